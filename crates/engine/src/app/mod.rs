mod input;
mod loop_runner;
mod metrics;
mod rendering;

pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig, DEFAULT_START_MAP};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{world_to_screen, Renderer};

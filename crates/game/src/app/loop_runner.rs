use std::process::ExitCode;

use tilewalk_engine::run_app;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    info!(start_map = %app.config.start_map, "launching");
    if let Err(err) = run_app(app.config) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

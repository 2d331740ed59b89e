//! Map documents: where they come from and how they reach the world.

mod error;
mod loader;
mod source;

pub use error::LoadError;
pub use loader::MapLoader;
pub use source::{load_document, parse_map_id, DirectoryMapSource, MapSource, MemoryMapSource};

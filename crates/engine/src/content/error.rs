use std::path::PathBuf;

use thiserror::Error;

use crate::keys::KeyError;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid map id '{map_id}': {source}")]
    InvalidMapId {
        map_id: String,
        #[source]
        source: KeyError,
    },
    #[error("map '{map_id}' not found")]
    Missing { map_id: String },
    #[error("failed to read map '{map_id}' at {path}: {source}")]
    Read {
        map_id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse map '{map_id}' at {json_path}: {source}")]
    Parse {
        map_id: String,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("map '{map_id}' has an empty tile grid")]
    EmptyGrid { map_id: String },
    #[error("map loader worker is not running")]
    WorkerUnavailable,
}

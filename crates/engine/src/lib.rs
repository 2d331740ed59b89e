use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
mod keys;
pub mod world;

pub use app::{
    run_app, world_to_screen, AppError, InputAction, InputSnapshot, LoopConfig,
    LoopMetricsSnapshot, Renderer, DEFAULT_START_MAP,
};
pub use content::{
    load_document, parse_map_id, DirectoryMapSource, LoadError, MapLoader, MapSource,
    MemoryMapSource,
};
pub use keys::KeyError;
pub use world::{
    CameraMode, Direction, InputEvent, LoadOutcome, LoadRequest, LoadResponse, MapDocument,
    MapId, Vec2, Viewport, WorldConfig, WorldController, WorldPhase, WorldState,
};

pub const ROOT_ENV_VAR: &str = "TILEWALK_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub maps_dir: PathBuf,
    pub sprites_dir: PathBuf,
}

impl AppPaths {
    fn from_root(root: PathBuf) -> Self {
        let assets_dir = root.join("assets");
        Self {
            maps_dir: assets_dir.join("maps"),
            sprites_dir: assets_dir.join("sprites"),
            assets_dir,
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "TILEWALK_ROOT is set but does not point to a valid project root: {path}\n\
A valid root contains an assets/maps/ directory."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not find assets/maps/ in the current directory or above the executable: {start_dir}\n\
Set {env_var} to the directory that holds assets/, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/tilewalk\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Finds the directory holding `assets/maps`: `TILEWALK_ROOT` when set,
/// otherwise the working directory or the nearest ancestor of the executable.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    resolve_root().map(AppPaths::from_root)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_project_root(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            if let Ok(cwd) = env::current_dir() {
                if is_project_root(&cwd) {
                    return Ok(normalize_path(&cwd));
                }
            }
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_project_root(candidate))
        .map(normalize_path)
}

fn is_project_root(path: &Path) -> bool {
    path.join("assets").join("maps").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

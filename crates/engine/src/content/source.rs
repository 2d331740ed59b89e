use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use super::LoadError;
use crate::world::{MapDocument, MapId};

/// One-shot fetch of a raw map document. Implementations run on the loader
/// worker thread.
pub trait MapSource: Send + 'static {
    fn fetch(&self, map_id: &MapId) -> Result<String, LoadError>;
}

/// Reads `<root>/<map_id>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryMapSource {
    root: PathBuf,
}

impl DirectoryMapSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, map_id: &MapId) -> PathBuf {
        self.root.join(format!("{map_id}.json"))
    }
}

impl MapSource for DirectoryMapSource {
    fn fetch(&self, map_id: &MapId) -> Result<String, LoadError> {
        let path = self.path_for(map_id);
        debug!(map = %map_id, path = %path.display(), "map_fetch");
        fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::Missing {
                map_id: map_id.to_string(),
            },
            _ => LoadError::Read {
                map_id: map_id.to_string(),
                path,
                source,
            },
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryMapSource {
    documents: HashMap<MapId, String>,
}

impl MemoryMapSource {
    pub fn insert(&mut self, map_id: MapId, raw: impl Into<String>) {
        self.documents.insert(map_id, raw.into());
    }
}

impl MapSource for MemoryMapSource {
    fn fetch(&self, map_id: &MapId) -> Result<String, LoadError> {
        self.documents
            .get(map_id)
            .cloned()
            .ok_or_else(|| LoadError::Missing {
                map_id: map_id.to_string(),
            })
    }
}

pub fn load_document(source: &dyn MapSource, map_id: &MapId) -> Result<MapDocument, LoadError> {
    let raw = source.fetch(map_id)?;
    MapDocument::parse(map_id, &raw)
}

/// Validates a user-supplied map id before any I/O happens.
pub fn parse_map_id(raw: &str) -> Result<MapId, LoadError> {
    MapId::new(raw).map_err(|source| LoadError::InvalidMapId {
        map_id: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> MapId {
        MapId::new(raw).expect("map id")
    }

    #[test]
    fn directory_source_reads_json_by_id() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("classroom.json"), r#"{"tiles": [["a"]]}"#).expect("write");

        let source = DirectoryMapSource::new(temp.path());
        let document = load_document(&source, &id("classroom")).expect("load");
        assert_eq!(document.tiles, vec![vec!["a".to_string()]]);
    }

    #[test]
    fn directory_source_reports_missing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let source = DirectoryMapSource::new(temp.path());
        let error = source.fetch(&id("nowhere")).expect_err("missing");
        assert!(matches!(error, LoadError::Missing { map_id } if map_id == "nowhere"));
    }

    #[test]
    fn directory_source_reports_unreadable_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("folder.json")).expect("mkdir");
        let source = DirectoryMapSource::new(temp.path());
        let error = source.fetch(&id("folder")).expect_err("directory is not a file");
        assert!(matches!(error, LoadError::Read { .. }));
    }

    #[test]
    fn parse_errors_surface_through_load_document() {
        let mut source = MemoryMapSource::default();
        source.insert(id("bad"), "{ not json");
        let error = load_document(&source, &id("bad")).expect_err("parse");
        assert!(matches!(error, LoadError::Parse { .. }));
    }

    #[test]
    fn invalid_ids_are_rejected_before_io() {
        for raw in ["../secrets", "maps/classroom", "", "Hallway"] {
            let error = parse_map_id(raw).expect_err("invalid id");
            assert!(matches!(error, LoadError::InvalidMapId { .. }), "raw={raw}");
        }
        assert_eq!(parse_map_id("hallway").expect("valid"), id("hallway"));
    }
}

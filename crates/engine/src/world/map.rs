use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use super::camera::CameraMode;
use super::tiles::{Block, TileGrid, TileRegistry};
use super::Vec2;
use crate::content::LoadError;
use crate::keys::{validate_map_id, KeyError};

/// Validated map identifier; doubles as the file stem under the maps directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct MapId(String);

impl MapId {
    pub fn new(raw: impl Into<String>) -> Result<Self, KeyError> {
        let raw = raw.into();
        validate_map_id(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MapId {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawStyle {
    Fill,
    Floor,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorLink {
    pub target_map: MapId,
    #[serde(default)]
    pub spawn: Option<Vec2>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileType {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub solid: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, rename = "drawType", alias = "drawStyle")]
    pub draw_style: Option<DrawStyle>,
    #[serde(default)]
    pub interactive: Option<bool>,
    #[serde(default)]
    pub door: Option<DoorLink>,
}

impl TileType {
    /// Tiles are interactive unless they opt out.
    pub fn is_interactive(&self) -> bool {
        self.interactive.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDocument {
    pub tiles: Vec<Vec<String>>,
    #[serde(default)]
    pub tile_types: BTreeMap<String, TileType>,
    #[serde(default)]
    pub events: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub spawn: Option<Vec2>,
    #[serde(default)]
    pub camera: Option<CameraMode>,
}

impl MapDocument {
    pub fn parse(map_id: &MapId, raw: &str) -> Result<Self, LoadError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let document = serde_path_to_error::deserialize::<_, MapDocument>(&mut deserializer)
            .map_err(|error| {
                let json_path = error.path().to_string();
                LoadError::Parse {
                    map_id: map_id.to_string(),
                    json_path,
                    source: error.into_inner(),
                }
            })?;
        deserializer.end().map_err(|source| LoadError::Parse {
            map_id: map_id.to_string(),
            json_path: ".".to_string(),
            source,
        })?;
        Ok(document)
    }
}

/// A map ready to be swapped into the world: grid interned, blocks built.
#[derive(Debug, Clone)]
pub struct LoadedMap {
    id: MapId,
    document: MapDocument,
    grid: TileGrid,
    blocks: Vec<Block>,
    tile_size: f32,
}

impl LoadedMap {
    pub fn build(id: MapId, document: MapDocument, tile_size: f32) -> Result<Self, LoadError> {
        let grid = TileGrid::from_rows(&document.tiles);
        if grid.is_empty() {
            return Err(LoadError::EmptyGrid {
                map_id: id.to_string(),
            });
        }
        let blocks = TileRegistry::new(&document.tile_types).materialize(&grid, tile_size);
        Ok(Self {
            id,
            document,
            grid,
            blocks,
            tile_size,
        })
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn width(&self) -> f32 {
        self.grid.columns() as f32 * self.tile_size
    }

    pub fn height(&self) -> f32 {
        self.grid.rows() as f32 * self.tile_size
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    pub fn spawn(&self) -> Option<Vec2> {
        self.document.spawn
    }

    pub fn camera(&self) -> Option<CameraMode> {
        self.document.camera
    }

    pub fn symbol_at_world(&self, position: Vec2) -> Option<&str> {
        self.grid.symbol_at_world(position, self.tile_size)
    }

    pub fn tile_type_at(&self, position: Vec2) -> Option<(&str, &TileType)> {
        let symbol = self.symbol_at_world(position)?;
        let tile_type = self.document.tile_types.get(symbol)?;
        Some((symbol, tile_type))
    }

    pub fn door_at(&self, position: Vec2) -> Option<&DoorLink> {
        self.tile_type_at(position)?.1.door.as_ref()
    }

    /// Dialogue lines for an interactive tile at `position`, if it has any.
    pub fn interaction_at(&self, position: Vec2) -> Option<(&str, &[String])> {
        let (symbol, tile_type) = self.tile_type_at(position)?;
        if !tile_type.is_interactive() {
            return None;
        }
        let lines = self.document.events.get(symbol)?;
        Some((symbol, lines.as_slice()))
    }
}

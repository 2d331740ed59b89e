use std::collections::BTreeMap;

use tracing::warn;

use super::collision::Aabb;
use super::map::{DrawStyle, TileType};
use super::Vec2;
use crate::keys::validate_image_key;

pub const FALLBACK_COLOR: Rgba = Rgba([128, 128, 128, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    /// Accepts `#rgb`, `#rrggbb` and a subset of the CSS named colours.
    /// Names outside that subset resolve to `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex);
        }
        named_color(&trimmed.to_ascii_lowercase())
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let mut channels = [0u8; 3];
            for (slot, ch) in channels.iter_mut().zip(hex.chars()) {
                let nibble = ch.to_digit(16)? as u8;
                *slot = nibble * 17;
            }
            Some(Rgba::opaque(channels[0], channels[1], channels[2]))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Rgba::opaque(r, g, b))
        }
        _ => None,
    }
}

fn named_color(name: &str) -> Option<Rgba> {
    let rgb = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "gray" | "grey" => (128, 128, 128),
        "darkgray" | "darkgrey" => (169, 169, 169),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "silver" => (192, 192, 192),
        "brown" => (165, 42, 42),
        "saddlebrown" => (139, 69, 19),
        "sienna" => (160, 82, 45),
        "chocolate" => (210, 105, 30),
        "peru" => (205, 133, 63),
        "burlywood" => (222, 184, 135),
        "tan" => (210, 180, 140),
        "wheat" => (245, 222, 179),
        "beige" => (245, 245, 220),
        "khaki" => (240, 230, 140),
        "red" => (255, 0, 0),
        "darkred" => (139, 0, 0),
        "maroon" => (128, 0, 0),
        "orange" => (255, 165, 0),
        "gold" => (255, 215, 0),
        "yellow" => (255, 255, 0),
        "green" => (0, 128, 0),
        "darkgreen" => (0, 100, 0),
        "olive" => (128, 128, 0),
        "teal" => (0, 128, 128),
        "blue" => (0, 0, 255),
        "navy" => (0, 0, 128),
        "lightblue" => (173, 216, 230),
        "skyblue" => (135, 206, 235),
        "cyan" => (0, 255, 255),
        "purple" => (128, 0, 128),
        "magenta" => (255, 0, 255),
        "pink" => (255, 192, 203),
        _ => return None,
    };
    Some(Rgba::opaque(rgb.0, rgb.1, rgb.2))
}

/// How a block is drawn. Resolved once at load so the renderer never looks at
/// tile types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderSpec {
    Hidden,
    Fill(Rgba),
    Floor(Rgba),
    Image { key: String, fallback: Rgba },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub solid: bool,
    pub symbol: String,
    pub render: RenderSpec,
}

impl Block {
    pub fn bounds(&self) -> Aabb {
        Aabb::square(Vec2::new(self.x, self.y), self.size)
    }
}

/// Row-major symbol grid. Ragged rows are padded with empty cells up to the
/// widest row.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<String>>,
}

impl TileGrid {
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut cells = Vec::with_capacity(columns * rows.len());
        for row in rows {
            cells.extend(row.iter().cloned().map(Some));
            cells.extend(std::iter::repeat(None).take(columns - row.len()));
        }
        Self {
            columns: columns as u32,
            rows: rows.len() as u32,
            cells,
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }

    pub fn index_of(&self, column: u32, row: u32) -> Option<usize> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        Some(row as usize * self.columns as usize + column as usize)
    }

    pub fn symbol_at(&self, column: u32, row: u32) -> Option<&str> {
        self.index_of(column, row)
            .and_then(|index| self.cells.get(index))
            .and_then(|cell| cell.as_deref())
    }

    /// Cell under a world position, `None` past the grid edges.
    pub fn symbol_at_world(&self, position: Vec2, tile_size: f32) -> Option<&str> {
        let column = (position.x / tile_size).floor();
        let row = (position.y / tile_size).floor();
        if !column.is_finite() || !row.is_finite() || column < 0.0 || row < 0.0 {
            return None;
        }
        self.symbol_at(column as u32, row as u32)
    }

    fn cells(&self) -> impl Iterator<Item = (u32, u32, &str)> + '_ {
        let columns = self.columns.max(1);
        self.cells.iter().enumerate().filter_map(move |(index, cell)| {
            let symbol = cell.as_deref()?;
            let index = index as u32;
            Some((index % columns, index / columns, symbol))
        })
    }
}

pub struct TileRegistry<'a> {
    types: &'a BTreeMap<String, TileType>,
}

impl<'a> TileRegistry<'a> {
    pub fn new(types: &'a BTreeMap<String, TileType>) -> Self {
        Self { types }
    }

    /// Builds one block per grid cell whose symbol has a tile type, row-major.
    pub fn materialize(&self, grid: &TileGrid, tile_size: f32) -> Vec<Block> {
        grid.cells()
            .filter_map(|(column, row, symbol)| {
                let tile_type = self.types.get(symbol)?;
                Some(Block {
                    x: column as f32 * tile_size,
                    y: row as f32 * tile_size,
                    size: tile_size,
                    solid: tile_type.solid,
                    symbol: symbol.to_string(),
                    render: resolve_render(symbol, tile_type),
                })
            })
            .collect()
    }
}

fn resolve_render(symbol: &str, tile_type: &TileType) -> RenderSpec {
    let color = tile_type
        .color
        .as_deref()
        .map(|raw| resolve_color(symbol, raw));

    if let Some(key) = tile_type.image.as_deref() {
        match validate_image_key(key) {
            Ok(()) => {
                return RenderSpec::Image {
                    key: key.to_string(),
                    fallback: color.unwrap_or(FALLBACK_COLOR),
                }
            }
            Err(error) => {
                warn!(symbol, key, error = %error, "tile_image_key_invalid");
            }
        }
    }

    match (tile_type.draw_style, color) {
        (Some(DrawStyle::Floor), color) => RenderSpec::Floor(color.unwrap_or(FALLBACK_COLOR)),
        (_, Some(color)) => RenderSpec::Fill(color),
        (_, None) => RenderSpec::Hidden,
    }
}

fn resolve_color(symbol: &str, raw: &str) -> Rgba {
    Rgba::parse(raw).unwrap_or_else(|| {
        warn!(symbol, color = raw, "tile_color_unknown");
        FALLBACK_COLOR
    })
}

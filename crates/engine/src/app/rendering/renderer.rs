use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::world::{Block, RenderSpec, Rgba, Vec2, Viewport, WorldState};

use super::text::{draw_text_clipped, wrap_text, GLYPH_ADVANCE, LINE_ADVANCE};
use super::world_to_screen;

const BACKGROUND_COLOR: [u8; 4] = [245, 245, 220, 255];
const PLAYER_COLOR: [u8; 4] = [0, 0, 255, 255];
const PANEL_COLOR: [u8; 4] = [24, 24, 32, 255];
const PANEL_BORDER_COLOR: [u8; 4] = [240, 240, 240, 255];
const PANEL_TEXT_COLOR: [u8; 4] = [244, 248, 252, 255];
const PROGRESS_DONE_COLOR: [u8; 4] = [240, 240, 240, 255];
const PROGRESS_PENDING_COLOR: [u8; 4] = [90, 90, 110, 255];
const PANEL_HEIGHT_PX: i32 = 96;
const PANEL_MARGIN_PX: i32 = 16;
const PROGRESS_DOT_PX: i32 = 8;
const FLOOR_PLANKS_PER_TILE: i32 = 4;
const FLOOR_SEAM_DARKEN: u8 = 28;

struct LoadedSprite {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// PNG sprites keyed by image key, loaded on first use. Failures are cached
/// too so a missing file is only reported once.
struct SpriteCache {
    sprites_dir: PathBuf,
    sprites: HashMap<String, Option<LoadedSprite>>,
    warned_keys: HashSet<String>,
}

impl SpriteCache {
    fn new(sprites_dir: PathBuf) -> Self {
        Self {
            sprites_dir,
            sprites: HashMap::new(),
            warned_keys: HashSet::new(),
        }
    }

    fn get(&mut self, key: &str) -> Option<&LoadedSprite> {
        if !self.sprites.contains_key(key) {
            let path = self.sprites_dir.join(format!("{key}.png"));
            let loaded = match load_sprite_rgba(&path) {
                Ok(sprite) => Some(sprite),
                Err(reason) => {
                    warn_sprite_load_once(&mut self.warned_keys, key, &path, &reason);
                    None
                }
            };
            self.sprites.insert(key.to_string(), loaded);
        }
        self.sprites.get(key).and_then(Option::as_ref)
    }
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    sprites: SpriteCache,
}

impl Renderer {
    pub fn new(window: Arc<Window>, sprites_dir: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);
        let pixels = Self::build_pixels(Arc::clone(&window), width, height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport { width, height },
            sprites: SpriteCache::new(sprites_dir),
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Zero-sized requests (minimised windows) keep the previous surface.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn render(&mut self, state: &WorldState) -> Result<(), Error> {
        let Viewport { width, height } = self.viewport;
        let frame = self.pixels.frame_mut();
        draw_world(frame, width, height, state, &mut self.sprites);
        self.pixels.render()
    }
}

fn draw_world(
    frame: &mut [u8],
    width: u32,
    height: u32,
    state: &WorldState,
    sprites: &mut SpriteCache,
) {
    clear(frame, BACKGROUND_COLOR);
    let offset = state.camera_offset();

    for block in state.blocks() {
        draw_block(frame, width, height, block, offset, sprites);
    }

    let player = state.player();
    let (px, py) = world_to_screen(player.position, offset);
    let size = player.size.round() as i32;
    fill_rect(frame, width, height, px, py, size, size, PLAYER_COLOR);

    let dialogue = state.dialogue();
    if let (Some(line), Some((index, count))) = (dialogue.current_line(), dialogue.progress()) {
        draw_dialogue_panel(frame, width, height, line, index, count);
    }
}

fn draw_block(
    frame: &mut [u8],
    width: u32,
    height: u32,
    block: &Block,
    offset: Vec2,
    sprites: &mut SpriteCache,
) {
    let (x, y) = world_to_screen(Vec2::new(block.x, block.y), offset);
    let size = block.size.round() as i32;
    if x + size <= 0 || y + size <= 0 || x >= width as i32 || y >= height as i32 {
        return;
    }
    match &block.render {
        RenderSpec::Hidden => {}
        RenderSpec::Fill(color) => fill_rect(frame, width, height, x, y, size, size, color.0),
        RenderSpec::Floor(color) => draw_floor_tile(frame, width, height, x, y, size, *color),
        RenderSpec::Image { key, fallback } => match sprites.get(key) {
            Some(sprite) => draw_sprite_scaled(frame, width, height, x, y, size, sprite),
            None => fill_rect(frame, width, height, x, y, size, size, fallback.0),
        },
    }
}

/// Horizontal planks with a staggered vertical seam per plank.
fn draw_floor_tile(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    size: i32,
    color: Rgba,
) {
    fill_rect(frame, width, height, x, y, size, size, color.0);
    let seam = darken(color, FLOOR_SEAM_DARKEN);
    let plank = (size / FLOOR_PLANKS_PER_TILE).max(1);
    for index in 0..FLOOR_PLANKS_PER_TILE {
        let top = y + index * plank;
        fill_rect(frame, width, height, x, top, size, 1, seam);
        let seam_x = if index % 2 == 0 { x + size / 3 } else { x + 2 * size / 3 };
        fill_rect(frame, width, height, seam_x, top, 1, plank, seam);
    }
}

/// Bottom panel with the current line word-wrapped above a row of progress
/// dots. Lines that do not fit the panel are dropped.
fn draw_dialogue_panel(
    frame: &mut [u8],
    width: u32,
    height: u32,
    line: &str,
    index: usize,
    count: usize,
) {
    let panel_width = width as i32 - PANEL_MARGIN_PX * 2;
    if panel_width <= 0 {
        return;
    }
    let top = height as i32 - PANEL_HEIGHT_PX - PANEL_MARGIN_PX;
    let left = PANEL_MARGIN_PX;
    fill_rect(frame, width, height, left, top, panel_width, PANEL_HEIGHT_PX, PANEL_COLOR);
    outline_rect(frame, width, height, left, top, panel_width, PANEL_HEIGHT_PX, PANEL_BORDER_COLOR);

    let dot_y = top + PANEL_HEIGHT_PX - PANEL_MARGIN_PX - PROGRESS_DOT_PX;
    let text_left = left + PANEL_MARGIN_PX;
    let text_top = top + PANEL_MARGIN_PX;
    let max_chars = ((panel_width - PANEL_MARGIN_PX * 2) / GLYPH_ADVANCE).max(1) as usize;
    let max_lines = ((dot_y - text_top) / LINE_ADVANCE).max(1) as usize;
    for (row, text) in wrap_text(line, max_chars).iter().take(max_lines).enumerate() {
        let y = text_top + row as i32 * LINE_ADVANCE;
        draw_text_clipped(frame, width, height, text_left, y, text, PANEL_TEXT_COLOR);
    }

    for dot in 0..count {
        let dot_x = left + PANEL_MARGIN_PX + dot as i32 * PROGRESS_DOT_PX * 2;
        let color = if dot <= index {
            PROGRESS_DONE_COLOR
        } else {
            PROGRESS_PENDING_COLOR
        };
        fill_rect(frame, width, height, dot_x, dot_y, PROGRESS_DOT_PX, PROGRESS_DOT_PX, color);
    }
}

fn darken(color: Rgba, amount: u8) -> [u8; 4] {
    let [r, g, b, a] = color.0;
    [
        r.saturating_sub(amount),
        g.saturating_sub(amount),
        b.saturating_sub(amount),
        a,
    ]
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_sprite_load_once(warned_keys: &mut HashSet<String>, key: &str, path: &Path, reason: &str) {
    if !warned_keys.insert(key.to_string()) {
        return;
    }
    warn!(
        image_key = key,
        path = %path.display(),
        reason,
        "tile_sprite_load_failed_using_fallback"
    );
}

fn clear(frame: &mut [u8], color: [u8; 4]) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&color);
    }
}

pub(super) fn write_pixel_rgba_clipped(
    frame: &mut [u8],
    width: usize,
    x: i32,
    y: i32,
    color: [u8; 4],
) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(width)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

#[allow(clippy::too_many_arguments)]
fn fill_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    let left = x.max(0);
    let top = y.max(0);
    let right = x.saturating_add(rect_width).min(width as i32);
    let bottom = y.saturating_add(rect_height).min(height as i32);
    for py in top..bottom {
        for px in left..right {
            write_pixel_rgba_clipped(frame, width as usize, px, py, color);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn outline_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    fill_rect(frame, width, height, x, y, rect_width, 1, color);
    fill_rect(frame, width, height, x, y + rect_height - 1, rect_width, 1, color);
    fill_rect(frame, width, height, x, y, 1, rect_height, color);
    fill_rect(frame, width, height, x + rect_width - 1, y, 1, rect_height, color);
}

/// Nearest-neighbour blit of `sprite` into the `size` x `size` square at
/// (`left`, `top`). Fully transparent texels are skipped.
fn draw_sprite_scaled(
    frame: &mut [u8],
    width: u32,
    height: u32,
    left: i32,
    top: i32,
    size: i32,
    sprite: &LoadedSprite,
) {
    if sprite.width == 0 || sprite.height == 0 || size <= 0 {
        return;
    }
    let expected_rgba_len = sprite.width as usize * sprite.height as usize * 4;
    if sprite.rgba.len() < expected_rgba_len {
        return;
    }

    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = (left + size).min(width as i32);
    let draw_bottom = (top + size).min(height as i32);
    let sprite_width = sprite.width as usize;

    for out_y in draw_top..draw_bottom {
        let src_y = ((out_y - top) as u64 * sprite.height as u64 / size as u64) as usize;
        let src_y = src_y.min(sprite.height as usize - 1);
        for out_x in draw_left..draw_right {
            let src_x = ((out_x - left) as u64 * sprite.width as u64 / size as u64) as usize;
            let src_x = src_x.min(sprite_width - 1);
            let src_offset = (src_y * sprite_width + src_x) * 4;
            let alpha = sprite.rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let mut texel = [0u8; 4];
            texel.copy_from_slice(&sprite.rgba[src_offset..src_offset + 4]);
            write_pixel_rgba_clipped(frame, width as usize, out_x, out_y, texel);
        }
    }
}

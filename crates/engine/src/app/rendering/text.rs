use super::renderer::write_pixel_rgba_clipped;

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: usize = 5;
const TEXT_SCALE: i32 = 2;
pub(super) const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;
pub(super) const LINE_ADVANCE: i32 = (GLYPH_HEIGHT as i32 + 2) * TEXT_SCALE;
const FALLBACK_CHAR: char = '?';

type Glyph = [u8; GLYPH_HEIGHT];

/// 3x5 bitmaps for printable ASCII, indexed from `' '`. Each row keeps its
/// pixels in the low three bits, leftmost column in the high bit.
const ASCII_GLYPHS: [Glyph; 95] = [
    [0b000, 0b000, 0b000, 0b000, 0b000], // space
    [0b010, 0b010, 0b010, 0b000, 0b010], // !
    [0b101, 0b101, 0b000, 0b000, 0b000], // "
    [0b101, 0b111, 0b101, 0b111, 0b101], // #
    [0b111, 0b110, 0b111, 0b011, 0b111], // $
    [0b101, 0b001, 0b010, 0b100, 0b101], // %
    [0b010, 0b101, 0b010, 0b101, 0b011], // &
    [0b010, 0b010, 0b000, 0b000, 0b000], // quote
    [0b001, 0b010, 0b010, 0b010, 0b001], // (
    [0b100, 0b010, 0b010, 0b010, 0b100], // )
    [0b000, 0b101, 0b010, 0b101, 0b000], // *
    [0b000, 0b010, 0b111, 0b010, 0b000], // +
    [0b000, 0b000, 0b000, 0b010, 0b100], // ,
    [0b000, 0b000, 0b111, 0b000, 0b000], // -
    [0b000, 0b000, 0b000, 0b000, 0b010], // .
    [0b001, 0b001, 0b010, 0b100, 0b100], // /
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
    [0b000, 0b010, 0b000, 0b010, 0b000], // :
    [0b000, 0b010, 0b000, 0b010, 0b100], // ;
    [0b001, 0b010, 0b100, 0b010, 0b001], // <
    [0b000, 0b111, 0b000, 0b111, 0b000], // =
    [0b100, 0b010, 0b001, 0b010, 0b100], // >
    [0b111, 0b001, 0b011, 0b000, 0b010], // ?
    [0b111, 0b101, 0b111, 0b100, 0b111], // @
    [0b010, 0b101, 0b111, 0b101, 0b101], // A
    [0b110, 0b101, 0b110, 0b101, 0b110], // B
    [0b111, 0b100, 0b100, 0b100, 0b111], // C
    [0b110, 0b101, 0b101, 0b101, 0b110], // D
    [0b111, 0b100, 0b110, 0b100, 0b111], // E
    [0b111, 0b100, 0b110, 0b100, 0b100], // F
    [0b111, 0b100, 0b101, 0b101, 0b111], // G
    [0b101, 0b101, 0b111, 0b101, 0b101], // H
    [0b111, 0b010, 0b010, 0b010, 0b111], // I
    [0b111, 0b001, 0b001, 0b101, 0b111], // J
    [0b101, 0b101, 0b110, 0b101, 0b101], // K
    [0b100, 0b100, 0b100, 0b100, 0b111], // L
    [0b101, 0b111, 0b111, 0b101, 0b101], // M
    [0b101, 0b111, 0b111, 0b111, 0b101], // N
    [0b111, 0b101, 0b101, 0b101, 0b111], // O
    [0b110, 0b101, 0b110, 0b100, 0b100], // P
    [0b111, 0b101, 0b101, 0b111, 0b001], // Q
    [0b110, 0b101, 0b110, 0b101, 0b101], // R
    [0b111, 0b100, 0b111, 0b001, 0b111], // S
    [0b111, 0b010, 0b010, 0b010, 0b010], // T
    [0b101, 0b101, 0b101, 0b101, 0b111], // U
    [0b101, 0b101, 0b101, 0b101, 0b010], // V
    [0b101, 0b101, 0b111, 0b111, 0b101], // W
    [0b101, 0b101, 0b010, 0b101, 0b101], // X
    [0b101, 0b101, 0b010, 0b010, 0b010], // Y
    [0b111, 0b001, 0b010, 0b100, 0b111], // Z
    [0b110, 0b100, 0b100, 0b100, 0b110], // [
    [0b100, 0b100, 0b010, 0b001, 0b001], // backslash
    [0b011, 0b001, 0b001, 0b001, 0b011], // ]
    [0b010, 0b101, 0b000, 0b000, 0b000], // ^
    [0b000, 0b000, 0b000, 0b000, 0b111], // _
    [0b100, 0b010, 0b000, 0b000, 0b000], // `
    [0b000, 0b111, 0b001, 0b111, 0b111], // a
    [0b100, 0b100, 0b110, 0b101, 0b110], // b
    [0b000, 0b111, 0b100, 0b100, 0b111], // c
    [0b001, 0b001, 0b111, 0b101, 0b111], // d
    [0b000, 0b111, 0b110, 0b100, 0b111], // e
    [0b011, 0b100, 0b110, 0b100, 0b100], // f
    [0b000, 0b111, 0b101, 0b111, 0b001], // g
    [0b100, 0b100, 0b110, 0b101, 0b101], // h
    [0b010, 0b000, 0b010, 0b010, 0b010], // i
    [0b001, 0b000, 0b001, 0b101, 0b010], // j
    [0b100, 0b101, 0b110, 0b101, 0b101], // k
    [0b100, 0b100, 0b100, 0b100, 0b111], // l
    [0b000, 0b110, 0b111, 0b101, 0b101], // m
    [0b000, 0b110, 0b101, 0b101, 0b101], // n
    [0b000, 0b111, 0b101, 0b101, 0b111], // o
    [0b000, 0b110, 0b101, 0b110, 0b100], // p
    [0b000, 0b111, 0b101, 0b111, 0b001], // q
    [0b000, 0b110, 0b101, 0b100, 0b100], // r
    [0b000, 0b111, 0b110, 0b001, 0b111], // s
    [0b010, 0b111, 0b010, 0b010, 0b011], // t
    [0b000, 0b101, 0b101, 0b101, 0b111], // u
    [0b000, 0b101, 0b101, 0b101, 0b010], // v
    [0b000, 0b101, 0b101, 0b111, 0b010], // w
    [0b000, 0b101, 0b010, 0b010, 0b101], // x
    [0b000, 0b101, 0b101, 0b111, 0b001], // y
    [0b000, 0b111, 0b001, 0b010, 0b111], // z
    [0b011, 0b010, 0b110, 0b010, 0b011], // {
    [0b010, 0b010, 0b010, 0b010, 0b010], // |
    [0b110, 0b010, 0b011, 0b010, 0b110], // }
    [0b000, 0b011, 0b110, 0b000, 0b000], // ~
];

fn glyph_for(ch: char) -> Option<Glyph> {
    let code = u32::from(ch);
    if !(0x20..=0x7e).contains(&code) {
        return None;
    }
    ASCII_GLYPHS.get((code - 0x20) as usize).copied()
}

/// Draws `text` left to right from (`x`, `y`); characters outside printable
/// ASCII are drawn as `?`.
pub(super) fn draw_text_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    mut x: i32,
    y: i32,
    text: &str,
    color: [u8; 4],
) {
    let fallback = glyph_for(FALLBACK_CHAR).unwrap_or_default();
    for ch in text.chars() {
        let glyph = glyph_for(ch).unwrap_or(fallback);
        draw_glyph_clipped(frame, width, height, x, y, glyph, color);
        x += GLYPH_ADVANCE;
    }
}

fn draw_glyph_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    glyph: Glyph,
    color: [u8; 4],
) {
    if width == 0 || height == 0 {
        return;
    }
    for (row, bits) in glyph.iter().enumerate() {
        let glyph_y = y + row as i32 * TEXT_SCALE;
        for col in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                continue;
            }
            let glyph_x = x + col * TEXT_SCALE;
            for sy in 0..TEXT_SCALE {
                if glyph_y + sy >= height as i32 {
                    break;
                }
                for sx in 0..TEXT_SCALE {
                    let pixel_x = glyph_x + sx;
                    write_pixel_rgba_clipped(frame, width as usize, pixel_x, glyph_y + sy, color);
                }
            }
        }
    }
}

/// Greedy word wrap to at most `max_chars` per line. Words longer than a
/// line are split.
pub(super) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        while chars.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = chars.split_off(max_chars);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }
        if chars.is_empty() {
            continue;
        }
        let needed = if current_len == 0 { chars.len() } else { current_len + 1 + chars.len() };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(chars.iter());
        current_len += chars.len();
    }
    if current_len > 0 {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_pixels(frame: &[u8]) -> usize {
        frame.chunks_exact(4).filter(|pixel| pixel[3] != 0).count()
    }

    #[test]
    fn printable_ascii_has_glyphs() {
        for code in 0x20u8..=0x7e {
            assert!(glyph_for(char::from(code)).is_some(), "missing glyph for {code}");
        }
        assert!(glyph_for('\n').is_none());
        assert!(glyph_for('é').is_none());
    }

    #[test]
    fn unknown_characters_draw_fallback_glyph() {
        let mut accented = vec![0u8; 16 * 16 * 4];
        let mut question = vec![0u8; 16 * 16 * 4];
        draw_text_clipped(&mut accented, 16, 16, 0, 0, "é", [255, 255, 255, 255]);
        draw_text_clipped(&mut question, 16, 16, 0, 0, "?", [255, 255, 255, 255]);
        assert_eq!(accented, question);
        assert!(lit_pixels(&accented) > 0);
    }

    #[test]
    fn text_is_clipped_to_frame() {
        let mut buffer = vec![0u8; 4 * 4 * 4];
        draw_text_clipped(&mut buffer, 4, 4, -2, -2, "HH", [1, 1, 1, 255]);
        assert!(lit_pixels(&buffer) > 0);
        assert_eq!(buffer.len(), 4 * 4 * 4);
    }

    #[test]
    fn wrap_breaks_on_words_and_splits_long_ones() {
        assert_eq!(wrap_text("a chalky old blackboard", 10), ["a chalky", "old", "blackboard"]);
        assert_eq!(wrap_text("abcdefghij", 4), ["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("  spaced   out ", 20), ["spaced out"]);
        assert!(wrap_text("", 8).is_empty());
    }
}

//! Dot-matrix fallback face.
//!
//! Used when no outline font can be loaded. Covers digits and the few
//! separators a numeric field needs; anything else renders as an empty cell.
//! Glyphs are 5x7 cells on a 6-cell advance, scaled by an integer unit so
//! every stroke stays pixel-aligned.

use image::{Rgba, RgbaImage};

const COLS: u32 = 5;
const ROWS: u32 = 7;
const ADVANCE: u32 = COLS + 1;

fn pattern(ch: char) -> [u8; ROWS as usize] {
    match ch {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b00100, 0b01000],
        _ => [0; ROWS as usize],
    }
}

/// Pixel size of one dot at the given font size.
pub fn unit_for_size(size: u32) -> u32 {
    (size / 8).max(1)
}

/// Laid-out dots of a string, in cell coordinates.
pub(crate) struct DotRun {
    unit: u32,
    dots: Vec<(u32, u32)>,
    min: (u32, u32),
    max: (u32, u32),
}

impl DotRun {
    pub(crate) fn layout(text: &str, size: u32) -> Option<Self> {
        let dots: Vec<(u32, u32)> = text
            .chars()
            .enumerate()
            .flat_map(|(i, ch)| {
                let rows = pattern(ch);
                (0..ROWS).flat_map(move |r| {
                    (0..COLS)
                        .filter(move |&c| (rows[r as usize] >> (COLS - 1 - c)) & 1 == 1)
                        .map(move |c| (i as u32 * ADVANCE + c, r))
                })
            })
            .collect();

        let min_x = dots.iter().map(|d| d.0).min()?;
        let min_y = dots.iter().map(|d| d.1).min()?;
        let max_x = dots.iter().map(|d| d.0).max()?;
        let max_y = dots.iter().map(|d| d.1).max()?;

        Some(Self {
            unit: unit_for_size(size),
            dots,
            min: (min_x, min_y),
            max: (max_x, max_y),
        })
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (
            (self.max.0 - self.min.0 + 1) * self.unit,
            (self.max.1 - self.min.1 + 1) * self.unit,
        )
    }

    pub(crate) fn draw(&self, ink: Rgba<u8>) -> RgbaImage {
        let (w, h) = self.dimensions();
        let [r, g, b, a] = ink.0;
        let mut img = RgbaImage::from_pixel(w, h, Rgba([r, g, b, 0]));
        for &(cx, cy) in &self.dots {
            let x0 = (cx - self.min.0) * self.unit;
            let y0 = (cy - self.min.1) * self.unit;
            for y in y0..y0 + self.unit {
                for x in x0..x0 + self.unit {
                    img.put_pixel(x, y, Rgba([r, g, b, a]));
                }
            }
        }
        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_have_ink() {
        for ch in '0'..='9' {
            assert!(DotRun::layout(&ch.to_string(), 10).is_some(), "{ch}");
        }
    }

    #[test]
    fn blank_text_has_no_layout() {
        assert!(DotRun::layout("", 20).is_none());
        assert!(DotRun::layout("   ", 20).is_none());
    }

    #[test]
    fn measures_tight_box() {
        let run = DotRun::layout("9999", 16).unwrap();
        // four glyphs on a 6-cell advance, last one 5 cells wide
        assert_eq!(run.dimensions(), (23 * 2, 7 * 2));

        let run = DotRun::layout("-", 8).unwrap();
        assert_eq!(run.dimensions(), (5, 1));
    }

    #[test]
    fn draw_matches_dimensions_and_keeps_background_clear() {
        let run = DotRun::layout("1", 24).unwrap();
        let img = run.draw(Rgba([0, 0, 0, 255]));
        assert_eq!(img.dimensions(), run.dimensions());
        // "1" is three cells wide: top-left dot of the bounding box is empty
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert!(img.pixels().any(|p| p.0[3] == 255));
    }
}

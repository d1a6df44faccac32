//! Shrink-to-fit text rendering.
//!
//! A string is drawn at a size estimated from the target box height, rotated
//! with an expanded canvas, and shrunk step by step until the rotated bitmap
//! fits. The first size that fits wins. When nothing down to the floor fits,
//! the floor size is returned anyway and flagged as overflowing.

use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Result, SynthError},
    fonts::{Face, FontPool, FontSource},
};

/// Range the initial size/box-height ratio is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeRatio {
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitParams {
    pub min_font_size: u32,
    pub font_size_step: u32,
    pub size_ratio: SizeRatio,
    pub ink: Rgba<u8>,
    /// Return an error instead of an oversized bitmap.
    pub strict: bool,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            min_font_size: 10,
            font_size_step: 2,
            size_ratio: SizeRatio { min: 0.5, max: 0.9 },
            ink: Rgba([0, 0, 0, 255]),
            strict: false,
        }
    }
}

/// Rotated text bitmap, transparent outside glyph strokes.
pub struct RenderedGlyph {
    pub image: RgbaImage,
    pub font_size: u32,
    /// Set when the bitmap is larger than the requested box.
    pub overflowed: bool,
}

impl RenderedGlyph {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

pub struct FittingRenderer<'a> {
    pool: &'a FontPool,
    params: FitParams,
}

impl<'a> FittingRenderer<'a> {
    pub fn new(pool: &'a FontPool, params: FitParams) -> Self {
        Self { pool, params }
    }

    pub fn render<R: Rng + ?Sized>(
        &self,
        text: &str,
        box_w: u32,
        box_h: u32,
        source: &FontSource,
        angle_degrees: f32,
        rng: &mut R,
    ) -> Result<RenderedGlyph> {
        let p = &self.params;
        let step = p.font_size_step.max(1);
        let mut size = self.initial_size(box_h, rng);
        let face = source.resolve(self.pool, rng);

        while size >= p.min_font_size {
            // no ink at this size: keep shrinking
            if let Some(text_img) = face.rasterize(text, size, p.ink) {
                let rotated = rotate_expand(&text_img, angle_degrees, p.ink);
                if rotated.width() <= box_w && rotated.height() <= box_h {
                    return Ok(RenderedGlyph {
                        image: rotated,
                        font_size: size,
                        overflowed: false,
                    });
                }
            }

            match size.checked_sub(step) {
                Some(next) => size = next,
                None => break,
            }
        }

        self.render_floor(&face, text, box_w, box_h, angle_degrees)
    }

    fn initial_size<R: Rng + ?Sized>(&self, box_h: u32, rng: &mut R) -> u32 {
        let SizeRatio { min, max } = self.params.size_ratio;
        let u = if min < max { rng.random_range(min..=max) } else { min };
        ((box_h as f64 * u) as u32).max(self.params.min_font_size)
    }

    fn render_floor(
        &self,
        face: &Face,
        text: &str,
        box_w: u32,
        box_h: u32,
        angle_degrees: f32,
    ) -> Result<RenderedGlyph> {
        let p = &self.params;
        let size = p.min_font_size;
        let [r, g, b, _] = p.ink.0;
        let text_img = face
            .rasterize(text, size, p.ink)
            .unwrap_or_else(|| RgbaImage::from_pixel(1, 1, Rgba([r, g, b, 0])));
        let rotated = rotate_expand(&text_img, angle_degrees, p.ink);
        let overflowed = rotated.width() > box_w || rotated.height() > box_h;

        if overflowed {
            if p.strict {
                return Err(SynthError::Overflow {
                    text: text.to_string(),
                    box_w,
                    box_h,
                    size,
                });
            }
            debug!(
                text,
                box_w,
                box_h,
                width = rotated.width(),
                height = rotated.height(),
                "text overflows box at minimum size"
            );
        }

        Ok(RenderedGlyph {
            image: rotated,
            font_size: size,
            overflowed,
        })
    }
}

/// Size of the axis-aligned box holding a `w`x`h` rectangle rotated by
/// `angle_degrees`.
pub fn rotated_extent(w: u32, h: u32, angle_degrees: f32) -> (u32, u32) {
    if angle_degrees.rem_euclid(360.0) == 0.0 {
        return (w, h);
    }
    let (sin, cos) = (angle_degrees as f64).to_radians().sin_cos();
    let (w, h) = (w as f64, h as f64);
    // tolerance keeps right angles from picking up an extra pixel
    let span = |v: f64| ((v - 1e-6).ceil().max(1.0)) as u32;
    (
        span(w * cos.abs() + h * sin.abs()),
        span(w * sin.abs() + h * cos.abs()),
    )
}

/// Rotates counter-clockwise about the center onto a canvas grown to the
/// full rotated silhouette, with bicubic resampling. A zero angle returns an
/// identical copy.
pub fn rotate_expand(src: &RgbaImage, angle_degrees: f32, ink: Rgba<u8>) -> RgbaImage {
    let (w, h) = src.dimensions();
    if angle_degrees.rem_euclid(360.0) == 0.0 {
        return src.clone();
    }

    let (out_w, out_h) = rotated_extent(w, h, angle_degrees);
    let [r, g, b, _] = ink.0;
    let clear = Rgba([r, g, b, 0]);
    let mut out = RgbaImage::from_pixel(out_w, out_h, clear);

    // image y grows downwards, so a visual counter-clockwise turn is a
    // negative angle for the projection
    let projection = Projection::translate(out_w as f32 / 2.0, out_h as f32 / 2.0)
        * Projection::rotate(-angle_degrees.to_radians())
        * Projection::translate(-(w as f32) / 2.0, -(h as f32) / 2.0);
    warp_into(src, &projection, Interpolation::Bicubic, clear, &mut out);
    out
}

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// One labeled field on the template, in coordinates normalized to the
/// template size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub class_id: u32,
    pub name: String,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn new(
        class_id: u32,
        name: &str,
        center_x: f64,
        center_y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            class_id,
            name: name.to_string(),
            center_x,
            center_y,
            width,
            height,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let coords = [
            ("center_x", self.center_x),
            ("center_y", self.center_y),
            ("width", self.width),
            ("height", self.height),
        ];
        for (field, v) in coords {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(SynthError::Config(format!(
                    "region {:?} (class {}): {field} = {v} is outside [0, 1]",
                    self.name, self.class_id
                )));
            }
        }
        Ok(())
    }
}

/// Where the template's top-left corner lands on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlacementOffset {
    pub dx: u32,
    pub dy: u32,
}

/// Absolute pixel rectangle on the canvas. Edges are inclusive and clamped to
/// the canvas, so `xmin <= xmax` and `ymin <= ymax` always hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PixelBox {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl PixelBox {
    pub fn width(&self) -> u32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> u32 {
        self.ymax - self.ymin
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// `(xc, yc, w, h)` relative to the canvas.
    pub fn to_normalized(&self, canvas_w: u32, canvas_h: u32) -> (f64, f64, f64, f64) {
        let cw = canvas_w as f64;
        let ch = canvas_h as f64;
        (
            (self.xmin + self.xmax) as f64 / 2.0 / cw,
            (self.ymin + self.ymax) as f64 / 2.0 / ch,
            self.width() as f64 / cw,
            self.height() as f64 / ch,
        )
    }
}

/// Maps a template-relative region onto the canvas.
///
/// Extents are scaled by the base template size, offset by the placement and
/// converted with truncation toward zero before clamping each edge to the
/// canvas independently. A clamped box may end up with zero width or height.
pub fn map_region(
    region: &Region,
    base_w: u32,
    base_h: u32,
    offset: PlacementOffset,
    canvas_w: u32,
    canvas_h: u32,
) -> (u32, PixelBox) {
    let cx = region.center_x * base_w as f64;
    let cy = region.center_y * base_h as f64;
    let half_w = region.width * base_w as f64 / 2.0;
    let half_h = region.height * base_h as f64 / 2.0;

    let dx = offset.dx as i64;
    let dy = offset.dy as i64;
    let xmin = (cx - half_w) as i64 + dx;
    let ymin = (cy - half_h) as i64 + dy;
    let xmax = (cx + half_w) as i64 + dx;
    let ymax = (cy + half_h) as i64 + dy;

    let max_x = canvas_w.saturating_sub(1) as i64;
    let max_y = canvas_h.saturating_sub(1) as i64;
    let pixel_box = PixelBox {
        xmin: xmin.clamp(0, max_x) as u32,
        ymin: ymin.clamp(0, max_y) as u32,
        xmax: xmax.clamp(0, max_x) as u32,
        ymax: ymax.clamp(0, max_y) as u32,
    };

    (region.class_id, pixel_box)
}

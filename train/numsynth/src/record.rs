use std::fmt;

use serde::Serialize;

use crate::geom::{PixelBox, PlacementOffset};

/// One normalized detection box plus the literal it shows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelRecord {
    pub class_id: u32,
    pub xc: f64,
    pub yc: f64,
    pub w: f64,
    pub h: f64,
    pub literal_value: String,
}

impl LabelRecord {
    /// Always built from the box the text was pasted into.
    pub fn from_pixel_box(
        class_id: u32,
        pixel_box: &PixelBox,
        canvas_w: u32,
        canvas_h: u32,
        value: &str,
    ) -> Self {
        let (xc, yc, w, h) = pixel_box.to_normalized(canvas_w, canvas_h);
        Self {
            class_id,
            xc,
            yc,
            w,
            h,
            literal_value: value.to_string(),
        }
    }
}

impl fmt::Display for LabelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6} {}",
            self.class_id, self.xc, self.yc, self.w, self.h, self.literal_value
        )
    }
}

/// Per-field details kept next to the label for the manifest.
#[derive(Clone, Debug, Serialize)]
pub struct FieldRecord {
    pub name: String,
    pub label: LabelRecord,
    pub pixel_box: PixelBox,
    pub angle: i32,
    pub font_size: u32,
    pub overflowed: bool,
}

/// Label file body: one line per field, then a `Name=value` summary line.
pub fn label_text(fields: &[FieldRecord]) -> String {
    let lines: Vec<String> = fields.iter().map(|f| f.label.to_string()).collect();
    let summary: Vec<String> = fields
        .iter()
        .map(|f| format!("{}={}", f.name, f.label.literal_value))
        .collect();
    format!("{}\n{}", lines.join("\n"), summary.join(" "))
}

#[derive(Serialize, Debug)]
pub struct ManifestRecord<'a> {
    pub schema: &'static str,
    pub image: String,
    pub debug_image: String,
    pub label: String,
    pub seed: u64,
    pub offset: PlacementOffset,
    pub fields: &'a [FieldRecord],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, class_id: u32, b: PixelBox, value: &str) -> FieldRecord {
        FieldRecord {
            name: name.to_string(),
            label: LabelRecord::from_pixel_box(class_id, &b, 1024, 1024, value),
            pixel_box: b,
            angle: 0,
            font_size: 20,
            overflowed: false,
        }
    }

    #[test]
    fn formats_label_line_with_six_decimals() {
        let b = PixelBox {
            xmin: 122,
            ymin: 207,
            xmax: 262,
            ymax: 312,
        };
        let rec = LabelRecord::from_pixel_box(0, &b, 1024, 1024, "77");
        assert_eq!(rec.to_string(), "0 0.187500 0.253418 0.136719 0.102539 77");
    }

    #[test]
    fn label_text_ends_with_summary() {
        let a = PixelBox {
            xmin: 0,
            ymin: 0,
            xmax: 512,
            ymax: 256,
        };
        let b = PixelBox {
            xmin: 512,
            ymin: 256,
            xmax: 1023,
            ymax: 1023,
        };
        let text = label_text(&[field("Qty", 0, a, "12"), field("Price", 1, b, "3400")]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "0 0.250000 0.125000 0.500000 0.250000 12");
        assert!(lines[1].starts_with("1 ") && lines[1].ends_with(" 3400"));
        assert_eq!(lines[2], "Qty=12 Price=3400");
        assert!(!text.ends_with('\n'));
    }
}

use std::path::{Path, PathBuf};

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SynthError},
    geom::Region,
    render::{FitParams, SizeRatio},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// Inclusive range of generated field values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub canvas_size: CanvasSize,
    pub max_rotation_degrees: i32,
    pub font_size_step: u32,
    pub min_font_size: u32,
    pub size_ratio: SizeRatio,
    pub value_range: ValueRange,
    pub ink: [u8; 3],
    pub regions: Vec<Region>,
    pub font_dir: PathBuf,
    pub fallback_font: Option<PathBuf>,
    /// Forces every field onto this font file.
    pub font_file: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub seed: Option<u64>,
    /// Fail the sample instead of pasting text larger than its box.
    pub strict_fit: bool,
    pub write_manifest: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            canvas_size: CanvasSize {
                width: 1024,
                height: 1024,
            },
            max_rotation_degrees: 15,
            font_size_step: 2,
            min_font_size: 10,
            size_ratio: SizeRatio { min: 0.5, max: 0.9 },
            value_range: ValueRange { min: 1, max: 9999 },
            ink: [0, 0, 0],
            regions: vec![
                Region::new(0, "Qty", 0.23, 0.7, 0.35, 0.35),
                Region::new(1, "Price", 0.70, 0.7, 0.5, 0.35),
            ],
            font_dir: PathBuf::from("fonts"),
            fallback_font: Some(PathBuf::from("jah.ttf")),
            font_file: None,
            out_dir: PathBuf::from("dataset"),
            seed: None,
            strict_fit: false,
            write_manifest: false,
        }
    }
}

impl GeneratorConfig {
    /// Reads a JSON config; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SynthError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn fit_params(&self) -> FitParams {
        let [r, g, b] = self.ink;
        FitParams {
            min_font_size: self.min_font_size,
            font_size_step: self.font_size_step,
            size_ratio: self.size_ratio,
            ink: Rgba([r, g, b, 255]),
            strict: self.strict_fit,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(SynthError::Config(msg));

        if self.canvas_size.width == 0 || self.canvas_size.height == 0 {
            return bad(format!(
                "canvas_size must be non-zero, got {}x{}",
                self.canvas_size.width, self.canvas_size.height
            ));
        }
        if !(0..=180).contains(&self.max_rotation_degrees) {
            return bad(format!(
                "max_rotation_degrees must be within 0..=180, got {}",
                self.max_rotation_degrees
            ));
        }
        if self.min_font_size == 0 {
            return bad("min_font_size must be at least 1".into());
        }
        if self.font_size_step == 0 {
            return bad("font_size_step must be at least 1".into());
        }
        let SizeRatio { min, max } = self.size_ratio;
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return bad(format!("size_ratio must satisfy 0 < min <= max, got {min}..{max}"));
        }
        if self.value_range.min > self.value_range.max {
            return bad(format!(
                "value_range min {} exceeds max {}",
                self.value_range.min, self.value_range.max
            ));
        }
        if self.regions.is_empty() {
            return bad("at least one region is required".into());
        }
        self.regions.iter().try_for_each(Region::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = GeneratorConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.regions.len(), 2);
        assert_eq!(cfg.fit_params(), FitParams::default());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = GeneratorConfig::from_json(
            r#"{
                "canvas_size": { "width": 640, "height": 480 },
                "max_rotation_degrees": 5,
                "regions": [
                    {
                        "class_id": 3, "name": "Total",
                        "center_x": 0.5, "center_y": 0.5, "width": 0.2, "height": 0.1
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.canvas_size, CanvasSize { width: 640, height: 480 });
        assert_eq!(cfg.max_rotation_degrees, 5);
        assert_eq!(cfg.min_font_size, 10);
        assert_eq!(cfg.regions[0].name, "Total");
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_bad_ranges() {
        let mut cfg = GeneratorConfig::default();
        cfg.font_size_step = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = GeneratorConfig::default();
        cfg.size_ratio = SizeRatio { min: 0.9, max: 0.5 };
        assert!(cfg.validate().is_err());

        let mut cfg = GeneratorConfig::default();
        cfg.regions[1].width = 1.5;
        assert!(matches!(cfg.validate(), Err(SynthError::Config(_))));

        let mut cfg = GeneratorConfig::default();
        cfg.regions.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_json_shape_is_an_error() {
        assert!(matches!(
            GeneratorConfig::from_json(r#"{ "min_font_size": "big" }"#),
            Err(SynthError::Json(_))
        ));
    }
}

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use image::{DynamicImage, RgbaImage};

use crate::{
    error::{Result, SynthError},
    generator::Sample,
    record::{ManifestRecord, label_text},
};

pub const IMAGES_DIR: &str = "images";
pub const LABELS_DIR: &str = "labels";
pub const DEBUG_DIR: &str = "debug";
pub const MANIFEST_FILE: &str = "manifest.jsonl";

/// Writes samples under `out_dir` as `images/`, `debug/` and `labels/`,
/// with an optional JSONL manifest at the root.
pub struct DatasetWriter {
    out_dir: PathBuf,
    manifest: Option<BufWriter<File>>,
}

impl DatasetWriter {
    pub fn create(out_dir: &Path, with_manifest: bool) -> Result<Self> {
        for sub in [IMAGES_DIR, LABELS_DIR, DEBUG_DIR] {
            let dir = out_dir.join(sub);
            std::fs::create_dir_all(&dir).map_err(|e| SynthError::io(&dir, e))?;
        }
        let manifest = if with_manifest {
            let path = out_dir.join(MANIFEST_FILE);
            let file = File::create(&path).map_err(|e| SynthError::io(&path, e))?;
            Some(BufWriter::with_capacity(1 << 20, file))
        } else {
            None
        };

        Ok(Self {
            out_dir: out_dir.to_path_buf(),
            manifest,
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn write_sample(&mut self, index: u32, sample: &Sample) -> Result<()> {
        let image_rel = format!("{IMAGES_DIR}/sample_{index}.png");
        let debug_rel = format!("{DEBUG_DIR}/sample_{index}.png");
        let label_rel = format!("{LABELS_DIR}/sample_{index}.txt");

        save_rgb(&sample.clean, &self.out_dir.join(&image_rel))?;
        save_rgb(&sample.debug, &self.out_dir.join(&debug_rel))?;

        let label_path = self.out_dir.join(&label_rel);
        std::fs::write(&label_path, label_text(&sample.fields))
            .map_err(|e| SynthError::io(&label_path, e))?;

        if let Some(ref mut writer) = self.manifest {
            let rec = ManifestRecord {
                schema: "v1",
                image: image_rel,
                debug_image: debug_rel,
                label: label_rel,
                seed: sample.seed,
                offset: sample.offset,
                fields: &sample.fields,
            };
            let json = serde_json::to_string(&rec)?;
            writeln!(writer, "{json}")
                .map_err(|e| SynthError::io(self.out_dir.join(MANIFEST_FILE), e))?;
        }
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.manifest.take() {
            let path = self.out_dir.join(MANIFEST_FILE);
            let file = writer
                .into_inner()
                .map_err(|e| SynthError::io(&path, e.into_error()))?;
            file.sync_all().map_err(|e| SynthError::io(&path, e))?;
        }
        Ok(())
    }
}

impl Drop for DatasetWriter {
    fn drop(&mut self) {
        let _ = self.finalize();
    }
}

/// Canvases are composed in RGBA; outputs are plain RGB.
fn save_rgb(img: &RgbaImage, path: &Path) -> Result<()> {
    DynamicImage::ImageRgba8(img.clone()).into_rgb8().save(path)?;
    Ok(())
}

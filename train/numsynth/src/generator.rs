use std::{path::Path, time::Instant};

use image::{
    DynamicImage, Rgba, RgbaImage,
    imageops::{self, FilterType},
};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::{SplitMix64, Xoshiro256PlusPlus};
use tracing::{debug, info, warn};

use crate::{
    config::GeneratorConfig,
    error::{Result, SynthError},
    fonts::{FontPool, FontSource, PoolFont, load_faces},
    geom::{PixelBox, PlacementOffset, map_region},
    io::DatasetWriter,
    record::{FieldRecord, LabelRecord},
    render::{FitParams, FittingRenderer},
};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OUTLINE: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// One composed sample: clean and annotated canvases plus the field records.
pub struct Sample {
    pub seed: u64,
    pub offset: PlacementOffset,
    pub clean: RgbaImage,
    pub debug: RgbaImage,
    pub fields: Vec<FieldRecord>,
}

/// Per-sample seeds derived from a run seed, in sample order.
pub fn sample_seeds(run_seed: u64) -> impl Iterator<Item = u64> {
    let mut sm = SplitMix64::seed_from_u64(run_seed);
    std::iter::repeat_with(move || sm.next_u64())
}

/// Decodes to opaque colour and shrinks uniformly if the template is larger
/// than the canvas on either axis.
pub fn prepare_template(template: &DynamicImage, canvas_w: u32, canvas_h: u32) -> RgbaImage {
    let rgb = DynamicImage::ImageRgb8(template.to_rgb8()).into_rgba8();
    let (w, h) = rgb.dimensions();
    if w <= canvas_w && h <= canvas_h {
        return rgb;
    }

    let scale = (canvas_w as f64 / w as f64).min(canvas_h as f64 / h as f64);
    let new_w = ((w as f64 * scale) as u32).max(1);
    let new_h = ((h as f64 * scale) as u32).max(1);
    debug!(from = ?(w, h), to = ?(new_w, new_h), "downscaling template");
    imageops::resize(&rgb, new_w, new_h, FilterType::CatmullRom)
}

pub struct SampleGenerator<'a> {
    config: &'a GeneratorConfig,
    fit: FitParams,
    pool: &'a FontPool,
    /// The configured font file, loaded once; replaces the pool when present.
    pinned: Option<FontPool>,
    template: RgbaImage,
}

impl<'a> SampleGenerator<'a> {
    pub fn new(
        config: &'a GeneratorConfig,
        pool: &'a FontPool,
        template: &DynamicImage,
    ) -> Result<Self> {
        config.validate()?;
        let canvas = config.canvas_size;
        Ok(Self {
            config,
            fit: config.fit_params(),
            pool,
            pinned: config.font_file.as_deref().and_then(pin_font_file),
            template: prepare_template(template, canvas.width, canvas.height),
        })
    }

    pub fn template_size(&self) -> (u32, u32) {
        self.template.dimensions()
    }

    pub fn generate(&self, seed: u64) -> Result<Sample> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let cfg = self.config;
        let renderer = FittingRenderer::new(self.active_pool(), self.fit);
        let (cw, ch) = (cfg.canvas_size.width, cfg.canvas_size.height);
        let (base_w, base_h) = self.template.dimensions();

        let offset = PlacementOffset {
            dx: random_offset(cw, base_w, &mut rng),
            dy: random_offset(ch, base_h, &mut rng),
        };

        let mut clean = RgbaImage::from_pixel(cw, ch, BACKGROUND);
        imageops::replace(&mut clean, &self.template, offset.dx as i64, offset.dy as i64);
        let mut debug = clean.clone();

        let sources = self.font_sources(&mut rng);
        let mut fields = Vec::with_capacity(cfg.regions.len());

        for (region, source) in cfg.regions.iter().zip(&sources) {
            let (class_id, pixel_box) = map_region(region, base_w, base_h, offset, cw, ch);
            let (box_w, box_h) = (pixel_box.width(), pixel_box.height());

            let value = rng
                .random_range(cfg.value_range.min..=cfg.value_range.max)
                .to_string();
            let max_rot = cfg.max_rotation_degrees;
            let angle = rng.random_range(-max_rot..=max_rot);

            let glyph = renderer.render(&value, box_w, box_h, source, angle as f32, &mut rng)?;

            let paste_x = pixel_box.xmin as i64 + centering(box_w, glyph.width());
            let paste_y = pixel_box.ymin as i64 + centering(box_h, glyph.height());
            imageops::overlay(&mut clean, &glyph.image, paste_x, paste_y);
            imageops::overlay(&mut debug, &glyph.image, paste_x, paste_y);
            draw_outline(&mut debug, &pixel_box);

            fields.push(FieldRecord {
                name: region.name.clone(),
                label: LabelRecord::from_pixel_box(class_id, &pixel_box, cw, ch, &value),
                pixel_box,
                angle,
                font_size: glyph.font_size,
                overflowed: glyph.overflowed,
            });
        }

        Ok(Sample {
            seed,
            offset,
            clean,
            debug,
            fields,
        })
    }

    fn active_pool(&self) -> &FontPool {
        self.pinned.as_ref().unwrap_or(self.pool)
    }

    /// A loaded font file wins; otherwise a coin decides whether all fields
    /// share one pool font or each draws its own.
    fn font_sources<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<FontSource> {
        let n = self.config.regions.len();
        if self.pinned.is_some() {
            return vec![FontSource::Pool(0); n];
        }
        let shared = rng.random_bool(0.5);
        match (shared, self.pool.choose(rng)) {
            (true, Some(index)) => vec![FontSource::Pool(index); n],
            _ => vec![FontSource::Random; n],
        }
    }
}

/// Loads the first face of `path` as a one-font pool. An unreadable file is
/// reported once and the regular pool is used instead.
fn pin_font_file(path: &Path) -> Option<FontPool> {
    match load_faces(path) {
        Ok(faces) => faces.into_iter().next().map(|font| {
            FontPool::from_fonts(vec![PoolFont {
                name: path.display().to_string(),
                font,
            }])
        }),
        Err(e) => {
            warn!("{e}, using font pool");
            None
        }
    }
}

/// Offset that centers `inner` in `outer`, flooring like integer division.
fn centering(outer: u32, inner: u32) -> i64 {
    (outer as i64 - inner as i64).div_euclid(2)
}

fn random_offset<R: Rng + ?Sized>(canvas: u32, base: u32, rng: &mut R) -> u32 {
    let max = canvas.saturating_sub(base);
    if max > 0 { rng.random_range(0..=max) } else { 0 }
}

/// Two-pixel red outline with inclusive corners, drawn inwards.
fn draw_outline(img: &mut RgbaImage, b: &PixelBox) {
    let (w, h) = (b.width(), b.height());
    draw_hollow_rect_mut(
        img,
        Rect::at(b.xmin as i32, b.ymin as i32).of_size(w + 1, h + 1),
        OUTLINE,
    );
    if w >= 2 && h >= 2 {
        draw_hollow_rect_mut(
            img,
            Rect::at(b.xmin as i32 + 1, b.ymin as i32 + 1).of_size(w - 1, h - 1),
            OUTLINE,
        );
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub seed: u64,
    pub samples: u32,
    pub overflowed_fields: usize,
}

/// Generates `count` samples and writes each before starting the next.
/// The first failing sample stops the run.
pub fn generate_dataset(
    config: &GeneratorConfig,
    pool: &FontPool,
    template: &DynamicImage,
    count: u32,
    writer: &mut DatasetWriter,
) -> Result<RunSummary> {
    let generator = SampleGenerator::new(config, pool, template)?;
    let run_seed = config.seed.unwrap_or_else(|| rand::rng().random());
    info!(
        seed = run_seed,
        samples = count,
        fonts = pool.len(),
        template = ?generator.template_size(),
        out = %writer.out_dir().display(),
        "generating dataset"
    );

    let mut overflowed_fields = 0;
    for (i, seed) in (0..count).zip(sample_seeds(run_seed)) {
        let started = Instant::now();
        let sample = generator.generate(seed).map_err(|e| sample_error(i, e))?;
        writer.write_sample(i, &sample).map_err(|e| sample_error(i, e))?;
        overflowed_fields += sample.fields.iter().filter(|f| f.overflowed).count();
        debug!(
            sample = i + 1,
            total = count,
            elapsed = ?started.elapsed(),
            "sample written"
        );
    }
    writer.finalize()?;

    info!(samples = count, overflowed_fields, "dataset complete");
    Ok(RunSummary {
        seed: run_seed,
        samples: count,
        overflowed_fields,
    })
}

fn sample_error(index: u32, e: SynthError) -> SynthError {
    SynthError::Sample {
        index,
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;
    use crate::geom::Region;

    fn template(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, image::Rgb([200, 210, 220])))
    }

    fn small_config() -> GeneratorConfig {
        GeneratorConfig {
            canvas_size: crate::config::CanvasSize {
                width: 256,
                height: 256,
            },
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn seeds_are_stable() {
        let a: Vec<u64> = sample_seeds(42).take(4).collect();
        let b: Vec<u64> = sample_seeds(42).take(4).collect();
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn large_template_is_downscaled_uniformly() {
        let t = prepare_template(&template(2048, 1024), 1024, 1024);
        assert_eq!(t.dimensions(), (1024, 512));

        let t = prepare_template(&template(300, 200), 1024, 1024);
        assert_eq!(t.dimensions(), (300, 200));
    }

    #[test]
    fn template_filling_canvas_gets_zero_offset() {
        let cfg = small_config();
        let pool = FontPool::empty();
        let generator = SampleGenerator::new(&cfg, &pool, &template(256, 256)).unwrap();
        let sample = generator.generate(1).unwrap();
        assert_eq!(sample.offset, PlacementOffset { dx: 0, dy: 0 });
    }

    #[test]
    fn labels_come_from_pasted_boxes() {
        let cfg = small_config();
        let pool = FontPool::empty();
        let generator = SampleGenerator::new(&cfg, &pool, &template(160, 120)).unwrap();
        let sample = generator.generate(99).unwrap();

        assert_eq!(sample.fields.len(), cfg.regions.len());
        for (field, region) in sample.fields.iter().zip(&cfg.regions) {
            let (_, expected) = map_region(region, 160, 120, sample.offset, 256, 256);
            assert_eq!(field.pixel_box, expected);
            let (xc, yc, w, h) = expected.to_normalized(256, 256);
            let label = &field.label;
            assert_eq!((label.xc, label.yc, label.w, label.h), (xc, yc, w, h));
            let value: u32 = field.label.literal_value.parse().unwrap();
            assert!((1..=9999).contains(&value));
            assert!(field.angle.abs() <= 15);
        }
    }

    #[test]
    fn debug_canvas_has_outline_and_clean_does_not() {
        let cfg = small_config();
        let pool = FontPool::empty();
        let generator = SampleGenerator::new(&cfg, &pool, &template(160, 120)).unwrap();
        let sample = generator.generate(5).unwrap();
        let b = sample.fields[0].pixel_box;

        assert_eq!(*sample.debug.get_pixel(b.xmin, b.ymin), OUTLINE);
        assert_eq!(*sample.debug.get_pixel(b.xmax, b.ymax), OUTLINE);
        assert_ne!(*sample.clean.get_pixel(b.xmin, b.ymin), OUTLINE);
    }

    #[test]
    fn degenerate_region_is_tolerated() {
        let mut cfg = small_config();
        cfg.regions = vec![
            Region::new(0, "Edge", 1.0, 1.0, 0.0, 0.0),
            Region::new(1, "Tiny", 0.5, 0.5, 0.01, 0.01),
        ];
        let pool = FontPool::empty();
        let generator = SampleGenerator::new(&cfg, &pool, &template(256, 256)).unwrap();
        let sample = generator.generate(3).unwrap();

        assert!(sample.fields[0].pixel_box.is_degenerate());
        assert!(sample.fields.iter().all(|f| f.overflowed));
    }

    #[test]
    fn strict_fit_fails_the_sample() {
        let mut cfg = small_config();
        cfg.strict_fit = true;
        cfg.regions = vec![Region::new(0, "Tiny", 0.5, 0.5, 0.01, 0.01)];
        let pool = FontPool::empty();
        let generator = SampleGenerator::new(&cfg, &pool, &template(256, 256)).unwrap();
        assert!(matches!(generator.generate(3), Err(SynthError::Overflow { .. })));
    }

    #[test]
    fn inverted_value_range_is_a_config_error() {
        let mut cfg = small_config();
        cfg.value_range.min = 10;
        cfg.value_range.max = 1;
        let pool = FontPool::empty();
        let result = SampleGenerator::new(&cfg, &pool, &template(64, 64));
        assert!(matches!(result, Err(SynthError::Config(_))));

        let mut cfg = small_config();
        cfg.max_rotation_degrees = -5;
        let result = SampleGenerator::new(&cfg, &pool, &template(64, 64));
        assert!(matches!(result, Err(SynthError::Config(_))));
    }

    #[test]
    fn unreadable_font_file_falls_back_to_pool() {
        let mut cfg = small_config();
        cfg.font_file = Some("no/such/font.ttf".into());
        let pool = FontPool::empty();
        let generator = SampleGenerator::new(&cfg, &pool, &template(160, 120)).unwrap();
        assert!(generator.pinned.is_none());
        let sample = generator.generate(8).unwrap();
        assert_eq!(sample.fields.len(), 2);
    }
}

use std::{
    fs::read_dir,
    path::{Path, PathBuf},
};

use ab_glyph::{Font, FontArc, FontVec, GlyphId, OutlinedGlyph, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};
use rand::Rng;
use tracing::{debug, warn};

use crate::{
    builtin::DotRun,
    error::{Result, SynthError},
};

pub const DIGITS: &str = "0123456789";
pub const FONT_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

const CHECK_SIZE: u32 = 40;

/// A validated outline face and the file it came from.
#[derive(Clone)]
pub struct PoolFont {
    pub name: String,
    pub font: FontArc,
}

/// Read-only set of fonts that renders choose from.
#[derive(Clone, Default)]
pub struct FontPool {
    fonts: Vec<PoolFont>,
}

impl FontPool {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_fonts(fonts: Vec<PoolFont>) -> Self {
        Self { fonts }
    }

    /// Loads every usable face under `dir`. Falls back to `fallback` when the
    /// directory yields nothing; an empty pool means the built-in face.
    pub fn load(dir: &Path, fallback: Option<&Path>) -> Self {
        let mut fonts = Vec::new();
        for path in font_files(dir) {
            match load_faces(&path) {
                Ok(faces) => {
                    let total = faces.len();
                    for (index, font) in faces.into_iter().enumerate() {
                        if !is_usable(&font) {
                            warn!(
                                path = %path.display(),
                                index,
                                "font cannot draw digits, skipping"
                            );
                            continue;
                        }
                        fonts.push(PoolFont {
                            name: face_name(&path, index, total),
                            font,
                        });
                    }
                }
                Err(e) => warn!("{e}, skipping"),
            }
        }

        if fonts.is_empty() {
            if let Some(path) = fallback.filter(|p| p.exists()) {
                match load_faces(path) {
                    Ok(faces) => {
                        if let Some(font) = faces.into_iter().next() {
                            fonts.push(PoolFont {
                                name: face_name(path, 0, 1),
                                font,
                            });
                        }
                    }
                    Err(e) => warn!("fallback {e}"),
                }
            }
        }

        if fonts.is_empty() {
            warn!(dir = %dir.display(), "no usable fonts found, using built-in face");
        } else {
            debug!(count = fonts.len(), "font pool loaded");
        }
        Self { fonts }
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PoolFont> {
        self.fonts.get(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fonts.iter().map(|f| f.name.as_str())
    }

    /// Uniformly random member index, `None` for an empty pool.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        if self.fonts.is_empty() {
            None
        } else {
            Some(rng.random_range(0..self.fonts.len()))
        }
    }

    pub fn random_face<R: Rng + ?Sized>(&self, rng: &mut R) -> Face {
        match self.choose(rng) {
            Some(i) => Face::Outline(self.fonts[i].font.clone()),
            None => Face::Builtin,
        }
    }
}

/// Font files directly under `dir`, sorted by path so pool order is stable.
/// A missing directory yields no files.
pub fn font_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = read_dir(dir)
        .ok()
        .into_iter()
        .flat_map(|rd| rd.filter_map(|e| e.ok()))
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| {
                    FONT_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
        })
        .collect();
    files.sort();
    files
}

/// Parses all faces in a font file; collections yield one entry per face.
pub fn load_faces(path: &Path) -> Result<Vec<FontArc>> {
    let bytes = std::fs::read(path).map_err(|e| SynthError::io(path, e))?;
    let count = ttf_parser::fonts_in_collection(&bytes).unwrap_or(1).max(1);

    (0..count)
        .map(|index| {
            FontVec::try_from_vec_and_index(bytes.clone(), index)
                .map(FontArc::new)
                .map_err(|e| SynthError::Font {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// A face is usable when every digit has a glyph and the digit string has ink.
pub fn is_usable(font: &FontArc) -> bool {
    DIGITS.chars().all(|ch| font.glyph_id(ch).0 != 0)
        && Face::Outline(font.clone()).measure(DIGITS, CHECK_SIZE).is_some()
}

fn face_name(path: &Path, index: usize, total: usize) -> String {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if total > 1 { format!("{file}#{index}") } else { file }
}

/// How a render picks its face.
#[derive(Clone, Debug, PartialEq)]
pub enum FontSource {
    /// A specific file. Unreadable files fall back to a random pool member.
    File(PathBuf),
    /// A specific pool member.
    Pool(usize),
    /// Any pool member, drawn at resolve time.
    Random,
    Builtin,
}

impl FontSource {
    /// Resolves to a concrete face. Never fails: every miss degrades to the
    /// pool and then to the built-in face.
    pub fn resolve<R: Rng + ?Sized>(&self, pool: &FontPool, rng: &mut R) -> Face {
        match self {
            FontSource::File(path) => match load_faces(path) {
                Ok(faces) if !faces.is_empty() => Face::Outline(faces[0].clone()),
                Ok(_) => pool.random_face(rng),
                Err(e) => {
                    warn!("{e}, using pool font");
                    pool.random_face(rng)
                }
            },
            FontSource::Pool(index) => match pool.get(*index) {
                Some(f) => Face::Outline(f.font.clone()),
                None => pool.random_face(rng),
            },
            FontSource::Random => pool.random_face(rng),
            FontSource::Builtin => Face::Builtin,
        }
    }
}

/// A concrete face a string can be measured and drawn with.
#[derive(Clone)]
pub enum Face {
    Outline(FontArc),
    Builtin,
}

impl Face {
    /// Tight ink box of `text` at `size` px per em, `None` when it has no ink.
    pub fn measure(&self, text: &str, size: u32) -> Option<(u32, u32)> {
        match self {
            Face::Outline(font) => {
                GlyphRun::layout(font, text, size).map(|run| (run.width, run.height))
            }
            Face::Builtin => DotRun::layout(text, size).map(|run| run.dimensions()),
        }
    }

    /// Draws `text` onto a transparent bitmap exactly the size of its ink box.
    pub fn rasterize(&self, text: &str, size: u32, ink: Rgba<u8>) -> Option<RgbaImage> {
        match self {
            Face::Outline(font) => GlyphRun::layout(font, text, size).map(|run| run.draw(ink)),
            Face::Builtin => DotRun::layout(text, size).map(|run| run.draw(ink)),
        }
    }
}

/// Scale that makes `size` the em height in pixels.
fn em_scale(font: &FontArc, size: u32) -> PxScale {
    let units_per_em = font.units_per_em().unwrap_or(1000.0);
    PxScale::from(size as f32 * font.height_unscaled() / units_per_em)
}

struct GlyphRun {
    outlines: Vec<OutlinedGlyph>,
    min_x: i32,
    min_y: i32,
    width: u32,
    height: u32,
}

impl GlyphRun {
    fn layout(font: &FontArc, text: &str, size: u32) -> Option<Self> {
        let scaled = font.as_scaled(em_scale(font, size));
        let mut caret = 0.0f32;
        let mut prev: Option<GlyphId> = None;
        let mut outlines = Vec::new();

        for ch in text.chars() {
            let mut glyph = scaled.scaled_glyph(ch);
            if let Some(p) = prev {
                caret += scaled.kern(p, glyph.id);
            }
            glyph.position = point(caret, scaled.ascent());
            caret += scaled.h_advance(glyph.id);
            prev = Some(glyph.id);
            if let Some(outlined) = font.outline_glyph(glyph) {
                outlines.push(outlined);
            }
        }

        let mut bounds: Option<(f32, f32, f32, f32)> = None;
        for o in &outlines {
            let b = o.px_bounds();
            bounds = Some(match bounds {
                None => (b.min.x, b.min.y, b.max.x, b.max.y),
                Some((x0, y0, x1, y1)) => (
                    x0.min(b.min.x),
                    y0.min(b.min.y),
                    x1.max(b.max.x),
                    y1.max(b.max.y),
                ),
            });
        }
        let (x0, y0, x1, y1) = bounds?;
        let min_x = x0.floor() as i32;
        let min_y = y0.floor() as i32;
        let width = (x1.ceil() as i32 - min_x).max(0) as u32;
        let height = (y1.ceil() as i32 - min_y).max(0) as u32;
        if width == 0 || height == 0 {
            return None;
        }

        Some(Self {
            outlines,
            min_x,
            min_y,
            width,
            height,
        })
    }

    fn draw(&self, ink: Rgba<u8>) -> RgbaImage {
        let [r, g, b, a] = ink.0;
        let mut img = RgbaImage::from_pixel(self.width, self.height, Rgba([r, g, b, 0]));
        for o in &self.outlines {
            let bounds = o.px_bounds();
            let ox = bounds.min.x.floor() as i32 - self.min_x;
            let oy = bounds.min.y.floor() as i32 - self.min_y;
            o.draw(|x, y, coverage| {
                let px = ox + x as i32;
                let py = oy + y as i32;
                if px < 0 || py < 0 || px as u32 >= self.width || py as u32 >= self.height {
                    return;
                }
                let alpha = (coverage.clamp(0.0, 1.0) * a as f32).round() as u8;
                let pixel = img.get_pixel_mut(px as u32, py as u32);
                pixel.0[3] = pixel.0[3].max(alpha);
            });
        }
        img
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;

    #[test]
    fn missing_directory_gives_empty_pool() {
        let pool = FontPool::load(Path::new("definitely/not/here"), None);
        assert!(pool.is_empty());
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        assert_eq!(pool.choose(&mut rng), None);
        assert!(matches!(pool.random_face(&mut rng), Face::Builtin));
    }

    #[test]
    fn skips_unreadable_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.ttf"), b"not a font").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let files = font_files(dir.path());
        assert_eq!(files, vec![dir.path().join("broken.ttf")]);

        let pool = FontPool::load(dir.path(), Some(&dir.path().join("missing.ttf")));
        assert!(pool.is_empty());
    }

    #[test]
    fn extension_match_ignores_case_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.OTF", "a.ttf", "c.TTC", "d.woff"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let names: Vec<String> = font_files(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.ttf", "b.OTF", "c.TTC"]);
    }

    #[test]
    fn unreadable_file_source_degrades_to_builtin_on_empty_pool() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let pool = FontPool::empty();
        let face = FontSource::File(PathBuf::from("nope.ttf")).resolve(&pool, &mut rng);
        assert!(matches!(face, Face::Builtin));
        let face = FontSource::Pool(3).resolve(&pool, &mut rng);
        assert!(matches!(face, Face::Builtin));
    }

    #[test]
    fn builtin_face_measures_and_draws_same_box() {
        let face = Face::Builtin;
        let dims = face.measure("1234", 24).unwrap();
        let img = face.rasterize("1234", 24, Rgba([0, 0, 0, 255])).unwrap();
        assert_eq!(img.dimensions(), dims);
        assert!(face.measure(" ", 24).is_none());
    }
}

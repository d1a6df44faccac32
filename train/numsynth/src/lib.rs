//! Synthetic detector-training data: random numbers rendered into fixed
//! regions of a template image, with normalized box labels.

pub mod builtin;
pub mod config;
pub mod error;
pub mod fonts;
pub mod generator;
pub mod geom;
pub mod io;
pub mod record;
pub mod render;

pub use config::GeneratorConfig;
pub use error::{Result, SynthError};
pub use fonts::{Face, FontPool, FontSource};
pub use generator::{RunSummary, Sample, SampleGenerator, generate_dataset};
pub use geom::{PixelBox, PlacementOffset, Region, map_region};
pub use io::DatasetWriter;
pub use record::LabelRecord;
pub use render::{FitParams, FittingRenderer, RenderedGlyph};

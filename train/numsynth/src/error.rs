use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("cannot load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("text {text:?} overflows {box_w}x{box_h} box even at {size}px")]
    Overflow {
        text: String,
        box_w: u32,
        box_h: u32,
        size: u32,
    },

    #[error("sample {index}: {source}")]
    Sample {
        index: u32,
        #[source]
        source: Box<SynthError>,
    },
}

impl SynthError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SynthError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SynthError>;

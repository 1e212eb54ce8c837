//! Error types for frame construction and encoding.
//!
//! Only fatal conditions surface here. Warnings (duplicate property sets,
//! unknown style properties, metadata mismatches) are logged through
//! `tracing` and execution continues.

/// Fatal errors raised by builders, converters and codecs.
#[derive(Debug, thiserror::Error)]
pub enum VizError {
    /// A fluent call arrived in a state that cannot accept it.
    #[error("builder state: {0}")]
    BuilderState(String),

    /// Frame finalized without the primary pose stream.
    #[error("missing primary pose stream `{0}`")]
    MissingPrimaryPose(&'static str),

    /// Flat array length does not divide into fixed-width tuples.
    #[error("flat array of length {len} does not divide into tuples of width {width}")]
    BadShape { len: usize, width: usize },

    /// Color channel list outside the RGB/RGBA shapes.
    #[error("color must have 3 or 4 channels, got {0}")]
    BadColor(usize),

    /// Payload kind the binary codec does not encode.
    #[error("unsupported payload: {0}")]
    Unsupported(&'static str),

    /// Writer used after `close()`.
    #[error("writer is closed")]
    WriterClosed,

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VizError>;

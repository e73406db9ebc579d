use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building datasets, running the network or training.
///
/// None of these are retried: a training run is a batch job and any failure
/// is surfaced to the caller, aborting the run.
#[derive(Debug, Error)]
pub enum Error {
    /// A listed image has no row in the label table.
    #[error("no label for '{id}' in {}", table.display())]
    NotFound { id: String, table: PathBuf },

    /// An image file could not be opened or decoded.
    #[error("failed to decode image '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Tensor shapes disagree (model output vs. targets, stacked samples, weights).
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("label table is invalid: {0}")]
    InvalidLabelTable(String),

    #[error("index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

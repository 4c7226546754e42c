//! Custom error types for deepstego.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for the deepstego library.
#[derive(Error, Debug)]
pub enum Error {
    /// Input bytes are not a readable image.
    #[error("failed to decode image: {source}")]
    Decode {
        #[source]
        source: image::ImageError,
    },

    /// Failed to encode an output image as PNG.
    #[error("failed to encode PNG: {source}")]
    Encode {
        #[source]
        source: image::ImageError,
    },

    /// Image dimensions are not supported.
    #[error("unsupported image dimensions {width}x{height}: {reason}")]
    UnsupportedDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// The ONNX runtime rejected or failed a call.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// A model returned something other than its declared output.
    #[error("model {model} returned malformed output: expected {expected}, got {actual}")]
    MalformedOutput {
        model: &'static str,
        expected: String,
        actual: String,
    },

    /// A model panicked while running.
    #[error("model {model} failed: {reason}")]
    InferenceFailed { model: &'static str, reason: String },

    /// Inference did not finish within the configured timeout.
    #[error("model {model} did not answer within {timeout:?}")]
    InferenceTimeout {
        model: &'static str,
        timeout: Duration,
    },

    /// The inference worker for a model is no longer running.
    #[error("inference worker for model {model} has shut down")]
    GatewayClosed { model: &'static str },

    /// Text payload does not fit into the fixed-size text vector.
    #[error("text is {length} characters long, capacity is {capacity}")]
    TextLength { length: usize, capacity: usize },

    /// A model produced a value that is not a Unicode scalar value.
    #[error("invalid code point {value} at position {position}")]
    InvalidCodePoint { position: usize, value: f32 },

    /// A model file is missing and no download location is configured.
    #[error("model file {path} not found (set a model URL to download it)")]
    ModelNotFound { path: PathBuf },

    /// Failed to download a model.
    #[error("failed to download model {name}: {source}")]
    ModelDownload {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// Failed to create cache directory.
    #[error("failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for deepstego operations.
pub type Result<T> = std::result::Result<T, Error>;

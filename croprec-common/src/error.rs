//! Common error types for croprec

use thiserror::Error;

/// Common result type for croprec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the trainer and the prediction service
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error (artifact files, dataset files)
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("TOML parse error")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classifier could not be fitted on the given samples
    #[error("Training error: {0}")]
    Training(String),

    /// Artifact was produced by an incompatible format version
    #[error("Incompatible model artifact: {0}")]
    IncompatibleArtifact(String),

    /// Artifact soil codes disagree with the encoder used for serving
    #[error("Encoding mismatch: {0}")]
    EncodingMismatch(String),
}

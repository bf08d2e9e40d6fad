use thiserror::Error;

/// Per-frame conversion errors. Both are transient: the caller skips the
/// frame and the next notification serves as the retry.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("no camera image available")]
    NoImageAvailable,

    #[error("conversion failed: {0}")]
    ConversionFailed(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, ConversionError>;

use thiserror::Error;

/// Camera subsystem errors.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("frame notification registration failed: {0}")]
    FrameEvents(String),

    #[error("frame release failed: {0}")]
    Release(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CameraError>;

use crate::camera::error::Result;
use crate::camera::types::CameraFrame;

/// Callback fired by a frame source whenever a new frame can be pulled.
pub type FrameCallback = Box<dyn Fn() + Send>;

/// Producer of CPU-accessible camera frames.
///
/// Implemented by the platform AR camera binding. Frames are pulled with
/// [`FrameSource::try_latest_frame`] after a "frame available" notification.
pub trait FrameSource: Send + Sync {
    /// Acquire the most recent frame, or `None` if no frame is ready.
    ///
    /// The returned frame must be released before the next one is requested.
    fn try_latest_frame(&self) -> Option<CameraFrame>;

    /// Register for frame-available notifications.
    ///
    /// The callback fires on the source's internal thread.
    fn watch_frames(&self, callback: FrameCallback) -> Result<()>;
}

/// Source used when no camera is available. Never yields a frame.
pub struct NullFrameSource;

impl FrameSource for NullFrameSource {
    fn try_latest_frame(&self) -> Option<CameraFrame> {
        None
    }

    fn watch_frames(&self, _callback: FrameCallback) -> Result<()> {
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::camera::error::{CameraError, Result};

/// Native pixel layout of a camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgba32,
    Bgra32,
    Argb32,
    Rgb24,
    Bgr24,
    Gray8,
    /// Packed 4:2:2, `[Y0, U, Y1, V]` per pixel pair.
    Yuy2,
    /// Y plane followed by an interleaved `[U, V]` plane at half resolution.
    Nv12,
    /// Same as NV12 with `[V, U]` chroma order (Android camera default).
    Nv21,
}

impl PixelFormat {
    /// Number of planes a frame of this format carries.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Nv12 | Self::Nv21 => 2,
            _ => 1,
        }
    }

    /// Minimum number of bytes in one row of the first plane.
    pub fn min_row_bytes(self, width: usize) -> usize {
        match self {
            Self::Rgba32 | Self::Bgra32 | Self::Argb32 => width * 4,
            Self::Rgb24 | Self::Bgr24 => width * 3,
            Self::Gray8 | Self::Nv12 | Self::Nv21 => width,
            Self::Yuy2 => width.div_ceil(2) * 4,
        }
    }

    /// Snake-case identifier, matching the serialised form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rgba32 => "rgba32",
            Self::Bgra32 => "bgra32",
            Self::Argb32 => "argb32",
            Self::Rgb24 => "rgb24",
            Self::Bgr24 => "bgr24",
            Self::Gray8 => "gray8",
            Self::Yuy2 => "yuy2",
            Self::Nv12 => "nv12",
            Self::Nv21 => "nv21",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One plane of image data with its row pitch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub data: Vec<u8>,
    /// Bytes between the start of consecutive rows. May exceed the
    /// visible row width when the producer pads rows.
    pub row_stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, row_stride: usize) -> Self {
        Self { data, row_stride }
    }
}

/// Hook that hands a frame's native resources back to its producer.
pub type ReleaseFn = Box<dyn FnOnce() -> std::result::Result<(), String> + Send>;

/// A single captured image from the camera, in its native format.
///
/// The producer's resources are released exactly once: either through
/// [`CameraFrame::release`] or, on any other exit path, when the frame is
/// dropped.
pub struct CameraFrame {
    width: u32,
    height: u32,
    format: PixelFormat,
    planes: Vec<Plane>,
    timestamp_us: u64,
    release: Option<ReleaseFn>,
}

impl CameraFrame {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        planes: Vec<Plane>,
        timestamp_us: u64,
    ) -> Self {
        Self {
            width,
            height,
            format,
            planes,
            timestamp_us,
            release: None,
        }
    }

    /// Attach the producer's release hook.
    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce() -> std::result::Result<(), String> + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Capture timestamp in microseconds.
    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    /// Release the native resources now and report the outcome.
    pub fn release(mut self) -> Result<()> {
        self.run_release()
    }

    fn run_release(&mut self) -> Result<()> {
        match self.release.take() {
            Some(release) => release().map_err(CameraError::Release),
            None => Ok(()),
        }
    }
}

impl Drop for CameraFrame {
    fn drop(&mut self) {
        if let Err(e) = self.run_release() {
            tracing::error!("{e}");
        }
    }
}

impl fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("planes", &self.planes.len())
            .field("timestamp_us", &self.timestamp_us)
            .field("released", &self.release.is_none())
            .finish()
    }
}

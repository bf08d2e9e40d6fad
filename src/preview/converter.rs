use tracing::{debug, error};

use crate::camera::source::FrameSource;
use crate::camera::types::CameraFrame;
use crate::device::types::Orientation;
use crate::preview::convert::{convert_to_rgba, TransformMode};
use crate::preview::error::{ConversionError, Result};
use crate::preview::texture::ConvertedTexture;

/// Turns camera frames into a single reusable RGBA8 texture.
///
/// The destination buffer is kept between frames and only recreated when
/// the frame size changes. Every frame passed in is released before the
/// call returns, whatever the outcome.
#[derive(Debug, Default)]
pub struct FrameConverter {
    texture: Option<ConvertedTexture>,
    allocations: u64,
    releases: u64,
}

impl FrameConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert `frame` for display in `orientation`.
    pub fn convert(&mut self, frame: CameraFrame, orientation: Orientation) -> Result<&ConvertedTexture> {
        let outcome = self.convert_frame(&frame, orientation);
        if let Err(e) = frame.release() {
            error!("failed to release camera frame: {e}");
        }
        outcome?;
        self.texture
            .as_ref()
            .ok_or_else(|| ConversionError::ConversionFailed("no destination texture".into()))
    }

    /// Pull the latest frame from `source` and convert it.
    pub fn convert_latest(
        &mut self,
        source: &dyn FrameSource,
        orientation: Orientation,
    ) -> Result<&ConvertedTexture> {
        let frame = source
            .try_latest_frame()
            .ok_or(ConversionError::NoImageAvailable)?;
        self.convert(frame, orientation)
    }

    fn convert_frame(&mut self, frame: &CameraFrame, orientation: Orientation) -> Result<()> {
        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            return Err(ConversionError::ConversionFailed(format!(
                "frame has no pixels ({width}x{height})"
            )));
        }

        let reuse = self
            .texture
            .as_ref()
            .is_some_and(|t| t.width == width && t.height == height);
        if !reuse {
            if self.texture.take().is_some() {
                self.releases += 1;
            }
            debug!("allocating {width}x{height} RGBA texture");
            self.texture = Some(ConvertedTexture::new(width, height));
            self.allocations += 1;
        }

        let transform = TransformMode::for_orientation(orientation);
        match self.texture.as_mut() {
            Some(texture) => {
                convert_to_rgba(frame, transform, &mut texture.data)?;
                texture.timestamp_us = frame.timestamp_us();
                Ok(())
            }
            None => Err(ConversionError::ConversionFailed("no destination texture".into())),
        }
    }

    /// The texture from the most recent conversion, if any.
    pub fn texture(&self) -> Option<&ConvertedTexture> {
        self.texture.as_ref()
    }

    /// Destination textures created so far.
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Destination textures discarded after a size change.
    pub fn releases(&self) -> u64 {
        self.releases
    }
}

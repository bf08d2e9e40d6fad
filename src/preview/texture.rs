use serde::Serialize;

use crate::device::types::{Orientation, Resolution};

/// RGBA8 pixels ready for upload, tightly packed, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedTexture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Capture timestamp of the frame last converted into this texture.
    pub timestamp_us: u64,
}

impl ConvertedTexture {
    /// Zero-filled texture of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
            timestamp_us: 0,
        }
    }

    pub fn aspect(&self) -> f32 {
        Resolution::new(self.width, self.height).aspect()
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// Horizontal UV scale applied by the preview shader so the camera image
/// fills the screen without stretching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UvMultipliers {
    pub landscape: f32,
    pub portrait: f32,
}

impl UvMultipliers {
    /// Screen aspect over texture aspect, for both screen orientations.
    ///
    /// Degenerate sizes yield `0.0` instead of dividing by zero.
    pub fn for_texture(screen: Resolution, texture_width: u32, texture_height: u32) -> Self {
        let texture_aspect = Resolution::new(texture_width, texture_height).aspect();
        let landscape = ratio(screen.aspect(), texture_aspect);
        let portrait = ratio(Resolution::new(screen.height, screen.width).aspect(), texture_aspect);
        Self {
            landscape,
            portrait,
        }
    }
}

fn ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// How the renderer lays the preview plane out for the current orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLayout {
    /// Vertical scale of the preview plane relative to its width.
    pub plane_scale_y: f32,
    /// The camera image must be transposed before display.
    pub needs_rotate: bool,
}

impl PreviewLayout {
    pub fn for_orientation(orientation: Orientation, texture_width: u32, texture_height: u32) -> Self {
        let portrait = orientation == Orientation::Portrait;
        let (w, h) = (texture_width as f32, texture_height as f32);
        let plane_scale_y = if portrait { ratio(w, h) } else { ratio(h, w) };
        Self {
            plane_scale_y,
            needs_rotate: portrait,
        }
    }
}

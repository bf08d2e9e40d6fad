use serde::{Deserialize, Serialize};

use crate::camera::types::PixelFormat;
use crate::device::types::{Orientation, Resolution};

/// Synthetic camera parameters for desktop runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DummyFrameSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    pub format: PixelFormat,
}

impl Default for DummyFrameSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30.0,
            format: PixelFormat::Nv21,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewConfig {
    /// Seconds between display polls.
    pub check_delay: f64,
    pub dummy_camera: bool,
    pub dummy_frame: DummyFrameSettings,
    pub log_level: String,
    /// Initial state of the simulated display.
    pub screen: Resolution,
    pub orientation: Orientation,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            check_delay: 0.5,
            dummy_camera: false,
            dummy_frame: DummyFrameSettings::default(),
            log_level: "info".to_string(),
            screen: Resolution::new(1080, 1920),
            orientation: Orientation::Portrait,
        }
    }
}

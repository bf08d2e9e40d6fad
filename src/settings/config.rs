use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::device::watcher::DEFAULT_CHECK_DELAY;
use crate::settings::types::PreviewConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "AR_PREVIEW_CONFIG";

/// Configuration file used when the environment variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "ar-preview.json";

/// Resolve the configuration file path.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load configuration from a JSON file, returning defaults on a missing file.
pub fn load(path: &Path) -> Result<PreviewConfig, String> {
    if !path.exists() {
        return Ok(PreviewConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&contents).map_err(|e| format!("{}: {e}", path.display()))
}

impl PreviewConfig {
    /// Display polling interval. Non-positive or non-finite values fall back
    /// to the default.
    pub fn check_delay(&self) -> Duration {
        if self.check_delay.is_finite() && self.check_delay > 0.0 {
            Duration::from_secs_f64(self.check_delay)
        } else {
            tracing::warn!(
                "invalid checkDelay {}, using {}s",
                self.check_delay,
                DEFAULT_CHECK_DELAY.as_secs_f64()
            );
            DEFAULT_CHECK_DELAY
        }
    }

    /// Whether the synthetic camera should be used, from config or the
    /// `DUMMY_CAMERA` environment variable.
    pub fn use_dummy_camera(&self) -> bool {
        self.dummy_camera || crate::camera::dummy::DummyFrameSource::is_enabled()
    }
}

// SPDX-License-Identifier: GPL-3.0-only

use crate::capture::SyntheticSettings;
use crate::constants::{
    APP_DIR_NAME, CAPTURE_POOL_SIZE, CONFIG_FILE_NAME, DEFAULT_PREVIEW_HEIGHT,
    DEFAULT_PREVIEW_WIDTH, FPS_REPORT_INTERVAL, FPS_WINDOW, RENDER_SETUP_TIMEOUT,
};
use crate::errors::ConfigError;
use crate::filter::{CannyParams, EdgeVariant};
use crate::pipeline::{PipelineMode, RawPath};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mode the pipeline starts in
    pub mode: PipelineMode,
    /// Edge algorithm for continuous frames
    pub live_variant: EdgeVariant,
    /// Edge algorithm for the single-shot viewer
    pub still_variant: EdgeVariant,
    /// Canny thresholds and pre-blur
    pub canny: CannyParams,
    /// How RAW frames reach the display
    pub raw_path: RawPath,
    /// Requested capture output size
    pub preview_width: u32,
    pub preview_height: u32,
    /// Frame arrival timestamps kept for FPS smoothing
    pub fps_window: usize,
    pub fps_report_interval_ms: u64,
    /// How long to wait for the render thread during setup
    pub render_setup_timeout_ms: u64,
    /// Capture buffers in flight
    pub capture_pool_size: usize,
    /// Software camera used by `openedge live`
    pub synthetic: SyntheticSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Raw,
            live_variant: EdgeVariant::Sobel,
            still_variant: EdgeVariant::Canny,
            canny: CannyParams::default(),
            raw_path: RawPath::ZeroCopy,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            preview_height: DEFAULT_PREVIEW_HEIGHT,
            fps_window: FPS_WINDOW,
            fps_report_interval_ms: FPS_REPORT_INTERVAL.as_millis() as u64,
            render_setup_timeout_ms: RENDER_SETUP_TIMEOUT.as_millis() as u64,
            capture_pool_size: CAPTURE_POOL_SIZE,
            synthetic: SyntheticSettings::default(),
        }
    }
}

impl Config {
    /// Default config file location, `None` when the platform has no config dir
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self, ConfigError> {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write to the default location, creating the directory if needed
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::path()
            .ok_or_else(|| ConfigError::Invalid("no config directory on this platform".into()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.canny
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.fps_window < 2 {
            return Err(ConfigError::Invalid(format!(
                "fps window {} needs at least two samples",
                self.fps_window
            )));
        }
        if self.capture_pool_size == 0 {
            return Err(ConfigError::Invalid("capture pool needs at least one buffer".into()));
        }
        if self.preview_width == 0 || self.preview_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "preview size {}x{} is empty",
                self.preview_width, self.preview_height
            )));
        }
        if !self.synthetic.format.is_yuv420() {
            return Err(ConfigError::Invalid(format!(
                "synthetic camera format {} is not 4:2:0",
                self.synthetic.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameFormat;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.live_variant, EdgeVariant::Sobel);
        assert_eq!(config.still_variant, EdgeVariant::Canny);
        assert_eq!(config.mode, PipelineMode::Raw);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"mode":"edges","canny":{"high_threshold":120.0}}"#).unwrap();
        assert_eq!(config.mode, PipelineMode::Edges);
        assert_eq!(config.canny.high_threshold, 120.0);
        assert_eq!(config.canny.low_threshold, 50.0);
        assert_eq!(config.fps_window, FPS_WINDOW);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = Config::default();
        config.canny.low_threshold = 200.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.canny.blur_size = 4;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fps_window = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.capture_pool_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.synthetic.format = FrameFormat::Rgba;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("openedge-config-{}", std::process::id()));
        let path = dir.join("config.json");

        let mut config = Config::default();
        config.raw_path = RawPath::Cpu;
        config.synthetic.rotation = 90;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = std::env::temp_dir().join(format!("openedge-bad-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
        let _ = fs::remove_dir_all(&dir);
    }
}

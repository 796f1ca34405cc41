// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use openedge::Config;
use openedge::errors::ConfigError;
use openedge::filter::EdgeVariant;
use openedge::pipeline::{PipelineMode, PipelineSettings, RawPath};
use std::time::Duration;

#[test]
fn test_config_default() {
    // Test that default config can be created
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.mode, PipelineMode::Raw, "Preview should start in RAW");
    assert_eq!(config.raw_path, RawPath::ZeroCopy);
    assert_eq!(config.canny.low_threshold, 50.0);
    assert_eq!(config.canny.high_threshold, 150.0);
    assert_eq!(config.canny.blur_size, 5);
    assert!(config.validate().is_ok());
}

#[test]
fn test_variants_split_live_and_still() {
    // Live frames use the cheap filter, stills the full Canny
    let config = Config::default();
    assert_eq!(config.live_variant, EdgeVariant::Sobel);
    assert_eq!(config.still_variant, EdgeVariant::Canny);
}

#[test]
fn test_config_json_roundtrip() {
    let mut config = Config::default();
    config.mode = PipelineMode::Edges;
    config.live_variant = EdgeVariant::Canny;

    let json = config.to_json().unwrap();
    assert!(json.contains("\"edges\""));
    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_pipeline_settings_from_config() {
    let mut config = Config::default();
    config.mode = PipelineMode::Grayscale;
    config.fps_report_interval_ms = 250;
    config.render_setup_timeout_ms = 750;

    let settings = PipelineSettings::from_config(&config);
    assert_eq!(settings.initial_mode, PipelineMode::Grayscale);
    assert_eq!(settings.fps_report_interval, Duration::from_millis(250));
    assert_eq!(settings.setup_timeout, Duration::from_millis(750));
    assert_eq!(settings.fps_window, config.fps_window);
}

#[test]
fn test_inverted_thresholds_rejected() {
    let mut config = Config::default();
    config.canny.low_threshold = 150.0;
    config.canny.high_threshold = 50.0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

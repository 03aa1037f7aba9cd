// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use cardcam::CaptureConfig;
use cardcam::capture::CaptureMode;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = CaptureConfig::default();

    assert_eq!(config.start_timeout(CaptureMode::Desktop), Duration::from_secs(5));
    assert_eq!(config.start_timeout(CaptureMode::Mobile), Duration::from_secs(8));
    assert_eq!(config.ready_timeout(CaptureMode::Mobile), Duration::from_secs(10));
    assert_eq!(config.settle_delay(), Duration::from_millis(300));
    assert_eq!(config.poll_interval(), Duration::from_millis(50));
    assert!(config.max_output_dimension.is_none());
}

#[test]
fn test_config_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = CaptureConfig {
        desktop_quality: 0.88,
        max_output_dimension: Some(1600),
        ..CaptureConfig::default()
    };
    config.save_to(&path).unwrap();

    let loaded = CaptureConfig::load_from(&path).unwrap();
    assert_eq!(loaded.desktop_quality, 0.88);
    assert_eq!(loaded.max_output_dimension, Some(1600));
    assert_eq!(loaded.quality_bands, config.quality_bands);
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig::load_or_default(&dir.path().join("absent.json"));
    assert_eq!(config.desktop_quality, CaptureConfig::default().desktop_quality);
}

#[test]
fn test_malformed_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(CaptureConfig::load_from(&path).is_err());
    let config = CaptureConfig::load_or_default(&path);
    assert_eq!(config.quality_floor, 0.85);
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "quality_floor": 1.5 }"#).unwrap();

    assert!(CaptureConfig::load_from(&path).is_err());
    assert_eq!(CaptureConfig::load_or_default(&path).quality_floor, 0.85);
}

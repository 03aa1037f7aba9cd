// SPDX-License-Identifier: GPL-3.0-only

use crate::capture::CaptureMode;
use crate::constants::{device, encoding, processing, timing};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Directory name under the user's config dir
const CONFIG_DIR_NAME: &str = "cardcam";
const CONFIG_FILE_NAME: &str = "config.json";

/// One encode-quality band, selected by source pixel count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityBand {
    /// Smallest pixel count that falls in this band
    pub min_pixels: u64,
    /// JPEG quality in 0..=1
    pub quality: f32,
    /// Byte budget before a re-encode is attempted
    pub max_bytes: usize,
    pub label: String,
}

impl QualityBand {
    fn new(min_pixels: u64, quality: f32, max_mib: usize, label: &str) -> Self {
        Self {
            min_pixels,
            quality,
            max_bytes: max_mib * encoding::MIB,
            label: label.to_string(),
        }
    }
}

/// Default bands, most demanding first
pub fn default_quality_bands() -> Vec<QualityBand> {
    vec![
        QualityBand::new(encoding::PIXELS_4K, 0.98, 8, "minimal"),
        QualityBand::new(encoding::PIXELS_2K, 0.97, 6, "low"),
        QualityBand::new(encoding::PIXELS_1080P, 0.96, 4, "medium"),
        QualityBand::new(0, 0.95, 2, "standard"),
    ]
}

/// Tunables for detection, capture and post-processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Wait for the first decodable frame after acquisition (desktop)
    pub desktop_start_timeout_ms: u64,
    /// Wait for the first decodable frame after acquisition (mobile)
    pub mobile_start_timeout_ms: u64,
    /// Frame readiness wait inside take_photo (desktop)
    pub desktop_ready_timeout_ms: u64,
    /// Frame readiness wait inside take_photo (mobile)
    pub mobile_ready_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Delay before sampling a mobile frame
    pub mobile_settle_delay_ms: u64,

    pub quality_floor: f32,
    pub reencode_step: f32,
    pub desktop_quality: f32,
    /// Checked from the most demanding band down
    pub quality_bands: Vec<QualityBand>,

    pub contrast_factor: f32,
    pub sharpen_min_width: u32,
    pub sharpen_min_height: u32,

    pub small_screen_max_width: u32,
    pub tablet_min_width: u32,
    pub tablet_max_width: u32,
    /// Viewport reported for native processes
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Downscale captures whose longer edge exceeds this
    pub max_output_dimension: Option<u32>,
    /// Lanczos3 when downscaling, nearest-neighbour otherwise
    pub smooth_downscale: bool,

    pub event_channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            desktop_start_timeout_ms: timing::DESKTOP_START_TIMEOUT.as_millis() as u64,
            mobile_start_timeout_ms: timing::MOBILE_START_TIMEOUT.as_millis() as u64,
            desktop_ready_timeout_ms: timing::DESKTOP_READY_TIMEOUT.as_millis() as u64,
            mobile_ready_timeout_ms: timing::MOBILE_READY_TIMEOUT.as_millis() as u64,
            poll_interval_ms: timing::FRAME_POLL_INTERVAL.as_millis() as u64,
            mobile_settle_delay_ms: timing::MOBILE_SETTLE_DELAY.as_millis() as u64,
            quality_floor: encoding::QUALITY_FLOOR,
            reencode_step: encoding::REENCODE_STEP,
            desktop_quality: encoding::DESKTOP_QUALITY,
            quality_bands: default_quality_bands(),
            contrast_factor: processing::CONTRAST_FACTOR,
            sharpen_min_width: processing::SHARPEN_MIN_WIDTH,
            sharpen_min_height: processing::SHARPEN_MIN_HEIGHT,
            small_screen_max_width: device::SMALL_SCREEN_MAX_WIDTH,
            tablet_min_width: device::TABLET_MIN_WIDTH,
            tablet_max_width: device::TABLET_MAX_WIDTH,
            viewport_width: device::DEFAULT_VIEWPORT.0,
            viewport_height: device::DEFAULT_VIEWPORT.1,
            max_output_dimension: None,
            smooth_downscale: true,
            event_channel_capacity: crate::constants::EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl CaptureConfig {
    /// Bounded wait for the first frame in `start_camera`
    pub fn start_timeout(&self, mode: CaptureMode) -> Duration {
        match mode {
            CaptureMode::Mobile => Duration::from_millis(self.mobile_start_timeout_ms),
            _ => Duration::from_millis(self.desktop_start_timeout_ms),
        }
    }

    /// Bounded wait for a ready frame in `take_photo`
    pub fn ready_timeout(&self, mode: CaptureMode) -> Duration {
        match mode {
            CaptureMode::Mobile => Duration::from_millis(self.mobile_ready_timeout_ms),
            _ => Duration::from_millis(self.desktop_ready_timeout_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.mobile_settle_delay_ms)
    }

    /// `$XDG_CONFIG_HOME/cardcam/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing or malformed file yields defaults
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }

    /// Strict load, surfacing I/O and parse errors
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write to the default location
    pub fn save(&self) -> AppResult<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("no config directory available".into()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Reject values that would break the capture pipeline
    pub fn validate(&self) -> AppResult<()> {
        let in_unit = |q: f32| (0.0..=1.0).contains(&q);
        if !in_unit(self.quality_floor) || !in_unit(self.desktop_quality) {
            return Err(AppError::Config("quality values must be within 0..=1".into()));
        }
        if self.reencode_step <= 0.0 {
            return Err(AppError::Config("reencode_step must be positive".into()));
        }
        if let Some(band) = self.quality_bands.iter().find(|b| !in_unit(b.quality)) {
            return Err(AppError::Config(format!(
                "quality band '{}' has quality {} outside 0..=1",
                band.label, band.quality
            )));
        }
        if self.tablet_min_width > self.tablet_max_width {
            return Err(AppError::Config("tablet band is inverted".into()));
        }
        if self.event_channel_capacity == 0 {
            return Err(AppError::Config("event_channel_capacity must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = CaptureConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.quality_bands.len(), 4);
        assert_eq!(config.start_timeout(CaptureMode::Mobile), Duration::from_secs(8));
        assert_eq!(config.ready_timeout(CaptureMode::Desktop), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: CaptureConfig =
            serde_json::from_str(r#"{ "desktop_quality": 0.9, "max_output_dimension": 2048 }"#)
                .unwrap();
        assert_eq!(config.desktop_quality, 0.9);
        assert_eq!(config.max_output_dimension, Some(2048));
        assert_eq!(config.mobile_settle_delay_ms, 300);
    }
}

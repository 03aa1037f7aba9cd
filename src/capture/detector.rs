// SPDX-License-Identifier: GPL-3.0-only

//! Capability detection
//!
//! Classifies the host (desktop, phone or tablet) from its user agent, touch
//! support and viewport, then probes the media backend: enumerate cameras and,
//! if any exist, run a trial acquisition with a facing-mode constraint. Every
//! probe failure degrades to a report without a camera; nothing here returns
//! an error.

use crate::backends::camera::{FacingMode, MediaDevices, VideoConstraints};
use crate::config::CaptureConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Phone user-agent tokens (lowercase)
const PHONE_TOKENS: [&str; 8] = [
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

const IOS_TOKENS: [&str; 4] = ["ios", "iphone", "ipad", "ipod"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceClass {
    pub fn is_handheld(&self) -> bool {
        matches!(self, DeviceClass::Mobile | DeviceClass::Tablet)
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Desktop => write!(f, "desktop"),
            DeviceClass::Mobile => write!(f, "mobile"),
            DeviceClass::Tablet => write!(f, "tablet"),
        }
    }
}

/// Which capture strategy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    Desktop,
    Mobile,
    NoCamera,
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureMode::Desktop => write!(f, "desktop"),
            CaptureMode::Mobile => write!(f, "mobile"),
            CaptureMode::NoCamera => write!(f, "no-camera"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// What the detector knows about the host it runs on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEnvironment {
    pub user_agent: String,
    /// Logical pixels
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Zero when there is no touch input
    pub max_touch_points: u32,
    pub pixel_ratio: f64,
}

impl HostEnvironment {
    /// Describe the current native process
    pub fn from_host(config: &CaptureConfig) -> Self {
        Self {
            user_agent: format!(
                "cardcam/{} ({}; {})",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            max_touch_points: 0,
            pixel_ratio: 1.0,
        }
    }

    pub fn has_touch(&self) -> bool {
        self.max_touch_points > 0
    }

    pub fn orientation(&self) -> Orientation {
        if self.viewport_width > self.viewport_height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    fn ua(&self) -> String {
        self.user_agent.to_lowercase()
    }

    pub fn is_android(&self) -> bool {
        self.ua().contains("android")
    }

    pub fn is_ios(&self) -> bool {
        let ua = self.ua();
        IOS_TOKENS.iter().any(|t| ua.contains(t))
    }

    /// Phone token, or a touch screen no wider than the small-screen limit
    pub fn is_mobile(&self, config: &CaptureConfig) -> bool {
        let ua = self.ua();
        PHONE_TOKENS.iter().any(|t| ua.contains(t))
            || (self.has_touch() && self.viewport_width <= config.small_screen_max_width)
    }

    /// `ipad`, `tablet`, or `android` not followed by `mobile`
    pub fn has_tablet_token(&self) -> bool {
        let ua = self.ua();
        if ua.contains("ipad") || ua.contains("tablet") {
            return true;
        }
        ua.match_indices("android")
            .any(|(i, _)| !ua[i..].contains("mobile"))
    }

    /// Device class from user agent, touch support and viewport
    pub fn classify(&self, config: &CaptureConfig) -> DeviceClass {
        let in_tablet_band = (config.tablet_min_width..=config.tablet_max_width)
            .contains(&self.viewport_width);
        if self.has_tablet_token() && in_tablet_band {
            DeviceClass::Tablet
        } else if self.is_mobile(config) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

/// A camera as listed in the capability report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub id: String,
    pub label: String,
    pub facing_mode: Option<FacingMode>,
}

/// Result of capability detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilityReport {
    pub device_class: DeviceClass,
    pub has_camera: bool,
    /// The trial acquisition with a facing mode succeeded
    pub supports_facing_mode: bool,
    /// Some trial acquisition succeeded
    pub supports_constraints: bool,
    /// The backend answered enumeration at all
    pub has_user_media: bool,
    pub available_cameras: Vec<CameraInfo>,
}

impl DeviceCapabilityReport {
    pub fn no_camera(device_class: DeviceClass) -> Self {
        Self {
            device_class,
            has_camera: false,
            supports_facing_mode: false,
            supports_constraints: false,
            has_user_media: false,
            available_cameras: Vec::new(),
        }
    }

    /// `NoCamera` without hardware, `Mobile` for handhelds, else `Desktop`
    pub fn recommend_mode(&self) -> CaptureMode {
        if !self.has_camera {
            CaptureMode::NoCamera
        } else if self.device_class.is_handheld() {
            CaptureMode::Mobile
        } else {
            CaptureMode::Desktop
        }
    }

    /// Facing-mode requests work and there is a second camera to switch to
    pub fn can_switch_camera(&self) -> bool {
        self.supports_facing_mode && self.available_cameras.len() >= 2
    }
}

/// Host details kept alongside the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub device_class: DeviceClass,
    pub is_android: bool,
    pub is_ios: bool,
    pub orientation: Orientation,
    pub screen_width: u32,
    pub screen_height: u32,
    pub pixel_ratio: f64,
    pub user_agent: String,
}

impl EnvironmentInfo {
    pub fn new(host: &HostEnvironment, config: &CaptureConfig) -> Self {
        Self {
            device_class: host.classify(config),
            is_android: host.is_android(),
            is_ios: host.is_ios(),
            orientation: host.orientation(),
            screen_width: host.viewport_width,
            screen_height: host.viewport_height,
            pixel_ratio: host.pixel_ratio,
            user_agent: host.user_agent.clone(),
        }
    }
}

/// Probes a media backend for the capability report
pub struct CapabilityDetector {
    devices: Arc<dyn MediaDevices>,
    host: HostEnvironment,
    config: CaptureConfig,
}

impl CapabilityDetector {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        host: HostEnvironment,
        config: CaptureConfig,
    ) -> Self {
        Self {
            devices,
            host,
            config,
        }
    }

    pub fn environment(&self) -> EnvironmentInfo {
        EnvironmentInfo::new(&self.host, &self.config)
    }

    /// Run detection on a blocking task
    pub async fn detect(&self) -> DeviceCapabilityReport {
        let devices = self.devices.clone();
        let device_class = self.host.classify(&self.config);
        match tokio::task::spawn_blocking(move || probe(devices.as_ref(), device_class)).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Capability probe task failed");
                DeviceCapabilityReport::no_camera(device_class)
            }
        }
    }

    /// Run detection on the current thread
    pub fn detect_blocking(&self) -> DeviceCapabilityReport {
        probe(self.devices.as_ref(), self.host.classify(&self.config))
    }
}

/// Enumerate and trial-acquire; never fails
fn probe(devices: &dyn MediaDevices, device_class: DeviceClass) -> DeviceCapabilityReport {
    let mut report = DeviceCapabilityReport::no_camera(device_class);

    let listed = match devices.enumerate_devices() {
        Ok(listed) => listed,
        Err(e) => {
            warn!(error = %e, "Camera enumeration failed");
            return report;
        }
    };
    report.has_user_media = true;
    report.has_camera = !listed.is_empty();
    report.available_cameras = listed
        .into_iter()
        .enumerate()
        .map(|(i, d)| CameraInfo {
            label: if d.label.is_empty() {
                format!("Camera {}", i + 1)
            } else {
                d.label
            },
            id: d.device_id,
            facing_mode: d.facing_mode,
        })
        .collect();

    if report.has_camera {
        match devices.get_user_media(&VideoConstraints::facing(FacingMode::Environment)) {
            Ok(stream) => {
                stream.stop();
                report.supports_facing_mode = true;
                report.supports_constraints = true;
            }
            Err(e) => {
                debug!(error = %e, "Facing-mode trial failed, trying unconstrained");
                match devices.get_user_media(&VideoConstraints::unconstrained()) {
                    Ok(stream) => {
                        stream.stop();
                        report.supports_constraints = true;
                    }
                    Err(e) => warn!(error = %e, "Basic camera access unavailable"),
                }
            }
        }
    }

    info!(
        device_class = %report.device_class,
        cameras = report.available_cameras.len(),
        supports_facing_mode = report.supports_facing_mode,
        "Capability detection complete"
    );
    report
}

// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Video4Linux2 capture devices
    #[default]
    V4l2,
    /// Scripted in-process camera (tests, demos)
    Virtual,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Virtual => write!(f, "virtual"),
        }
    }
}

/// Which way a camera faces relative to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointing away from the user
    #[default]
    Environment,
    /// Front ("selfie") camera
    User,
}

impl FacingMode {
    /// The other camera
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::Environment => FacingMode::User,
            FacingMode::User => FacingMode::Environment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::Environment => "environment",
            FacingMode::User => "user",
        }
    }

    /// Guess a facing mode from a device name or location hint
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.to_lowercase();
        if hint.contains("front") || hint.contains("user") || hint.contains("selfie") {
            Some(FacingMode::User)
        } else if hint.contains("back") || hint.contains("rear") || hint.contains("environment")
        {
            Some(FacingMode::Environment)
        } else {
            None
        }
    }
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the business card being captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureTarget {
    Front,
    #[default]
    Back,
}

impl CaptureTarget {
    /// The `front` target uses the user-facing camera, `back` the rear one
    pub fn facing_mode(&self) -> FacingMode {
        match self {
            CaptureTarget::Front => FacingMode::User,
            CaptureTarget::Back => FacingMode::Environment,
        }
    }
}

impl std::fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureTarget::Front => write!(f, "front"),
            CaptureTarget::Back => write!(f, "back"),
        }
    }
}

impl std::str::FromStr for CaptureTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Ok(CaptureTarget::Front),
            "back" => Ok(CaptureTarget::Back),
            other => Err(format!("unknown capture target '{}'", other)),
        }
    }
}

/// An enumerated video input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    /// Human readable label (may be empty before permission is granted)
    pub label: String,
    pub group_id: Option<String>,
    /// Known mounting direction, if the platform reports one
    pub facing_mode: Option<FacingMode>,
}

/// An `{ ideal, min }` constraint on a single numeric setting
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstrainRange<T> {
    pub ideal: Option<T>,
    pub min: Option<T>,
}

impl<T: Copy> ConstrainRange<T> {
    pub const fn new(ideal: T, min: T) -> Self {
        Self {
            ideal: Some(ideal),
            min: Some(min),
        }
    }

    pub const fn ideal(ideal: T) -> Self {
        Self {
            ideal: Some(ideal),
            min: None,
        }
    }

    pub const fn any() -> Self {
        Self {
            ideal: None,
            min: None,
        }
    }

    pub fn is_any(&self) -> bool {
        self.ideal.is_none() && self.min.is_none()
    }
}

impl ConstrainRange<u32> {
    /// Whether an actual value satisfies the `min` bound
    pub fn accepts(&self, value: u32) -> bool {
        self.min.is_none_or(|min| value >= min)
    }
}

impl ConstrainRange<f64> {
    /// Whether an actual value satisfies the `min` bound
    pub fn accepts(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min)
    }
}

/// A video acquisition request
///
/// `facing_mode: None` means "any camera"; an all-`None` value is the
/// unconstrained request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub facing_mode: Option<FacingMode>,
    pub device_id: Option<String>,
    pub width: ConstrainRange<u32>,
    pub height: ConstrainRange<u32>,
    pub frame_rate: ConstrainRange<f64>,
    pub aspect_ratio: Option<f64>,
}

impl VideoConstraints {
    /// A request for any camera with no parameter constraints
    pub fn unconstrained() -> Self {
        Self::default()
    }

    /// The minimal request used to probe facing-mode support
    pub fn facing(mode: FacingMode) -> Self {
        Self {
            facing_mode: Some(mode),
            ..Self::default()
        }
    }
}

impl std::fmt::Display for VideoConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let facing = self.facing_mode.map(|m| m.as_str()).unwrap_or("any");
        match (self.width.ideal, self.height.ideal) {
            (Some(w), Some(h)) => write!(f, "{}x{} facing={}", w, h, facing)?,
            _ => write!(f, "any-size facing={}", facing)?,
        }
        if let Some(fps) = self.frame_rate.ideal {
            write!(f, " @{}fps", fps)?;
        }
        Ok(())
    }
}

/// Settings actually in effect on a live stream
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackSettings {
    pub device_id: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f64>,
    pub facing_mode: Option<FacingMode>,
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    /// The canonical format used by the frame buffer
    RGBA,
    /// BGRA - 32-bit with alpha (B G R A byte order)
    BGRA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    YUYV,
    /// UYVY - Packed 4:2:2 (U Y0 V Y1 interleaved)
    UYVY,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// Average bytes per pixel
    pub fn bytes_per_pixel(&self) -> f32 {
        match self {
            Self::RGBA | Self::BGRA => 4.0,
            Self::RGB24 => 3.0,
            Self::YUYV | Self::UYVY => 2.0,
            Self::Gray8 => 1.0,
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed RGBA frame
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }
}

/// Media readiness of a display surface, in increasing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveEnoughData,
}

/// Snapshot of a display surface's playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameState {
    pub width: u32,
    pub height: u32,
    pub ready_state: ReadyState,
    pub paused: bool,
    pub ended: bool,
}

impl FrameState {
    /// A frame can be sampled: decoded data, non-zero size, playing
    pub fn is_ready(&self) -> bool {
        self.ready_state >= ReadyState::HaveCurrentData
            && self.width > 0
            && self.height > 0
            && !self.paused
            && !self.ended
    }
}

/// Why a `get_user_media` request failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireErrorKind {
    /// The request cannot be satisfied; `constraint` names the culprit
    Overconstrained { constraint: Option<String> },
    /// Permission was denied
    NotAllowed,
    /// No matching device exists
    NotFound,
    /// The device exists but cannot be opened (busy, driver error)
    NotReadable,
    /// The request was aborted
    Aborted,
    Other,
}

impl AcquireErrorKind {
    /// An overconstrained failure caused by the facing-mode constraint
    pub fn is_facing_mode_rejection(&self) -> bool {
        matches!(
            self,
            AcquireErrorKind::Overconstrained { constraint: Some(c) } if c == "facingMode"
        )
    }

    /// Any overconstrained failure not caused by the facing mode
    pub fn is_resolution_rejection(&self) -> bool {
        matches!(self, AcquireErrorKind::Overconstrained { .. }) && !self.is_facing_mode_rejection()
    }

    pub fn name(&self) -> &'static str {
        match self {
            AcquireErrorKind::Overconstrained { .. } => "OverconstrainedError",
            AcquireErrorKind::NotAllowed => "NotAllowedError",
            AcquireErrorKind::NotFound => "NotFoundError",
            AcquireErrorKind::NotReadable => "NotReadableError",
            AcquireErrorKind::Aborted => "AbortError",
            AcquireErrorKind::Other => "UnknownError",
        }
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            AcquireErrorKind::NotAllowed => {
                "Camera permission was denied, allow camera access in your settings"
            }
            AcquireErrorKind::NotFound => "No usable camera device was found",
            AcquireErrorKind::NotReadable => "The camera is in use by another application",
            _ => "Unable to start the camera",
        }
    }
}

/// A failed acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireError {
    pub kind: AcquireErrorKind,
    pub message: String,
}

impl AcquireError {
    pub fn new(kind: AcquireErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Overconstrained failure naming the rejected constraint
    pub fn overconstrained(constraint: &str, message: impl Into<String>) -> Self {
        Self::new(
            AcquireErrorKind::Overconstrained {
                constraint: Some(constraint.to_string()),
            },
            message,
        )
    }
}

impl std::fmt::Display for AcquireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            AcquireErrorKind::Overconstrained {
                constraint: Some(c),
            } => write!(f, "{} [{}]: {}", self.kind.name(), c, self.message),
            kind => write!(f, "{}: {}", kind.name(), self.message),
        }
    }
}

impl std::error::Error for AcquireError {}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_state_readiness() {
        let mut state = FrameState {
            width: 1280,
            height: 720,
            ready_state: ReadyState::HaveEnoughData,
            paused: false,
            ended: false,
        };
        assert!(state.is_ready());

        state.paused = true;
        assert!(!state.is_ready());

        state.paused = false;
        state.ready_state = ReadyState::HaveMetadata;
        assert!(!state.is_ready());

        state.ready_state = ReadyState::HaveCurrentData;
        state.width = 0;
        assert!(!state.is_ready());
    }

    #[test]
    fn test_facing_mode_rejection_is_distinguishable() {
        let facing = AcquireError::overconstrained("facingMode", "no rear camera");
        let width = AcquireError::overconstrained("width", "too small");
        assert!(facing.kind.is_facing_mode_rejection());
        assert!(!facing.kind.is_resolution_rejection());
        assert!(width.kind.is_resolution_rejection());
        assert!(!AcquireErrorKind::NotAllowed.is_resolution_rejection());
    }

    #[test]
    fn test_target_facing_modes() {
        assert_eq!(CaptureTarget::Front.facing_mode(), FacingMode::User);
        assert_eq!(CaptureTarget::Back.facing_mode(), FacingMode::Environment);
        assert_eq!(FacingMode::User.toggled(), FacingMode::Environment);
        assert_eq!("FRONT".parse::<CaptureTarget>(), Ok(CaptureTarget::Front));
    }

    #[test]
    fn test_facing_mode_hints() {
        assert_eq!(FacingMode::from_hint("Front Camera"), Some(FacingMode::User));
        assert_eq!(FacingMode::from_hint("Rear Sensor"), Some(FacingMode::Environment));
        assert_eq!(FacingMode::from_hint("HD Pro Webcam C920"), None);
    }

    #[test]
    fn test_constraint_min_bounds() {
        let range = ConstrainRange::new(3840u32, 1920);
        assert!(range.accepts(1920));
        assert!(!range.accepts(1280));
        assert!(ConstrainRange::<u32>::any().accepts(1));
    }
}

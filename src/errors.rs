// SPDX-License-Identifier: MPL-2.0

//! Error types for the capture subsystem

use crate::backends::camera::types::{AcquireError, BackendError};
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Top-level error type used by the binary and config handling
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture lifecycle errors
    Capture(CaptureError),
    /// Platform backend errors
    Backend(BackendError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Capture lifecycle errors
///
/// Every failure past capability detection surfaces as one of these kinds so
/// callers can tell them apart without parsing messages.
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// Detection found no camera hardware
    NoCameraAvailable,
    /// Every negotiation tier failed, or acquisition failed outright
    CameraUnavailable {
        reason: String,
        source: Option<AcquireError>,
    },
    /// The display surface never produced a decodable frame
    CameraInitTimeout { waited_ms: u64 },
    /// `take_photo` was called without an active, ready session
    CaptureNotReady(String),
    /// The post-processing pipeline could not produce output
    EncodeFailed(String),
    /// Camera switching is not possible on this device
    SwitchUnsupported(String),
}

impl CaptureError {
    /// Build a `CameraUnavailable` from the acquisition failure that caused it
    pub fn unavailable(reason: impl Into<String>, source: Option<AcquireError>) -> Self {
        CaptureError::CameraUnavailable {
            reason: reason.into(),
            source,
        }
    }

    /// Stable name of the error kind, used in events and logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            CaptureError::NoCameraAvailable => "NoCameraAvailable",
            CaptureError::CameraUnavailable { .. } => "CameraUnavailable",
            CaptureError::CameraInitTimeout { .. } => "CameraInitTimeout",
            CaptureError::CaptureNotReady(_) => "CaptureNotReady",
            CaptureError::EncodeFailed(_) => "EncodeFailed",
            CaptureError::SwitchUnsupported(_) => "SwitchUnsupported",
        }
    }

    /// Fatal for the current attempt; retrying the same call will not help
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptureError::NoCameraAvailable | CaptureError::EncodeFailed(_)
        )
    }

    /// A later `start_camera` may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CaptureError::CameraUnavailable { .. }
                | CaptureError::CameraInitTimeout { .. }
                | CaptureError::SwitchUnsupported(_)
        )
    }

    /// Message suitable for a transient notice in the UI
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::NoCameraAvailable => "This device has no usable camera".to_string(),
            CaptureError::CameraUnavailable {
                source: Some(source),
                ..
            } => source.kind.user_message().to_string(),
            CaptureError::CameraUnavailable { .. } => "Unable to start the camera".to_string(),
            CaptureError::CameraInitTimeout { .. } => {
                "The camera took too long to start, please try again".to_string()
            }
            CaptureError::CaptureNotReady(_) => "The camera is not ready yet".to_string(),
            CaptureError::EncodeFailed(_) => {
                "Failed to process the photo, please retry".to_string()
            }
            CaptureError::SwitchUnsupported(_) => {
                "This device does not support switching cameras".to_string()
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Backend(e) => write!(f, "Backend error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoCameraAvailable => write!(f, "No camera available"),
            CaptureError::CameraUnavailable {
                reason,
                source: Some(source),
            } => write!(f, "Camera unavailable: {} ({})", reason, source),
            CaptureError::CameraUnavailable { reason, .. } => {
                write!(f, "Camera unavailable: {}", reason)
            }
            CaptureError::CameraInitTimeout { waited_ms } => {
                write!(f, "Camera did not produce a frame within {}ms", waited_ms)
            }
            CaptureError::CaptureNotReady(msg) => write!(f, "Capture not ready: {}", msg),
            CaptureError::EncodeFailed(msg) => write!(f, "Encoding failed: {}", msg),
            CaptureError::SwitchUnsupported(msg) => {
                write!(f, "Camera switching unsupported: {}", msg)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::CameraUnavailable {
                source: Some(source),
                ..
            } => Some(source),
            _ => None,
        }
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

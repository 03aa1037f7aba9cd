// SPDX-License-Identifier: MPL-2.0

//! Camera platform abstraction
//!
//! The capture layer never talks to hardware directly. It goes through three
//! small traits that model what a media runtime offers:
//!
//! ```text
//! ┌──────────────────────┐
//! │  Capture strategies  │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐      ┌──────────────────┐
//! │  MediaDevices trait  │ ───▶ │ MediaStream trait │
//! └──────────┬───────────┘      └────────┬─────────┘
//!            │                           │ attached to
//!       ┌────┴─────┐                     ▼
//!       │          │            ┌──────────────────┐
//!     V4L2      Virtual         │ DisplaySurface   │ ──▶ FrameBuffer
//!                               └──────────────────┘
//! ```

pub mod format_converters;
pub mod surface;
pub mod types;
#[cfg(target_os = "linux")]
pub mod v4l2;

pub use surface::{CaptureSurfaces, FrameBuffer, VideoSurface};
pub use types::*;

use std::sync::Arc;

/// Device enumeration and acquisition
///
/// Implementations must be cheap to call repeatedly; capability detection
/// and every negotiation attempt go through here.
pub trait MediaDevices: Send + Sync {
    /// Enumerate video input devices
    fn enumerate_devices(&self) -> BackendResult<Vec<MediaDeviceInfo>>;

    /// Acquire a live stream satisfying `constraints`
    ///
    /// `ideal` values are best-effort; a `min` bound or a facing mode that
    /// cannot be honored fails with [`AcquireErrorKind::Overconstrained`]
    /// naming the offending constraint.
    fn get_user_media(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Arc<dyn MediaStream>, AcquireError>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;
}

/// A live video stream holding a device handle
pub trait MediaStream: Send + Sync {
    /// Settings actually in effect (may differ from what was requested)
    fn settings(&self) -> TrackSettings;

    /// Most recent decoded frame, if any has arrived yet
    fn latest_frame(&self) -> Option<CameraFrame>;

    /// False once the stream has been stopped or the device went away
    fn is_live(&self) -> bool;

    /// Release the device handle. Safe to call more than once.
    fn stop(&self);
}

/// A live display target (the preview) that a stream is attached to
pub trait DisplaySurface: Send + Sync {
    /// Attach a stream, or detach with `None`
    fn attach(&self, stream: Option<Arc<dyn MediaStream>>);

    /// Current playback state
    fn frame_state(&self) -> FrameState;

    /// The frame currently shown
    fn current_frame(&self) -> Option<CameraFrame>;
}

/// Get the platform's default media backend
#[cfg(target_os = "linux")]
pub fn get_backend() -> Arc<dyn MediaDevices> {
    Arc::new(v4l2::V4l2Devices::new())
}

/// Get the platform's default media backend
#[cfg(not(target_os = "linux"))]
pub fn get_backend() -> Arc<dyn MediaDevices> {
    Arc::new(crate::backends::virtual_camera::VirtualDevices::new(
        crate::backends::virtual_camera::VirtualCameraConfig::no_cameras(),
    ))
}

/// Get the default backend type
pub fn get_default_backend() -> CameraBackendType {
    if cfg!(target_os = "linux") {
        CameraBackendType::V4l2
    } else {
        CameraBackendType::Virtual
    }
}

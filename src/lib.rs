// SPDX-License-Identifier: MPL-2.0

//! cardcam - adaptive camera capture for business-card scanning
//!
//! The crate picks a capture strategy for the device it runs on, negotiates
//! the best resolution the camera accepts, waits for a stable frame and
//! turns it into an OCR-friendly JPEG.
//!
//! # Architecture
//!
//! - [`backends`]: Platform media seam (V4L2 and a virtual camera)
//! - [`capture`]: Capability detection, negotiation, strategies and the manager
//! - [`pipelines`]: Photo post-processing and adaptive encoding
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let devices = cardcam::backends::camera::get_backend();
//! let config = CaptureConfig::load();
//! let host = HostEnvironment::from_host(&config);
//! let mut manager = CaptureManager::new(devices, host, config);
//! manager.start_camera(CaptureTarget::Back, StartOptions::default()).await?;
//! let photo = manager.take_photo().await?;
//! ```

pub mod backends;
pub mod capture;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;

// Re-export commonly used types
pub use backends::camera::{CaptureSurfaces, CaptureTarget, FacingMode};
pub use capture::{CaptureEvent, CaptureManager, HostEnvironment, StartOptions};
pub use config::CaptureConfig;
pub use errors::{AppError, AppResult, CaptureError, CaptureResult};

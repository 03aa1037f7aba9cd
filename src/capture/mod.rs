// SPDX-License-Identifier: GPL-3.0-only

//! Adaptive capture layer
//!
//! ```text
//! CaptureManager
//!   ├── CapabilityDetector ──▶ DeviceCapabilityReport ──▶ CaptureMode
//!   ├── CaptureStrategy (Desktop | Mobile)
//!   │     ├── negotiate() over the tier table
//!   │     └── PhotoPipeline
//!   └── EventEmitter ──▶ broadcast::Receiver<CaptureEvent>
//! ```

pub mod detector;
pub mod events;
pub mod manager;
pub mod negotiation;
pub mod strategy;
pub mod tiers;

pub use detector::{
    CameraInfo, CapabilityDetector, CaptureMode, DeviceCapabilityReport, DeviceClass,
    EnvironmentInfo, HostEnvironment, Orientation,
};
pub use events::{CaptureEvent, EventEmitter, PhotoMetadata};
pub use manager::{CaptureManager, CaptureRegistry, CaptureStatus, PhotoResult, StartOptions};
pub use negotiation::{NegotiatedStream, facing_chain, negotiate};
pub use strategy::{
    ActiveStream, CaptureStrategy, DesktopStrategy, MobileStrategy, SessionStatus, StopHandle,
    StrategyStatus, SwitchOutcome,
};
pub use tiers::{ConstraintOverrides, ConstraintTier, DESKTOP_TIERS, MOBILE_TIERS, tiers_for};

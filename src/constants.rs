// SPDX-License-Identifier: GPL-3.0-only

//! Capture-wide constants
//!
//! These are the defaults behind [`crate::config::CaptureConfig`]. Every value
//! here can be overridden from the config file.

use std::time::Duration;

/// Timing defaults for camera start-up and capture
pub mod timing {
    use super::Duration;

    /// Desktop webcams are usually ready quickly
    pub const DESKTOP_START_TIMEOUT: Duration = Duration::from_millis(5_000);
    /// Phone sensors take longer to power up and settle exposure
    pub const MOBILE_START_TIMEOUT: Duration = Duration::from_millis(8_000);
    /// Readiness wait before sampling a frame (desktop)
    pub const DESKTOP_READY_TIMEOUT: Duration = Duration::from_millis(5_000);
    /// Readiness wait before sampling a frame (mobile)
    pub const MOBILE_READY_TIMEOUT: Duration = Duration::from_millis(10_000);
    /// Poll interval while waiting for a decodable frame
    pub const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(50);
    /// Settling delay before a mobile capture (hand shake, auto-focus)
    pub const MOBILE_SETTLE_DELAY: Duration = Duration::from_millis(300);
}

/// Encoding defaults
pub mod encoding {
    /// Single fixed JPEG quality used for desktop captures
    pub const DESKTOP_QUALITY: f32 = 0.92;
    /// Quality never drops below this during adaptive re-encoding
    pub const QUALITY_FLOOR: f32 = 0.85;
    /// Quality reduction applied on the single re-encode pass
    pub const REENCODE_STEP: f32 = 0.10;
    /// MIME type of every captured photo
    pub const JPEG_MIME: &str = "image/jpeg";

    pub const MIB: usize = 1024 * 1024;

    /// Pixel count thresholds for quality bands
    pub const PIXELS_4K: u64 = 3840 * 2160;
    pub const PIXELS_2K: u64 = 2560 * 1440;
    pub const PIXELS_1080P: u64 = 1920 * 1080;
}

/// Pixel post-processing defaults
pub mod processing {
    /// Contrast remap factor around mid-grey: (v - 128) * f + 128
    pub const CONTRAST_FACTOR: f32 = 1.15;
    /// Sharpening only runs at or above this resolution
    pub const SHARPEN_MIN_WIDTH: u32 = 1920;
    pub const SHARPEN_MIN_HEIGHT: u32 = 1080;

    /// 3x3 unsharp kernel, row-major
    pub const SHARPEN_KERNEL: [f32; 9] = [
        0.0, -0.2, 0.0, //
        -0.2, 1.8, -0.2, //
        0.0, -0.2, 0.0,
    ];

    /// Desktop captures at or above 1280x720 get a mild tone filter
    pub const DESKTOP_FILTER_MIN_WIDTH: u32 = 1280;
    pub const DESKTOP_FILTER_MIN_HEIGHT: u32 = 720;
}

/// Device classification defaults
pub mod device {
    /// Viewports at or below this width count as small screens
    pub const SMALL_SCREEN_MAX_WIDTH: u32 = 768;
    /// Tablet viewport band (logical px, inclusive)
    pub const TABLET_MIN_WIDTH: u32 = 768;
    pub const TABLET_MAX_WIDTH: u32 = 1024;
    /// Viewport assumed for native desktop processes
    pub const DEFAULT_VIEWPORT: (u32, u32) = (1920, 1080);
}

/// Event channel capacity for capture lifecycle notifications
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Number of mmap buffers requested from V4L2 devices
pub const V4L2_BUFFER_COUNT: u32 = 4;

// SPDX-License-Identifier: MPL-2.0

//! Display surface and frame buffer
//!
//! [`VideoSurface`] plays the role of the live preview: a stream is attached
//! to it and it reports whether a decodable frame is available.
//! [`FrameBuffer`] is the off-screen canvas a still frame is drawn into
//! before post-processing.

use super::format_converters::frame_to_rgba;
use super::types::{CameraFrame, FrameState, ReadyState};
use super::{DisplaySurface, MediaStream};
use image::RgbaImage;
use image::imageops::FilterType;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// The two caller-owned surfaces a capture session draws on
#[derive(Clone)]
pub struct CaptureSurfaces {
    pub display: Arc<dyn DisplaySurface>,
    pub frame_buffer: Arc<Mutex<FrameBuffer>>,
}

impl CaptureSurfaces {
    pub fn new(display: Arc<dyn DisplaySurface>, frame_buffer: Arc<Mutex<FrameBuffer>>) -> Self {
        Self {
            display,
            frame_buffer,
        }
    }
}

impl Default for CaptureSurfaces {
    /// A fresh [`VideoSurface`] and an empty frame buffer
    fn default() -> Self {
        Self {
            display: Arc::new(VideoSurface::new()),
            frame_buffer: Arc::new(Mutex::new(FrameBuffer::new())),
        }
    }
}

impl std::fmt::Debug for CaptureSurfaces {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSurfaces")
            .field("display", &self.display.frame_state())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct SurfaceState {
    stream: Option<Arc<dyn MediaStream>>,
    paused: bool,
}

/// Stock display surface that mirrors its attached stream
#[derive(Default)]
pub struct VideoSurface {
    state: Mutex<SurfaceState>,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause playback; a paused surface is never "ready"
    pub fn pause(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.paused = true;
        }
    }

    pub fn resume(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.paused = false;
        }
    }

    /// Whether a stream is currently attached
    pub fn has_stream(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.stream.is_some())
            .unwrap_or(false)
    }
}

impl DisplaySurface for VideoSurface {
    fn attach(&self, stream: Option<Arc<dyn MediaStream>>) {
        if let Ok(mut state) = self.state.lock() {
            debug!(attached = stream.is_some(), "Display surface source changed");
            state.stream = stream;
            state.paused = false;
        }
    }

    fn frame_state(&self) -> FrameState {
        let Ok(state) = self.state.lock() else {
            return FrameState::default();
        };
        let Some(stream) = state.stream.as_ref() else {
            return FrameState::default();
        };

        if !stream.is_live() {
            return FrameState {
                ended: true,
                paused: state.paused,
                ..FrameState::default()
            };
        }

        match stream.latest_frame() {
            Some(frame) => FrameState {
                width: frame.width,
                height: frame.height,
                ready_state: ReadyState::HaveEnoughData,
                paused: state.paused,
                ended: false,
            },
            None => FrameState {
                ready_state: ReadyState::HaveMetadata,
                paused: state.paused,
                ..FrameState::default()
            },
        }
    }

    fn current_frame(&self) -> Option<CameraFrame> {
        let state = self.state.lock().ok()?;
        let stream = state.stream.as_ref()?;
        if stream.is_live() {
            stream.latest_frame()
        } else {
            None
        }
    }
}

/// Off-screen RGBA canvas
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing RGBA pixels
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, String> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(format!(
                "RGBA buffer size mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Draw a frame at its native resolution, resizing the buffer to match
    pub fn draw_frame(&mut self, frame: &CameraFrame) -> Result<(), String> {
        if frame.width == 0 || frame.height == 0 {
            return Err("Frame has zero dimensions".to_string());
        }
        self.pixels = frame_to_rgba(frame)?;
        self.width = frame.width;
        self.height = frame.height;
        Ok(())
    }

    /// Downscale so the longer edge is at most `max_dimension`
    ///
    /// `smooth` selects Lanczos resampling; otherwise nearest-neighbour.
    /// Returns true when the buffer changed.
    pub fn fit_within(&mut self, max_dimension: u32, smooth: bool) -> bool {
        let longest = self.width.max(self.height);
        if max_dimension == 0 || longest <= max_dimension {
            return false;
        }
        let Some(image) = self.to_image() else {
            return false;
        };

        let scale = max_dimension as f64 / longest as f64;
        let new_w = ((self.width as f64 * scale).round() as u32).max(1);
        let new_h = ((self.height as f64 * scale).round() as u32).max(1);
        let filter = if smooth {
            FilterType::Lanczos3
        } else {
            FilterType::Nearest
        };

        let resized = image::imageops::resize(&image, new_w, new_h, filter);
        debug!(
            from_width = self.width,
            from_height = self.height,
            to_width = new_w,
            to_height = new_h,
            smooth,
            "Frame buffer downscaled"
        );
        self.width = new_w;
        self.height = new_h;
        self.pixels = resized.into_raw();
        true
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy the contents into an `image` buffer
    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn clear(&mut self) {
        self.width = 0;
        self.height = 0;
        self.pixels.clear();
    }
}

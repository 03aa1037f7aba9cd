// SPDX-License-Identifier: MPL-2.0

//! Post-processing for captured card photos
//!
//! Three pixel stages, all pure functions over a tightly packed RGBA buffer:
//! - tone filter (contrast, brightness, saturation) picked by resolution
//! - 3x3 sharpening for high resolution mobile captures
//! - contrast normalization around mid-grey to separate text from card stock
//!
//! Alpha is never modified.

use super::PhotoVariant;
use crate::config::CaptureConfig;
use crate::constants::processing::{
    DESKTOP_FILTER_MIN_HEIGHT, DESKTOP_FILTER_MIN_WIDTH, SHARPEN_KERNEL,
};
use image::RgbaImage;
use tracing::{debug, info};

/// Rec. 709 luminance weights used by the saturation matrix
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Contrast, brightness and saturation nudges, applied in that order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneFilter {
    pub contrast: f32,
    pub brightness: f32,
    pub saturation: f32,
}

impl ToneFilter {
    pub const fn new(contrast: f32, brightness: f32, saturation: f32) -> Self {
        Self {
            contrast,
            brightness,
            saturation,
        }
    }

    /// Phone cameras get stronger nudges the more pixels they deliver
    pub fn mobile_for(width: u32, height: u32) -> Self {
        if width >= 2560 || height >= 1440 {
            Self::new(1.08, 1.03, 1.05)
        } else if width >= 1920 || height >= 1080 {
            Self::new(1.06, 1.02, 1.03)
        } else {
            Self::new(1.04, 1.01, 1.02)
        }
    }

    /// A single mild filter, only for HD and above
    pub fn desktop_for(width: u32, height: u32) -> Option<Self> {
        (width >= DESKTOP_FILTER_MIN_WIDTH && height >= DESKTOP_FILTER_MIN_HEIGHT)
            .then_some(Self::new(1.04, 1.02, 1.02))
    }

    pub fn is_identity(&self) -> bool {
        self.contrast == 1.0 && self.brightness == 1.0 && self.saturation == 1.0
    }

    /// Apply to an RGBA buffer in place
    pub fn apply(&self, rgba: &mut [u8]) {
        if self.is_identity() {
            return;
        }
        let s = self.saturation;
        let matrix = [
            [
                LUMA[0] + (1.0 - LUMA[0]) * s,
                LUMA[1] - LUMA[1] * s,
                LUMA[2] - LUMA[2] * s,
            ],
            [
                LUMA[0] - LUMA[0] * s,
                LUMA[1] + (1.0 - LUMA[1]) * s,
                LUMA[2] - LUMA[2] * s,
            ],
            [
                LUMA[0] - LUMA[0] * s,
                LUMA[1] - LUMA[1] * s,
                LUMA[2] + (1.0 - LUMA[2]) * s,
            ],
        ];

        for px in rgba.chunks_exact_mut(4) {
            let mut rgb = [0f32; 3];
            for (c, value) in rgb.iter_mut().enumerate() {
                let v = px[c] as f32 / 255.0;
                let v = ((v - 0.5) * self.contrast + 0.5).clamp(0.0, 1.0);
                *value = (v * self.brightness).clamp(0.0, 1.0);
            }
            for (c, row) in matrix.iter().enumerate() {
                let v = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
                px[c] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
    }
}

/// Convolve RGB with a 3x3 kernel, reading from a copy of the input
///
/// Border pixels and alpha are left as they were.
pub fn sharpen(rgba: &mut [u8], width: u32, height: u32, kernel: &[f32; 9]) {
    let (w, h) = (width as usize, height as usize);
    if w < 3 || h < 3 || rgba.len() < w * h * 4 {
        return;
    }
    let source = rgba.to_vec();

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            for c in 0..3 {
                let mut sum = 0.0f32;
                for ky in 0..3 {
                    for kx in 0..3 {
                        let idx = ((y + ky - 1) * w + (x + kx - 1)) * 4 + c;
                        sum += source[idx] as f32 * kernel[ky * 3 + kx];
                    }
                }
                rgba[(y * w + x) * 4 + c] = sum.clamp(0.0, 255.0).round() as u8;
            }
        }
    }
}

/// Remap every RGB value as `(v - 128) * factor + 128`, clamped
pub fn normalize_contrast(rgba: &mut [u8], factor: f32) {
    for px in rgba.chunks_exact_mut(4) {
        for v in &mut px[..3] {
            *v = ((*v as f32 - 128.0) * factor + 128.0).clamp(0.0, 255.0).round() as u8;
        }
    }
}

/// Which stages run for a capture
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessingConfig {
    pub tone: Option<ToneFilter>,
    pub sharpen: bool,
    /// Contrast normalization factor, `None` to skip
    pub contrast: Option<f32>,
}

impl PostProcessingConfig {
    /// Plan the stages for a frame of the given size
    pub fn plan(variant: PhotoVariant, width: u32, height: u32, config: &CaptureConfig) -> Self {
        match variant {
            PhotoVariant::Desktop => Self {
                tone: ToneFilter::desktop_for(width, height),
                sharpen: false,
                contrast: None,
            },
            PhotoVariant::Mobile => Self {
                tone: Some(ToneFilter::mobile_for(width, height)),
                sharpen: width >= config.sharpen_min_width && height >= config.sharpen_min_height,
                contrast: Some(config.contrast_factor),
            },
        }
    }

    pub fn is_noop(&self) -> bool {
        self.tone.is_none_or(|t| t.is_identity()) && !self.sharpen && self.contrast.is_none()
    }
}

/// Applies a [`PostProcessingConfig`] to captured images
pub struct PostProcessor {
    config: PostProcessingConfig,
}

impl PostProcessor {
    pub fn new(config: PostProcessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PostProcessingConfig {
        &self.config
    }

    /// Run every planned stage over `image`
    ///
    /// CPU-bound; call from a blocking task for large frames.
    pub fn process(&self, mut image: RgbaImage) -> RgbaImage {
        let (width, height) = image.dimensions();
        if self.config.is_noop() {
            debug!(width, height, "No post-processing planned");
            return image;
        }
        info!(
            width,
            height,
            tone = ?self.config.tone,
            sharpen = self.config.sharpen,
            contrast = ?self.config.contrast,
            "Starting post-processing"
        );

        let buffer: &mut [u8] = &mut image;
        if let Some(tone) = self.config.tone {
            tone.apply(buffer);
        }
        if self.config.sharpen {
            sharpen(buffer, width, height, &SHARPEN_KERNEL);
        }
        if let Some(factor) = self.config.contrast {
            normalize_contrast(buffer, factor);
        }

        debug!("Post-processing complete");
        image
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Async JPEG encoding with a size budget
//!
//! Mobile captures pick a [`QualityProfile`] from the source pixel count and
//! are re-encoded once at lower quality if the first pass overshoots the
//! budget. Desktop captures use one fixed quality and a single pass.

use crate::config::{QualityBand, default_quality_bands};
use image::buffer::ConvertBuffer;
use image::{RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Encode quality and byte budget for a source resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    /// JPEG quality in 0..=1
    pub encode_quality: f32,
    pub max_bytes: usize,
    pub label: String,
}

impl QualityProfile {
    /// Pick the first band whose threshold the pixel count reaches
    ///
    /// `bands` are expected most demanding first; the last band should have
    /// a zero threshold so every size matches something.
    pub fn select(width: u32, height: u32, bands: &[QualityBand]) -> Self {
        let pixels = width as u64 * height as u64;
        let band = bands
            .iter()
            .find(|b| pixels >= b.min_pixels)
            .or_else(|| bands.last());
        match band {
            Some(band) => Self {
                encode_quality: band.quality,
                max_bytes: band.max_bytes,
                label: band.label.clone(),
            },
            None => Self {
                encode_quality: crate::constants::encoding::DESKTOP_QUALITY,
                max_bytes: usize::MAX,
                label: "unbounded".to_string(),
            },
        }
    }

    /// Select from the built-in bands
    pub fn for_resolution(width: u32, height: u32) -> Self {
        Self::select(width, height, &default_quality_bands())
    }
}

/// How many passes and at what quality
#[derive(Debug, Clone, PartialEq)]
pub enum EncodingPolicy {
    /// Encode once at `profile.encode_quality`, re-encode once if over budget
    Adaptive {
        profile: QualityProfile,
        floor: f32,
        step: f32,
    },
    /// One pass, no budget
    Fixed(f32),
}

/// Encoded JPEG with the parameters that produced it
#[derive(Debug, Clone)]
pub struct EncodedPhoto {
    pub data: Vec<u8>,
    /// Quality of the pass that was kept
    pub quality: f32,
    /// 1, or 2 when a re-encode happened
    pub passes: u8,
    pub width: u32,
    pub height: u32,
}

/// Convert a 0..=1 quality to the encoder's 1..=100 scale
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Run `policy` against an arbitrary encode function
///
/// Returns the bytes and the quality of the pass that was kept. A second pass
/// only happens when the first exceeds the budget and quality is still above
/// the floor; its output is returned whatever its size.
pub fn encode_with_policy<F>(
    policy: &EncodingPolicy,
    mut encode: F,
) -> Result<(Vec<u8>, f32, u8), String>
where
    F: FnMut(f32) -> Result<Vec<u8>, String>,
{
    match policy {
        EncodingPolicy::Fixed(quality) => Ok((encode(*quality)?, *quality, 1)),
        EncodingPolicy::Adaptive {
            profile,
            floor,
            step,
        } => {
            let quality = profile.encode_quality;
            let first = encode(quality)?;
            if first.len() <= profile.max_bytes || quality <= *floor {
                return Ok((first, quality, 1));
            }

            let reduced = (quality - step).max(*floor);
            debug!(
                size = first.len(),
                budget = profile.max_bytes,
                from = quality,
                to = reduced,
                "Over budget, re-encoding once"
            );
            let second = encode(reduced)?;
            if second.len() > profile.max_bytes {
                warn!(
                    size = second.len(),
                    budget = profile.max_bytes,
                    "Re-encoded photo still over budget"
                );
            }
            Ok((second, reduced, 2))
        }
    }
}

/// Encode an RGBA image as baseline JPEG
pub fn encode_jpeg(image: &RgbaImage, quality: f32) -> Result<Vec<u8>, String> {
    let rgb: RgbImage = image.convert();
    let mut buffer = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| format!("JPEG encoding failed: {}", e))?;
    Ok(buffer)
}

/// Photo encoder
pub struct PhotoEncoder {
    policy: EncodingPolicy,
}

impl PhotoEncoder {
    pub fn new(policy: EncodingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EncodingPolicy {
        &self.policy
    }

    /// Encode on a blocking task
    pub async fn encode(&self, image: RgbaImage) -> Result<EncodedPhoto, String> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err("Cannot encode an empty image".to_string());
        }
        info!(width, height, policy = ?self.policy, "Starting encoding");

        let policy = self.policy.clone();
        let (data, quality, passes) = tokio::task::spawn_blocking(move || {
            encode_with_policy(&policy, |q| encode_jpeg(&image, q))
        })
        .await
        .map_err(|e| format!("Encoding task error: {}", e))??;

        debug!(size = data.len(), quality, passes, "Encoding complete");
        Ok(EncodedPhoto {
            data,
            quality,
            passes,
            width,
            height,
        })
    }
}

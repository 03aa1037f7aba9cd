// SPDX-License-Identifier: MPL-2.0

//! Async photo post-processing pipeline
//!
//! ```text
//! FrameBuffer (RGBA) → Post-Processing → Encoding → CapturedPhoto
//! ```
//!
//! 1. **Post-Processing**: tone filter, sharpening and contrast normalization
//!    chosen by variant and resolution (blocking task)
//! 2. **Encoding**: JPEG with a quality profile and at most one re-encode
//!    (blocking task)
//!
//! The live preview keeps running while both stages execute.

pub mod encoding;
pub mod processing;

pub use encoding::{EncodedPhoto, EncodingPolicy, PhotoEncoder, QualityProfile};
pub use processing::{PostProcessingConfig, PostProcessor, ToneFilter};

use crate::backends::camera::types::FacingMode;
use crate::config::CaptureConfig;
use crate::constants::encoding::JPEG_MIME;
use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Which tuning a capture gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoVariant {
    /// Mild filter, fixed quality, single pass
    Desktop,
    /// Resolution-tiered filter, sharpening, contrast, adaptive encoding
    Mobile,
}

/// A finished capture, owned by the caller
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
    pub facing_mode: FacingMode,
    pub captured_at: DateTime<Utc>,
    /// Resolution of the frame as delivered by the camera
    pub source_resolution: (u32, u32),
    /// Resolution of the encoded image
    pub output_resolution: (u32, u32),
    pub quality: f32,
    pub passes: u8,
    /// Quality band label, `None` for fixed-quality captures
    pub profile: Option<String>,
}

impl CapturedPhoto {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Post-process and encode one frame
pub struct PhotoPipeline {
    variant: PhotoVariant,
    config: CaptureConfig,
}

impl PhotoPipeline {
    pub fn new(variant: PhotoVariant, config: CaptureConfig) -> Self {
        Self { variant, config }
    }

    pub fn variant(&self) -> PhotoVariant {
        self.variant
    }

    /// Encoding policy for a given source resolution
    pub fn encoding_policy(&self, width: u32, height: u32) -> EncodingPolicy {
        match self.variant {
            PhotoVariant::Desktop => EncodingPolicy::Fixed(self.config.desktop_quality),
            PhotoVariant::Mobile => EncodingPolicy::Adaptive {
                profile: QualityProfile::select(width, height, &self.config.quality_bands),
                floor: self.config.quality_floor,
                step: self.config.reencode_step,
            },
        }
    }

    /// Run both stages over `image`
    ///
    /// `source_resolution` is the camera's frame size, which selects the
    /// quality profile even if the buffer was downscaled.
    pub async fn process(
        &self,
        image: RgbaImage,
        source_resolution: (u32, u32),
        facing_mode: FacingMode,
    ) -> Result<CapturedPhoto, String> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err("Frame buffer is empty".to_string());
        }

        let plan = PostProcessingConfig::plan(self.variant, width, height, &self.config);
        let processor = PostProcessor::new(plan);
        let processed = tokio::task::spawn_blocking(move || processor.process(image))
            .await
            .map_err(|e| format!("Post-processing task error: {}", e))?;

        let policy = self.encoding_policy(source_resolution.0, source_resolution.1);
        let profile = match &policy {
            EncodingPolicy::Adaptive { profile, .. } => Some(profile.label.clone()),
            EncodingPolicy::Fixed(_) => None,
        };
        let encoded = PhotoEncoder::new(policy).encode(processed).await?;

        info!(
            variant = ?self.variant,
            bytes = encoded.data.len(),
            quality = encoded.quality,
            passes = encoded.passes,
            "Photo processed"
        );

        Ok(CapturedPhoto {
            data: encoded.data,
            mime_type: JPEG_MIME,
            facing_mode,
            captured_at: Utc::now(),
            source_resolution,
            output_resolution: (encoded.width, encoded.height),
            quality: encoded.quality,
            passes: encoded.passes,
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_desktop_pipeline_uses_fixed_quality() {
        let pipeline = PhotoPipeline::new(PhotoVariant::Desktop, CaptureConfig::default());
        let image = RgbaImage::from_pixel(32, 24, image::Rgba([90, 90, 90, 255]));
        let photo = pipeline
            .process(image, (32, 24), FacingMode::User)
            .await
            .unwrap();

        assert_eq!(photo.mime_type, "image/jpeg");
        assert_eq!(photo.quality, 0.92);
        assert_eq!(photo.passes, 1);
        assert!(photo.profile.is_none());
        assert_eq!(photo.facing_mode, FacingMode::User);
    }

    #[tokio::test]
    async fn test_mobile_pipeline_profile_follows_source() {
        let pipeline = PhotoPipeline::new(PhotoVariant::Mobile, CaptureConfig::default());
        let image = RgbaImage::from_pixel(40, 30, image::Rgba([200, 60, 60, 255]));
        let photo = pipeline
            .process(image, (4000, 3000), FacingMode::Environment)
            .await
            .unwrap();

        assert_eq!(photo.quality, 0.98);
        assert_eq!(photo.profile.as_deref(), Some("minimal"));
        assert_eq!(photo.output_resolution, (40, 30));
        assert_eq!(photo.source_resolution, (4000, 3000));
    }

    #[tokio::test]
    async fn test_empty_image_is_rejected() {
        let pipeline = PhotoPipeline::new(PhotoVariant::Mobile, CaptureConfig::default());
        let result = pipeline
            .process(RgbaImage::new(0, 0), (0, 0), FacingMode::Environment)
            .await;
        assert!(result.is_err());
    }
}

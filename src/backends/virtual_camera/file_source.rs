// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources for the virtual camera
//!
//! A virtual device either renders a synthetic business-card scene or replays
//! a still image from disk, scaled to whatever resolution was negotiated.

use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Where a virtual device gets its pixels from
#[derive(Debug, Clone, Default)]
pub enum FrameSource {
    /// Procedurally drawn card on a desk
    #[default]
    Pattern,
    /// A decoded still image
    Image(Arc<RgbaImage>),
}

impl FrameSource {
    /// Load an image file as the frame source
    pub fn from_file(path: &Path) -> BackendResult<Self> {
        info!(path = %path.display(), "Loading image file");
        let img = image::open(path).map_err(|e| {
            BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
        })?;
        let rgba = img.to_rgba8();
        info!(
            width = rgba.width(),
            height = rgba.height(),
            "Image loaded successfully"
        );
        Ok(FrameSource::Image(Arc::new(rgba)))
    }

    /// Native size of the source, if it has one
    pub fn native_size(&self) -> Option<(u32, u32)> {
        match self {
            FrameSource::Pattern => None,
            FrameSource::Image(img) => Some(img.dimensions()),
        }
    }

    /// Produce a frame at the given resolution
    pub fn render(&self, width: u32, height: u32) -> CameraFrame {
        let width = width.max(1);
        let height = height.max(1);
        let image = match self {
            FrameSource::Pattern => card_pattern(width, height),
            FrameSource::Image(img) if img.dimensions() == (width, height) => (**img).clone(),
            FrameSource::Image(img) => {
                debug!(
                    from_width = img.width(),
                    from_height = img.height(),
                    width,
                    height,
                    "Scaling source image"
                );
                image::imageops::resize(&**img, width, height, FilterType::Triangle)
            }
        };
        CameraFrame::from_rgba(width, height, image.into_raw())
    }
}

/// Draw a light card with a few "text" bars on a darker desk
fn card_pattern(width: u32, height: u32) -> RgbaImage {
    let desk = Rgba([62, 54, 48, 255]);
    let card = Rgba([236, 232, 224, 255]);
    let ink = Rgba([28, 36, 64, 255]);
    let accent = Rgba([180, 40, 48, 255]);

    // Card occupies the centre 70% at a 1.75:1 aspect (ISO/IEC 7810 ID-1 is ~1.586)
    let card_w = (width as f32 * 0.7) as u32;
    let card_h = ((card_w as f32 / 1.75) as u32).min((height as f32 * 0.8) as u32);
    let left = (width - card_w) / 2;
    let top = (height - card_h) / 2;

    let bar = |row: f32, start: f32, len: f32| {
        let y0 = top + (card_h as f32 * row) as u32;
        let y1 = y0 + (card_h as f32 * 0.06).max(1.0) as u32;
        let x0 = left + (card_w as f32 * start) as u32;
        let x1 = x0 + (card_w as f32 * len) as u32;
        (x0, x1, y0, y1)
    };
    let bars = [
        (bar(0.18, 0.08, 0.55), accent),
        (bar(0.38, 0.08, 0.40), ink),
        (bar(0.55, 0.08, 0.62), ink),
        (bar(0.70, 0.08, 0.48), ink),
    ];

    RgbaImage::from_fn(width, height, |x, y| {
        let on_card = x >= left && x < left + card_w && y >= top && y < top + card_h;
        if !on_card {
            // Subtle gradient so the desk is not flat
            let shade = ((x + y) % 64) as u8 / 8;
            return Rgba([desk[0] + shade, desk[1] + shade, desk[2] + shade, 255]);
        }
        for ((x0, x1, y0, y1), color) in bars {
            if x >= x0 && x < x1 && y >= y0 && y < y1 {
                return color;
            }
        }
        card
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_renders_requested_size() {
        let frame = FrameSource::Pattern.render(64, 36);
        assert_eq!((frame.width, frame.height), (64, 36));
        assert_eq!(frame.data.len(), 64 * 36 * 4);

        // Centre is on the card, corner is desk
        let centre = ((18 * 64 + 32) * 4) as usize;
        assert!(frame.data[centre] > 150);
        assert!(frame.data[0] < 100);
    }

    #[test]
    fn test_image_source_is_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        RgbaImage::from_pixel(20, 10, Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let source = FrameSource::from_file(&path).unwrap();
        assert_eq!(source.native_size(), Some((20, 10)));
        let frame = source.render(10, 5);
        assert_eq!((frame.width, frame.height), (10, 5));
        assert_eq!(&frame.data[..4], &[1, 2, 3, 255]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(FrameSource::from_file(Path::new("/nonexistent/card.png")).is_err());
    }
}

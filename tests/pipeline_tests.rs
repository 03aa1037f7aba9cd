// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the photo pipeline

use cardcam::backends::camera::{CameraFrame, FrameBuffer};
use cardcam::pipelines::photo::{PhotoPipeline, PhotoVariant, PostProcessingConfig};
use cardcam::{CaptureConfig, FacingMode};
use image::{Rgba, RgbaImage};

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width) as u8, (y * 255 / height) as u8, 128, 255])
    })
}

#[test]
fn test_mobile_plan_by_resolution() {
    let config = CaptureConfig::default();

    let full_hd = PostProcessingConfig::plan(PhotoVariant::Mobile, 1920, 1080, &config);
    assert!(full_hd.sharpen);
    assert_eq!(full_hd.contrast, Some(1.15));
    assert!(full_hd.tone.is_some());

    let hd = PostProcessingConfig::plan(PhotoVariant::Mobile, 1280, 720, &config);
    assert!(!hd.sharpen);
    assert_eq!(hd.contrast, Some(1.15));
}

#[test]
fn test_desktop_plan_is_mild() {
    let config = CaptureConfig::default();

    let small = PostProcessingConfig::plan(PhotoVariant::Desktop, 640, 480, &config);
    assert!(small.is_noop());

    let hd = PostProcessingConfig::plan(PhotoVariant::Desktop, 1280, 720, &config);
    assert!(hd.tone.is_some());
    assert!(!hd.sharpen);
    assert!(hd.contrast.is_none());
}

#[tokio::test]
async fn test_encoded_photo_decodes_at_output_size() {
    let pipeline = PhotoPipeline::new(PhotoVariant::Mobile, CaptureConfig::default());
    let photo = pipeline
        .process(gradient(96, 64), (96, 64), FacingMode::Environment)
        .await
        .unwrap();

    let decoded = image::load_from_memory(&photo.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (96, 64));
    assert_eq!(photo.profile.as_deref(), Some("standard"));
    assert_eq!(photo.quality, 0.95);
    assert_eq!(photo.passes, 1);
}

#[tokio::test]
async fn test_frame_buffer_to_photo() {
    let source = gradient(400, 300);
    let frame = CameraFrame::from_rgba(400, 300, source.into_raw());

    let mut buffer = FrameBuffer::new();
    buffer.draw_frame(&frame).unwrap();
    assert_eq!((buffer.width(), buffer.height()), (400, 300));
    assert!(buffer.fit_within(200, true));
    assert!(!buffer.fit_within(200, true));
    assert_eq!((buffer.width(), buffer.height()), (200, 150));

    let pipeline = PhotoPipeline::new(PhotoVariant::Desktop, CaptureConfig::default());
    let photo = pipeline
        .process(buffer.to_image().unwrap(), (400, 300), FacingMode::User)
        .await
        .unwrap();
    assert_eq!(photo.output_resolution, (200, 150));
    assert_eq!(photo.source_resolution, (400, 300));
}

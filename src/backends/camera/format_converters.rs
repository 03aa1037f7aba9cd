// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format conversion to RGBA
//!
//! Backends deliver whatever the device produces; the frame buffer only
//! stores tightly packed RGBA8. These helpers bridge the two.

use super::types::{CameraFrame, PixelFormat};

/// Byte order of the chroma/luma samples in a packed 4:2:2 group
#[derive(Clone, Copy)]
enum Packed422 {
    /// Y0 U Y1 V
    Yuyv,
    /// U Y0 V Y1
    Uyvy,
}

/// BT.601 YUV to RGB for one pixel
fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [u8; 3] {
    [
        (y + 1.402 * v).clamp(0.0, 255.0) as u8,
        (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8,
        (y + 1.772 * u).clamp(0.0, 255.0) as u8,
    ]
}

fn packed_422_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    order: Packed422,
) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let stride = (stride as usize).max(w * 2);
    let mut rgba = Vec::with_capacity(w * h * 4);

    for row in data.chunks(stride).take(h) {
        let mut written = 0;
        // Each 4-byte group encodes 2 pixels
        for chunk in row.chunks_exact(4) {
            let (y0, u, y1, v) = match order {
                Packed422::Yuyv => (chunk[0], chunk[1], chunk[2], chunk[3]),
                Packed422::Uyvy => (chunk[1], chunk[0], chunk[3], chunk[2]),
            };
            let u = u as f32 - 128.0;
            let v = v as f32 - 128.0;
            for y in [y0, y1] {
                if written == w {
                    break;
                }
                let [r, g, b] = yuv_to_rgb(y as f32, u, v);
                rgba.extend_from_slice(&[r, g, b, 255]);
                written += 1;
            }
            if written == w {
                break;
            }
        }
    }

    rgba
}

/// Convert YUYV (YUV 4:2:2) to RGBA
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    packed_422_to_rgba(data, width, height, stride, Packed422::Yuyv)
}

/// Convert UYVY (YUV 4:2:2) to RGBA
pub fn uyvy_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    packed_422_to_rgba(data, width, height, stride, Packed422::Uyvy)
}

/// Convert rows of `bpp`-byte pixels to RGBA using `map`
fn map_rows<F>(data: &[u8], width: u32, height: u32, stride: u32, bpp: usize, map: F) -> Vec<u8>
where
    F: Fn(&[u8]) -> [u8; 4],
{
    let w = width as usize;
    let stride = (stride as usize).max(w * bpp);
    let mut rgba = Vec::with_capacity(w * height as usize * 4);
    for row in data.chunks(stride).take(height as usize) {
        for px in row.chunks_exact(bpp).take(w) {
            rgba.extend_from_slice(&map(px));
        }
    }
    rgba
}

/// Convert RGB24 to RGBA (opaque alpha)
pub fn rgb_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    map_rows(data, width, height, stride, 3, |p| [p[0], p[1], p[2], 255])
}

/// Convert BGRA to RGBA
pub fn bgra_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    map_rows(data, width, height, stride, 4, |p| [p[2], p[1], p[0], p[3]])
}

/// Expand 8-bit grayscale to RGBA
pub fn gray_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    map_rows(data, width, height, stride, 1, |p| [p[0], p[0], p[0], 255])
}

/// Convert any supported camera frame into tightly packed RGBA8
pub fn frame_to_rgba(frame: &CameraFrame) -> Result<Vec<u8>, String> {
    let (w, h, stride) = (frame.width, frame.height, frame.stride);
    let rgba = match frame.format {
        PixelFormat::RGBA => map_rows(&frame.data, w, h, stride, 4, |p| [p[0], p[1], p[2], p[3]]),
        PixelFormat::BGRA => bgra_to_rgba(&frame.data, w, h, stride),
        PixelFormat::RGB24 => rgb_to_rgba(&frame.data, w, h, stride),
        PixelFormat::YUYV => yuyv_to_rgba(&frame.data, w, h, stride),
        PixelFormat::UYVY => uyvy_to_rgba(&frame.data, w, h, stride),
        PixelFormat::Gray8 => gray_to_rgba(&frame.data, w, h, stride),
    };

    let expected = w as usize * h as usize * 4;
    if rgba.len() != expected {
        return Err(format!(
            "{:?} frame too small: expected {} RGBA bytes, got {}",
            frame.format,
            expected,
            rgba.len()
        ));
    }
    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_yuyv_grey_maps_to_grey() {
        // Y=128, U=V=128 is mid grey for both pixels
        let data = [128u8, 128, 128, 128];
        let rgba = yuyv_to_rgba(&data, 2, 1, 4);
        assert_eq!(rgba, vec![128, 128, 128, 255, 128, 128, 128, 255]);
    }

    #[test]
    fn test_stride_padding_is_skipped() {
        // 1x2 RGB image with 2 bytes of padding per row
        let data = [10u8, 20, 30, 0, 0, 40, 50, 60, 0, 0];
        let rgba = rgb_to_rgba(&data, 1, 2, 5);
        assert_eq!(rgba, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let frame = CameraFrame {
            width: 4,
            height: 4,
            data: Arc::from(vec![0u8; 10].into_boxed_slice()),
            format: PixelFormat::RGBA,
            stride: 16,
            captured_at: Instant::now(),
        };
        assert!(frame_to_rgba(&frame).is_err());
    }
}

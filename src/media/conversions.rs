// SPDX-License-Identifier: GPL-3.0-only

//! CPU colour conversion for camera frames

use crate::backends::camera::types::{CameraFrame, PixelFormat};
use image::RgbImage;

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

/// RGB of a single pixel. Out-of-range coordinates are clamped to the edge;
/// truncated buffers read as black (no luma) or gray (no chroma).
pub fn sample_pixel_rgb(frame: &CameraFrame, x: u32, y: u32) -> (u8, u8, u8) {
    if frame.width == 0 || frame.height == 0 {
        return (0, 0, 0);
    }
    let x = x.min(frame.width - 1);
    let y = y.min(frame.height - 1);
    let data = frame.data_slice();

    let y_idx = (y as usize) * (frame.stride as usize) + x as usize;
    let Some(&luma) = data.get(y_idx) else {
        return (0, 0, 0);
    };

    match frame.format {
        PixelFormat::Gray8 => (luma, luma, luma),
        PixelFormat::NV12 => {
            let planes = frame.chroma_layout();
            // UV pairs at half resolution, interleaved
            let uv_idx = planes.uv_offset
                + (y / 2) as usize * planes.uv_stride as usize
                + (x & !1) as usize;
            match (data.get(uv_idx), data.get(uv_idx + 1)) {
                (Some(&u), Some(&v)) => yuv_to_rgb(luma, u, v),
                _ => (luma, luma, luma),
            }
        }
        PixelFormat::I420 => {
            let planes = frame.chroma_layout();
            let cx = (x / 2) as usize;
            let cy = (y / 2) as usize;
            let u_idx = planes.uv_offset + cy * planes.uv_stride as usize + cx;
            let v_idx = planes.v_offset + cy * planes.v_stride as usize + cx;
            match (data.get(u_idx), data.get(v_idx)) {
                (Some(&u), Some(&v)) => yuv_to_rgb(luma, u, v),
                _ => (luma, luma, luma),
            }
        }
    }
}

/// Convert a whole frame to a packed RGB image
pub fn frame_to_rgb_image(frame: &CameraFrame) -> RgbImage {
    RgbImage::from_fn(frame.width, frame.height, |x, y| {
        let (r, g, b) = sample_pixel_rgb(frame, x, y);
        image::Rgb([r, g, b])
    })
}

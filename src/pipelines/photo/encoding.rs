// SPDX-License-Identifier: GPL-3.0-only

//! JPEG encoding of captured frames

use crate::backends::camera::types::CameraFrame;
use crate::errors::CaptureError;
use crate::media::frame_to_rgb_image;
use image::RgbImage;
use std::path::Path;
use tracing::{debug, info, warn};

/// Encode an RGB image as JPEG at `quality` (1-100)
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(buffer)
}

/// Convert, encode and write `frame` to `path`.
///
/// On a write failure the partial file is removed, so a reported failure
/// never leaves a truncated JPEG behind.
pub fn write_jpeg(frame: &CameraFrame, path: &Path, quality: u8) -> Result<(), CaptureError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(CaptureError::EncodingFailed(format!(
            "empty frame {}x{}",
            frame.width, frame.height
        )));
    }

    let image = frame_to_rgb_image(frame);
    let data = encode_jpeg(&image, quality)?;
    debug!(size = data.len(), quality, "JPEG encoded");

    if let Err(e) = std::fs::write(path, &data) {
        if path.exists()
            && let Err(remove_err) = std::fs::remove_file(path)
        {
            warn!(path = %path.display(), error = %remove_err, "Failed to remove partial photo");
        }
        return Err(e.into());
    }

    info!(path = %path.display(), width = frame.width, height = frame.height, "Photo saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("snapcam-encoding-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn gray_frame(width: u32, height: u32, luma: u8) -> CameraFrame {
        let mut data = vec![luma; (width * height) as usize];
        data.extend(std::iter::repeat_n(128u8, (width * height / 2) as usize));
        CameraFrame::nv12(width, height, data, 1)
    }

    #[test]
    fn test_jpeg_is_decodable() {
        let dir = temp_dir("decode");
        let path = dir.join("photo.jpg");

        write_jpeg(&gray_frame(16, 8, 90), &path, 90).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unwritable_path_fails_without_leftovers() {
        let dir = temp_dir("missing");
        let path = dir.join("no-such-dir").join("photo.jpg");

        let result = write_jpeg(&gray_frame(4, 4, 10), &path, 85);
        assert!(matches!(result, Err(CaptureError::SaveFailed(_))));
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_frame_rejected() {
        let dir = temp_dir("empty");
        let frame = CameraFrame::nv12(0, 0, Vec::new(), 1);
        let result = write_jpeg(&frame, &dir.join("x.jpg"), 85);
        assert!(matches!(result, Err(CaptureError::EncodingFailed(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

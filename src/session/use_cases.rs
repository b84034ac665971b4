// SPDX-License-Identifier: GPL-3.0-only

//! Use-case configuration bound into a capture session

use crate::backends::camera::types::{CameraDevice, LensFacing};
use crate::constants::{capture, pipeline};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Target aspect ratio of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    Ratio4x3,
    #[default]
    Ratio16x9,
}

impl AspectRatio {
    /// Width for a given height, rounded down to an even number (4:2:0 chroma)
    pub fn width_for_height(&self, height: u32) -> u32 {
        let width = match self {
            AspectRatio::Ratio4x3 => height * 4 / 3,
            AspectRatio::Ratio16x9 => height * 16 / 9,
        };
        width & !1
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AspectRatio::Ratio4x3 => write!(f, "4:3"),
            AspectRatio::Ratio16x9 => write!(f, "16:9"),
        }
    }
}

/// Still capture trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    #[default]
    MinimizeLatency,
    MaximizeQuality,
}

impl CaptureMode {
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            CaptureMode::MinimizeLatency => capture::JPEG_QUALITY_LATENCY,
            CaptureMode::MaximizeQuality => capture::JPEG_QUALITY_MAX,
        }
    }
}

/// Whether the torch LED fires during a still capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlashMode {
    Off,
    On,
    /// Fire when the last luminance reading says the scene is dark
    #[default]
    Auto,
}

impl FlashMode {
    pub fn should_fire(&self, last_luma: Option<f64>, dark_threshold: f64) -> bool {
        match self {
            FlashMode::Off => false,
            FlashMode::On => true,
            FlashMode::Auto => last_luma.is_some_and(|luma| luma < dark_threshold),
        }
    }
}

/// Preview stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preview {
    pub target_aspect_ratio: AspectRatio,
}

/// Still capture endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageCaptureConfig {
    pub capture_mode: CaptureMode,
    pub flash_mode: FlashMode,
}

/// Video capture endpoint. Bound with the session so its aspect ratio takes
/// part in stream selection; recording itself is not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoCaptureConfig {
    pub target_aspect_ratio: AspectRatio,
}

/// Resolution requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
}

impl StreamConfig {
    /// One stream serves every use case; the preview's aspect ratio wins
    pub fn resolve(preview: &Preview, video: Option<&VideoCaptureConfig>) -> Self {
        if let Some(video) = video
            && video.target_aspect_ratio != preview.target_aspect_ratio
        {
            warn!(
                preview = %preview.target_aspect_ratio,
                video = %video.target_aspect_ratio,
                "Video aspect ratio differs from preview, using preview"
            );
        }
        let height = pipeline::STREAM_HEIGHT;
        Self {
            width: preview.target_aspect_ratio.width_for_height(height),
            height,
        }
    }
}

impl std::fmt::Display for StreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Picks the camera to bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraSelector {
    pub lens_facing: LensFacing,
}

impl CameraSelector {
    pub const DEFAULT_BACK_CAMERA: CameraSelector = CameraSelector {
        lens_facing: LensFacing::Back,
    };

    /// A camera facing the requested way, else the first camera that does not
    /// report where it faces, else the first camera.
    pub fn select<'a>(&self, cameras: &'a [CameraDevice]) -> Option<&'a CameraDevice> {
        if let Some(exact) = cameras.iter().find(|c| c.facing == Some(self.lens_facing)) {
            return Some(exact);
        }
        let fallback = cameras
            .iter()
            .find(|c| c.facing.is_none())
            .or_else(|| cameras.first())?;
        warn!(
            wanted = ?self.lens_facing,
            using = %fallback.name,
            "No camera with the requested lens facing"
        );
        Some(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, facing: Option<LensFacing>) -> CameraDevice {
        CameraDevice {
            name: name.to_string(),
            path: format!("/dev/{}", name),
            driver: String::new(),
            facing,
        }
    }

    #[test]
    fn test_aspect_ratio_widths() {
        assert_eq!(AspectRatio::Ratio16x9.width_for_height(720), 1280);
        assert_eq!(AspectRatio::Ratio4x3.width_for_height(720), 960);
        assert_eq!(AspectRatio::Ratio16x9.width_for_height(9), 16);
        // Odd widths are rounded down
        assert_eq!(AspectRatio::Ratio4x3.width_for_height(3), 4);
        assert_eq!(AspectRatio::Ratio16x9.width_for_height(10), 16);
    }

    #[test]
    fn test_stream_follows_preview() {
        let preview = Preview {
            target_aspect_ratio: AspectRatio::Ratio4x3,
        };
        let video = VideoCaptureConfig {
            target_aspect_ratio: AspectRatio::Ratio16x9,
        };
        let stream = StreamConfig::resolve(&preview, Some(&video));
        assert_eq!((stream.width, stream.height), (960, 720));
        assert_eq!(stream.to_string(), "960x720");
    }

    #[test]
    fn test_selector_prefers_matching_facing() {
        let cameras = vec![
            device("video0", Some(LensFacing::Front)),
            device("video2", Some(LensFacing::Back)),
        ];
        let chosen = CameraSelector::DEFAULT_BACK_CAMERA.select(&cameras).unwrap();
        assert_eq!(chosen.name, "video2");
    }

    #[test]
    fn test_selector_falls_back() {
        let cameras = vec![
            device("video0", Some(LensFacing::External)),
            device("video1", None),
        ];
        let chosen = CameraSelector::DEFAULT_BACK_CAMERA.select(&cameras).unwrap();
        assert_eq!(chosen.name, "video1");

        let only_external = vec![device("video4", Some(LensFacing::External))];
        let chosen = CameraSelector::DEFAULT_BACK_CAMERA.select(&only_external).unwrap();
        assert_eq!(chosen.name, "video4");

        assert!(CameraSelector::DEFAULT_BACK_CAMERA.select(&[]).is_none());
    }

    #[test]
    fn test_flash_mode_decisions() {
        assert!(!FlashMode::Off.should_fire(Some(0.0), 50.0));
        assert!(FlashMode::On.should_fire(None, 50.0));
        assert!(FlashMode::Auto.should_fire(Some(12.0), 50.0));
        assert!(!FlashMode::Auto.should_fire(Some(120.0), 50.0));
        assert!(!FlashMode::Auto.should_fire(None, 50.0));
    }

    #[test]
    fn test_capture_mode_quality() {
        assert!(
            CaptureMode::MaximizeQuality.jpeg_quality() > CaptureMode::MinimizeLatency.jpeg_quality()
        );
    }
}

// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

#[cfg(feature = "gstreamer")]
use gstreamer::buffer::{MappedBuffer, Readable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Frame data storage - either pre-copied bytes or zero-copy GStreamer buffer
///
/// The `Mapped` variant keeps the GStreamer buffer mapped and alive until all
/// references are dropped, at which point it goes back to the pipeline's pool.
#[derive(Clone)]
pub enum FrameData {
    /// Pre-copied bytes (synthetic frames, tests)
    Copied(Arc<[u8]>),
    /// Zero-copy mapped GStreamer buffer
    #[cfg(feature = "gstreamer")]
    Mapped(Arc<MappedBuffer<Readable>>),
}

impl FrameData {
    /// Create FrameData from a mapped GStreamer buffer (zero-copy)
    #[cfg(feature = "gstreamer")]
    pub fn from_mapped_buffer(buffer: MappedBuffer<Readable>) -> Self {
        FrameData::Mapped(Arc::new(buffer))
    }

    /// Get the length of the frame data in bytes
    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    /// Check if the frame data is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for FrameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameData::Copied(data) => write!(f, "FrameData::Copied({} bytes)", data.len()),
            #[cfg(feature = "gstreamer")]
            FrameData::Mapped(buf) => write!(f, "FrameData::Mapped({} bytes)", buf.len()),
        }
    }
}

impl AsRef<[u8]> for FrameData {
    fn as_ref(&self) -> &[u8] {
        match self {
            FrameData::Copied(data) => data.as_ref(),
            #[cfg(feature = "gstreamer")]
            FrameData::Mapped(buf) => buf.as_slice(),
        }
    }
}

impl From<Vec<u8>> for FrameData {
    fn from(data: Vec<u8>) -> Self {
        FrameData::Copied(Arc::from(data))
    }
}

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// V4L2 when it lists a camera, the virtual camera otherwise
    #[default]
    Auto,
    /// V4L2 device through a GStreamer pipeline
    V4l2,
    /// Synthetic test pattern
    Virtual,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::Auto => write!(f, "auto"),
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Virtual => write!(f, "virtual"),
        }
    }
}

/// Which way a camera points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LensFacing {
    /// World-facing camera
    #[default]
    Back,
    /// User-facing camera
    Front,
    /// Detachable camera (USB webcams)
    External,
}

impl LensFacing {
    /// Parse the location strings used by libcamera and device tree
    pub fn from_location(location: &str) -> Option<Self> {
        match location.trim().to_ascii_lowercase().as_str() {
            "back" | "rear" => Some(LensFacing::Back),
            "front" => Some(LensFacing::Front),
            "external" => Some(LensFacing::External),
            _ => None,
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    pub path: String,                // Capture node, e.g. /dev/video0
    pub driver: String,              // V4L2 driver name
    pub facing: Option<LensFacing>,  // None when the device does not report it
}

/// Pixel format for camera frames
///
/// Only formats carrying a separate luminance plane are produced by the backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// NV12 - Semi-planar 4:2:0 (Y plane + interleaved UV plane)
    NV12,
    /// I420 - Planar 4:2:0 (separate Y, U, V planes)
    I420,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    /// Number of planes in a frame of this format
    pub fn plane_count(&self) -> usize {
        match self {
            PixelFormat::NV12 => 2,
            PixelFormat::I420 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Chroma plane layout for planar YUV frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YuvPlanes {
    /// Offset of the UV (NV12) or U (I420) plane
    pub uv_offset: usize,
    /// Row stride of the UV or U plane
    pub uv_stride: u32,
    /// Offset of the V plane (I420 only)
    pub v_offset: usize,
    /// Row stride of the V plane (I420 only)
    pub v_stride: u32,
}

/// A single frame delivered by a camera backend
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Frame data: Y plane followed by the chroma planes
    pub data: FrameData,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride of the Y plane (bytes per row, may include padding)
    pub stride: u32,
    /// Chroma plane layout (NV12/I420)
    pub yuv_planes: Option<YuvPlanes>,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
    /// Monotonic frame number assigned by the producing backend
    pub sequence: u64,
}

impl CameraFrame {
    /// Get the raw frame bytes
    pub fn data_slice(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Offset of the first chroma byte, i.e. the size of the luminance plane
    fn luma_len(&self) -> usize {
        let data_len = self.data.len();
        let end = match (self.format, &self.yuv_planes) {
            (PixelFormat::Gray8, _) => data_len,
            (_, Some(planes)) => planes.uv_offset,
            (_, None) => (self.stride as usize) * (self.height as usize),
        };
        end.min(data_len)
    }

    /// The luminance (Y) plane, including any row padding
    pub fn luma_plane(&self) -> &[u8] {
        &self.data_slice()[..self.luma_len()]
    }

    /// Chroma layout, falling back to the tightly packed layout
    pub fn chroma_layout(&self) -> YuvPlanes {
        if let Some(planes) = self.yuv_planes {
            return planes;
        }
        let y_size = (self.stride as usize) * (self.height as usize);
        match self.format {
            PixelFormat::NV12 => YuvPlanes {
                uv_offset: y_size,
                uv_stride: self.stride,
                v_offset: 0,
                v_stride: 0,
            },
            PixelFormat::I420 => {
                let half_stride = self.stride / 2;
                let u_size = (half_stride as usize) * (self.height as usize / 2);
                YuvPlanes {
                    uv_offset: y_size,
                    uv_stride: half_stride,
                    v_offset: y_size + u_size,
                    v_stride: half_stride,
                }
            }
            PixelFormat::Gray8 => YuvPlanes {
                uv_offset: y_size,
                uv_stride: 0,
                v_offset: 0,
                v_stride: 0,
            },
        }
    }

    /// Build a tightly packed NV12 frame from raw bytes
    pub fn nv12(width: u32, height: u32, data: Vec<u8>, sequence: u64) -> Self {
        Self {
            width,
            height,
            data: FrameData::from(data),
            format: PixelFormat::NV12,
            stride: width,
            yuv_planes: None,
            captured_at: Instant::now(),
            sequence,
        }
    }
}

/// Torch (flashlight LED) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TorchState {
    #[default]
    Off,
    On,
}

impl TorchState {
    pub fn is_on(&self) -> bool {
        matches!(self, TorchState::On)
    }
}

impl From<bool> for TorchState {
    fn from(on: bool) -> Self {
        if on { TorchState::On } else { TorchState::Off }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// A camera control (zoom) could not be applied
    ControlFailed(String),
    /// No controllable torch LED
    TorchUnavailable(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::ControlFailed(msg) => write!(f, "Control failed: {}", msg),
            BackendError::TorchUnavailable(msg) => write!(f, "Torch unavailable: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_plane_excludes_chroma() {
        // 4x2 NV12: 8 luma bytes then 4 interleaved chroma bytes
        let mut data = vec![10u8; 8];
        data.extend_from_slice(&[128, 128, 128, 128]);
        let frame = CameraFrame::nv12(4, 2, data, 0);

        assert_eq!(frame.luma_plane().len(), 8);
        assert!(frame.luma_plane().iter().all(|&v| v == 10));
    }

    #[test]
    fn test_luma_plane_uses_explicit_offset() {
        let mut frame = CameraFrame::nv12(2, 2, vec![1, 2, 0, 0, 3, 4, 0, 0, 9, 9], 0);
        frame.stride = 4;
        frame.yuv_planes = Some(YuvPlanes {
            uv_offset: 8,
            uv_stride: 4,
            v_offset: 0,
            v_stride: 0,
        });

        // Row padding belongs to the luminance plane buffer
        assert_eq!(frame.luma_plane(), &[1, 2, 0, 0, 3, 4, 0, 0]);
    }

    #[test]
    fn test_gray8_is_all_luma() {
        let mut frame = CameraFrame::nv12(2, 2, vec![1, 2, 3, 4], 0);
        frame.format = PixelFormat::Gray8;
        assert_eq!(frame.luma_plane(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_lens_facing_from_location() {
        assert_eq!(LensFacing::from_location("back"), Some(LensFacing::Back));
        assert_eq!(LensFacing::from_location(" Front\n"), Some(LensFacing::Front));
        assert_eq!(LensFacing::from_location("0"), None);
    }
}

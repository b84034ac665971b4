// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera application

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Runtime permission was not granted
    Permission(PermissionError),
    /// Camera backend errors (pipeline, controls, devices)
    Backend(BackendError),
    /// Still capture errors
    Capture(CaptureError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Permission gate errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// The user (or the system) refused the permission
    Denied { permission: String, reason: String },
}

/// Still capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Another capture is still in flight
    Busy,
    /// The session was bound without a still-capture use case
    NotConfigured,
    /// No frame arrived from the camera in time
    NoFrameAvailable,
    /// JPEG encoding failed
    EncodingFailed(String),
    /// Output file could not be written
    SaveFailed(String),
    /// The capture worker went away before reporting a result
    Aborted,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Permission(e) => write!(f, "Permission error: {}", e),
            AppError::Backend(e) => write!(f, "Camera error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionError::Denied { permission, reason } => {
                write!(f, "{} permission denied: {}", permission, reason)
            }
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Busy => write!(f, "A capture is already in progress"),
            CaptureError::NotConfigured => write!(f, "Still capture is not enabled"),
            CaptureError::NoFrameAvailable => write!(f, "No frame available for capture"),
            CaptureError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            CaptureError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
            CaptureError::Aborted => write!(f, "Capture aborted"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for PermissionError {}
impl std::error::Error for CaptureError {}

impl From<PermissionError> for AppError {
    fn from(err: PermissionError) -> Self {
        AppError::Permission(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Capture(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::SaveFailed(err.to_string())
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => CaptureError::SaveFailed(e.to_string()),
            other => CaptureError::EncodingFailed(other.to_string()),
        }
    }
}

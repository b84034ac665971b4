// SPDX-License-Identifier: GPL-3.0-only

//! Camera permission gate
//!
//! The screen may only bind a camera after the camera permission is granted.
//! The gate checks first, requests once if needed, and reports a denial as
//! [`PermissionError::Denied`], which ends the screen before any pipeline is
//! built.
//!
//! On Linux the permission is read/write access to the `/dev/video*` node.
//! There is no prompt to show: a request explains how to join the owning
//! group and checks again.

use crate::backends::camera::types::CameraDevice;
use crate::backends::camera::v4l2_utils;
use crate::errors::PermissionError;
use std::path::Path;
use tracing::{info, warn};

/// Permissions the screen depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Camera,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Camera => write!(f, "Camera"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied(String),
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Source of permission decisions
pub trait PermissionProvider {
    /// Current status, without asking anybody
    fn check(&self, permission: Permission, device: &CameraDevice) -> PermissionStatus;

    /// Ask for the permission and report the outcome
    fn request(&mut self, permission: Permission, device: &CameraDevice) -> PermissionStatus;
}

/// Device node access through `access(2)`
#[derive(Debug, Clone, Copy, Default)]
pub struct DevicePermissions;

impl PermissionProvider for DevicePermissions {
    fn check(&self, _permission: Permission, device: &CameraDevice) -> PermissionStatus {
        // Synthetic cameras have no device node
        if !device.path.starts_with("/dev/") {
            return PermissionStatus::Granted;
        }
        match v4l2_utils::can_access(Path::new(&device.path)) {
            Ok(()) => PermissionStatus::Granted,
            Err(e) => PermissionStatus::Denied(format!("{}: {}", device.path, e)),
        }
    }

    fn request(&mut self, permission: Permission, device: &CameraDevice) -> PermissionStatus {
        let group = crate::torch::owning_group(Path::new(&device.path))
            .unwrap_or_else(|| "video".to_string());
        let username = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
        warn!(
            %permission,
            path = %device.path,
            "No access to the camera. Run: sudo adduser {username} {group}, then log in again."
        );
        self.check(permission, device)
    }
}

/// Check-then-request-once gate in front of session binding
pub struct PermissionGate<P: PermissionProvider> {
    provider: P,
}

impl<P: PermissionProvider> PermissionGate<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Succeeds only when the camera permission is granted for `device`
    pub fn ensure(&mut self, device: &CameraDevice) -> Result<(), PermissionError> {
        let permission = Permission::Camera;
        if self.provider.check(permission, device).is_granted() {
            return Ok(());
        }

        info!(%permission, path = %device.path, "Permission not granted, requesting");
        match self.provider.request(permission, device) {
            PermissionStatus::Granted => {
                info!(%permission, "Permission granted");
                Ok(())
            }
            PermissionStatus::Denied(reason) => {
                warn!(%permission, reason = %reason, "Permission denied");
                Err(PermissionError::Denied {
                    permission: permission.to_string(),
                    reason,
                })
            }
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

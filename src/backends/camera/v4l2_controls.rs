// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera control interface
//!
//! Just enough of the control ioctls to drive optical/hardware zoom.

use std::fs::File;
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a0000;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

/// Absolute zoom position (driver-specific units)
pub const V4L2_CID_ZOOM_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 13;

const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;
const V4L2_CTRL_FLAG_INACTIVE: u32 = 0x0010;

// (dir << 30) | (size << 16) | ('V' << 8) | nr

/// Set control value (v4l2_control: 8 bytes)
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008561C;
/// Query control info (v4l2_queryctrl: 68 bytes)
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC0445624;

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

#[repr(C)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

/// Range information about a V4L2 control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlInfo {
    pub id: u32,
    pub name: String,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
    pub flags: u32,
}

impl ControlInfo {
    /// Check if control is disabled
    pub fn is_disabled(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_DISABLED != 0
    }

    /// Check if control is inactive (value cannot be changed)
    pub fn is_inactive(&self) -> bool {
        self.flags & V4L2_CTRL_FLAG_INACTIVE != 0
    }

    /// Map a linear position in [0, 1] onto the control range, honouring the step
    pub fn linear_to_value(&self, linear: f32) -> i32 {
        let linear = linear.clamp(0.0, 1.0) as f64;
        let span = (self.maximum as f64) - (self.minimum as f64);
        let raw = self.minimum as f64 + linear * span;
        let step = self.step.max(1) as f64;
        let snapped = self.minimum as f64 + ((raw - self.minimum as f64) / step).round() * step;
        (snapped as i32).clamp(self.minimum, self.maximum)
    }
}

fn extract_name(bytes: &[u8; 32]) -> String {
    let name_len = bytes.iter().position(|&c| c == 0).unwrap_or(32);
    String::from_utf8_lossy(&bytes[..name_len]).to_string()
}

/// Query if a control exists and get its information
pub fn query_control(device_path: &str, control_id: u32) -> Option<ControlInfo> {
    let file = File::open(device_path).ok()?;
    let fd = file.as_raw_fd();

    let mut qctrl = V4l2Queryctrl {
        id: control_id,
        ctrl_type: 0,
        name: [0; 32],
        minimum: 0,
        maximum: 0,
        step: 0,
        default_value: 0,
        flags: 0,
        reserved: [0; 2],
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCTRL as _, &mut qctrl as *mut V4l2Queryctrl) };

    if result < 0 {
        return None;
    }

    Some(ControlInfo {
        id: qctrl.id,
        name: extract_name(&qctrl.name),
        minimum: qctrl.minimum,
        maximum: qctrl.maximum,
        step: qctrl.step,
        default_value: qctrl.default_value,
        flags: qctrl.flags,
    })
}

/// Set value of a control
pub fn set_control(device_path: &str, control_id: u32, value: i32) -> Result<(), String> {
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(device_path)
        .map_err(|e| format!("Failed to open device: {}", e))?;
    let fd = file.as_raw_fd();

    let mut ctrl = V4l2Control {
        id: control_id,
        value,
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_S_CTRL as _, &mut ctrl as *mut V4l2Control) };

    if result < 0 {
        let errno = std::io::Error::last_os_error();
        warn!(
            device_path,
            control_id,
            value,
            ?errno,
            "Failed to set V4L2 control"
        );
        return Err(format!("Failed to set control: {}", errno));
    }

    if ctrl.value != value {
        debug!(
            device_path,
            control_id,
            requested = value,
            actual = ctrl.value,
            "V4L2 control value was clamped"
        );
    }

    Ok(())
}

/// Zoom control of the device, if it has a usable one
pub fn zoom_control(device_path: &str) -> Option<ControlInfo> {
    query_control(device_path, V4L2_CID_ZOOM_ABSOLUTE)
        .filter(|info| !info.is_disabled() && !info.is_inactive() && info.maximum > info.minimum)
}

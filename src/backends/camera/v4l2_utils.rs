// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 device discovery
//!
//! Lists `/dev/video*` capture nodes. Nodes that cannot be opened (usually a
//! permission problem) are still listed, so the permission gate can report
//! them instead of the camera silently disappearing.

use super::types::{CameraDevice, LensFacing};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use tracing::debug;

/// VIDIOC_QUERYCAP ioctl number
const VIDIOC_QUERYCAP: libc::c_ulong = 0x80685600;

const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;
const V4L2_CAP_DEVICE_CAPS: u32 = 0x8000_0000;

/// V4L2 capability structure for VIDIOC_QUERYCAP ioctl
#[repr(C)]
struct V4l2Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

fn query_v4l2_cap(fd: RawFd) -> Option<V4l2Capability> {
    let mut cap: V4l2Capability = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCAP as _, &mut cap as *mut V4l2Capability) };
    if result < 0 { None } else { Some(cap) }
}

fn c_string(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).trim().to_string()
}

/// Numeric suffix of a `videoN` node name, for natural ordering
fn node_index(name: &str) -> Option<u32> {
    name.strip_prefix("video")?.parse().ok()
}

/// Enumerate V4L2 video capture nodes, ordered by node number
pub fn enumerate_video_devices() -> Vec<CameraDevice> {
    let Ok(entries) = std::fs::read_dir("/dev") else {
        return Vec::new();
    };

    let mut nodes: Vec<(u32, String)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            node_index(&name).map(|index| (index, name))
        })
        .collect();
    nodes.sort();

    nodes
        .into_iter()
        .filter_map(|(_, name)| probe_node(&name))
        .collect()
}

fn probe_node(name: &str) -> Option<CameraDevice> {
    let path = format!("/dev/{}", name);
    let sysfs_name = std::fs::read_to_string(format!("/sys/class/video4linux/{}/name", name))
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let file = match std::fs::File::open(&path) {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path, error = %e, "Cannot open video node, listing unprobed");
            return Some(CameraDevice {
                name: if sysfs_name.is_empty() { name.to_string() } else { sysfs_name },
                path,
                driver: String::new(),
                facing: None,
            });
        }
    };

    let cap = query_v4l2_cap(file.as_raw_fd())?;
    let caps = if cap.capabilities & V4L2_CAP_DEVICE_CAPS != 0 {
        cap.device_caps
    } else {
        cap.capabilities
    };

    // Metadata and output nodes share the videoN namespace
    if caps & V4L2_CAP_VIDEO_CAPTURE == 0 {
        debug!(path = %path, caps, "Skipping non-capture video node");
        return None;
    }

    let driver = c_string(&cap.driver);
    let card = c_string(&cap.card);
    let facing = facing_for_driver(&driver);

    debug!(path = %path, card = %card, driver = %driver, "Found capture device");

    Some(CameraDevice {
        name: if card.is_empty() { sysfs_name } else { card },
        path,
        driver,
        facing,
    })
}

/// USB webcams are detachable; other drivers do not tell us where they point
fn facing_for_driver(driver: &str) -> Option<LensFacing> {
    match driver {
        "uvcvideo" => Some(LensFacing::External),
        _ => None,
    }
}

/// Whether the current user may open the node for capture (`access(2)`)
pub fn can_access(device_path: &Path) -> std::io::Result<()> {
    use std::os::unix::ffi::OsStrExt;

    let c_path = std::ffi::CString::new(device_path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let result = unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

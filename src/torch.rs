// SPDX-License-Identifier: GPL-3.0-only

//! Torch LED control via Linux sysfs
//!
//! Discovers LEDs exposed at `/sys/class/leds/*:flash` or `*:torch` and drives
//! them through the `brightness` file, which is group-writable on most phones
//! (usually by `feedbackd` or `video`). The root-only strobe interface is not
//! used.

use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default sysfs directory for LED class devices
pub const LEDS_DIR: &str = "/sys/class/leds";

/// A torch-capable LED discovered via sysfs
#[derive(Debug, Clone)]
pub struct TorchDevice {
    /// Sysfs path, e.g. `/sys/class/leds/white:flash`
    path: PathBuf,
    /// Maximum brightness value (from `max_brightness` file)
    max_brightness: u32,
    /// Directory basename
    name: String,
}

impl TorchDevice {
    /// Get the device name (e.g. "white:flash")
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set raw brightness value (0 = off, max_brightness = full)
    pub fn set_brightness(&self, value: u32) -> io::Result<()> {
        let clamped = value.min(self.max_brightness);
        std::fs::write(self.path.join("brightness"), clamped.to_string())
    }

    /// Current raw brightness
    pub fn brightness(&self) -> io::Result<u32> {
        let raw = std::fs::read_to_string(self.path.join("brightness"))?;
        raw.trim()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Turn the LED fully on or off
    pub fn set_on(&self, on: bool) -> io::Result<()> {
        self.set_brightness(if on { self.max_brightness } else { 0 })
    }
}

/// Result of torch hardware detection.
///
/// Separates "hardware exists" from "we can control it" so the UI can show a
/// helpful permission error instead of a bare failure.
#[derive(Debug, Clone, Default)]
pub struct TorchHardware {
    /// Devices we can actually control (writable)
    pub devices: Vec<TorchDevice>,
    /// User-facing error if hardware was found but not writable
    pub permission_error: Option<String>,
}

impl TorchHardware {
    /// Scan the system LED directory
    pub fn detect() -> TorchHardware {
        Self::detect_in(Path::new(LEDS_DIR))
    }

    /// Scan `leds_dir` for `*:flash` / `*:torch` entries.
    pub fn detect_in(leds_dir: &Path) -> TorchHardware {
        let Ok(entries) = std::fs::read_dir(leds_dir) else {
            warn!(path = %leds_dir.display(), "Cannot read LED directory, torch discovery skipped");
            return TorchHardware::default();
        };

        let mut devices = Vec::new();
        let mut permission_failures: Vec<PathBuf> = Vec::new();

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name_str) = name.to_str() else {
                continue;
            };

            if !(name_str.ends_with(":flash") || name_str.ends_with(":torch")) {
                continue;
            }

            let led_path = entry.path();
            let brightness_path = led_path.join("brightness");
            let max_brightness_path = led_path.join("max_brightness");

            let max_brightness = match std::fs::read_to_string(&max_brightness_path) {
                Ok(s) => match s.trim().parse::<u32>() {
                    Ok(v) if v > 0 => v,
                    _ => {
                        warn!(
                            path = %max_brightness_path.display(),
                            "Invalid max_brightness value"
                        );
                        continue;
                    }
                },
                Err(e) => {
                    warn!(
                        path = %max_brightness_path.display(),
                        error = %e,
                        "Cannot read max_brightness"
                    );
                    continue;
                }
            };

            match std::fs::OpenOptions::new()
                .write(true)
                .open(&brightness_path)
            {
                Ok(_) => {
                    info!(name = name_str, max_brightness, "Discovered torch LED");
                    devices.push(TorchDevice {
                        path: led_path,
                        max_brightness,
                        name: name_str.to_string(),
                    });
                }
                Err(_) => {
                    warn!(
                        path = %brightness_path.display(),
                        "Torch LED found but not writable"
                    );
                    permission_failures.push(brightness_path);
                }
            }
        }

        devices.sort_by(|a, b| a.name.cmp(&b.name));

        let permission_error = if !permission_failures.is_empty() && devices.is_empty() {
            Some(permission_hint(&permission_failures))
        } else {
            None
        };

        TorchHardware {
            devices,
            permission_error,
        }
    }

    /// Whether any controllable LED was found
    pub fn has_devices(&self) -> bool {
        !self.devices.is_empty()
    }

    /// Switch every LED on or off. Fails if none could be switched.
    pub fn set_on(&self, on: bool) -> io::Result<()> {
        let mut last_error = None;
        let mut switched = 0;
        for dev in &self.devices {
            match dev.set_on(on) {
                Ok(()) => switched += 1,
                Err(e) => {
                    warn!(device = %dev.name, error = %e, on, "Failed to switch torch LED");
                    last_error = Some(e);
                }
            }
        }
        match (switched, last_error) {
            (0, Some(e)) => Err(e),
            (0, None) => Err(io::Error::new(io::ErrorKind::NotFound, "no torch LED")),
            _ => Ok(()),
        }
    }

    /// Torch is on when the first LED reports a non-zero brightness
    pub fn is_on(&self) -> bool {
        self.devices
            .first()
            .and_then(|dev| dev.brightness().ok())
            .is_some_and(|value| value > 0)
    }
}

/// Name of the group owning `path`, looked up in `/etc/group`
pub(crate) fn owning_group(path: &Path) -> Option<String> {
    let gid = std::fs::metadata(path).ok()?.gid();
    let groups = std::fs::read_to_string("/etc/group").ok()?;
    groups.lines().find_map(|line| {
        let parts: Vec<&str> = line.split(':').collect();
        (parts.len() >= 3 && parts[2].parse::<u32>().ok() == Some(gid))
            .then(|| parts[0].to_string())
    })
}

/// Build a user-facing message naming the group that owns the LED files.
fn permission_hint(failures: &[PathBuf]) -> String {
    let username = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
    let group = failures
        .first()
        .and_then(|path| owning_group(path))
        .unwrap_or_else(|| "feedbackd".to_string());

    format!(
        "Torch LED detected but cannot be controlled. Run: sudo adduser {username} {group}, then log in again."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "snapcam-torch-{}-{}-{}",
            tag,
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fake_led(root: &Path, name: &str, max: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("max_brightness"), max).unwrap();
        std::fs::write(dir.join("brightness"), "0").unwrap();
    }

    #[test]
    fn test_detects_flash_and_torch_leds() {
        let root = scratch_dir("detect");
        fake_led(&root, "white:flash", "255\n");
        fake_led(&root, "yellow:torch", "15");
        fake_led(&root, "input0::capslock", "1");
        fake_led(&root, "broken:flash", "0");

        let hw = TorchHardware::detect_in(&root);
        let names: Vec<&str> = hw.devices.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["white:flash", "yellow:torch"]);
        assert!(hw.permission_error.is_none());

        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_switching_writes_brightness() {
        let root = scratch_dir("switch");
        fake_led(&root, "white:flash", "200");

        let hw = TorchHardware::detect_in(&root);
        assert!(!hw.is_on());

        hw.set_on(true).unwrap();
        assert!(hw.is_on());
        let raw = std::fs::read_to_string(root.join("white:flash/brightness")).unwrap();
        assert_eq!(raw, "200");

        hw.set_on(false).unwrap();
        assert!(!hw.is_on());

        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_no_devices_is_an_error() {
        let hw = TorchHardware::detect_in(Path::new("/nonexistent/leds"));
        assert!(!hw.has_devices());
        assert!(hw.set_on(true).is_err());
        assert!(!hw.is_on());
    }
}

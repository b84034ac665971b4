// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application name, used for the media directory and config directory
pub const APP_NAME: &str = "snapcam";

/// Tracing target for luminance diagnostics
pub const LUMINOSITY_TARGET: &str = "luminosity";

/// Log filter used when `RUST_LOG` is unset; luminance readings stay visible
pub const DEFAULT_LOG_FILTER: &str = "warn,luminosity=debug";

/// Capture file name pattern (yyyy-MM-dd-HH-mm-ss-SSS)
pub const FILENAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

/// Capture file extension, including the dot
pub const PHOTO_EXTENSION: &str = ".jpg";

/// Frame analysis settings
pub mod analysis {
    use super::Duration;

    /// Minimum wall-clock spacing between two luminance computations
    pub const INTERVAL: Duration = Duration::from_millis(1000);

    /// Mean luminance below which `FlashMode::Auto` fires the torch
    pub const DARK_SCENE_LUMA: f64 = 50.0;
}

/// Zoom settings
pub mod zoom {
    /// Number of discrete steps between 0.0 and 1.0 (step = 0.1)
    pub const STEPS: u8 = 10;

    /// Crop ratio reached at linear zoom 1.0 when zooming digitally
    pub const MAX_DIGITAL_ZOOM: f32 = 4.0;
}

/// Still capture settings
pub mod capture {
    use super::Duration;

    /// How long to wait for a fresh frame after a capture request
    pub const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

    /// Torch warm-up before grabbing the frame when the flash fires
    pub const FLASH_WARMUP: Duration = Duration::from_millis(150);

    /// JPEG quality for latency-optimised captures
    pub const JPEG_QUALITY_LATENCY: u8 = 85;

    /// JPEG quality for quality-optimised captures
    pub const JPEG_QUALITY_MAX: u8 = 95;
}

/// GStreamer pipeline settings
pub mod pipeline {
    /// Maximum buffer queue size (keep small for low latency)
    pub const MAX_BUFFERS: u32 = 2;

    /// Output pixel format for appsink
    pub const OUTPUT_FORMAT: &str = "NV12";

    /// Stream height used for the preview stream; width follows the aspect ratio
    pub const STREAM_HEIGHT: u32 = 720;
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Pipeline playing state timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Terminal input poll interval (also the preview refresh cadence)
    pub const UI_TICK: Duration = Duration::from_millis(16);

    /// Lifetime of a long toast message
    pub const TOAST_LONG: Duration = Duration::from_millis(3500);
}

// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use snapcam::constants::{
    DEFAULT_LOG_FILTER, FILENAME_FORMAT, LUMINOSITY_TARGET, PHOTO_EXTENSION, analysis, capture, zoom,
};
use std::time::Duration;

#[test]
fn test_analysis_interval_is_one_second() {
    assert_eq!(analysis::INTERVAL, Duration::from_millis(1000));
}

#[test]
fn test_zoom_step_is_one_tenth() {
    assert_eq!(zoom::STEPS, 10);
    assert!(zoom::MAX_DIGITAL_ZOOM > 1.0);
}

#[test]
fn test_capture_qualities_are_valid() {
    for quality in [capture::JPEG_QUALITY_LATENCY, capture::JPEG_QUALITY_MAX] {
        assert!((1..=100).contains(&quality), "JPEG quality out of range");
    }
    assert!(capture::FLASH_WARMUP < capture::FRAME_TIMEOUT);
}

#[test]
fn test_file_name_pattern() {
    // yyyy-MM-dd-HH-mm-ss-SSS, one dash between every field
    assert_eq!(FILENAME_FORMAT.matches('-').count(), 6);
    assert_eq!(PHOTO_EXTENSION, ".jpg");
}

#[test]
fn test_default_log_filter_enables_luminosity_debug() {
    let filter = tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).unwrap();
    assert_eq!(filter.max_level_hint(), Some(tracing::level_filters::LevelFilter::DEBUG));
    assert!(DEFAULT_LOG_FILTER.contains(&format!("{}=debug", LUMINOSITY_TARGET)));
}

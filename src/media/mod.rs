// SPDX-License-Identifier: GPL-3.0-only

//! Media processing utilities
//!
//! Camera frames arrive as YUV 4:2:0 (NV12, or I420 from some sources) or
//! plain grayscale. The [`conversions`] module turns them into RGB for the
//! terminal preview and for photo encoding.

pub mod conversions;

pub use conversions::{frame_to_rgb_image, sample_pixel_rgb, yuv_to_rgb};

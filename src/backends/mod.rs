// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            Session / Screen Layer            │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │  Camera (V4L2)   │  │ Virtual Camera  │  │
//! │  │   (GStreamer)    │  │ (test pattern)  │  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: backend traits, shared frame types, V4L2 helpers
//! - [`virtual_camera`]: synthetic camera used without hardware and in tests

pub mod camera;
pub mod virtual_camera;

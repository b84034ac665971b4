// SPDX-License-Identifier: GPL-3.0-only

//! Still photo capture
//!
//! ```text
//! take_picture ──▶ executor: [flash] → wait for fresh frame → NV12→RGB → JPEG → file
//!       │                                                                  │
//!       └──────────────────────── CaptureFuture ◀──────────────────────────┘
//! ```
//!
//! One capture may be in flight at a time; a second request resolves
//! immediately with [`CaptureError::Busy`](crate::errors::CaptureError::Busy).

pub mod capture;
pub mod encoding;

pub use capture::{CaptureFuture, OutputFileOptions, StillCapture};
pub use encoding::{encode_jpeg, write_jpeg};

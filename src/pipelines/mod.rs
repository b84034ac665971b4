// SPDX-License-Identifier: GPL-3.0-only

//! Capture pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  Photo Pipeline   │ ──▶ │  JPEG File   │
//! │   (NV12)     │     │  - NV12→RGB       │     │              │
//! │              │     │  - Encoding       │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! Capture work runs on the session's camera executor, so the preview keeps
//! streaming while a photo is encoded.

pub mod photo;

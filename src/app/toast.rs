// SPDX-License-Identifier: GPL-3.0-only

//! Transient status messages

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    expires_at: Instant,
}

/// The toast currently on screen. A new toast replaces the old one.
#[derive(Debug, Clone, Default)]
pub struct Toasts {
    current: Option<Toast>,
}

impl Toasts {
    pub fn show(&mut self, message: impl Into<String>, duration: Duration, now: Instant) {
        self.current = Some(Toast {
            message: message.into(),
            expires_at: now + duration,
        });
    }

    /// Message still visible at `now`; expired toasts are cleared
    pub fn current(&mut self, now: Instant) -> Option<&str> {
        if self.current.as_ref().is_some_and(|t| now >= t.expires_at) {
            self.current = None;
        }
        self.current.as_ref().map(|t| t.message.as_str())
    }
}

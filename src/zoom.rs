// SPDX-License-Identifier: GPL-3.0-only

//! Volume-key zoom
//!
//! Zoom is a linear position in [0.0, 1.0] moved in steps of 0.1. An increase
//! is applied only while the level is at most 0.9 and a decrease only while it
//! is at least 0.1; the check happens before the step. Every key event pushes
//! the (possibly unchanged) level to the camera.
//!
//! The level is kept as a count of tenths so ten steps land exactly on the
//! ends of the range instead of drifting around them.

use crate::backends::camera::{BackendResult, CameraControl};
use crate::constants::zoom::STEPS;
use tracing::debug;

/// Direction of a zoom key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomKey {
    In,
    Out,
}

/// Bounded zoom position, in tenths
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ZoomLevel(u8);

impl ZoomLevel {
    pub const MIN: ZoomLevel = ZoomLevel(0);
    pub const MAX: ZoomLevel = ZoomLevel(STEPS);

    /// Nearest level to a linear value, clamped to [0, 1]
    pub fn from_linear(linear: f32) -> Self {
        let tenths = (linear.clamp(0.0, 1.0) * STEPS as f32).round() as u8;
        ZoomLevel(tenths.min(STEPS))
    }

    pub fn tenths(&self) -> u8 {
        self.0
    }

    pub fn as_linear(&self) -> f32 {
        self.0 as f32 / STEPS as f32
    }

    /// One step up, only from 0.9 or below
    pub fn increased(self) -> Self {
        if self.0 < STEPS {
            ZoomLevel(self.0 + 1)
        } else {
            self
        }
    }

    /// One step down, only from 0.1 or above
    pub fn decreased(self) -> Self {
        if self.0 >= 1 {
            ZoomLevel(self.0 - 1)
        } else {
            self
        }
    }

    pub fn apply(self, key: ZoomKey) -> Self {
        match key {
            ZoomKey::In => self.increased(),
            ZoomKey::Out => self.decreased(),
        }
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.as_linear())
    }
}

/// Tracks the zoom level of a session and forwards it to the camera
#[derive(Debug, Default)]
pub struct ZoomController {
    level: ZoomLevel,
}

impl ZoomController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> ZoomLevel {
        self.level
    }

    /// Apply one key event and push the resulting level to `control`.
    ///
    /// The local level follows the step even if the camera rejects it.
    pub fn handle(&mut self, key: ZoomKey, control: &dyn CameraControl) -> BackendResult<ZoomLevel> {
        let before = self.level;
        self.level = before.apply(key);
        debug!(key = ?key, from = %before, to = %self.level, "Zoom key");
        control.set_linear_zoom(self.level.as_linear())?;
        Ok(self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every value pushed to the camera
    #[derive(Default)]
    struct RecordingControl {
        pushed: RefCell<Vec<f32>>,
    }

    impl CameraControl for RecordingControl {
        fn set_linear_zoom(&self, linear_zoom: f32) -> BackendResult<()> {
            self.pushed.borrow_mut().push(linear_zoom);
            Ok(())
        }

        fn enable_torch(&self, _on: bool) -> BackendResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_ten_increases_reach_max() {
        let control = RecordingControl::default();
        let mut zoom = ZoomController::new();
        for _ in 0..10 {
            zoom.handle(ZoomKey::In, &control).unwrap();
        }
        assert_eq!(zoom.level(), ZoomLevel::MAX);
        assert_eq!(zoom.level().as_linear(), 1.0);

        // An eleventh press is still pushed, unchanged
        zoom.handle(ZoomKey::In, &control).unwrap();
        assert_eq!(zoom.level(), ZoomLevel::MAX);
        let pushed = control.pushed.borrow();
        assert_eq!(pushed.len(), 11);
        assert_eq!(pushed[9], 1.0);
        assert_eq!(pushed[10], 1.0);
    }

    #[test]
    fn test_ten_decreases_reach_min() {
        let control = RecordingControl::default();
        let mut zoom = ZoomController {
            level: ZoomLevel::MAX,
        };
        for _ in 0..10 {
            zoom.handle(ZoomKey::Out, &control).unwrap();
        }
        assert_eq!(zoom.level(), ZoomLevel::MIN);
        assert_eq!(zoom.level().as_linear(), 0.0);

        zoom.handle(ZoomKey::Out, &control).unwrap();
        assert_eq!(zoom.level(), ZoomLevel::MIN);
        assert_eq!(control.pushed.borrow().last(), Some(&0.0));
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        // 0.9 may still step up, 0.1 may still step down
        assert_eq!(ZoomLevel::from_linear(0.9).increased(), ZoomLevel::MAX);
        assert_eq!(ZoomLevel::from_linear(0.1).decreased(), ZoomLevel::MIN);
        assert_eq!(ZoomLevel::MAX.increased(), ZoomLevel::MAX);
        assert_eq!(ZoomLevel::MIN.decreased(), ZoomLevel::MIN);
    }

    #[test]
    fn test_pushed_values_are_exact_tenths() {
        let control = RecordingControl::default();
        let mut zoom = ZoomController::new();
        for _ in 0..3 {
            zoom.handle(ZoomKey::In, &control).unwrap();
        }
        zoom.handle(ZoomKey::Out, &control).unwrap();
        let pushed: Vec<u8> = control
            .pushed
            .borrow()
            .iter()
            .map(|v| ZoomLevel::from_linear(*v).tenths())
            .collect();
        assert_eq!(pushed, vec![1, 2, 3, 2]);
        assert_eq!(zoom.level().to_string(), "0.2");
    }

    #[test]
    fn test_from_linear_clamps() {
        assert_eq!(ZoomLevel::from_linear(-3.0), ZoomLevel::MIN);
        assert_eq!(ZoomLevel::from_linear(7.5), ZoomLevel::MAX);
        assert_eq!(ZoomLevel::from_linear(0.44).tenths(), 4);
    }
}

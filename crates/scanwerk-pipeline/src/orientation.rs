// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device orientation tracking.

use std::sync::{Mutex, PoisonError};

use scanwerk_core::types::{OrientationState, Rotation};
use tracing::info;

/// Latest device rotation plus the sensor mounting offset.
///
/// Updated from orientation events on any thread; read at the start of every
/// tick to pick the edge-map rotation.
#[derive(Debug, Default)]
pub struct OrientationTracker {
    state: Mutex<OrientationState>,
}

impl OrientationTracker {
    pub fn new(state: OrientationState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> OrientationState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self, state: OrientationState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Record a device rotation; `true` when it differs from the last one.
    pub fn update_device_rotation(&self, rotation: Rotation) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.device_rotation == rotation {
            return false;
        }
        state.device_rotation = rotation;
        info!(
            device = rotation.degrees(),
            applied = state.applied_rotation().degrees(),
            "Device rotation changed"
        );
        true
    }

    /// Clockwise rotation bringing sensor content upright.
    pub fn applied_rotation(&self) -> Rotation {
        self.state().applied_rotation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_device_rotation() {
        let tracker = OrientationTracker::new(OrientationState::new(Rotation::Deg0, Rotation::Deg90));
        assert_eq!(tracker.applied_rotation(), Rotation::Deg90);
        assert!(tracker.update_device_rotation(Rotation::Deg90));
        assert!(!tracker.update_device_rotation(Rotation::Deg90));
        assert_eq!(tracker.applied_rotation(), Rotation::Deg0);
    }
}

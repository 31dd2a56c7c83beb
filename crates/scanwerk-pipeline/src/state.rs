// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline state: the busy flag and the retained frame/contour pair.

use std::sync::atomic::{AtomicBool, Ordering};

use scanwerk_core::types::{RawFrame, Rotation};
use scanwerk_document::Detection;

/// Non-reentrant Idle/Processing flag shared by preview ticks and captures.
#[derive(Debug, Default)]
pub struct BusyFlag {
    busy: AtomicBool,
}

impl BusyFlag {
    /// Enter Processing, or `None` if someone else already has.
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Returns the pipeline to Idle when dropped, on every exit path.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// What a capture needs: the latest preview snapshot (with the rotation in
/// force when it was taken) and the last good contour.
///
/// The frame is replaced every processed tick; the detection only when a tick
/// finds one. Both are cleared together by a successful capture.
#[derive(Debug, Default)]
pub struct RetainedState {
    frame: Option<(RawFrame, Rotation)>,
    detection: Option<Detection>,
}

/// A complete retained pair, taken out for a capture.
#[derive(Debug)]
pub struct RetainedCapture {
    pub frame: RawFrame,
    pub rotation: Rotation,
    pub detection: Detection,
}

impl RetainedState {
    /// Keep `frame`, handing back the snapshot it replaces.
    pub fn retain_frame(&mut self, frame: RawFrame, rotation: Rotation) -> Option<RawFrame> {
        self.frame.replace((frame, rotation)).map(|(old, _)| old)
    }

    pub fn retain_detection(&mut self, detection: Detection) {
        self.detection = Some(detection);
    }

    pub fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }

    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }

    /// Both halves present.
    pub fn is_ready(&self) -> bool {
        self.frame.is_some() && self.detection.is_some()
    }

    /// Take frame and detection together, or nothing if either is missing.
    pub fn take(&mut self) -> Option<RetainedCapture> {
        if !self.is_ready() {
            return None;
        }
        let (frame, rotation) = self.frame.take()?;
        let detection = self.detection.take()?;
        Some(RetainedCapture {
            frame,
            rotation,
            detection,
        })
    }

    /// Put a taken pair back after a failed capture.
    pub fn restore(&mut self, capture: RetainedCapture) {
        self.frame = Some((capture.frame, capture.rotation));
        self.detection = Some(capture.detection);
    }
}

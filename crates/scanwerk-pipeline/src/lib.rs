// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-pipeline: the live scanning loop.
//
// `PipelineController` owns the busy flag, the retained frame/contour pair and
// the frame pool, and runs preview ticks and captures against them.
// `ScannerSession` drives a controller from a `FrameSource` on a blocking
// worker and takes commands over a channel.

pub mod controller;
pub mod frames;
pub mod orientation;
pub mod session;
pub mod state;

pub use controller::{CaptureOutcome, PipelineController, TickOutcome};
pub use frames::FrameBufferManager;
pub use orientation::OrientationTracker;
pub use session::{ScannerSession, SessionCommand, SessionStats};

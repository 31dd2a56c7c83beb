// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk: collaborator seams between the scanner pipeline and the platform.
//
// The pipeline never talks to a camera API or a UI toolkit directly. It pulls
// preview frames from a `FrameSource` and pushes overlays and rectified
// captures into sinks. Embedding apps implement these traits for their
// platform; this crate ships a stub for builds without a camera, a replay
// source for files and tests, and channel-backed sinks.

pub mod replay;
pub mod sinks;
pub mod stub;
pub mod traits;

pub use replay::ReplayFrameSource;
pub use sinks::{ChannelOverlaySink, ChannelResultSink, overlay_channel, result_channel};
pub use stub::StubCamera;
pub use traits::{FrameSource, OverlaySink, ResultSink};

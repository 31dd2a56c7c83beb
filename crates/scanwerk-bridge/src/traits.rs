// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the camera and UI collaborators.

use image::RgbaImage;
use scanwerk_core::error::Result;
use scanwerk_core::types::{CameraInfo, PreviewConfig, RawFrame, Rotation};
use scanwerk_document::RectifiedImage;

/// A camera delivering preview frames and, optionally, full-resolution stills.
///
/// Calls come from a single worker thread, so implementations only need to
/// be `Send`.
pub trait FrameSource: Send {
    /// Human-readable source name for logs (e.g. "replay", "Desktop (stub)").
    fn name(&self) -> &str;

    /// Open the back-facing camera and report its capabilities.
    fn open(&mut self) -> Result<CameraInfo>;

    /// Start streaming preview frames with the negotiated configuration.
    fn start_preview(&mut self, config: &PreviewConfig) -> Result<()>;

    /// Stop streaming. Stopping a preview that is not running may fail; the
    /// session treats that as harmless.
    fn stop_preview(&mut self) -> Result<()>;

    /// Block until the next preview frame, written into `buffer` (a pooled
    /// buffer that may be reused or replaced). `Ok(None)` ends the stream.
    fn next_frame(&mut self, buffer: Vec<u8>) -> Result<Option<RawFrame>>;

    /// A full-resolution still for the pending capture, if the platform can
    /// take one. `Ok(None)` makes the capture fall back to the retained
    /// preview frame.
    fn capture_still(&mut self) -> Result<Option<RawFrame>>;

    /// Current display rotation of the device.
    fn device_rotation(&self) -> Rotation;
}

/// Receives the live overlay after every processed preview tick.
pub trait OverlaySink: Send + Sync {
    /// `None` clears the overlay (nothing detected this tick).
    fn present_overlay(&self, overlay: Option<&RgbaImage>);
}

/// Receives each finished capture.
pub trait ResultSink: Send + Sync {
    fn deliver(&self, result: &RectifiedImage);
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub camera for desktop/CI builds where no native camera session exists.
//
// Every call returns `PlatformUnavailable`, so a session started against it
// fails setup instead of waiting for frames that never come.

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{CameraInfo, PreviewConfig, RawFrame, Rotation};

use crate::traits::FrameSource;

/// Camera that is never there.
pub struct StubCamera;

impl FrameSource for StubCamera {
    fn name(&self) -> &str {
        "Desktop (stub)"
    }

    fn open(&mut self) -> Result<CameraInfo> {
        tracing::warn!("FrameSource::open called on stub camera");
        Err(ScanwerkError::PlatformUnavailable)
    }

    fn start_preview(&mut self, _config: &PreviewConfig) -> Result<()> {
        tracing::warn!("FrameSource::start_preview called on stub camera");
        Err(ScanwerkError::PlatformUnavailable)
    }

    fn stop_preview(&mut self) -> Result<()> {
        Err(ScanwerkError::PlatformUnavailable)
    }

    fn next_frame(&mut self, _buffer: Vec<u8>) -> Result<Option<RawFrame>> {
        Err(ScanwerkError::PlatformUnavailable)
    }

    fn capture_still(&mut self) -> Result<Option<RawFrame>> {
        tracing::warn!("FrameSource::capture_still called on stub camera");
        Err(ScanwerkError::PlatformUnavailable)
    }

    fn device_rotation(&self) -> Rotation {
        Rotation::Deg0
    }
}

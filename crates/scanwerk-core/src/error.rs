// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

use crate::types::PixelFormat;

/// Top-level error type for all Scanwerk operations.
#[derive(Debug, Error)]
pub enum ScanwerkError {
    // -- Frame errors --
    #[error(
        "frame buffer holds {actual} bytes, expected {expected} for {width}x{height} {format:?}"
    )]
    FrameSizeMismatch {
        width: u32,
        height: u32,
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },

    #[error("frame buffer allocation failed: {0}")]
    BufferAllocation(String),

    #[error("camera reported no supported {0} sizes")]
    NoSupportedSize(&'static str),

    #[error("unsupported rotation: {0} degrees")]
    InvalidRotation(i32),

    // -- Geometry errors --
    #[error("expected a 4-point contour, got {0} points")]
    NotAQuad(usize),

    #[error("degenerate quadrilateral: {0}")]
    DegenerateQuad(String),

    // -- Image errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Camera / platform bridge --
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Pipeline --
    #[error("scanner session has stopped")]
    SessionStopped,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScanwerkError {
    /// Whether this error prevents the pipeline from starting at all.
    ///
    /// Setup failures (camera missing, no usable sizes, buffer allocation)
    /// are surfaced to the collaborator; everything else is local to a
    /// single tick or capture.
    pub fn is_setup_fatal(&self) -> bool {
        matches!(
            self,
            Self::BufferAllocation(_)
                | Self::NoSupportedSize(_)
                | Self::CameraUnavailable(_)
                | Self::PlatformUnavailable
                | Self::InvalidConfig(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanwerkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_errors_are_fatal() {
        assert!(ScanwerkError::PlatformUnavailable.is_setup_fatal());
        assert!(ScanwerkError::NoSupportedSize("preview").is_setup_fatal());
        assert!(!ScanwerkError::NotAQuad(3).is_setup_fatal());
        assert!(!ScanwerkError::ImageError("boom".into()).is_setup_fatal());
    }

    #[test]
    fn frame_mismatch_message_names_dimensions() {
        let err = ScanwerkError::FrameSizeMismatch {
            width: 4,
            height: 2,
            format: PixelFormat::Gray8,
            expected: 8,
            actual: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("4x2"), "{msg}");
        assert!(msg.contains("expected 8"), "{msg}");
    }
}

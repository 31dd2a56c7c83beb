// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk scanner pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanwerkError};

/// Pixel dimensions of a frame, preview configuration, or output raster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height. Zero-height sizes report an infinite ratio.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Pixel count as a float, for area-ratio arithmetic.
    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    /// The same size with width and height exchanged.
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A right-angle rotation, applied clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Parse a rotation from degrees. Negative and >360 inputs are normalised;
    /// anything that is not a multiple of 90 is rejected.
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            _ => Err(ScanwerkError::InvalidRotation(degrees)),
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Quarter turns exchange width and height.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    /// Size of a `size`-sized raster after this rotation.
    pub fn rotate_size(&self, size: Size) -> Size {
        if self.swaps_axes() {
            size.transposed()
        } else {
            size
        }
    }
}

/// Device rotation plus the camera sensor's mounting offset.
///
/// The preview buffer always arrives in sensor orientation; the rotation that
/// brings it upright is derived from both angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrientationState {
    /// Current display rotation reported by the platform.
    pub device_rotation: Rotation,
    /// Clockwise angle the sensor image must be rotated to appear upright
    /// when the device is in its natural orientation.
    pub sensor_offset: Rotation,
}

impl OrientationState {
    pub fn new(device_rotation: Rotation, sensor_offset: Rotation) -> Self {
        Self {
            device_rotation,
            sensor_offset,
        }
    }

    /// `(sensorOffset - deviceRotation + 360) mod 360`.
    pub fn applied_rotation(&self) -> Rotation {
        let degrees = (self.sensor_offset.degrees() - self.device_rotation.degrees() + 360) % 360;
        // Both inputs are multiples of 90, so the difference is as well.
        Rotation::from_degrees(degrees).unwrap_or_default()
    }
}

/// Pixel layouts a camera collaborator may deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Single-plane 8-bit luma.
    Gray8,
    /// YUV 4:2:0 semi-planar: Y plane followed by interleaved V/U samples.
    Nv21,
    Rgb24,
    Bgr24,
    Rgba32,
    /// Little-endian premultiplied BGRA, as delivered by iOS capture outputs.
    Bgra32,
}

impl PixelFormat {
    pub fn bits_per_pixel(&self) -> u32 {
        match self {
            Self::Gray8 => 8,
            Self::Nv21 => 12,
            Self::Rgb24 | Self::Bgr24 => 24,
            Self::Rgba32 | Self::Bgra32 => 32,
        }
    }

    /// Buffer length for a frame of `size`: `w * h * bpp / 8`, rounded down.
    pub fn buffer_len(&self, size: Size) -> usize {
        (size.width as usize * size.height as usize * self.bits_per_pixel() as usize) / 8
    }
}

/// One camera frame as delivered by the platform, uninterpreted.
///
/// The byte buffer is private: once constructed a frame is read-only, which is
/// what lets the detector and the capture path share it without copying.
#[derive(Debug, Clone)]
pub struct RawFrame {
    data: Vec<u8>,
    size: Size,
    format: PixelFormat,
    captured_at: DateTime<Utc>,
    sequence: u64,
}

impl RawFrame {
    /// Wrap a buffer, checking that its length matches the declared geometry.
    pub fn new(data: Vec<u8>, size: Size, format: PixelFormat, sequence: u64) -> Result<Self> {
        Self::with_timestamp(data, size, format, sequence, Utc::now())
    }

    pub fn with_timestamp(
        data: Vec<u8>,
        size: Size,
        format: PixelFormat,
        sequence: u64,
        captured_at: DateTime<Utc>,
    ) -> Result<Self> {
        let expected = format.buffer_len(size);
        if data.len() != expected {
            return Err(ScanwerkError::FrameSizeMismatch {
                width: size.width,
                height: size.height,
                format,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            size,
            format,
            captured_at,
            sequence,
        })
    }

    /// Copy this frame into `buffer` (cleared and resized as needed),
    /// producing an independently owned snapshot.
    pub fn snapshot_into(&self, mut buffer: Vec<u8>) -> Self {
        buffer.clear();
        buffer.extend_from_slice(&self.data);
        Self {
            data: buffer,
            size: self.size,
            format: self.format,
            captured_at: self.captured_at,
            sequence: self.sequence,
        }
    }

    /// The same frame under a new sequence number.
    pub fn renumbered(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Give the underlying buffer back, e.g. to return it to a pool.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Inclusive band of accepted exterior angles, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleBand {
    pub min_degrees: f64,
    pub max_degrees: f64,
}

impl AngleBand {
    pub const fn new(min_degrees: f64, max_degrees: f64) -> Self {
        Self {
            min_degrees,
            max_degrees,
        }
    }

    /// 50° to 130°: tolerates strong perspective.
    pub const fn loose() -> Self {
        Self::new(50.0, 130.0)
    }

    /// 60° to 120°.
    pub const fn moderate() -> Self {
        Self::new(60.0, 120.0)
    }

    /// 75° to 105°: near-frontal documents only.
    pub const fn strict() -> Self {
        Self::new(75.0, 105.0)
    }

    pub fn contains(&self, degrees: f64) -> bool {
        degrees >= self.min_degrees && degrees <= self.max_degrees
    }
}

impl Default for AngleBand {
    fn default() -> Self {
        Self::loose()
    }
}

/// How the rectified capture is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputMode {
    /// Keep the colour crop as captured.
    #[default]
    Photo,
    /// Grayscale plus adaptive threshold, for text documents.
    Document,
}

/// What the camera collaborator reports when it is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Mounting offset of the back-facing sensor.
    pub sensor_offset: Rotation,
    /// Discrete preview sizes, in sensor orientation.
    pub preview_sizes: Vec<Size>,
    /// Discrete still-picture sizes, in sensor orientation.
    pub picture_sizes: Vec<Size>,
    /// Pixel format of preview frames.
    pub preview_format: PixelFormat,
}

/// Preview and picture sizes chosen for the current surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub preview_size: Size,
    pub picture_size: Size,
    pub format: PixelFormat,
    /// Rotation applied to preview content, for display and detection.
    pub rotation: Rotation,
}

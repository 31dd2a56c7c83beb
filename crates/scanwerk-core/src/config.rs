// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanwerkError};
use crate::types::{AngleBand, OutputMode};

/// Working-resolution pixel area detection is tuned for (853x512).
pub const DEFAULT_TARGET_PIXEL_AREA: f64 = 853.0 * 512.0;

/// All tunables of the scanner pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub detection: DetectionConfig,
    pub sizing: SizingConfig,
    pub output: OutputConfig,
}

/// Edge/contour detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Preview frames are downscaled so their area is close to this.
    pub target_pixel_area: f64,
    /// Gaussian sigma; 1.1 matches a 5x5 kernel.
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Radius of the square structuring element used to close edge gaps.
    pub close_radius: u8,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub approx_tolerance: f64,
    /// Exterior angles a rectangle candidate must stay within.
    pub angle_band: AngleBand,
    /// Draw every traced contour and every candidate into the overlay.
    pub debug_overlay: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            target_pixel_area: DEFAULT_TARGET_PIXEL_AREA,
            blur_sigma: 1.1,
            canny_low: 15.0,
            canny_high: 40.0,
            close_radius: 1,
            approx_tolerance: 0.05,
            angle_band: AngleBand::loose(),
            debug_overlay: false,
        }
    }
}

/// Preview/picture size negotiation and frame buffering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Allowed aspect-ratio deviation when picking the preview size.
    pub preview_aspect_tolerance: f64,
    /// Allowed aspect-ratio deviation when matching the picture size to the
    /// preview.
    pub picture_aspect_tolerance: f64,
    /// Number of reusable frame buffers kept by the pool.
    pub buffer_pool_size: usize,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            preview_aspect_tolerance: 0.1,
            picture_aspect_tolerance: 0.12,
            buffer_pool_size: 3,
        }
    }
}

/// Rectified output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: OutputMode,
    /// Half-width of the adaptive-threshold window (5 gives an 11x11 block).
    pub binarize_block_radius: u32,
    /// Constant subtracted from the local mean in document mode.
    pub binarize_offset: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Photo,
            binarize_block_radius: 5,
            binarize_offset: 2,
        }
    }
}

impl ScannerConfig {
    /// Reject values that would make the pipeline misbehave silently.
    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;
        if !(d.target_pixel_area > 0.0) {
            return Err(invalid("detection.target_pixel_area must be positive"));
        }
        if d.canny_low < 0.0 || d.canny_low >= d.canny_high {
            return Err(invalid("detection.canny_low must be >= 0 and below canny_high"));
        }
        if d.blur_sigma <= 0.0 {
            return Err(invalid("detection.blur_sigma must be positive"));
        }
        if !(d.approx_tolerance > 0.0 && d.approx_tolerance < 1.0) {
            return Err(invalid("detection.approx_tolerance must be in (0, 1)"));
        }
        if d.angle_band.min_degrees > d.angle_band.max_degrees
            || d.angle_band.min_degrees < 0.0
            || d.angle_band.max_degrees > 180.0
        {
            return Err(invalid("detection.angle_band must lie within 0..=180 and be non-empty"));
        }
        let s = &self.sizing;
        if s.preview_aspect_tolerance < 0.0 || s.picture_aspect_tolerance < 0.0 {
            return Err(invalid("sizing aspect tolerances must not be negative"));
        }
        if s.buffer_pool_size == 0 {
            return Err(invalid("sizing.buffer_pool_size must be at least 1"));
        }
        if self.output.binarize_block_radius == 0 {
            return Err(invalid("output.binarize_block_radius must be at least 1"));
        }
        Ok(())
    }

    /// Parse a JSON document, filling omitted fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn invalid(msg: &str) -> ScanwerkError {
    ScanwerkError::InvalidConfig(msg.to_string())
}

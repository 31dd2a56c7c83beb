// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Size negotiation: optimal preview/picture size search and the
// working-resolution downscale used by the detector.

use scanwerk_core::config::SizingConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{CameraInfo, OrientationState, PreviewConfig, Size};
use tracing::{debug, info, instrument};

/// Pick the supported size best matching `requested`.
///
/// Candidates whose aspect ratio is within `aspect_tolerance` of the request
/// are considered first, and among them the one with the smallest absolute
/// height difference wins (first encountered on ties). Only when no candidate
/// passes the aspect filter is the ratio ignored and the closest height taken.
/// Returns `None` for an empty list.
pub fn optimal_size(sizes: &[Size], requested: Size, aspect_tolerance: f64) -> Option<Size> {
    let target_ratio = requested.aspect_ratio();
    let target_height = requested.height;

    let aspect_matches = sizes
        .iter()
        .filter(|size| (size.aspect_ratio() - target_ratio).abs() <= aspect_tolerance);
    if let Some(size) = closest_height(aspect_matches, target_height) {
        return Some(size);
    }

    debug!(%requested, "no size within aspect tolerance; matching height only");
    closest_height(sizes.iter(), target_height)
}

/// First size with the minimum absolute height difference.
fn closest_height<'a>(candidates: impl Iterator<Item = &'a Size>, target_height: u32) -> Option<Size> {
    let mut best: Option<(Size, u32)> = None;
    for size in candidates {
        let diff = size.height.abs_diff(target_height);
        if best.is_none_or(|(_, best_diff)| diff < best_diff) {
            best = Some((*size, diff));
        }
    }
    best.map(|(size, _)| size)
}

/// Choose preview and picture sizes for a surface of `surface` pixels.
///
/// Camera sizes are expressed in sensor orientation, so the surface is
/// transposed first when the applied rotation is a quarter turn. The picture
/// size is then matched against the chosen preview size; cameras that report
/// no picture sizes reuse the preview size.
#[instrument(skip(info, sizing), fields(surface = %surface))]
pub fn choose_preview_config(
    info: &CameraInfo,
    surface: Size,
    orientation: OrientationState,
    sizing: &SizingConfig,
) -> Result<PreviewConfig> {
    let rotation = orientation.applied_rotation();
    let requested = rotation.rotate_size(surface);

    let preview_size = optimal_size(&info.preview_sizes, requested, sizing.preview_aspect_tolerance)
        .ok_or(ScanwerkError::NoSupportedSize("preview"))?;

    let picture_size = if info.picture_sizes.is_empty() {
        debug!("camera reports no picture sizes; reusing preview size");
        preview_size
    } else {
        optimal_size(
            &info.picture_sizes,
            preview_size,
            sizing.picture_aspect_tolerance,
        )
        .ok_or(ScanwerkError::NoSupportedSize("picture"))?
    };

    info!(
        preview = %preview_size,
        picture = %picture_size,
        rotation = rotation.degrees(),
        "Preview configuration chosen"
    );

    Ok(PreviewConfig {
        preview_size,
        picture_size,
        format: info.preview_format,
        rotation,
    })
}

/// Uniform downscale ratio bringing `preview` close to `target_area` pixels,
/// rounded to three decimals.
pub fn resize_ratio(preview: Size, target_area: f64) -> f64 {
    let ratio = (preview.area() / target_area).sqrt();
    let rounded = (ratio * 1000.0).round() / 1000.0;
    // Sub-pixel previews would round to zero.
    rounded.max(0.001)
}

/// Working resolution for detection: each preview dimension divided by the
/// resize ratio and truncated.
pub fn working_size(preview: Size, target_area: f64) -> Size {
    let ratio = resize_ratio(preview, target_area);
    Size::new(
        ((preview.width as f64 / ratio) as u32).max(1),
        ((preview.height as f64 / ratio) as u32).max(1),
    )
}

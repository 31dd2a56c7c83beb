// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `scan` command: replay an image through a scanner session and write
// what the capture produces.

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use scanwerk_bridge::{ReplayFrameSource, overlay_channel, result_channel};
use scanwerk_core::config::ScannerConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{OrientationState, OutputMode, PixelFormat, Size};
use scanwerk_document::ImageProcessor;
use scanwerk_pipeline::{CaptureOutcome, ScannerSession, SessionStats};
use tracing::{info, instrument, warn};

use super::config_store;
use crate::cli::ScanArgs;

/// What a scan run produced.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub stats: SessionStats,
    /// Written crop, if a document was found.
    pub output: Option<PathBuf>,
    pub size: Option<Size>,
    pub overlay: Option<PathBuf>,
}

#[instrument(skip_all, fields(input = %args.input.display()))]
pub async fn run(args: &ScanArgs) -> Result<ScanReport> {
    let config = effective_config(args)?;
    let format = PixelFormat::from(args.format);

    let mut source = ReplayFrameSource::from_image_files(&[&args.input], format)?
        .with_repeat(args.ticks as usize)
        .with_sensor_offset(args.sensor_offset)
        .with_device_rotation(args.device_rotation);
    if let Some(still) = &args.still {
        source = source.with_still(ImageProcessor::open(still)?.to_frame(PixelFormat::Rgb24, 0)?);
    }

    let surface = match args.surface {
        Some(surface) => surface,
        None => {
            let input = ImageProcessor::open(&args.input)?.size();
            OrientationState::new(args.device_rotation, args.sensor_offset)
                .applied_rotation()
                .rotate_size(input)
        }
    };

    let (overlay_sink, mut overlays) = overlay_channel();
    let (result_sink, _results) = result_channel();
    let session = ScannerSession::start(
        Box::new(source),
        surface,
        config,
        Arc::new(overlay_sink),
        Arc::new(result_sink),
    )
    .await?;

    session.stream_ended().await?;
    let outcome = session.capture().await;
    let stats = session.shutdown().await?;

    let mut report = ScanReport {
        stats,
        ..ScanReport::default()
    };

    if let Some(path) = &args.overlay_out {
        let mut last: Option<RgbaImage> = None;
        while let Ok(overlay) = overlays.try_recv() {
            if overlay.is_some() {
                last = overlay;
            }
        }
        match last {
            Some(overlay) => {
                overlay
                    .save(path)
                    .map_err(|e| ScanwerkError::ImageError(format!("failed to save overlay: {e}")))?;
                report.overlay = Some(path.clone());
            }
            None => warn!("No overlay was drawn; skipping overlay output"),
        }
    }

    match outcome? {
        CaptureOutcome::Rectified(result) => {
            std::fs::write(&args.output, &result.png)?;
            info!(path = %args.output.display(), size = %result.size(), "Scan written");
            report.output = Some(args.output.clone());
            report.size = Some(result.size());
        }
        CaptureOutcome::NothingRetained => info!("No document in view"),
        CaptureOutcome::Busy => warn!("Pipeline stayed busy; capture refused"),
    }
    Ok(report)
}

/// Config file values with command-line switches applied on top.
fn effective_config(args: &ScanArgs) -> Result<ScannerConfig> {
    let mut config = config_store::load(args.config.as_deref())?;
    if args.document {
        config.output.mode = OutputMode::Document;
    }
    if args.debug_overlay {
        config.detection.debug_overlay = true;
    }
    Ok(config)
}

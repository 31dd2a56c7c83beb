// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame buffer management: preview configuration plus the buffer pool the
// camera fills.

use scanwerk_bridge::FrameSource;
use scanwerk_core::config::SizingConfig;
use scanwerk_core::error::Result;
use scanwerk_core::types::{CameraInfo, OrientationState, PreviewConfig, RawFrame, Size};
use scanwerk_document::FramePool;
use scanwerk_document::frame::sizing::{choose_preview_config, working_size};
use tracing::{info, instrument};

/// Owns the pool of preview buffers and the configuration they are sized for.
///
/// Every buffer handed to the camera or used for a snapshot comes from the
/// pool and goes back to it; buffers from an older configuration are dropped
/// on return.
#[derive(Debug)]
pub struct FrameBufferManager {
    pool: FramePool,
    sizing: SizingConfig,
    target_pixel_area: f64,
    config: Option<PreviewConfig>,
}

impl FrameBufferManager {
    pub fn new(sizing: SizingConfig, target_pixel_area: f64) -> Result<Self> {
        let pool = FramePool::new(0, sizing.buffer_pool_size)?;
        Ok(Self {
            pool,
            sizing,
            target_pixel_area,
            config: None,
        })
    }

    /// Pick preview and picture sizes for `surface` and resize the pool to
    /// match the chosen preview.
    #[instrument(skip(self, info), fields(surface = %surface))]
    pub fn configure(
        &mut self,
        info: &CameraInfo,
        surface: Size,
        orientation: OrientationState,
    ) -> Result<PreviewConfig> {
        let config = choose_preview_config(info, surface, orientation, &self.sizing)?;
        let buffer_len = config.format.buffer_len(config.preview_size);
        self.pool.reconfigure(buffer_len)?;

        info!(
            preview = %config.preview_size,
            working = %working_size(config.preview_size, self.target_pixel_area),
            buffer_len,
            buffers = self.pool.available(),
            "Frame buffers configured"
        );
        self.config = Some(config);
        Ok(config)
    }

    pub fn preview_config(&self) -> Option<&PreviewConfig> {
        self.config.as_ref()
    }

    /// Working resolution of the current preview, before rotation.
    pub fn working_size(&self) -> Option<Size> {
        self.config
            .as_ref()
            .map(|c| working_size(c.preview_size, self.target_pixel_area))
    }

    /// Hand a pooled buffer to `source` and take back the frame it fills.
    pub fn acquire_next_frame(&mut self, source: &mut dyn FrameSource) -> Result<Option<RawFrame>> {
        let buffer = self.pool.acquire()?;
        source.next_frame(buffer)
    }

    /// Copy `frame` into a pooled buffer.
    pub fn snapshot(&mut self, frame: &RawFrame) -> Result<RawFrame> {
        let buffer = self.pool.acquire()?;
        Ok(frame.snapshot_into(buffer))
    }

    pub fn release_frame(&mut self, frame: RawFrame) {
        self.pool.release(frame.into_data());
    }

    /// Buffers idle in the pool.
    pub fn available(&self) -> usize {
        self.pool.available()
    }
}

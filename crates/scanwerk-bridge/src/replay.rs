// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Replay camera: serves prepared frames as if they came from a sensor.

use std::path::Path;
use std::time::Duration;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{CameraInfo, PixelFormat, PreviewConfig, RawFrame, Rotation};
use scanwerk_document::ImageProcessor;
use tracing::{debug, info, instrument};

use crate::traits::FrameSource;

/// Plays a fixed list of frames through the `FrameSource` interface.
///
/// Every frame must share one size and format; that size is reported as the
/// only supported preview size. Each frame is served `repeat` times and the
/// stream ends after the last one.
#[derive(Debug)]
pub struct ReplayFrameSource {
    frames: Vec<RawFrame>,
    still: Option<RawFrame>,
    sensor_offset: Rotation,
    device_rotation: Rotation,
    repeat: usize,
    interval: Option<Duration>,
    served: usize,
    streaming: bool,
}

impl ReplayFrameSource {
    pub fn new(frames: Vec<RawFrame>) -> Result<Self> {
        let Some(first) = frames.first() else {
            return Err(ScanwerkError::CameraUnavailable(
                "replay source has no frames".to_string(),
            ));
        };
        let (size, format) = (first.size(), first.format());
        if let Some(odd) = frames
            .iter()
            .find(|f| f.size() != size || f.format() != format)
        {
            return Err(ScanwerkError::CameraUnavailable(format!(
                "replay frames must share one geometry: {} {:?} vs {} {:?}",
                size,
                format,
                odd.size(),
                odd.format()
            )));
        }

        Ok(Self {
            frames,
            still: None,
            sensor_offset: Rotation::Deg0,
            device_rotation: Rotation::Deg0,
            repeat: 1,
            interval: None,
            served: 0,
            streaming: false,
        })
    }

    /// Load image files and encode each one as a preview frame in `format`.
    #[instrument(skip_all, fields(files = paths.len(), format = ?format))]
    pub fn from_image_files<P: AsRef<Path>>(paths: &[P], format: PixelFormat) -> Result<Self> {
        let frames = paths
            .iter()
            .enumerate()
            .map(|(i, path)| ImageProcessor::open(path)?.to_frame(format, i as u64))
            .collect::<Result<Vec<_>>>()?;
        info!(frames = frames.len(), "Replay frames loaded");
        Self::new(frames)
    }

    /// Mounting offset reported by `open`.
    pub fn with_sensor_offset(mut self, rotation: Rotation) -> Self {
        self.sensor_offset = rotation;
        self
    }

    pub fn with_device_rotation(mut self, rotation: Rotation) -> Self {
        self.device_rotation = rotation;
        self
    }

    /// Full-resolution still returned by `capture_still`. Its size becomes
    /// the only supported picture size.
    pub fn with_still(mut self, still: RawFrame) -> Self {
        self.still = Some(still);
        self
    }

    /// Serve each frame `times` times (at least once).
    pub fn with_repeat(mut self, times: usize) -> Self {
        self.repeat = times.max(1);
        self
    }

    /// Sleep between frames to mimic a live frame rate.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    fn total(&self) -> usize {
        self.frames.len() * self.repeat
    }
}

impl FrameSource for ReplayFrameSource {
    fn name(&self) -> &str {
        "replay"
    }

    fn open(&mut self) -> Result<CameraInfo> {
        let first = &self.frames[0];
        Ok(CameraInfo {
            sensor_offset: self.sensor_offset,
            preview_sizes: vec![first.size()],
            picture_sizes: self.still.iter().map(RawFrame::size).collect(),
            preview_format: first.format(),
        })
    }

    fn start_preview(&mut self, config: &PreviewConfig) -> Result<()> {
        let size = self.frames[0].size();
        if config.preview_size != size {
            return Err(ScanwerkError::CameraUnavailable(format!(
                "replay frames are {} but preview {} was requested",
                size, config.preview_size
            )));
        }
        self.streaming = true;
        debug!(%size, "Replay preview started");
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<()> {
        if !self.streaming {
            return Err(ScanwerkError::Bridge("preview is not running".to_string()));
        }
        self.streaming = false;
        Ok(())
    }

    fn next_frame(&mut self, buffer: Vec<u8>) -> Result<Option<RawFrame>> {
        if !self.streaming {
            return Err(ScanwerkError::Bridge("preview is not running".to_string()));
        }
        if self.served >= self.total() {
            return Ok(None);
        }
        if let Some(interval) = self.interval {
            std::thread::sleep(interval);
        }

        let template = &self.frames[self.served / self.repeat];
        let frame = template
            .snapshot_into(buffer)
            .renumbered(self.served as u64);
        self.served += 1;
        Ok(Some(frame))
    }

    fn capture_still(&mut self) -> Result<Option<RawFrame>> {
        Ok(self.still.clone())
    }

    fn device_rotation(&self) -> Rotation {
        self.device_rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use scanwerk_core::types::Size;

    fn gray_frame(value: u8) -> RawFrame {
        RawFrame::new(vec![value; 12], Size::new(4, 3), PixelFormat::Gray8, 0).unwrap()
    }

    fn config_for(size: Size) -> PreviewConfig {
        PreviewConfig {
            preview_size: size,
            picture_size: size,
            format: PixelFormat::Gray8,
            rotation: Rotation::Deg0,
        }
    }

    #[test]
    fn serves_each_frame_repeat_times_then_ends() {
        let mut source = ReplayFrameSource::new(vec![gray_frame(1), gray_frame(2)])
            .unwrap()
            .with_repeat(2);
        source.start_preview(&config_for(Size::new(4, 3))).unwrap();

        let mut seen = Vec::new();
        while let Some(frame) = source.next_frame(Vec::new()).unwrap() {
            seen.push((frame.data()[0], frame.sequence()));
        }
        assert_eq!(seen, vec![(1, 0), (1, 1), (2, 2), (2, 3)]);
    }

    #[test]
    fn reports_single_supported_size() {
        let mut source = ReplayFrameSource::new(vec![gray_frame(0)])
            .unwrap()
            .with_sensor_offset(Rotation::Deg90);
        let info = source.open().unwrap();
        assert_eq!(info.preview_sizes, vec![Size::new(4, 3)]);
        assert!(info.picture_sizes.is_empty());
        assert_eq!(info.sensor_offset, Rotation::Deg90);
    }

    #[test]
    fn frames_require_a_running_preview() {
        let mut source = ReplayFrameSource::new(vec![gray_frame(0)]).unwrap();
        assert!(source.next_frame(Vec::new()).is_err());
        assert!(matches!(
            source.stop_preview(),
            Err(ScanwerkError::Bridge(_))
        ));
    }

    #[test]
    fn mismatched_geometry_is_rejected() {
        let other = RawFrame::new(vec![0; 4], Size::new(2, 2), PixelFormat::Gray8, 0).unwrap();
        assert!(ReplayFrameSource::new(vec![gray_frame(0), other]).is_err());
        assert!(ReplayFrameSource::new(Vec::new()).is_err());
    }

    #[test]
    fn loads_frames_from_image_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        RgbImage::from_pixel(6, 4, Rgb([10, 200, 30])).save(&path).unwrap();

        let mut source = ReplayFrameSource::from_image_files(&[&path], PixelFormat::Nv21).unwrap();
        let info = source.open().unwrap();
        assert_eq!(info.preview_format, PixelFormat::Nv21);
        assert_eq!(info.preview_sizes, vec![Size::new(6, 4)]);

        source.start_preview(&PreviewConfig {
            preview_size: Size::new(6, 4),
            picture_size: Size::new(6, 4),
            format: PixelFormat::Nv21,
            rotation: Rotation::Deg0,
        })
        .unwrap();
        let frame = source.next_frame(Vec::new()).unwrap().unwrap();
        assert_eq!(frame.data().len(), PixelFormat::Nv21.buffer_len(Size::new(6, 4)));
    }
}

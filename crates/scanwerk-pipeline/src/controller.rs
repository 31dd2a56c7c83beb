// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline controller: runs preview ticks and captures against shared state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scanwerk_bridge::{FrameSource, OverlaySink, ResultSink};
use scanwerk_core::config::ScannerConfig;
use scanwerk_core::error::Result;
use scanwerk_core::types::{CameraInfo, PreviewConfig, RawFrame, Rotation, Size};
use scanwerk_document::detect::render_overlay;
use scanwerk_document::{ContourDetector, Detection, ImageProcessor, RectifiedImage, Rectifier};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, trace, warn};

use crate::frames::FrameBufferManager;
use crate::orientation::OrientationTracker;
use crate::state::{BusyFlag, RetainedCapture, RetainedState};

/// What a preview tick did with its frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The pipeline was busy; the frame was ignored.
    Dropped,
    /// Processed, but nothing document-like was found.
    NoCandidate,
    /// A contour was found and retained.
    Detected { area: f64 },
}

/// Result of a capture request.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    /// The crop was produced and handed to the result sink.
    Rectified(RectifiedImage),
    /// No frame/contour pair has been retained yet.
    NothingRetained,
    /// A tick or another capture was in progress.
    Busy,
}

impl CaptureOutcome {
    pub fn rectified(&self) -> Option<&RectifiedImage> {
        match self {
            Self::Rectified(image) => Some(image),
            _ => None,
        }
    }
}

/// Coordinates preview ticks and captures.
///
/// Ticks and captures share one busy flag: whichever arrives while the other
/// is running is refused. Every tick retains its frame; only ticks that find
/// a document replace the retained contour.
pub struct PipelineController {
    pub(crate) busy: BusyFlag,
    retained: Mutex<RetainedState>,
    frames: Mutex<FrameBufferManager>,
    orientation: OrientationTracker,
    detector: ContourDetector,
    rectifier: Rectifier,
    debug_overlay: bool,
    overlay_sink: Arc<dyn OverlaySink>,
    result_sink: Arc<dyn ResultSink>,
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("busy", &self.busy.is_busy())
            .field("orientation", &self.orientation.state())
            .field("debug_overlay", &self.debug_overlay)
            .finish_non_exhaustive()
    }
}

impl PipelineController {
    pub fn new(
        config: &ScannerConfig,
        overlay_sink: Arc<dyn OverlaySink>,
        result_sink: Arc<dyn ResultSink>,
    ) -> Result<Self> {
        config.validate()?;
        let frames = FrameBufferManager::new(config.sizing.clone(), config.detection.target_pixel_area)?;
        Ok(Self {
            busy: BusyFlag::default(),
            retained: Mutex::new(RetainedState::default()),
            frames: Mutex::new(frames),
            orientation: OrientationTracker::default(),
            detector: ContourDetector::new(config.detection.clone()),
            rectifier: Rectifier::new(config.output.clone()),
            debug_overlay: config.detection.debug_overlay,
            overlay_sink,
            result_sink,
        })
    }

    pub fn orientation(&self) -> &OrientationTracker {
        &self.orientation
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Whether a capture right now would have a frame and contour to use.
    pub fn has_retained(&self) -> bool {
        self.retained().is_ready()
    }

    /// The contour a capture would use right now.
    pub fn retained_detection(&self) -> Option<Detection> {
        self.retained().detection().cloned()
    }

    /// Size preview and buffers for `surface` under the current orientation.
    pub fn configure(&self, info: &CameraInfo, surface: Size) -> Result<PreviewConfig> {
        let orientation = self.orientation.state();
        self.frames().configure(info, surface, orientation)
    }

    pub fn preview_config(&self) -> Option<PreviewConfig> {
        self.frames().preview_config().copied()
    }

    pub fn acquire_next_frame(&self, source: &mut dyn FrameSource) -> Result<Option<RawFrame>> {
        self.frames().acquire_next_frame(source)
    }

    /// Return a frame's buffer to the pool once the tick is done with it.
    pub fn release_frame(&self, frame: RawFrame) {
        self.frames().release_frame(frame);
    }

    /// Process one preview frame.
    ///
    /// The frame is copied before detection so the caller may recycle its
    /// buffer as soon as this returns. An overlay (or `None` to clear it) is
    /// presented on every processed tick.
    #[instrument(skip_all, fields(seq = frame.sequence()))]
    pub fn on_preview_frame(&self, frame: &RawFrame) -> Result<TickOutcome> {
        let Some(_busy) = self.busy.try_acquire() else {
            trace!("Pipeline busy; frame dropped");
            return Ok(TickOutcome::Dropped);
        };

        let rotation = self.orientation.applied_rotation();
        let snapshot = self.frames().snapshot(frame)?;
        let report = match self.detector.detect(&snapshot, rotation) {
            Ok(report) => report,
            Err(err) => {
                self.frames().release_frame(snapshot);
                return Err(err);
            }
        };

        let outcome = match &report.best {
            Some(best) => TickOutcome::Detected { area: best.area },
            None => TickOutcome::NoCandidate,
        };
        let replaced = {
            let mut retained = self.retained();
            let replaced = retained.retain_frame(snapshot, rotation);
            if let Some(best) = report.best.as_ref() {
                retained.retain_detection(best.clone());
            }
            replaced
        };
        if let Some(old) = replaced {
            self.frames().release_frame(old);
        }

        let overlay = render_overlay(&report, self.debug_overlay);
        self.overlay_sink.present_overlay(overlay.as_ref());
        trace!(?outcome, "Tick complete");
        Ok(outcome)
    }

    /// Rectify the retained frame (or `still`, when the camera took one)
    /// using the retained contour.
    ///
    /// On success the result goes to the result sink and the retained pair is
    /// cleared. On failure the pair is kept so the user can try again.
    #[instrument(skip_all, fields(still = still.is_some()))]
    pub fn capture_now(&self, still: Option<RawFrame>) -> Result<CaptureOutcome> {
        let Some(_busy) = self.busy.try_acquire() else {
            debug!("Pipeline busy; capture refused");
            return Ok(CaptureOutcome::Busy);
        };
        let Some(retained) = self.retained().take() else {
            debug!("Nothing retained; capture skipped");
            return Ok(CaptureOutcome::NothingRetained);
        };

        let source = still.as_ref().unwrap_or(&retained.frame);
        match self.rectify(source, retained.rotation, &retained.detection) {
            Ok(result) => {
                self.result_sink.deliver(&result);
                info!(size = %result.size(), mode = ?result.mode, "Capture delivered");
                self.frames().release_frame(retained.frame);
                Ok(CaptureOutcome::Rectified(result))
            }
            Err(err) => {
                warn!(error = %err, "Capture failed; keeping retained frame");
                self.retained().restore(retained);
                Err(err)
            }
        }
    }

    /// Run `capture_now` on the blocking pool and report through a oneshot.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn request_capture(
        self: &Arc<Self>,
        still: Option<RawFrame>,
    ) -> oneshot::Receiver<Result<CaptureOutcome>> {
        let (tx, rx) = oneshot::channel();
        let controller = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let outcome = controller.capture_now(still);
            if tx.send(outcome).is_err() {
                debug!("Capture requester went away");
            }
        });
        rx
    }

    fn rectify(&self, frame: &RawFrame, rotation: Rotation, detection: &Detection) -> Result<RectifiedImage> {
        let image = ImageProcessor::from_frame(frame)?.rotate(rotation).into_rgb8();
        let quad = detection.quad_for(Size::new(image.width(), image.height()))?;
        self.rectifier.rectify(&image, &quad)
    }

    fn retained(&self) -> MutexGuard<'_, RetainedState> {
        self.retained.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn frames(&self) -> MutexGuard<'_, FrameBufferManager> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

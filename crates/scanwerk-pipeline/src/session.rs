// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner session: camera setup and the preview loop.

use std::sync::Arc;

use scanwerk_bridge::{FrameSource, OverlaySink, ResultSink};
use scanwerk_core::config::ScannerConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::types::{CameraInfo, OrientationState, PreviewConfig, Rotation, Size};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::{CaptureOutcome, PipelineController, TickOutcome};

const COMMAND_QUEUE_DEPTH: usize = 16;

/// Requests accepted by a running session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Rectify the retained frame; the outcome is sent back on the channel.
    Capture(oneshot::Sender<Result<CaptureOutcome>>),
    /// New device rotation; a change renegotiates the preview like a resize.
    OrientationChanged(Rotation),
    /// The preview surface was resized: stop, renegotiate sizes, restart.
    SurfaceChanged(Size),
    Shutdown,
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub dropped: u64,
    pub detections: u64,
    pub captures: u64,
    pub tick_errors: u64,
}

impl SessionStats {
    fn record(&mut self, outcome: TickOutcome) {
        self.frames += 1;
        match outcome {
            TickOutcome::Dropped => self.dropped += 1,
            TickOutcome::Detected { .. } => self.detections += 1,
            TickOutcome::NoCandidate => {}
        }
    }
}

/// A camera driven through the pipeline on a blocking worker.
///
/// Setup (open, size negotiation, start preview) runs before `start`
/// returns; any failure there is fatal and returned to the caller. Once
/// running, per-tick errors are logged and the loop carries on.
#[derive(Debug)]
pub struct ScannerSession {
    controller: Arc<PipelineController>,
    commands: mpsc::Sender<SessionCommand>,
    stream_ended: watch::Receiver<bool>,
    worker: JoinHandle<Result<SessionStats>>,
}

impl ScannerSession {
    #[instrument(skip_all, fields(surface = %surface))]
    pub async fn start(
        source: Box<dyn FrameSource>,
        surface: Size,
        config: ScannerConfig,
        overlay_sink: Arc<dyn OverlaySink>,
        result_sink: Arc<dyn ResultSink>,
    ) -> Result<Self> {
        let controller = Arc::new(PipelineController::new(&config, overlay_sink, result_sink)?);

        let setup_controller = Arc::clone(&controller);
        let (source, info) = tokio::task::spawn_blocking(move || {
            let mut source = source;
            let info = setup(&setup_controller, source.as_mut(), surface)?;
            Ok::<_, ScanwerkError>((source, info))
        })
        .await
        .map_err(worker_gone)??;

        let (commands, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (ended_tx, stream_ended) = watch::channel(false);
        let worker = Worker {
            controller: Arc::clone(&controller),
            source,
            info,
            surface,
            commands: receiver,
            stream_ended: ended_tx,
            stats: SessionStats::default(),
        };
        let worker = tokio::task::spawn_blocking(move || worker.run());

        Ok(Self {
            controller,
            commands,
            stream_ended,
            worker,
        })
    }

    pub fn controller(&self) -> &Arc<PipelineController> {
        &self.controller
    }

    /// Sender for UI code that wants to post commands directly.
    pub fn commands(&self) -> mpsc::Sender<SessionCommand> {
        self.commands.clone()
    }

    pub async fn capture(&self) -> Result<CaptureOutcome> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Capture(tx)).await?;
        rx.await.map_err(|_| ScanwerkError::SessionStopped)?
    }

    pub async fn orientation_changed(&self, rotation: Rotation) -> Result<()> {
        self.send(SessionCommand::OrientationChanged(rotation)).await
    }

    pub async fn surface_changed(&self, surface: Size) -> Result<()> {
        self.send(SessionCommand::SurfaceChanged(surface)).await
    }

    /// Resolves once the camera has no more frames to give.
    pub async fn stream_ended(&self) -> Result<()> {
        let mut ended = self.stream_ended.clone();
        ended
            .wait_for(|ended| *ended)
            .await
            .map(|_| ())
            .map_err(|_| ScanwerkError::SessionStopped)
    }

    /// Stop the preview and wait for the worker to finish.
    pub async fn shutdown(self) -> Result<SessionStats> {
        // A worker that already exited has dropped its receiver.
        if self.commands.send(SessionCommand::Shutdown).await.is_err() {
            debug!("Session worker already stopped");
        }
        self.worker.await.map_err(worker_gone)?
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ScanwerkError::SessionStopped)
    }
}

fn worker_gone(err: tokio::task::JoinError) -> ScanwerkError {
    error!(error = %err, "Session worker terminated abnormally");
    ScanwerkError::SessionStopped
}

/// Open the camera, negotiate sizes and start the preview.
fn setup(
    controller: &PipelineController,
    source: &mut dyn FrameSource,
    surface: Size,
) -> Result<CameraInfo> {
    let info = source.open().inspect_err(|err| {
        error!(camera = source.name(), error = %err, "Camera could not be opened");
    })?;
    controller
        .orientation()
        .reset(OrientationState::new(source.device_rotation(), info.sensor_offset));

    let config = controller.configure(&info, surface)?;
    start_preview(source, &config)?;
    info!(camera = source.name(), preview = %config.preview_size, "Scanner session started");
    Ok(info)
}

fn start_preview(source: &mut dyn FrameSource, config: &PreviewConfig) -> Result<()> {
    source.start_preview(config).inspect_err(|err| {
        error!(camera = source.name(), error = %err, "Preview could not be started");
    })
}

/// Stopping a preview that is already stopped is not an error worth raising.
fn stop_preview(source: &mut dyn FrameSource) {
    if let Err(err) = source.stop_preview() {
        debug!(camera = source.name(), error = %err, "Ignoring stop_preview failure");
    }
}

enum Flow {
    Continue,
    Restarted,
    Stop,
}

struct Worker {
    controller: Arc<PipelineController>,
    source: Box<dyn FrameSource>,
    info: CameraInfo,
    surface: Size,
    commands: mpsc::Receiver<SessionCommand>,
    stream_ended: watch::Sender<bool>,
    stats: SessionStats,
}

impl Worker {
    fn run(mut self) -> Result<SessionStats> {
        let mut streaming = true;
        let result = loop {
            let command = if streaming {
                match self.commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break Ok(()),
                }
            } else {
                match self.commands.blocking_recv() {
                    Some(command) => Some(command),
                    None => break Ok(()),
                }
            };

            if let Some(command) = command {
                match self.handle(command) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Restarted) => streaming = true,
                    Ok(Flow::Stop) => break Ok(()),
                    Err(err) => break Err(err),
                }
                continue;
            }

            match self.controller.acquire_next_frame(self.source.as_mut()) {
                Ok(Some(frame)) => {
                    match self.controller.on_preview_frame(&frame) {
                        Ok(outcome) => self.stats.record(outcome),
                        Err(err) => {
                            self.stats.tick_errors += 1;
                            warn!(seq = frame.sequence(), error = %err, "Preview tick failed");
                        }
                    }
                    self.controller.release_frame(frame);
                }
                Ok(None) => {
                    streaming = false;
                    info!(frames = self.stats.frames, "Preview stream ended");
                    self.stream_ended.send_replace(true);
                }
                Err(err) => {
                    error!(error = %err, "Camera stopped delivering frames");
                    break Err(err);
                }
            }
        };

        stop_preview(self.source.as_mut());
        self.stream_ended.send_replace(true);
        info!(
            frames = self.stats.frames,
            detections = self.stats.detections,
            captures = self.stats.captures,
            "Scanner session stopped"
        );
        result.map(|()| self.stats)
    }

    fn handle(&mut self, command: SessionCommand) -> Result<Flow> {
        match command {
            SessionCommand::Capture(reply) => {
                let outcome = self.capture();
                if reply.send(outcome).is_err() {
                    debug!("Capture requester went away");
                }
                Ok(Flow::Continue)
            }
            SessionCommand::OrientationChanged(rotation) => {
                if !self.controller.orientation().update_device_rotation(rotation) {
                    return Ok(Flow::Continue);
                }
                // Quarter turns swap which surface side maps to sensor width.
                self.reconfigure(self.surface)?;
                Ok(Flow::Restarted)
            }
            SessionCommand::SurfaceChanged(surface) => {
                self.surface = surface;
                self.reconfigure(surface)?;
                Ok(Flow::Restarted)
            }
            SessionCommand::Shutdown => Ok(Flow::Stop),
        }
    }

    fn capture(&mut self) -> Result<CaptureOutcome> {
        // No shutter release unless there is a contour to rectify with.
        let still = if self.controller.has_retained() {
            match self.source.capture_still() {
                Ok(still) => still,
                Err(err) => {
                    warn!(error = %err, "Still capture failed; using preview frame");
                    None
                }
            }
        } else {
            None
        };
        let outcome = self.controller.capture_now(still)?;
        if matches!(outcome, CaptureOutcome::Rectified(_)) {
            self.stats.captures += 1;
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    fn reconfigure(&mut self, surface: Size) -> Result<()> {
        stop_preview(self.source.as_mut());
        let config = self.controller.configure(&self.info, surface)?;
        start_preview(self.source.as_mut(), &config)?;
        self.stream_ended.send_replace(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use scanwerk_bridge::{ReplayFrameSource, StubCamera, overlay_channel, result_channel};
    use scanwerk_core::types::{PixelFormat, RawFrame};
    use scanwerk_document::frame::convert::encode_frame;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn document_frame() -> RawFrame {
        let mut image = RgbImage::from_pixel(320, 240, Rgb([40, 40, 40]));
        draw_filled_rect_mut(&mut image, Rect::at(60, 50).of_size(200, 140), Rgb([220, 220, 220]));
        encode_frame(&image, PixelFormat::Nv21, 0).unwrap()
    }

    fn blank_frame() -> RawFrame {
        encode_frame(&RgbImage::from_pixel(320, 240, Rgb([40, 40, 40])), PixelFormat::Nv21, 0).unwrap()
    }

    async fn start(source: Box<dyn FrameSource>) -> Result<ScannerSession> {
        let (overlay_sink, _overlays) = overlay_channel();
        let (result_sink, _results) = result_channel();
        ScannerSession::start(
            source,
            Size::new(320, 240),
            ScannerConfig::default(),
            Arc::new(overlay_sink),
            Arc::new(result_sink),
        )
        .await
    }

    /// Replay source that counts still requests and can refuse to stop.
    struct TestCamera {
        inner: ReplayFrameSource,
        refuse_stop: bool,
        stills: Arc<AtomicUsize>,
    }

    impl TestCamera {
        fn new(inner: ReplayFrameSource) -> (Self, Arc<AtomicUsize>) {
            let stills = Arc::new(AtomicUsize::new(0));
            let camera = Self {
                inner,
                refuse_stop: false,
                stills: Arc::clone(&stills),
            };
            (camera, stills)
        }
    }

    impl FrameSource for TestCamera {
        fn name(&self) -> &str {
            "test"
        }
        fn open(&mut self) -> Result<CameraInfo> {
            self.inner.open()
        }
        fn start_preview(&mut self, config: &PreviewConfig) -> Result<()> {
            self.inner.start_preview(config)
        }
        fn stop_preview(&mut self) -> Result<()> {
            if self.refuse_stop {
                return Err(ScanwerkError::Bridge("preview stop raced with teardown".into()));
            }
            self.inner.stop_preview()
        }
        fn next_frame(&mut self, buffer: Vec<u8>) -> Result<Option<RawFrame>> {
            self.inner.next_frame(buffer)
        }
        fn capture_still(&mut self) -> Result<Option<RawFrame>> {
            self.stills.fetch_add(1, Ordering::SeqCst);
            self.inner.capture_still()
        }
        fn device_rotation(&self) -> Rotation {
            self.inner.device_rotation()
        }
    }

    #[tokio::test]
    async fn missing_camera_fails_setup() {
        let err = start(Box::new(StubCamera)).await.unwrap_err();
        assert!(matches!(err, ScanwerkError::PlatformUnavailable));
        assert!(err.is_setup_fatal());
    }

    #[tokio::test]
    async fn invalid_config_fails_before_camera_opens() {
        let source = ReplayFrameSource::new(vec![blank_frame()]).unwrap();
        let (overlay_sink, _overlays) = overlay_channel();
        let (result_sink, _results) = result_channel();
        let mut config = ScannerConfig::default();
        config.sizing.buffer_pool_size = 0;

        let err = ScannerSession::start(
            Box::new(source),
            Size::new(320, 240),
            config,
            Arc::new(overlay_sink),
            Arc::new(result_sink),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScanwerkError::InvalidConfig(_)));
        assert!(err.is_setup_fatal());
    }

    #[tokio::test]
    async fn replayed_stream_detects_and_captures() {
        let source = ReplayFrameSource::new(vec![document_frame()]).unwrap().with_repeat(3);
        let session = start(Box::new(source)).await.unwrap();
        session.stream_ended().await.unwrap();

        let outcome = session.capture().await.unwrap();
        assert!(outcome.rectified().is_some());
        assert!(matches!(
            session.capture().await.unwrap(),
            CaptureOutcome::NothingRetained
        ));

        let stats = session.shutdown().await.unwrap();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.detections, 3);
        assert_eq!(stats.captures, 1);
        assert_eq!(stats.dropped, 0);
    }

    #[tokio::test]
    async fn capture_before_any_document_is_a_no_op() {
        let source = ReplayFrameSource::new(vec![blank_frame()])
            .unwrap()
            .with_repeat(2)
            .with_still(document_frame());
        let (camera, stills) = TestCamera::new(source);
        let session = start(Box::new(camera)).await.unwrap();
        session.stream_ended().await.unwrap();

        assert!(matches!(
            session.capture().await.unwrap(),
            CaptureOutcome::NothingRetained
        ));
        let stats = session.shutdown().await.unwrap();
        assert_eq!((stats.frames, stats.detections, stats.captures), (2, 0, 0));
        assert_eq!(stills.load(Ordering::SeqCst), 0, "shutter fired with nothing to rectify");
    }

    #[tokio::test]
    async fn capture_with_a_document_takes_one_still() {
        let source = ReplayFrameSource::new(vec![document_frame()])
            .unwrap()
            .with_still(document_frame());
        let (camera, stills) = TestCamera::new(source);
        let session = start(Box::new(camera)).await.unwrap();
        session.stream_ended().await.unwrap();

        assert!(session.capture().await.unwrap().rectified().is_some());
        // The retained pair is gone, so the second request skips the shutter.
        assert!(matches!(
            session.capture().await.unwrap(),
            CaptureOutcome::NothingRetained
        ));
        session.shutdown().await.unwrap();
        assert_eq!(stills.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn surface_change_survives_stop_failure() {
        let source = ReplayFrameSource::new(vec![document_frame()]).unwrap();
        let (mut camera, _) = TestCamera::new(source);
        camera.refuse_stop = true;
        let session = start(Box::new(camera)).await.unwrap();
        session.stream_ended().await.unwrap();

        session.surface_changed(Size::new(240, 320)).await.unwrap();
        session.orientation_changed(Rotation::Deg90).await.unwrap();
        let controller = Arc::clone(session.controller());

        // Commands are handled in order, so shutdown sees both applied.
        let stats = session.shutdown().await.unwrap();
        assert_eq!(stats.frames, 1);
        assert_eq!(controller.orientation().state().device_rotation, Rotation::Deg90);
        assert_eq!(controller.orientation().applied_rotation(), Rotation::Deg270);
        assert!(controller.preview_config().is_some());
    }

    #[tokio::test]
    async fn commands_after_shutdown_report_stopped() {
        let source = ReplayFrameSource::new(vec![blank_frame()]).unwrap();
        let session = start(Box::new(source)).await.unwrap();
        let commands = session.commands();
        session.shutdown().await.unwrap();

        let (tx, _rx) = oneshot::channel();
        assert!(commands.send(SessionCommand::Capture(tx)).await.is_err());
    }
}

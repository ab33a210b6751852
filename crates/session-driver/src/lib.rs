//! Liveness Session Driver
//!
//! Pulls frames from a camera source, runs them through a
//! [`LivenessDetectionSession`] and produces the session result.

use camera_capture::{FrameSource, VideoFrame};
use liveness::{FaceCapture, FaceDetector, LivenessDetectionSession, LivenessDetectionSessionResult, LivenessError};
use metrics::counter;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Detection frames, by index, over which the detection rate is measured
const FPS_WINDOW: std::ops::Range<usize> = 3..10;

/// Initialize logging
pub fn init_logging() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

/// Running average of the face detection rate over the first frames
#[derive(Debug)]
struct FpsMonitor {
    required: f64,
    frame_count: usize,
    fps: Option<f64>,
}

impl FpsMonitor {
    fn new(required: f64) -> Self {
        Self {
            required,
            frame_count: 0,
            fps: None,
        }
    }

    /// Record how long one detection took
    fn record(&mut self, detection: Duration) -> Result<(), LivenessError> {
        let index = self.frame_count;
        self.frame_count += 1;
        if !FPS_WINDOW.contains(&index) {
            self.fps = None;
            return Ok(());
        }
        let seconds = detection.as_secs_f64();
        let current = if seconds > 0.0 { 1.0 / seconds } else { f64::INFINITY };
        let fps = match self.fps {
            Some(fps) => (fps + current) / 2.0,
            None => current,
        };
        self.fps = Some(fps);
        if fps < self.required {
            return Err(LivenessError::DeviceTooSlow {
                fps,
                required: self.required,
            });
        }
        Ok(())
    }
}

/// Resolves once cancellation is requested; never if the sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Run a liveness session to completion
///
/// Returns `Ok(None)` when cancelled through `cancel`. The frame source is
/// stopped and the session closed however the run ends.
pub async fn capture_faces(
    session: &mut LivenessDetectionSession,
    detector: &mut dyn FaceDetector,
    source: &mut dyn FrameSource,
    mut cancel: watch::Receiver<bool>,
) -> Result<Option<LivenessDetectionSessionResult>, LivenessError> {
    counter!("liveness_sessions_started").increment(1);
    let outcome = run_session(session, detector, source, &mut cancel).await;
    source.stop().await;
    session.close();

    match &outcome {
        Ok(Some(result)) => {
            counter!("liveness_sessions_succeeded").increment(1);
            info!(
                session = %session.id(),
                captures = result.face_captures.len(),
                duration = result.duration,
                "Liveness session succeeded"
            );
        }
        Ok(None) => info!(session = %session.id(), "Liveness session cancelled"),
        Err(e) => {
            counter!("liveness_sessions_failed", "kind" => e.kind()).increment(1);
            warn!(session = %session.id(), error = %e, spoof = e.is_spoof_signal(), "Liveness session failed");
        }
    }
    outcome
}

async fn run_session(
    session: &mut LivenessDetectionSession,
    detector: &mut dyn FaceDetector,
    source: &mut dyn FrameSource,
    cancel: &mut watch::Receiver<bool>,
) -> Result<Option<LivenessDetectionSessionResult>, LivenessError> {
    if session.is_closed() {
        return Err(LivenessError::SessionClosed);
    }
    session.settings().validate()?;
    detector.check_available()?;

    let capture_count = session.settings().face_capture_count;
    let max_duration_ms = session.settings().max_duration_ms();
    let mirror = session.settings().use_front_camera;
    let mut fps = FpsMonitor::new(session.settings().min_fps);
    let mut captures: Vec<FaceCapture> = Vec::with_capacity(capture_count);
    let mut first_frame_ms: Option<f64> = None;
    // Also bounded by the wall clock, so stalled or frozen sources still time out
    let deadline = Duration::try_from_secs_f64(session.settings().max_duration)
        .ok()
        .and_then(|limit| tokio::time::Instant::now().checked_add(limit));

    info!(session = %session.id(), bearing = %session.requested_bearing(), "Liveness session started");

    while captures.len() < capture_count {
        let frame = tokio::select! {
            biased;
            _ = cancelled(cancel) => return Ok(None),
            _ = deadline_reached(deadline) => {
                debug!(session = %session.id(), "Session wall-clock duration exceeded");
                break;
            }
            frame = source.next_frame() => frame?,
        };
        let Some(frame) = frame else {
            debug!(session = %session.id(), "Frame source ended");
            break;
        };

        let time_ms = frame.timestamp_ms();
        let start_ms = *first_frame_ms.get_or_insert(time_ms);
        if time_ms - start_ms > max_duration_ms {
            debug!(session = %session.id(), elapsed_ms = time_ms - start_ms, "Session duration exceeded");
            break;
        }

        let frame = if mirror { frame.mirrored() } else { frame };
        if let Some(capture) = process_frame(session, detector, &mut fps, frame)? {
            let capture = session.create_face_capture(capture).await?;
            session.notify_face_captured(&capture);
            info!(
                session = %session.id(),
                bearing = %capture.requested_bearing,
                collected = captures.len() + 1,
                "Face captured"
            );
            captures.push(capture);
        }
    }

    if captures.len() < capture_count {
        return Err(LivenessError::SessionTimedOut);
    }
    let result = session.result_from_captures(captures).await?;
    let result = session.check_liveness(result).await?;
    Ok(Some(result))
}

/// Resolves once `deadline` has passed, never when there is none
async fn deadline_reached(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Run one frame through the session stages, returning it if accepted
fn process_frame(
    session: &mut LivenessDetectionSession,
    detector: &mut dyn FaceDetector,
    fps: &mut FpsMonitor,
    frame: VideoFrame,
) -> Result<Option<FaceCapture>, LivenessError> {
    let started = Instant::now();
    let face = detector.detect_face(&frame)?;
    fps.record(started.elapsed())?;

    session.set_image_size(frame.size());
    session.record_video_frame(&frame)?;

    let mut capture = FaceCapture::new(frame, face);
    capture.requested_bearing = session.requested_bearing();
    session.detect_face_presence(&mut capture)?;
    session.detect_face_alignment(&mut capture);
    session.detect_spoof_attempt(&capture)?;
    session.record_control_capture(&capture);
    session.notify_face_detected(&capture);
    counter!("liveness_frames_processed").increment(1);

    Ok(capture.is_accepted().then_some(capture))
}

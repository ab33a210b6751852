//! Optional result collaborators: passive liveness scoring and session video

use crate::LivenessError;
use async_trait::async_trait;
use camera_capture::VideoFrame;
use uuid::Uuid;

/// Scores that a frame shows a live person rather than a reproduction
#[async_trait]
pub trait LivenessCheck: Send + Sync {
    /// Score from 0 (spoof) to 1 (live)
    async fn check_liveness(&self, frame: &VideoFrame) -> Result<f64, LivenessError>;
}

/// Lowest liveness score a session accepts
pub const MIN_LIVENESS_SCORE: f64 = 0.5;

/// Records session video
#[async_trait]
pub trait VideoRecorder: Send + Sync {
    fn record_frame(&mut self, frame: &VideoFrame) -> Result<(), LivenessError>;

    /// Stop recording and return the video's URL
    async fn finish(&mut self) -> Result<String, LivenessError>;
}

/// Keeps JPEG-encoded frames in memory
#[derive(Debug, Default)]
pub struct InMemoryVideoRecorder {
    frames: Vec<Vec<u8>>,
    finished: bool,
}

impl InMemoryVideoRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }
}

#[async_trait]
impl VideoRecorder for InMemoryVideoRecorder {
    fn record_frame(&mut self, frame: &VideoFrame) -> Result<(), LivenessError> {
        if self.finished {
            return Err(LivenessError::VideoRecording("recorder already finished".into()));
        }
        self.frames.push(frame.to_jpeg()?);
        Ok(())
    }

    async fn finish(&mut self) -> Result<String, LivenessError> {
        if self.frames.is_empty() {
            return Err(LivenessError::VideoRecording("no frames recorded".into()));
        }
        self.finished = true;
        Ok(format!("memory://session-video/{}", Uuid::new_v4()))
    }
}

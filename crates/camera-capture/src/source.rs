//! Pull-model frame sources
//!
//! The session driver asks for the next frame only after it has finished
//! with the previous one, so a slow pipeline never queues frames.

use crate::{CameraConfig, CameraError, VideoFrame};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Source of camera frames
///
/// Frame timestamps must not decrease; session timing is measured on them.
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` once the source is exhausted or stopped
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the camera; later calls to `next_frame` return `None`
    async fn stop(&mut self);
}

/// Replays a fixed list of frames
pub struct VecFrameSource {
    frames: VecDeque<VideoFrame>,
    /// Wall-clock delay before each frame
    pacing: Option<Duration>,
    stopped: bool,
}

impl VecFrameSource {
    pub fn new(frames: Vec<VideoFrame>) -> Self {
        Self {
            frames: frames.into(),
            pacing: None,
            stopped: false,
        }
    }

    /// Wait `interval` before yielding each frame
    pub fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacing = Some(interval);
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[async_trait]
impl FrameSource for VecFrameSource {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.stopped {
            return Ok(None);
        }
        if let Some(interval) = self.pacing {
            tokio::time::sleep(interval).await;
        }
        Ok(self.frames.pop_front())
    }

    async fn stop(&mut self) {
        if !self.stopped {
            debug!(remaining = self.frames.len(), "Frame source stopped");
        }
        self.stopped = true;
        self.frames.clear();
    }
}

/// Generates solid frames on demand at the camera's frame rate
///
/// Only the frame being handed out is held in memory.
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
    rgb: [u8; 3],
    interval_ns: u64,
    next_sequence: u32,
    limit: u32,
    stopped: bool,
}

impl SyntheticFrameSource {
    /// Source yielding `limit` frames sized and timed like `config`
    pub fn new(config: &CameraConfig, limit: u32) -> Self {
        Self {
            width: config.width,
            height: config.height,
            rgb: [128, 112, 100],
            interval_ns: config.frame_interval_ns(),
            next_sequence: 0,
            limit,
            stopped: false,
        }
    }

    pub fn with_color(mut self, rgb: [u8; 3]) -> Self {
        self.rgb = rgb;
        self
    }

    /// Frames handed out so far
    pub fn produced(&self) -> u32 {
        self.next_sequence
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.stopped || self.next_sequence >= self.limit {
            return Ok(None);
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Ok(Some(VideoFrame::solid(
            self.width,
            self.height,
            self.rgb,
            u64::from(sequence) * self.interval_ns,
            sequence,
        )))
    }

    async fn stop(&mut self) {
        if !self.stopped {
            debug!(produced = self.next_sequence, "Synthetic source stopped");
        }
        self.stopped = true;
    }
}

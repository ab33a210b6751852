//! Camera Capture Library for Liveness Sessions
//!
//! Provides the frame type handed to face detectors and the pull-model
//! source that feeds a session:
//! - RGB frames with crop, mirror and JPEG encoding
//! - `FrameSource` trait, pulled one frame at a time by the session driver
//! - `VecFrameSource` replaying prepared frames (tests)
//! - `SyntheticFrameSource` generating frames on demand (demo)

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, SyntheticFrameSource, VecFrameSource};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid frame: {0}")]
    Format(String),

    #[error("Crop region outside the frame")]
    Crop,

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Camera stopped")]
    Stopped,
}

/// Which camera faces the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// Selfie camera; frames are shown mirrored
    Front,
    Back,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub facing: CameraFacing,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::front()
    }
}

impl CameraConfig {
    /// Front camera, portrait 480x640 @ 30fps
    pub fn front() -> Self {
        Self {
            facing: CameraFacing::Front,
            width: 480,
            height: 640,
            fps: 30,
        }
    }

    /// Back camera, 720p @ 30fps
    pub fn back() -> Self {
        Self {
            facing: CameraFacing::Back,
            width: 1280,
            height: 720,
            fps: 30,
        }
    }

    /// Config for the camera selected by a session's `use_front_camera` flag
    pub fn for_front_camera(use_front_camera: bool) -> Self {
        if use_front_camera {
            Self::front()
        } else {
            Self::back()
        }
    }

    /// Nominal spacing between frames in nanoseconds
    pub fn frame_interval_ns(&self) -> u64 {
        1_000_000_000 / u64::from(self.fps.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_presets() {
        let front = CameraConfig::for_front_camera(true);
        assert_eq!(front.facing, CameraFacing::Front);
        assert!(front.height > front.width);

        let back = CameraConfig::for_front_camera(false);
        assert_eq!(back.facing, CameraFacing::Back);
        assert_eq!(back.frame_interval_ns(), 33_333_333);
    }
}

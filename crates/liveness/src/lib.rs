//! Liveness Detection Session
//!
//! Frame-by-frame state machine guiding a user through a sequence of head
//! poses and rejecting photo or replay attacks:
//! - Face presence tracking with smoothing and loss detection
//! - Alignment against the requested bearing (found/fixed/aligned/misaligned)
//! - Spoof detection from head movement between bearings
//! - Control-face cross check against the recognition service
//! - Result assembly with optional passive liveness check

pub mod bearings;
pub mod capture;
pub mod check;
pub mod config;
pub mod detector;
pub mod requirements;
pub mod session;
pub mod state;

pub use bearings::BearingSequence;
pub use capture::{FaceCapture, LivenessDetectionSessionResult};
pub use check::{InMemoryVideoRecorder, LivenessCheck, VideoRecorder};
pub use self::config::{FaceExtents, SessionSettings};
pub use detector::{Face, FaceDetector, ScriptedFaceDetector};
pub use requirements::{FaceRequirementListener, FaceRequirements, Range};
pub use session::{FaceCaptureCallback, LivenessDetectionSession};
pub use state::FaceAlignmentStatus;

use camera_capture::CameraError;
use face_recognition::RecognitionError;
use thiserror::Error;

/// Liveness session error types
///
/// Every variant ends the session.
#[derive(Error, Debug)]
pub enum LivenessError {
    #[error("Face lost")]
    FaceLost,

    #[error("Face moved too far")]
    FaceMovedTooFar,

    #[error("Moved opposite")]
    MovedOpposite,

    #[error("Session timed out")]
    SessionTimedOut,

    #[error("Detected possible spoof attempt")]
    PossibleSpoofAttempt,

    #[error("Liveness check failed (score {0:.2})")]
    LivenessCheckFailed(f64),

    #[error("Device too slow: {fps:.1} FPS (required {required} FPS)")]
    DeviceTooSlow { fps: f64, required: f64 },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Attempting to run a closed session")]
    SessionClosed,

    #[error("Face detector unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("Face recognition failed: {0}")]
    Recognition(#[from] RecognitionError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Video recording failed: {0}")]
    VideoRecording(String),

    #[error("Failed to extract face capture")]
    MissingStraightCapture,
}

impl LivenessError {
    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            LivenessError::FaceLost => "face_lost",
            LivenessError::FaceMovedTooFar => "face_moved_too_far",
            LivenessError::MovedOpposite => "moved_opposite",
            LivenessError::SessionTimedOut => "timed_out",
            LivenessError::PossibleSpoofAttempt => "possible_spoof_attempt",
            LivenessError::LivenessCheckFailed(_) => "liveness_check_failed",
            LivenessError::DeviceTooSlow { .. } => "device_too_slow",
            LivenessError::InvalidSettings(_) => "invalid_settings",
            LivenessError::SessionClosed => "session_closed",
            LivenessError::DetectorUnavailable(_) => "detector_unavailable",
            LivenessError::Recognition(_) => "recognition",
            LivenessError::Camera(_) => "camera",
            LivenessError::VideoRecording(_) => "video_recording",
            LivenessError::MissingStraightCapture => "missing_straight_capture",
        }
    }

    /// Whether the error suggests a spoofing attempt rather than a usage problem
    pub fn is_spoof_signal(&self) -> bool {
        matches!(
            self,
            LivenessError::FaceMovedTooFar
                | LivenessError::MovedOpposite
                | LivenessError::PossibleSpoofAttempt
                | LivenessError::LivenessCheckFailed(_)
        )
    }
}

//! Face captures and session results

use crate::detector::Face;
use crate::state::FaceAlignmentStatus;
use camera_capture::VideoFrame;
use chrono::{DateTime, Utc};
use face_geometry::{Angle, Bearing, Rect, Size};
use serde::Serialize;

/// One frame passing through the session pipeline
///
/// Created per frame and annotated in place by each stage.
#[derive(Debug, Clone, Serialize)]
pub struct FaceCapture {
    #[serde(skip)]
    pub frame: VideoFrame,
    pub face: Option<Face>,
    /// Frame timestamp (ms)
    pub time_ms: f64,
    pub image_size: Size,
    pub requested_bearing: Bearing,
    /// Smoothed face bounds
    pub face_bounds: Option<Rect>,
    /// Smoothed face angle
    pub face_angle: Option<Angle>,
    pub face_alignment_status: FaceAlignmentStatus,
    /// Set only when misaligned
    pub offset_angle_from_bearing: Option<Angle>,
    /// 1 when heading straight for the requested bearing
    pub angle_trajectory: Option<f64>,
    /// Remaining distance to the requested bearing, 0 to 1
    pub angle_distance: f64,
}

impl FaceCapture {
    pub fn new(frame: VideoFrame, face: Option<Face>) -> Self {
        Self {
            time_ms: frame.timestamp_ms(),
            image_size: frame.size(),
            frame,
            face,
            requested_bearing: Bearing::Straight,
            face_bounds: None,
            face_angle: None,
            face_alignment_status: FaceAlignmentStatus::Found,
            offset_angle_from_bearing: None,
            angle_trajectory: None,
            angle_distance: 0.0,
        }
    }

    pub fn has_face(&self) -> bool {
        self.face.is_some()
    }

    /// Face present and aligned with the requested bearing
    pub fn is_accepted(&self) -> bool {
        self.face.is_some() && self.face_alignment_status == FaceAlignmentStatus::Aligned
    }

    pub fn template(&self) -> Option<&str> {
        self.face.as_ref()?.template.as_deref()
    }
}

/// Result of a successful liveness session
#[derive(Debug, Clone, Serialize)]
pub struct LivenessDetectionSessionResult {
    pub start_time: DateTime<Utc>,
    /// Seconds
    pub duration: f64,
    /// Accepted captures in frame order
    pub face_captures: Vec<FaceCapture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness_score: Option<f64>,
}

impl LivenessDetectionSessionResult {
    pub fn new(start_time: DateTime<Utc>, face_captures: Vec<FaceCapture>, video_url: Option<String>) -> Self {
        let duration = (Utc::now() - start_time).num_milliseconds().max(0) as f64 / 1000.0;
        Self {
            start_time,
            duration,
            face_captures,
            video_url,
            liveness_score: None,
        }
    }

    /// First capture taken with the user looking straight at the camera
    pub fn straight_capture(&self) -> Option<&FaceCapture> {
        self.face_captures
            .iter()
            .find(|capture| capture.requested_bearing == Bearing::Straight)
    }
}

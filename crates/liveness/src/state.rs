//! Session state tracking

use crate::capture::FaceCapture;
use crate::detector::Face;
use face_geometry::{Angle, Bearing};
use ring_buffer::CircularBuffer;
use serde::{Deserialize, Serialize};
use smoothing::{AngleSmoothing, RectSmoothing, DEFAULT_WINDOW};
use std::collections::VecDeque;

/// Alignment of the face with the requested bearing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaceAlignmentStatus {
    /// Face seen but not yet settled in the expected region
    #[default]
    Found,
    /// Face settled; waiting for the pause and a full buffer
    Fixed,
    /// Buffered faces all match the requested bearing
    Aligned,
    Misaligned,
}

/// Mutable session state
///
/// Owned by one session and reset as a whole when it closes.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Most recent faces, capacity `face_capture_face_count`
    pub face_buffer: CircularBuffer<Face>,
    pub bounds_smoothing: RectSmoothing,
    pub angle_smoothing: AngleSmoothing,
    pub alignment_status: FaceAlignmentStatus,
    /// Frame time the face was last fixed or aligned (ms)
    pub fix_time: Option<f64>,
    pub aligned_face_count: usize,
    /// Face angles seen since the last accepted bearing
    pub angle_history: Vec<Angle>,
    pub previous_bearing: Bearing,
    /// Bearing accepted most recently and the one before it
    pub last_transition: Option<(Bearing, Bearing)>,
    pub previous_face_angle: Option<Angle>,
    pub has_face_been_aligned: bool,
    pub control_captures: VecDeque<FaceCapture>,
    /// Frame time of the last control capture (ms)
    pub last_control_time: Option<f64>,
}

impl SessionState {
    pub fn new(face_capture_face_count: usize) -> Self {
        Self {
            face_buffer: CircularBuffer::new(face_capture_face_count),
            bounds_smoothing: RectSmoothing::new(DEFAULT_WINDOW),
            angle_smoothing: AngleSmoothing::new(DEFAULT_WINDOW),
            alignment_status: FaceAlignmentStatus::Found,
            fix_time: None,
            aligned_face_count: 0,
            angle_history: Vec::new(),
            previous_bearing: Bearing::Straight,
            last_transition: None,
            previous_face_angle: None,
            has_face_been_aligned: false,
            control_captures: VecDeque::new(),
            last_control_time: None,
        }
    }

    /// Reset state (on session close)
    pub fn reset(&mut self) {
        *self = Self::new(self.face_buffer.capacity());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use face_geometry::Rect;

    #[test]
    fn test_reset_clears_everything() {
        let mut state = SessionState::new(3);
        state.face_buffer.enqueue(Face::new(Rect::new(0.0, 0.0, 10.0, 10.0), Angle::default()));
        state.bounds_smoothing.add_sample(&Rect::new(0.0, 0.0, 10.0, 10.0));
        state.alignment_status = FaceAlignmentStatus::Misaligned;
        state.fix_time = Some(12.0);
        state.aligned_face_count = 2;
        state.angle_history.push(Angle::yaw_pitch(3.0, 1.0));
        state.previous_bearing = Bearing::Left;
        state.has_face_been_aligned = true;
        state.last_control_time = Some(40.0);

        state.reset();

        assert!(state.face_buffer.is_empty());
        assert_eq!(state.face_buffer.capacity(), 3);
        assert!(state.bounds_smoothing.smoothed_value().is_none());
        assert_eq!(state.alignment_status, FaceAlignmentStatus::Found);
        assert_eq!(state.fix_time, None);
        assert_eq!(state.aligned_face_count, 0);
        assert!(state.angle_history.is_empty());
        assert_eq!(state.previous_bearing, Bearing::Straight);
        assert!(!state.has_face_been_aligned);
        assert_eq!(state.last_control_time, None);
    }
}

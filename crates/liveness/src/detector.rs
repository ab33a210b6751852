//! Face detection seam
//!
//! The detector itself is external; sessions only see its per-frame output.

use crate::LivenessError;
use camera_capture::VideoFrame;
use face_geometry::{Angle, Rect};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::warn;

/// Face found by a detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Bounds in pixels
    pub bounds: Rect,
    pub angle: Angle,
    /// Recognition template, once extracted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl Face {
    pub fn new(bounds: Rect, angle: Angle) -> Self {
        Self {
            bounds,
            angle,
            template: None,
        }
    }
}

/// Per-frame face detector
pub trait FaceDetector: Send {
    /// Detect the most prominent face in a frame
    fn detect_face(&mut self, frame: &VideoFrame) -> Result<Option<Face>, LivenessError>;

    /// Fails when the detector cannot run on this device
    fn check_available(&self) -> Result<(), LivenessError> {
        Ok(())
    }
}

/// Replays a scripted sequence of detections
///
/// Frames past the end of the script have no face.
pub struct ScriptedFaceDetector {
    script: VecDeque<Option<Face>>,
    latency: Option<Duration>,
    unavailable: Option<String>,
}

impl ScriptedFaceDetector {
    pub fn new(script: impl IntoIterator<Item = Option<Face>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            latency: None,
            unavailable: None,
        }
    }

    /// Block for `latency` on every detection, simulating a slow device
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Detector that reports itself unavailable
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            script: VecDeque::new(),
            latency: None,
            unavailable: Some(reason.into()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl FaceDetector for ScriptedFaceDetector {
    fn detect_face(&mut self, frame: &VideoFrame) -> Result<Option<Face>, LivenessError> {
        if let Some(reason) = &self.unavailable {
            return Err(LivenessError::DetectorUnavailable(reason.clone()));
        }
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        match self.script.pop_front() {
            Some(face) => Ok(face),
            None => {
                warn!(sequence = frame.sequence, "Face detector script exhausted");
                Ok(None)
            }
        }
    }

    fn check_available(&self) -> Result<(), LivenessError> {
        match &self.unavailable {
            Some(reason) => Err(LivenessError::DetectorUnavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_detector_replays() {
        let face = Face::new(Rect::new(1.0, 2.0, 3.0, 4.0), Angle::yaw_pitch(5.0, 0.0));
        let mut detector = ScriptedFaceDetector::new([Some(face.clone()), None]);
        let frame = VideoFrame::solid(4, 4, [0, 0, 0], 0, 0);

        assert!(detector.check_available().is_ok());
        assert_eq!(detector.detect_face(&frame).unwrap(), Some(face));
        assert_eq!(detector.detect_face(&frame).unwrap(), None);
        assert_eq!(detector.remaining(), 0);
        assert_eq!(detector.detect_face(&frame).unwrap(), None);
    }

    #[test]
    fn test_unavailable_detector() {
        let mut detector = ScriptedFaceDetector::unavailable("no model");
        assert!(matches!(
            detector.check_available(),
            Err(LivenessError::DetectorUnavailable(_))
        ));
        let frame = VideoFrame::solid(1, 1, [0, 0, 0], 0, 0);
        assert!(detector.detect_face(&frame).is_err());
    }

    #[test]
    fn test_face_json_without_template() {
        let face: Face = serde_json::from_str(
            r#"{"bounds": {"x": 1, "y": 2, "width": 3, "height": 4}, "angle": {"yaw": 10, "pitch": -2, "roll": 0}}"#,
        )
        .unwrap();
        assert_eq!(face.template, None);
        assert_eq!(face.angle.yaw, 10.0);
    }
}

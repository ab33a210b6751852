//! Face Recognition Collaborator
//!
//! Face templates are extracted and compared by a remote service:
//! - Recognizable face detection (bounds, quality, template)
//! - Template-to-templates similarity scoring
//! - HTTP client for the service and an in-process mock

mod http;
mod mock;

pub use http::{adjust_crop_rect, HttpFaceRecognition};
pub use mock::MockFaceRecognition;

use async_trait::async_trait;
use camera_capture::{CameraError, VideoFrame};
use face_geometry::Rect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recognition error types
#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("Face not detected")]
    NoFace,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Service returned status {0}")]
    Status(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing face templates")]
    MissingTemplates,

    #[error("Image error: {0}")]
    Image(#[from] CameraError),
}

/// Face suitable for recognition
///
/// Coordinates are percentages of the image the face was detected in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizableFace {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// 0 (worst) to 10 (best)
    pub quality: f64,
    /// Base64-encoded recognition template
    pub template: String,
}

impl RecognizableFace {
    /// Bounds in percent of the image
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Face template extraction and comparison
#[async_trait]
pub trait FaceRecognition: Send + Sync {
    /// Detect a face usable for recognition, optionally near `face_rect` (pixels)
    async fn detect_recognizable_face(
        &self,
        frame: &VideoFrame,
        face_rect: Option<Rect>,
    ) -> Result<RecognizableFace, RecognitionError>;

    /// Similarity of `template` to the closest of `templates`
    async fn compare_face_template_to_templates(
        &self,
        template: &str,
        templates: &[String],
    ) -> Result<f64, RecognitionError>;

    async fn compare_face_templates(&self, first: &str, second: &str) -> Result<f64, RecognitionError> {
        if first.is_empty() || second.is_empty() {
            return Err(RecognitionError::MissingTemplates);
        }
        self.compare_face_template_to_templates(first, &[second.to_string()])
            .await
    }
}

/// Recognition service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Base URL accepting `/detect_face` and `/compare_faces`
    pub service_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8080".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognizable_face_json() {
        let face: RecognizableFace = serde_json::from_str(
            r#"{"x": 1.5, "y": 2, "width": 30, "height": 40, "quality": 9.1, "template": "dGVtcGxhdGU="}"#,
        )
        .unwrap();
        assert_eq!(face.y, 2.0);
        assert_eq!(face.template, "dGVtcGxhdGU=");
    }

    #[tokio::test]
    async fn test_compare_templates_rejects_empty() {
        let recognition = MockFaceRecognition::new();
        let result = recognition.compare_face_templates("", "abc").await;
        assert!(matches!(result, Err(RecognitionError::MissingTemplates)));
        assert_eq!(recognition.compare_calls(), 0);
    }
}

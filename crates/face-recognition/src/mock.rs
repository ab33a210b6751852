//! In-process recognition service for tests and demos

use crate::{FaceRecognition, RecognitionError, RecognizableFace};
use async_trait::async_trait;
use camera_capture::VideoFrame;
use face_geometry::Rect;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a fixed template per frame and a fixed similarity score
pub struct MockFaceRecognition {
    score: f64,
    /// Frames with these sequence numbers have no recognizable face
    faceless_sequences: HashSet<u32>,
    detect_calls: AtomicUsize,
    compare_calls: AtomicUsize,
}

impl MockFaceRecognition {
    pub fn new() -> Self {
        Self {
            score: 5.0,
            faceless_sequences: HashSet::new(),
            detect_calls: AtomicUsize::new(0),
            compare_calls: AtomicUsize::new(0),
        }
    }

    /// Score returned by every comparison
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Fail detection on frames with the given sequence numbers
    pub fn without_face_in(mut self, sequences: impl IntoIterator<Item = u32>) -> Self {
        self.faceless_sequences.extend(sequences);
        self
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    pub fn compare_calls(&self) -> usize {
        self.compare_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockFaceRecognition {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaceRecognition for MockFaceRecognition {
    async fn detect_recognizable_face(
        &self,
        frame: &VideoFrame,
        face_rect: Option<Rect>,
    ) -> Result<RecognizableFace, RecognitionError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        if self.faceless_sequences.contains(&frame.sequence) {
            return Err(RecognitionError::NoFace);
        }
        let size = frame.size();
        let bounds = face_rect
            .unwrap_or_else(|| Rect::from_size(size))
            .scaled_by(100.0 / size.width, 100.0 / size.height);
        Ok(RecognizableFace {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            quality: 9.0,
            template: format!("template-{}", frame.sequence),
        })
    }

    async fn compare_face_template_to_templates(
        &self,
        _template: &str,
        templates: &[String],
    ) -> Result<f64, RecognitionError> {
        self.compare_calls.fetch_add(1, Ordering::SeqCst);
        if templates.is_empty() {
            return Err(RecognitionError::MissingTemplates);
        }
        Ok(self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_detects_and_compares() {
        let recognition = MockFaceRecognition::new().with_score(4.2).without_face_in([3]);
        let frame = VideoFrame::solid(100, 200, [10, 10, 10], 0, 1);

        let face = recognition
            .detect_recognizable_face(&frame, Some(Rect::new(10.0, 20.0, 50.0, 100.0)))
            .await
            .unwrap();
        assert_eq!(face.template, "template-1");
        assert!((face.x - 10.0).abs() < 1e-9);
        assert!((face.height - 50.0).abs() < 1e-9);

        let faceless = VideoFrame::solid(100, 200, [10, 10, 10], 0, 3);
        assert!(matches!(
            recognition.detect_recognizable_face(&faceless, None).await,
            Err(RecognitionError::NoFace)
        ));

        let score = recognition
            .compare_face_template_to_templates("a", &["b".to_string()])
            .await
            .unwrap();
        assert_eq!(score, 4.2);
        assert_eq!(recognition.detect_calls(), 2);
        assert_eq!(recognition.compare_calls(), 1);
    }
}

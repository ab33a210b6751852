//! HTTP client for the recognition service

use crate::{FaceRecognition, RecognitionConfig, RecognitionError, RecognizableFace};
use async_trait::async_trait;
use camera_capture::VideoFrame;
use face_geometry::{Rect, Size};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Serialize)]
struct CompareRequest<'a> {
    target: &'a str,
    faces: &'a [String],
}

/// Recognition service reached over HTTP
pub struct HttpFaceRecognition {
    service_url: String,
    client: reqwest::Client,
}

impl HttpFaceRecognition {
    pub fn new(config: &RecognitionConfig) -> Result<Self, RecognitionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            service_url: config.service_url.trim_end_matches(|c: char| c == '/' || c.is_whitespace()).to_string(),
            client,
        })
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }
}

#[async_trait]
impl FaceRecognition for HttpFaceRecognition {
    #[instrument(skip(self, frame), fields(sequence = frame.sequence))]
    async fn detect_recognizable_face(
        &self,
        frame: &VideoFrame,
        face_rect: Option<Rect>,
    ) -> Result<RecognizableFace, RecognitionError> {
        let image_size = frame.size();
        let crop_rect = adjust_crop_rect(image_size, face_rect);
        let body = match face_rect {
            Some(_) => frame.crop(&crop_rect)?.to_jpeg()?,
            None => frame.to_jpeg()?,
        };

        let response = self
            .client
            .post(format!("{}/detect_face", self.service_url))
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RecognitionError::Status(response.status().as_u16()));
        }

        let face: RecognizableFace = response
            .json()
            .await
            .map_err(|e| RecognitionError::InvalidResponse(e.to_string()))?;
        if face.width <= 0.0 || face.height <= 0.0 || face.template.is_empty() {
            return Err(RecognitionError::NoFace);
        }

        let bounds = crop_percent_to_image_percent(&face.bounds(), image_size, &crop_rect);
        debug!(quality = face.quality, "Recognizable face detected");
        Ok(RecognizableFace {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            ..face
        })
    }

    async fn compare_face_template_to_templates(
        &self,
        template: &str,
        templates: &[String],
    ) -> Result<f64, RecognitionError> {
        let response = self
            .client
            .post(format!("{}/compare_faces", self.service_url))
            .header(reqwest::header::ACCEPT, "text/plain")
            .json(&CompareRequest {
                target: template,
                faces: templates,
            })
            .send()
            .await?;
        if response.status().as_u16() >= 400 {
            return Err(RecognitionError::Status(response.status().as_u16()));
        }
        let text = response.text().await?;
        text.trim()
            .parse::<f64>()
            .map_err(|_| RecognitionError::InvalidResponse(format!("not a score: {text:?}")))
    }
}

/// Grow a face rectangle by 10% on each side, clipped to the image
///
/// Without a face rectangle the whole image is used.
pub fn adjust_crop_rect(image_size: Size, face_rect: Option<Rect>) -> Rect {
    let Some(rect) = face_rect else {
        return Rect::from_size(image_size);
    };
    let x = (rect.x - rect.width * 0.1).max(0.0);
    let y = (rect.y - rect.height * 0.1).max(0.0);
    let mut width = rect.width * 1.2;
    let mut height = rect.height * 1.2;
    if x + width > image_size.width {
        width = image_size.width - x;
    }
    if y + height > image_size.height {
        height = image_size.height - y;
    }
    Rect::new(x, y, width, height)
}

/// Convert bounds in percent of a crop to percent of the whole image
fn crop_percent_to_image_percent(bounds: &Rect, image_size: Size, crop_rect: &Rect) -> Rect {
    let pixels = Rect::new(
        crop_rect.x + bounds.x / 100.0 * crop_rect.width,
        crop_rect.y + bounds.y / 100.0 * crop_rect.height,
        bounds.width / 100.0 * crop_rect.width,
        bounds.height / 100.0 * crop_rect.height,
    );
    pixels.scaled_by(100.0 / image_size.width, 100.0 / image_size.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: &Rect, b: &Rect) -> bool {
        (a.x - b.x).abs() < 1e-9
            && (a.y - b.y).abs() < 1e-9
            && (a.width - b.width).abs() < 1e-9
            && (a.height - b.height).abs() < 1e-9
    }

    #[test]
    fn test_adjust_crop_rect_grows_ten_percent() {
        let size = Size::new(1000.0, 1000.0);
        let crop = adjust_crop_rect(size, Some(Rect::new(100.0, 200.0, 100.0, 200.0)));
        assert!(approx(&crop, &Rect::new(90.0, 180.0, 120.0, 240.0)));
    }

    #[test]
    fn test_adjust_crop_rect_clips() {
        let size = Size::new(200.0, 100.0);
        let crop = adjust_crop_rect(size, Some(Rect::new(5.0, 0.0, 190.0, 95.0)));
        assert_eq!(crop.x, 0.0);
        assert_eq!(crop.y, 0.0);
        assert!((crop.right() - 200.0).abs() < 1e-9);
        assert!((crop.bottom() - 100.0).abs() < 1e-9);

        assert_eq!(adjust_crop_rect(size, None), Rect::new(0.0, 0.0, 200.0, 100.0));
    }

    #[test]
    fn test_crop_coordinates_to_image() {
        let size = Size::new(400.0, 200.0);
        let crop = Rect::new(100.0, 50.0, 200.0, 100.0);
        // Face covering the middle half of the crop
        let bounds = crop_percent_to_image_percent(&Rect::new(25.0, 25.0, 50.0, 50.0), size, &crop);
        assert!(approx(&bounds, &Rect::new(37.5, 37.5, 25.0, 25.0)));
    }

    #[test]
    fn test_service_url_trailing_slash_removed() {
        let config = RecognitionConfig {
            service_url: "http://faces.local/api/ ".to_string(),
            timeout_ms: 500,
        };
        let recognition = HttpFaceRecognition::new(&config).unwrap();
        assert_eq!(recognition.service_url(), "http://faces.local/api");
    }
}

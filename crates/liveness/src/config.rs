//! Liveness session configuration

use crate::LivenessError;
use face_geometry::{Bearing, Rect, Size, DEFAULT_THRESHOLD_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a face is expected in relation to the camera frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceExtents {
    /// Face width as a proportion of a portrait view's width
    pub proportion_of_view_width: f64,
    /// Face height as a proportion of a landscape view's height
    pub proportion_of_view_height: f64,
}

impl Default for FaceExtents {
    fn default() -> Self {
        Self {
            proportion_of_view_width: 0.65,
            proportion_of_view_height: 0.85,
        }
    }
}

/// Liveness session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Use the front-facing (selfie) camera
    pub use_front_camera: bool,

    /// Face captures collected per session
    pub face_capture_count: usize,

    /// Maximum session duration (seconds)
    pub max_duration: f64,

    /// Yaw at which a face counts as turned (degrees)
    pub yaw_threshold: f64,

    /// Pitch at which a face counts as tilted (degrees)
    pub pitch_threshold: f64,

    /// Consecutive faces that must match a bearing before it is accepted
    pub face_capture_face_count: usize,

    /// Pause after the face is fixed so the prompt can be read (seconds)
    pub pause_duration: f64,

    pub expected_face_extents: FaceExtents,

    /// Pool the requested bearings are drawn from
    pub bearings: Vec<Bearing>,

    pub record_session_video: bool,

    /// Minimum control face similarity score
    pub control_face_similarity_threshold: f64,

    /// Spacing of control face captures (milliseconds)
    pub control_face_capture_interval: u64,

    pub max_control_face_count: usize,

    /// Minimum face detection rate
    pub min_fps: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            use_front_camera: true,
            face_capture_count: 2,
            max_duration: 30.0,
            yaw_threshold: 28.0,
            pitch_threshold: 10.0,
            face_capture_face_count: 3,
            pause_duration: 0.5,
            expected_face_extents: FaceExtents::default(),
            bearings: vec![
                Bearing::Straight,
                Bearing::Left,
                Bearing::Right,
                Bearing::LeftUp,
                Bearing::RightUp,
            ],
            record_session_video: false,
            control_face_similarity_threshold: 3.7,
            control_face_capture_interval: 500,
            max_control_face_count: 4,
            min_fps: 3.5,
        }
    }
}

impl SessionSettings {
    /// Create strict config (more poses, wider turns)
    pub fn strict() -> Self {
        Self {
            face_capture_count: 3,
            yaw_threshold: 32.0,
            pitch_threshold: 12.0,
            control_face_similarity_threshold: 4.0,
            min_fps: 5.0,
            ..Default::default()
        }
    }

    /// Create lenient config (fewer consecutive faces, smaller turns)
    pub fn lenient() -> Self {
        Self {
            max_duration: 60.0,
            yaw_threshold: 22.0,
            pitch_threshold: 8.0,
            face_capture_face_count: 2,
            control_face_similarity_threshold: 3.2,
            min_fps: 2.0,
            ..Default::default()
        }
    }

    /// Load settings from an optional TOML file, then `LIVENESS_*` environment variables
    ///
    /// Keys missing from both keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, LivenessError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        let settings: SessionSettings = builder
            .add_source(
                ::config::Environment::with_prefix("LIVENESS")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("bearings"),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| LivenessError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings a session cannot run with
    pub fn validate(&self) -> Result<(), LivenessError> {
        let invalid = |msg: String| Err(LivenessError::InvalidSettings(msg));
        if self.face_capture_count == 0 {
            return invalid("face_capture_count must be at least 1".into());
        }
        if self.face_capture_face_count == 0 {
            return invalid("face_capture_face_count must be at least 1".into());
        }
        if !(self.max_duration > 0.0) {
            return invalid(format!("max_duration must be positive, got {}", self.max_duration));
        }
        if !(self.yaw_threshold > DEFAULT_THRESHOLD_TOLERANCE) {
            return invalid(format!(
                "yaw_threshold must exceed the {DEFAULT_THRESHOLD_TOLERANCE} degree tolerance, got {}",
                self.yaw_threshold
            ));
        }
        if !(self.pitch_threshold > DEFAULT_THRESHOLD_TOLERANCE) {
            return invalid(format!(
                "pitch_threshold must exceed the {DEFAULT_THRESHOLD_TOLERANCE} degree tolerance, got {}",
                self.pitch_threshold
            ));
        }
        if self.pause_duration < 0.0 {
            return invalid("pause_duration cannot be negative".into());
        }
        if self.bearings.is_empty() {
            return invalid("bearings cannot be empty".into());
        }
        let extents = self.expected_face_extents;
        for proportion in [extents.proportion_of_view_width, extents.proportion_of_view_height] {
            if !(proportion > 0.0 && proportion <= 1.0) {
                return invalid(format!("face extents must be in (0, 1], got {proportion}"));
            }
        }
        if self.min_fps < 0.0 {
            return invalid("min_fps cannot be negative".into());
        }
        Ok(())
    }

    /// Where the session expects a face in an image of the given size
    pub fn expected_face_rect(&self, image_size: Size) -> Rect {
        let (width, height) = if image_size.width > image_size.height {
            let height = image_size.height * self.expected_face_extents.proportion_of_view_height;
            (height / 1.25, height)
        } else {
            let width = image_size.width * self.expected_face_extents.proportion_of_view_width;
            (width, width * 1.25)
        };
        Rect::new(
            image_size.width / 2.0 - width / 2.0,
            image_size.height / 2.0 - height / 2.0,
            width,
            height,
        )
    }

    /// Pause duration in milliseconds
    pub fn pause_duration_ms(&self) -> f64 {
        self.pause_duration * 1000.0
    }

    /// Maximum duration in milliseconds
    pub fn max_duration_ms(&self) -> f64 {
        self.max_duration * 1000.0
    }
}

//! Liveness detection session
//!
//! The driver passes every frame through the stages in order:
//! [`detect_face_presence`](LivenessDetectionSession::detect_face_presence),
//! [`detect_face_alignment`](LivenessDetectionSession::detect_face_alignment),
//! [`detect_spoof_attempt`](LivenessDetectionSession::detect_spoof_attempt) and
//! [`record_control_capture`](LivenessDetectionSession::record_control_capture).
//! Aligned captures are then enriched with
//! [`create_face_capture`](LivenessDetectionSession::create_face_capture) and,
//! once enough are collected, turned into a result.

use crate::bearings::BearingSequence;
use crate::capture::{FaceCapture, LivenessDetectionSessionResult};
use crate::check::{LivenessCheck, VideoRecorder, MIN_LIVENESS_SCORE};
use crate::config::SessionSettings;
use crate::detector::Face;
use crate::requirements::{AcceptedFace, FaceRequirementListener, FaceRequirements, IdealFace, Range};
use crate::state::{FaceAlignmentStatus, SessionState};
use crate::LivenessError;
use camera_capture::VideoFrame;
use chrono::{DateTime, Utc};
use face_geometry::{AngleBearingEvaluation, Bearing, Rect, Size};
use face_recognition::FaceRecognition;
use std::f64::consts::{FRAC_PI_4, PI};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Callback invoked with a processed capture
pub type FaceCaptureCallback = Box<dyn Fn(&FaceCapture) + Send + Sync>;

/// Frame margin, as a share of the shorter side, inside which a vanished face is suspicious
const MOVED_TOO_FAR_MARGIN: f64 = 0.05;

/// One liveness detection session
pub struct LivenessDetectionSession {
    id: Uuid,
    settings: SessionSettings,
    evaluation: AngleBearingEvaluation,
    face_recognition: Arc<dyn FaceRecognition>,
    liveness_check: Option<Arc<dyn LivenessCheck>>,
    video_recorder: Option<Box<dyn VideoRecorder>>,
    face_detection_callback: Option<FaceCaptureCallback>,
    face_capture_callback: Option<FaceCaptureCallback>,
    requirement_listeners: Vec<Box<dyn FaceRequirementListener>>,
    image_size: Option<Size>,
    /// Bearing whose requirements wait for the image size
    pending_requirements_bearing: Option<Bearing>,
    bearings: BearingSequence,
    bearing_seed: Option<u64>,
    state: SessionState,
    start_time: DateTime<Utc>,
    closed: bool,
}

impl LivenessDetectionSession {
    /// Create a new session with validated settings
    pub fn new(
        settings: SessionSettings,
        face_recognition: Arc<dyn FaceRecognition>,
    ) -> Result<Self, LivenessError> {
        settings.validate()?;
        let evaluation =
            AngleBearingEvaluation::with_thresholds(settings.yaw_threshold, settings.pitch_threshold);
        let bearings = BearingSequence::new(
            settings.bearings.clone(),
            settings.face_capture_count,
            evaluation,
        );
        let session = Self {
            id: Uuid::new_v4(),
            state: SessionState::new(settings.face_capture_face_count),
            evaluation,
            face_recognition,
            liveness_check: None,
            video_recorder: None,
            face_detection_callback: None,
            face_capture_callback: None,
            requirement_listeners: Vec::new(),
            image_size: None,
            pending_requirements_bearing: Some(Bearing::Straight),
            bearings,
            bearing_seed: None,
            start_time: Utc::now(),
            closed: false,
            settings,
        };
        info!(session = %session.id, captures = session.settings.face_capture_count, "Liveness session created");
        Ok(session)
    }

    /// Draw bearings from a seeded generator
    pub fn with_bearing_seed(mut self, seed: u64) -> Self {
        self.bearing_seed = Some(seed);
        self.bearings = self.new_bearing_sequence();
        self
    }

    pub fn with_liveness_check(mut self, check: Arc<dyn LivenessCheck>) -> Self {
        self.liveness_check = Some(check);
        self
    }

    /// Recorder used when `record_session_video` is set
    pub fn with_video_recorder(mut self, recorder: Box<dyn VideoRecorder>) -> Self {
        self.video_recorder = Some(recorder);
        self
    }

    /// Called for every processed frame
    pub fn on_face_detected(mut self, callback: FaceCaptureCallback) -> Self {
        self.face_detection_callback = Some(callback);
        self
    }

    /// Called for every accepted capture
    pub fn on_face_captured(mut self, callback: FaceCaptureCallback) -> Self {
        self.face_capture_callback = Some(callback);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn evaluation(&self) -> &AngleBearingEvaluation {
        &self.evaluation
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn requested_bearing(&self) -> Bearing {
        self.bearings.current()
    }

    pub fn alignment_status(&self) -> FaceAlignmentStatus {
        self.state.alignment_status
    }

    pub fn aligned_face_count(&self) -> usize {
        self.state.aligned_face_count
    }

    pub fn control_capture_count(&self) -> usize {
        self.state.control_captures.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn register_face_requirement_listener(&mut self, listener: Box<dyn FaceRequirementListener>) {
        if let Some(size) = self.image_size {
            listener.on_change(&self.face_requirements(size, self.requested_bearing()));
        }
        self.requirement_listeners.push(listener);
    }

    /// Record the camera's image size, releasing any deferred requirement notification
    pub fn set_image_size(&mut self, size: Size) {
        if self.image_size == Some(size) {
            return;
        }
        self.image_size = Some(size);
        if let Some(bearing) = self.pending_requirements_bearing.take() {
            self.notify_face_requirement_listeners(bearing);
        }
    }

    /// Requirements a face must meet for `bearing`
    pub fn face_requirements(&self, image_size: Size, bearing: Bearing) -> FaceRequirements {
        let min_angle = self.evaluation.min_angle_for_bearing(bearing);
        let max_angle = self.evaluation.max_angle_for_bearing(bearing);
        let expected_bounds = self.settings.expected_face_rect(image_size);
        let mut accepted = AcceptedFace {
            left: Range::unbounded(),
            top: Range::unbounded(),
            right: Range::unbounded(),
            bottom: Range::unbounded(),
            yaw: Range::new(min_angle.yaw, max_angle.yaw),
            pitch: Range::new(min_angle.pitch, max_angle.pitch),
        };
        if !self.state.has_face_been_aligned {
            // Face must cover the inner box without leaving the image
            let max_rect = Rect::from_size(image_size);
            let inset = expected_bounds.width * 0.25;
            let min_rect = expected_bounds.inset(inset, inset);
            accepted.left = Range::new(max_rect.x, min_rect.x);
            accepted.top = Range::new(max_rect.y, min_rect.y);
            accepted.right = Range::new(min_rect.right(), max_rect.right());
            accepted.bottom = Range::new(min_rect.bottom(), max_rect.bottom());
        }
        FaceRequirements {
            image_size,
            ideal: IdealFace {
                bounds: expected_bounds,
                angle: self.evaluation.angle_for_bearing(bearing),
            },
            accepted,
        }
    }

    /// Track whether a face is present, smoothing its bounds and angle
    pub fn detect_face_presence(&mut self, capture: &mut FaceCapture) -> Result<(), LivenessError> {
        self.ensure_open()?;
        if let Some(face) = &capture.face {
            self.state.face_buffer.enqueue(face.clone());
            self.state.bounds_smoothing.add_sample(&face.bounds);
            self.state.angle_smoothing.add_sample(&face.angle);
        } else if self.state.aligned_face_count > 0
            && self.state.aligned_face_count < self.settings.face_capture_face_count
        {
            let was_empty = self.state.face_buffer.is_empty();
            self.state.face_buffer.dequeue();
            if !was_empty && self.state.face_buffer.is_empty() {
                warn!(session = %self.id, "Face lost");
                return Err(LivenessError::FaceLost);
            }
            self.state.bounds_smoothing.remove_first_sample();
            self.state.angle_smoothing.remove_first_sample();
            if let Some(last) = self.state.face_buffer.last() {
                if self.has_face_moved_too_far(last, capture.image_size) {
                    warn!(session = %self.id, "Face vanished from a plausible position");
                    return Err(LivenessError::FaceMovedTooFar);
                }
            }
        }
        capture.face_bounds = self.state.bounds_smoothing.smoothed_value();
        capture.face_angle = self.state.angle_smoothing.smoothed_value();
        self.record_angle_distance_and_trajectory(capture);
        Ok(())
    }

    /// Update the alignment status from the most recent buffered face
    pub fn detect_face_alignment(&mut self, capture: &mut FaceCapture) {
        match self.state.face_buffer.last().cloned() {
            Some(face) => self.set_face_alignment_from_face(&face, capture),
            None => self.state.alignment_status = FaceAlignmentStatus::Found,
        }
        capture.face_alignment_status = self.state.alignment_status;
    }

    /// Reject head movement that left the corridor between accepted bearings
    pub fn detect_spoof_attempt(&mut self, capture: &FaceCapture) -> Result<(), LivenessError> {
        let angle = capture
            .face
            .as_ref()
            .or_else(|| self.state.face_buffer.last())
            .map(|face| face.angle);
        let Some(angle) = angle else {
            self.state.angle_history.clear();
            return Ok(());
        };
        if capture.face_alignment_status != FaceAlignmentStatus::Aligned {
            self.state.angle_history.push(angle);
            return Ok(());
        }
        if self.moved_opposite() {
            warn!(session = %self.id, transition = ?self.state.last_transition, "Head moved outside the expected path");
            return Err(LivenessError::MovedOpposite);
        }
        self.state.angle_history.clear();
        Ok(())
    }

    /// Keep periodic face frames for the final control-face comparison
    pub fn record_control_capture(&mut self, capture: &FaceCapture) {
        if capture.face.is_none() {
            return;
        }
        let now = capture.time_ms;
        let aligned = capture.face_alignment_status == FaceAlignmentStatus::Aligned;
        match self.state.last_control_time {
            None if aligned => self.state.last_control_time = Some(now),
            Some(last)
                if aligned || now - last >= self.settings.control_face_capture_interval as f64 =>
            {
                self.state.last_control_time = Some(now);
                self.state.control_captures.push_back(capture.clone());
                while self.state.control_captures.len() > self.settings.max_control_face_count {
                    self.state.control_captures.pop_front();
                }
                debug!(session = %self.id, count = self.state.control_captures.len(), "Control face captured");
            }
            _ => {}
        }
    }

    /// Invoke the per-frame callback
    pub fn notify_face_detected(&self, capture: &FaceCapture) {
        if let Some(callback) = &self.face_detection_callback {
            callback(capture);
        }
    }

    /// Invoke the accepted-capture callback
    pub fn notify_face_captured(&self, capture: &FaceCapture) {
        if let Some(callback) = &self.face_capture_callback {
            callback(capture);
        }
    }

    /// Pass a frame to the video recorder when recording is enabled
    pub fn record_video_frame(&mut self, frame: &VideoFrame) -> Result<(), LivenessError> {
        if !self.settings.record_session_video {
            return Ok(());
        }
        match self.video_recorder.as_mut() {
            Some(recorder) => recorder.record_frame(frame),
            None => Ok(()),
        }
    }

    /// Attach a recognition template to frontal captures that lack one
    pub async fn create_face_capture(&self, mut capture: FaceCapture) -> Result<FaceCapture, LivenessError> {
        if capture.requested_bearing == Bearing::Straight && capture.template().is_none() {
            let bounds = capture.face.as_ref().map(|face| face.bounds);
            let recognizable = self
                .face_recognition
                .detect_recognizable_face(&capture.frame, bounds)
                .await?;
            if let Some(face) = capture.face.as_mut() {
                face.template = Some(recognizable.template);
            }
            debug!(session = %self.id, "Recognition template attached");
        }
        Ok(capture)
    }

    /// Cross-check control faces and assemble the session result
    pub async fn result_from_captures(
        &mut self,
        mut captures: Vec<FaceCapture>,
    ) -> Result<LivenessDetectionSessionResult, LivenessError> {
        if !self.state.control_captures.is_empty() {
            let score = self.control_face_score(&captures).await?;
            if score < self.settings.control_face_similarity_threshold {
                warn!(session = %self.id, score, "Control faces do not match captured faces");
                return Err(LivenessError::PossibleSpoofAttempt);
            }
        }
        captures.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));

        let video_url = match self.video_recorder.as_mut() {
            Some(recorder) if self.settings.record_session_video => Some(recorder.finish().await?),
            _ => None,
        };
        Ok(LivenessDetectionSessionResult::new(self.start_time, captures, video_url))
    }

    /// Run the passive liveness check on the frontal capture, if configured
    pub async fn check_liveness(
        &self,
        mut result: LivenessDetectionSessionResult,
    ) -> Result<LivenessDetectionSessionResult, LivenessError> {
        let Some(check) = &self.liveness_check else {
            return Ok(result);
        };
        let capture = result
            .straight_capture()
            .ok_or(LivenessError::MissingStraightCapture)?;
        let score = check.check_liveness(&capture.frame).await?;
        result.liveness_score = Some(score);
        if score < MIN_LIVENESS_SCORE {
            warn!(session = %self.id, score, "Liveness check failed");
            return Err(LivenessError::LivenessCheckFailed(score));
        }
        Ok(result)
    }

    /// Close the session and reset all state
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.cleanup();
            info!(session = %self.id, "Liveness session closed");
        }
    }

    fn cleanup(&mut self) {
        self.state.reset();
        self.bearings = self.new_bearing_sequence();
        self.notify_face_requirement_listeners(Bearing::Straight);
    }

    fn ensure_open(&self) -> Result<(), LivenessError> {
        if self.closed {
            return Err(LivenessError::SessionClosed);
        }
        Ok(())
    }

    fn new_bearing_sequence(&self) -> BearingSequence {
        let pool = self.settings.bearings.clone();
        let length = self.settings.face_capture_count;
        match self.bearing_seed {
            Some(seed) => BearingSequence::seeded(pool, length, self.evaluation, seed),
            None => BearingSequence::new(pool, length, self.evaluation),
        }
    }

    fn advance_bearing(&mut self) {
        if let Some(bearing) = self.bearings.advance() {
            info!(session = %self.id, %bearing, "Requested bearing changed");
            self.notify_face_requirement_listeners(bearing);
        }
    }

    fn notify_face_requirement_listeners(&mut self, bearing: Bearing) {
        let Some(size) = self.image_size else {
            self.pending_requirements_bearing = Some(bearing);
            return;
        };
        let requirements = self.face_requirements(size, bearing);
        for listener in &self.requirement_listeners {
            listener.on_change(&requirements);
        }
    }

    fn is_face_fixed_in_image_size(&self, bounds: &Rect, image_size: Size) -> bool {
        self.face_requirements(image_size, self.requested_bearing())
            .bounds_accepted(bounds)
    }

    fn are_all_buffered_faces_aligned(&self, image_size: Size) -> bool {
        let requirements = self.face_requirements(image_size, self.requested_bearing());
        self.state
            .face_buffer
            .iter()
            .all(|face| requirements.angle_accepted(&face.angle))
    }

    fn set_face_alignment_from_face(&mut self, face: &Face, capture: &mut FaceCapture) {
        let now = capture.time_ms;
        let bearing = self.requested_bearing();
        if self.state.alignment_status == FaceAlignmentStatus::Aligned {
            self.state.alignment_status = FaceAlignmentStatus::Fixed;
            self.state.fix_time = Some(now);
        }
        let pause_elapsed = self
            .state
            .fix_time
            .map_or(false, |fix_time| now - fix_time > self.settings.pause_duration_ms());

        if self.state.alignment_status == FaceAlignmentStatus::Found
            && self.is_face_fixed_in_image_size(&face.bounds, capture.image_size)
        {
            self.state.fix_time = Some(now);
            self.state.alignment_status = FaceAlignmentStatus::Fixed;
            debug!(session = %self.id, "Face fixed");
        } else if pause_elapsed && self.state.face_buffer.is_full() {
            if !self.are_all_buffered_faces_aligned(capture.image_size) {
                if self.state.alignment_status != FaceAlignmentStatus::Misaligned {
                    debug!(session = %self.id, %bearing, "Face misaligned");
                }
                self.state.alignment_status = FaceAlignmentStatus::Misaligned;
                let angle = capture.face_angle.unwrap_or_default();
                capture.offset_angle_from_bearing =
                    Some(self.evaluation.offset_from_angle_to_bearing(&angle, bearing));
            } else {
                self.state.face_buffer.clear();
                self.state.alignment_status = FaceAlignmentStatus::Aligned;
                self.state.fix_time = Some(now);
                self.state.aligned_face_count += 1;
                self.state.has_face_been_aligned = true;
                self.state.last_transition = Some((self.state.previous_bearing, bearing));
                self.state.previous_bearing = bearing;
                info!(
                    session = %self.id,
                    %bearing,
                    aligned = self.state.aligned_face_count,
                    "Face aligned"
                );
                self.advance_bearing();
            }
        }
    }

    fn has_face_moved_too_far(&self, face: &Face, image_size: Size) -> bool {
        let requested = self
            .evaluation
            .angle_for_bearing(self.requested_bearing())
            .screen_angle();
        let detected = face.angle.screen_angle();
        let margin = image_size.min_side() * MOVED_TOO_FAR_MARGIN;
        let safe_area = Rect::from_size(image_size).inset(margin, margin);
        // Wrapped into [-π, π) so bearings on the ±π seam compare correctly
        let difference = (detected - requested + PI).rem_euclid(2.0 * PI) - PI;
        safe_area.contains(&face.bounds) && difference.abs() < FRAC_PI_4
    }

    fn moved_opposite(&self) -> bool {
        match self.state.last_transition {
            Some((from, to)) if from != to => self
                .state
                .angle_history
                .iter()
                .any(|angle| !self.evaluation.is_angle_between_bearings(angle, from, to)),
            _ => false,
        }
    }

    fn record_angle_distance_and_trajectory(&mut self, capture: &mut FaceCapture) {
        capture.angle_trajectory = None;
        capture.angle_distance = 0.0;
        let Some(current) = capture.face_angle else {
            self.state.previous_face_angle = None;
            return;
        };
        if let Some(previous) = self.state.previous_face_angle {
            let target = self.evaluation.angle_for_bearing(self.requested_bearing());
            let previous_to_target = (previous.pitch - target.pitch).atan2(previous.yaw - target.yaw);
            let previous_to_current = (previous.pitch - current.pitch).atan2(previous.yaw - current.yaw);
            let previous_bearing_angle = self.evaluation.angle_for_bearing(self.state.previous_bearing);
            let bearing_distance = target.distance_to(&previous_bearing_angle);
            if bearing_distance != 0.0 {
                capture.angle_distance = (target.distance_to(&current) / bearing_distance).min(1.0);
            }
            capture.angle_trajectory = Some(1.0 - ((previous_to_target - previous_to_current) / PI).abs());
        }
        self.state.previous_face_angle = Some(current);
    }

    /// Lowest similarity between any aligned capture and the control faces
    ///
    /// Passes with the threshold itself when there is nothing to compare.
    async fn control_face_score(&self, captures: &[FaceCapture]) -> Result<f64, LivenessError> {
        let threshold = self.settings.control_face_similarity_threshold;
        let mut control_templates = Vec::new();
        for control in &self.state.control_captures {
            let bounds = control.face.as_ref().map(|face| face.bounds);
            match self
                .face_recognition
                .detect_recognizable_face(&control.frame, bounds)
                .await
            {
                Ok(face) => control_templates.push(face.template),
                Err(e) => {
                    warn!(session = %self.id, sequence = control.frame.sequence, error = %e, "Skipping control face")
                }
            }
        }
        if control_templates.is_empty() {
            return Ok(threshold);
        }

        let capture_templates: Vec<&str> = captures
            .iter()
            .filter(|capture| capture.face_alignment_status == FaceAlignmentStatus::Aligned)
            .filter_map(|capture| capture.template())
            .collect();
        if capture_templates.is_empty() {
            return Ok(threshold);
        }

        let mut min_score = f64::INFINITY;
        for template in capture_templates {
            let score = self
                .face_recognition
                .compare_face_template_to_templates(template, &control_templates)
                .await?;
            min_score = min_score.min(score);
        }
        debug!(session = %self.id, score = min_score, controls = control_templates.len(), "Control faces compared");
        Ok(min_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::InMemoryVideoRecorder;
    use async_trait::async_trait;
    use face_geometry::Angle;
    use face_recognition::MockFaceRecognition;
    use std::sync::Mutex;

    const WIDTH: u32 = 120;
    const HEIGHT: u32 = 160;

    fn two_bearing_settings() -> SessionSettings {
        SessionSettings {
            bearings: vec![Bearing::Straight, Bearing::Left],
            ..Default::default()
        }
    }

    fn session_with(settings: SessionSettings, recognition: MockFaceRecognition) -> LivenessDetectionSession {
        LivenessDetectionSession::new(settings, Arc::new(recognition))
            .unwrap()
            .with_bearing_seed(7)
    }

    fn session() -> LivenessDetectionSession {
        session_with(two_bearing_settings(), MockFaceRecognition::new())
    }

    fn image_size() -> Size {
        Size::new(f64::from(WIDTH), f64::from(HEIGHT))
    }

    fn face(yaw: f64, pitch: f64) -> Face {
        let bounds = SessionSettings::default().expected_face_rect(image_size());
        Face::new(bounds, Angle::yaw_pitch(yaw, pitch))
    }

    /// Run one frame at `time_ms` through the per-frame stages
    fn feed(
        session: &mut LivenessDetectionSession,
        time_ms: u64,
        face: Option<Face>,
    ) -> Result<FaceCapture, LivenessError> {
        let frame = VideoFrame::solid(WIDTH, HEIGHT, [120, 110, 100], time_ms * 1_000_000, (time_ms / 100) as u32);
        let mut capture = FaceCapture::new(frame, face);
        session.set_image_size(capture.image_size);
        capture.requested_bearing = session.requested_bearing();
        session.detect_face_presence(&mut capture)?;
        session.detect_face_alignment(&mut capture);
        session.detect_spoof_attempt(&capture)?;
        session.record_control_capture(&capture);
        Ok(capture)
    }

    /// Hold a straight face until the first bearing is accepted
    fn align_straight(session: &mut LivenessDetectionSession) -> FaceCapture {
        let mut aligned = None;
        for i in 0..=6 {
            let capture = feed(session, i * 100, Some(face(0.0, 0.0))).unwrap();
            if capture.face_alignment_status == FaceAlignmentStatus::Aligned {
                aligned = Some(capture);
            }
        }
        aligned.expect("straight face should align")
    }

    struct FixedLiveness(f64);

    #[async_trait]
    impl LivenessCheck for FixedLiveness {
        async fn check_liveness(&self, _frame: &VideoFrame) -> Result<f64, LivenessError> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_happy_path_aligns_once() {
        let mut session = session();
        let mut statuses = Vec::new();
        for i in 0..=6 {
            let capture = feed(&mut session, i * 100, Some(face(0.0, 0.0))).unwrap();
            statuses.push(capture.face_alignment_status);
        }
        assert_eq!(statuses[0], FaceAlignmentStatus::Fixed);
        assert!(statuses[1..6].iter().all(|s| *s == FaceAlignmentStatus::Fixed));
        assert_eq!(statuses[6], FaceAlignmentStatus::Aligned);
        assert_eq!(session.aligned_face_count(), 1);
        assert_eq!(session.requested_bearing(), Bearing::Left);

        // Holding the old pose never aligns again
        for i in 7..=13 {
            let capture = feed(&mut session, i * 100, Some(face(0.0, 0.0))).unwrap();
            assert_ne!(capture.face_alignment_status, FaceAlignmentStatus::Aligned);
        }
        assert_eq!(session.aligned_face_count(), 1);
        assert_eq!(session.alignment_status(), FaceAlignmentStatus::Misaligned);
    }

    #[test]
    fn test_pause_must_elapse_before_alignment() {
        let mut session = session();
        // Buffer is full after 3 frames but only 200ms have passed
        for i in 0..3 {
            let capture = feed(&mut session, i * 100, Some(face(0.0, 0.0))).unwrap();
            assert_eq!(capture.face_alignment_status, FaceAlignmentStatus::Fixed);
        }
        // Exactly the pause duration is not enough
        let capture = feed(&mut session, 500, Some(face(0.0, 0.0))).unwrap();
        assert_eq!(capture.face_alignment_status, FaceAlignmentStatus::Fixed);
        let capture = feed(&mut session, 501, Some(face(0.0, 0.0))).unwrap();
        assert_eq!(capture.face_alignment_status, FaceAlignmentStatus::Aligned);
    }

    #[test]
    fn test_face_outside_expected_region_is_not_fixed() {
        let mut session = session();
        let small = Face::new(Rect::new(50.0, 70.0, 20.0, 20.0), Angle::default());
        for i in 0..10 {
            let capture = feed(&mut session, i * 100, Some(small.clone())).unwrap();
            assert_eq!(capture.face_alignment_status, FaceAlignmentStatus::Found);
        }
    }

    #[test]
    fn test_misaligned_reports_offset() {
        let mut session = session();
        align_straight(&mut session);
        let mut last = None;
        for i in 7..=13 {
            last = Some(feed(&mut session, i * 100, Some(face(0.0, 0.0))).unwrap());
        }
        let capture = last.unwrap();
        assert_eq!(capture.face_alignment_status, FaceAlignmentStatus::Misaligned);
        let offset = capture.offset_angle_from_bearing.unwrap();
        assert!(offset.yaw > 0.0);
        assert_eq!(offset.pitch, 0.0);
    }

    #[test]
    fn test_moved_opposite_raises() {
        let mut session = session();
        align_straight(&mut session);
        assert_eq!(session.requested_bearing(), Bearing::Left);

        // Turn right first, then left
        feed(&mut session, 700, Some(face(-40.0, 0.0))).unwrap();
        feed(&mut session, 800, Some(face(-40.0, 0.0))).unwrap();
        let mut result = Ok(());
        for i in 9..=13 {
            if let Err(e) = feed(&mut session, i * 100, Some(face(35.0, 0.0))) {
                result = Err(e);
                break;
            }
        }
        assert!(matches!(result, Err(LivenessError::MovedOpposite)));
    }

    #[test]
    fn test_turn_within_corridor_is_accepted() {
        let mut session = session();
        align_straight(&mut session);
        for (i, yaw) in [(7, 10.0), (8, 20.0), (9, 35.0), (10, 35.0), (11, 35.0), (12, 35.0)] {
            feed(&mut session, i * 100, Some(face(yaw, 0.0))).unwrap();
        }
        let capture = feed(&mut session, 1300, Some(face(35.0, 0.0))).unwrap();
        assert_eq!(capture.face_alignment_status, FaceAlignmentStatus::Aligned);
        assert_eq!(session.aligned_face_count(), 2);
    }

    #[test]
    fn test_face_lost_after_alignment() {
        let mut session = session();
        align_straight(&mut session);
        feed(&mut session, 700, Some(face(0.0, 0.0))).unwrap();
        let result = feed(&mut session, 800, None);
        assert!(matches!(result, Err(LivenessError::FaceLost)));
    }

    #[test]
    fn test_missing_face_before_alignment_is_tolerated() {
        let mut session = session();
        feed(&mut session, 0, Some(face(0.0, 0.0))).unwrap();
        let capture = feed(&mut session, 100, None).unwrap();
        assert_eq!(capture.face_alignment_status, FaceAlignmentStatus::Fixed);
        assert!(capture.face_bounds.is_some());
    }

    #[test]
    fn test_face_moved_too_far() {
        let mut session = session();
        align_straight(&mut session);
        // Turning towards LEFT while well inside the frame
        feed(&mut session, 700, Some(face(10.0, 0.0))).unwrap();
        feed(&mut session, 800, Some(face(10.0, 0.0))).unwrap();
        let result = feed(&mut session, 900, None);
        assert!(matches!(result, Err(LivenessError::FaceMovedTooFar)));
    }

    #[test]
    fn test_face_moved_too_far_across_screen_angle_seam() {
        let mut session = session();
        align_straight(&mut session);
        // Turned left and tilted slightly up: screen angle just above -π, LEFT sits at π
        feed(&mut session, 700, Some(face(10.0, -1.0))).unwrap();
        feed(&mut session, 800, Some(face(10.0, -1.0))).unwrap();
        let result = feed(&mut session, 900, None);
        assert!(matches!(result, Err(LivenessError::FaceMovedTooFar)));
    }

    #[test]
    fn test_face_leaving_sideways_is_not_too_far() {
        let mut session = session();
        align_straight(&mut session);
        // Looking away from the requested bearing
        feed(&mut session, 700, Some(face(-10.0, 0.0))).unwrap();
        feed(&mut session, 800, Some(face(-10.0, 0.0))).unwrap();
        assert!(feed(&mut session, 900, None).is_ok());
    }

    #[test]
    fn test_angle_distance_and_trajectory() {
        let mut session = session();
        let first = feed(&mut session, 0, Some(face(0.0, 0.0))).unwrap();
        assert_eq!(first.angle_trajectory, None);
        assert_eq!(first.angle_distance, 0.0);

        align_straight(&mut session);
        let capture = feed(&mut session, 700, Some(face(14.0, 0.0))).unwrap();
        // Smoothed yaw is (0 * 4 + 14) / 5
        assert!((capture.face_angle.unwrap().yaw - 2.8).abs() < 1e-9);
        assert!((capture.angle_distance - 25.2 / 28.0).abs() < 1e-9);
        assert!((capture.angle_trajectory.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_requirement_listener_notifications() {
        let received: Arc<Mutex<Vec<FaceRequirements>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let mut session = session();
        session.register_face_requirement_listener(Box::new(move |requirements: &FaceRequirements| {
            sink.lock().unwrap().push(*requirements);
        }));
        assert!(received.lock().unwrap().is_empty());

        // The initial bearing is delivered once the image size is known
        session.set_image_size(image_size());
        {
            let received = received.lock().unwrap();
            assert_eq!(received.len(), 1);
            assert_eq!(received[0].ideal.angle, Angle::default());
            assert_eq!(received[0].accepted.left.from, 0.0);
            assert!(received[0].accepted.left.to.is_finite());
        }

        align_straight(&mut session);
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].ideal.angle.yaw, 28.0);
        assert_eq!(received[1].accepted.left, Range::unbounded());
        assert_eq!(received[1].accepted.yaw.from, 23.0);
    }

    #[test]
    fn test_control_captures_roll() {
        let mut session = session();
        align_straight(&mut session);
        assert_eq!(session.control_capture_count(), 0);
        for i in 7..=35 {
            feed(&mut session, i * 100, Some(face(0.0, 0.0))).unwrap();
        }
        // Captured at 1100, 1600, 2100, 2600 and 3100ms; the oldest dropped
        assert_eq!(session.control_capture_count(), 4);
        assert_eq!(session.state.control_captures[0].time_ms, 1600.0);
    }

    #[tokio::test]
    async fn test_create_face_capture_attaches_template() {
        let mut session = session();
        let aligned = align_straight(&mut session);
        let capture = session.create_face_capture(aligned).await.unwrap();
        assert_eq!(capture.template(), Some("template-6"));

        // Other bearings pass through untouched
        let mut left = feed(&mut session, 700, Some(face(30.0, 0.0))).unwrap();
        left.requested_bearing = Bearing::Left;
        let left = session.create_face_capture(left).await.unwrap();
        assert_eq!(left.template(), None);
    }

    #[tokio::test]
    async fn test_control_faces_reject_spoof() {
        let mut session = session_with(two_bearing_settings(), MockFaceRecognition::new().with_score(2.0));
        let aligned = align_straight(&mut session);
        let aligned = session.create_face_capture(aligned).await.unwrap();
        for i in 7..=20 {
            feed(&mut session, i * 100, Some(face(0.0, 0.0))).unwrap();
        }
        assert!(session.control_capture_count() > 0);

        let result = session.result_from_captures(vec![aligned]).await;
        assert!(matches!(result, Err(LivenessError::PossibleSpoofAttempt)));
    }

    #[tokio::test]
    async fn test_control_faces_pass_and_captures_sorted() {
        let mut session = session();
        let aligned = align_straight(&mut session);
        let aligned = session.create_face_capture(aligned).await.unwrap();
        let mut later = aligned.clone();
        later.time_ms = 9_000.0;
        later.requested_bearing = Bearing::Left;
        for i in 7..=20 {
            feed(&mut session, i * 100, Some(face(0.0, 0.0))).unwrap();
        }

        let result = session.result_from_captures(vec![later, aligned]).await.unwrap();
        assert_eq!(result.face_captures.len(), 2);
        assert_eq!(result.face_captures[0].time_ms, 600.0);
        assert_eq!(result.video_url, None);
        assert!(result.duration >= 0.0);
    }

    #[tokio::test]
    async fn test_failed_control_detections_are_skipped() {
        let recognition = MockFaceRecognition::new().with_score(0.0).without_face_in(0..100);
        let mut session = session_with(two_bearing_settings(), recognition);
        let mut aligned = align_straight(&mut session);
        if let Some(face) = aligned.face.as_mut() {
            face.template = Some("enrolled".to_string());
        }
        for i in 7..=20 {
            feed(&mut session, i * 100, Some(face(0.0, 0.0))).unwrap();
        }
        assert!(session.result_from_captures(vec![aligned]).await.is_ok());
    }

    #[tokio::test]
    async fn test_liveness_check() {
        let mut session = session().with_liveness_check(Arc::new(FixedLiveness(0.3)));
        let aligned = align_straight(&mut session);
        let result = session.result_from_captures(vec![aligned.clone()]).await.unwrap();
        let outcome = session.check_liveness(result).await;
        assert!(matches!(outcome, Err(LivenessError::LivenessCheckFailed(s)) if (s - 0.3).abs() < 1e-9));

        let session = session_with(two_bearing_settings(), MockFaceRecognition::new())
            .with_liveness_check(Arc::new(FixedLiveness(0.9)));
        let result = LivenessDetectionSessionResult::new(Utc::now(), vec![aligned.clone()], None);
        let result = session.check_liveness(result).await.unwrap();
        assert_eq!(result.liveness_score, Some(0.9));

        let mut left = aligned;
        left.requested_bearing = Bearing::Left;
        let result = LivenessDetectionSessionResult::new(Utc::now(), vec![left], None);
        assert!(matches!(
            session.check_liveness(result).await,
            Err(LivenessError::MissingStraightCapture)
        ));
    }

    #[tokio::test]
    async fn test_session_video_url() {
        let settings = SessionSettings {
            record_session_video: true,
            ..two_bearing_settings()
        };
        let mut session = session_with(settings, MockFaceRecognition::new())
            .with_video_recorder(Box::new(InMemoryVideoRecorder::new()));
        let frame = VideoFrame::solid(WIDTH, HEIGHT, [0, 0, 0], 0, 0);
        session.record_video_frame(&frame).unwrap();
        let result = session.result_from_captures(Vec::new()).await.unwrap();
        assert!(result.video_url.unwrap().starts_with("memory://"));
    }

    #[test]
    fn test_close_resets_and_rejects_frames() {
        let mut session = session();
        align_straight(&mut session);
        session.close();
        assert!(session.is_closed());
        assert_eq!(session.aligned_face_count(), 0);
        assert_eq!(session.requested_bearing(), Bearing::Straight);
        assert_eq!(session.alignment_status(), FaceAlignmentStatus::Found);
        assert!(matches!(
            feed(&mut session, 5000, Some(face(0.0, 0.0))),
            Err(LivenessError::SessionClosed)
        ));
        // Closing twice is harmless
        session.close();
    }

    #[test]
    fn test_callbacks() {
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let session = session().on_face_detected(Box::new(move |_: &FaceCapture| {
            *counter.lock().unwrap() += 1;
        }));
        let capture = FaceCapture::new(VideoFrame::solid(2, 2, [0, 0, 0], 0, 0), None);
        session.notify_face_detected(&capture);
        session.notify_face_captured(&capture);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = SessionSettings {
            face_capture_face_count: 0,
            ..Default::default()
        };
        let result = LivenessDetectionSession::new(settings, Arc::new(MockFaceRecognition::new()));
        assert!(matches!(result, Err(LivenessError::InvalidSettings(_))));
    }
}

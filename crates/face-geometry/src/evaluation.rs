//! Angle evaluation against requested bearings
//!
//! Each bearing has an ideal angle at the configured yaw/pitch thresholds.
//! A face matches the bearing when its yaw and pitch fall strictly inside a
//! window around that ideal. The window is unbounded on the side facing away
//! from the centre, so turning further than required still counts.

use crate::angle::Angle;
use crate::bearing::{Axis, Bearing};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Tolerance (degrees) applied to both axes by liveness sessions
pub const DEFAULT_THRESHOLD_TOLERANCE: f64 = 5.0;

/// Evaluates angles in relation to bearings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleBearingEvaluation {
    /// Yaw at which a face counts as turned left or right (degrees)
    pub yaw_threshold: f64,
    /// Pitch at which a face counts as tilted up or down (degrees)
    pub pitch_threshold: f64,
    pub yaw_tolerance: f64,
    pub pitch_tolerance: f64,
}

impl AngleBearingEvaluation {
    pub fn new(yaw_threshold: f64, pitch_threshold: f64, yaw_tolerance: f64, pitch_tolerance: f64) -> Self {
        Self {
            yaw_threshold,
            pitch_threshold,
            yaw_tolerance,
            pitch_tolerance,
        }
    }

    /// Evaluation with the default tolerance on both axes
    pub fn with_thresholds(yaw_threshold: f64, pitch_threshold: f64) -> Self {
        Self::new(
            yaw_threshold,
            pitch_threshold,
            DEFAULT_THRESHOLD_TOLERANCE,
            DEFAULT_THRESHOLD_TOLERANCE,
        )
    }

    pub fn threshold_angle_for_axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Yaw => self.yaw_threshold,
            Axis::Pitch => self.pitch_threshold,
        }
    }

    pub fn threshold_angle_tolerance_for_axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Yaw => self.yaw_tolerance,
            Axis::Pitch => self.pitch_tolerance,
        }
    }

    /// Ideal angle representing a bearing
    pub fn angle_for_bearing(&self, bearing: Bearing) -> Angle {
        let mut angle = Angle::default();
        if bearing.is_up() {
            angle.pitch = 0.0 - self.pitch_threshold;
        } else if bearing.is_down() {
            angle.pitch = self.pitch_threshold;
        }
        if bearing.is_left() {
            angle.yaw = self.yaw_threshold;
        } else if bearing.is_right() {
            angle.yaw = 0.0 - self.yaw_threshold;
        }
        angle
    }

    /// Lower edge of the acceptance window
    pub fn min_angle_for_bearing(&self, bearing: Bearing) -> Angle {
        let mut angle = Angle::default();
        angle.pitch = if bearing.is_up() {
            f64::NEG_INFINITY
        } else if bearing.is_down() {
            self.pitch_threshold - self.pitch_tolerance
        } else {
            0.0 - self.pitch_threshold + self.pitch_tolerance
        };
        angle.yaw = if bearing.is_left() {
            self.yaw_threshold - self.yaw_tolerance
        } else if bearing.is_right() {
            f64::NEG_INFINITY
        } else {
            0.0 - self.yaw_threshold + self.yaw_tolerance
        };
        angle
    }

    /// Upper edge of the acceptance window
    pub fn max_angle_for_bearing(&self, bearing: Bearing) -> Angle {
        let mut angle = Angle::default();
        angle.pitch = if bearing.is_up() {
            0.0 - self.pitch_threshold + self.pitch_tolerance
        } else if bearing.is_down() {
            f64::INFINITY
        } else {
            self.pitch_threshold - self.pitch_tolerance
        };
        angle.yaw = if bearing.is_left() {
            f64::INFINITY
        } else if bearing.is_right() {
            0.0 - self.yaw_threshold + self.yaw_tolerance
        } else {
            self.yaw_threshold - self.yaw_tolerance
        };
        angle
    }

    /// `true` if yaw and pitch both lie strictly inside the bearing's window
    pub fn angle_matches_bearing(&self, angle: &Angle, bearing: Bearing) -> bool {
        let min = self.min_angle_for_bearing(bearing);
        let max = self.max_angle_for_bearing(bearing);
        angle.pitch > min.pitch && angle.pitch < max.pitch && angle.yaw > min.yaw && angle.yaw < max.yaw
    }

    /// Whether `angle` lies on a plausible path of a head turning from one bearing to another
    ///
    /// The path is a corridor around the segment between the two ideal
    /// angles, as wide as the larger threshold on each side and capped by a
    /// circle of the same radius around the starting angle.
    pub fn is_angle_between_bearings(&self, angle: &Angle, from: Bearing, to: Bearing) -> bool {
        if self.angle_matches_bearing(angle, from) || self.angle_matches_bearing(angle, to) {
            return true;
        }
        let from_angle = self.angle_for_bearing(from);
        let to_angle = self.angle_for_bearing(to);
        let radius = self.pitch_threshold.max(self.yaw_threshold);
        let direction = (to_angle.pitch - from_angle.pitch).atan2(to_angle.yaw - from_angle.yaw) + FRAC_PI_2;
        let cos = direction.cos() * radius;
        let sin = direction.sin() * radius;
        let start_right = Angle::yaw_pitch(from_angle.yaw + cos, from_angle.pitch + sin);
        let start_left = Angle::yaw_pitch(from_angle.yaw - cos, from_angle.pitch - sin);
        let end_right = Angle::yaw_pitch(to_angle.yaw + cos, to_angle.pitch + sin);
        let end_left = Angle::yaw_pitch(to_angle.yaw - cos, to_angle.pitch - sin);

        let is_not_right_of_right = !is_point_to_right_of_plane(angle, &start_right, &end_right);
        let is_left_of_left = is_point_to_right_of_plane(angle, &start_left, &end_left);
        let is_right_of_start = is_point_to_right_of_plane(angle, &start_right, &start_left);
        let is_inside_start_circle = angle.distance_to(&from_angle) < radius;

        is_not_right_of_right && is_left_of_left && (is_right_of_start || is_inside_start_circle)
    }

    /// Normalised per-axis offset from `angle` to the bearing's ideal angle
    ///
    /// Zero when the angle already matches. Not clamped.
    pub fn offset_from_angle_to_bearing(&self, angle: &Angle, bearing: Bearing) -> Angle {
        if self.angle_matches_bearing(angle, bearing) {
            return Angle::default();
        }
        let ideal = self.angle_for_bearing(bearing);
        Angle::yaw_pitch(
            (ideal.yaw - angle.yaw) / (self.yaw_threshold + self.yaw_tolerance),
            (ideal.pitch - angle.pitch) / (self.pitch_threshold + self.pitch_tolerance),
        )
    }
}

/// Sign test of `point` against the directed line `start -> end`
fn is_point_to_right_of_plane(point: &Angle, start: &Angle, end: &Angle) -> bool {
    let d = (point.yaw - start.yaw) * (end.pitch - start.pitch)
        - (point.pitch - start.pitch) * (end.yaw - start.yaw);
    d <= 0.0
}

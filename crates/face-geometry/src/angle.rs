//! Head pose angle

use serde::{Deserialize, Serialize};

/// Head pose in degrees
///
/// Positive yaw turns towards the LEFT bearing, positive pitch tilts DOWN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Angle {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl Angle {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Angle with zero roll
    pub fn yaw_pitch(yaw: f64, pitch: f64) -> Self {
        Self::new(yaw, pitch, 0.0)
    }

    /// Direction of the pose on screen in radians, for arrows and coarse comparisons
    pub fn screen_angle(&self) -> f64 {
        self.pitch.atan2(0.0 - self.yaw)
    }

    /// Euclidean distance in the yaw/pitch plane
    pub fn distance_to(&self, other: &Angle) -> f64 {
        (self.yaw - other.yaw).hypot(self.pitch - other.pitch)
    }
}

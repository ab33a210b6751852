//! Face requirements published to the UI

use face_geometry::{Angle, Rect, Size};
use serde::Serialize;

/// Inclusive range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub from: f64,
    pub to: f64,
}

impl Range {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    pub fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.from && value <= self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdealFace {
    pub bounds: Rect,
    pub angle: Angle,
}

/// Accepted ranges of each face edge and angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AcceptedFace {
    pub left: Range,
    pub top: Range,
    pub right: Range,
    pub bottom: Range,
    pub yaw: Range,
    pub pitch: Range,
}

/// What the session currently asks of the face
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceRequirements {
    pub image_size: Size,
    pub ideal: IdealFace,
    pub accepted: AcceptedFace,
}

impl FaceRequirements {
    /// Whether face bounds lie within every accepted edge range
    pub fn bounds_accepted(&self, bounds: &Rect) -> bool {
        self.accepted.left.contains(bounds.x)
            && self.accepted.top.contains(bounds.y)
            && self.accepted.right.contains(bounds.right())
            && self.accepted.bottom.contains(bounds.bottom())
    }

    /// Whether an angle lies within the accepted yaw and pitch ranges
    pub fn angle_accepted(&self, angle: &Angle) -> bool {
        self.accepted.yaw.contains(angle.yaw) && self.accepted.pitch.contains(angle.pitch)
    }
}

/// Receives updated requirements whenever the requested bearing changes
pub trait FaceRequirementListener: Send + Sync {
    fn on_change(&self, requirements: &FaceRequirements);
}

impl<F> FaceRequirementListener for F
where
    F: Fn(&FaceRequirements) + Send + Sync,
{
    fn on_change(&self, requirements: &FaceRequirements) {
        self(requirements)
    }
}

//! Face Geometry
//!
//! Value types and pure functions shared by every stage of a liveness
//! session:
//! - Points, sizes and axis-aligned rectangles
//! - Head pose angles (yaw, pitch, roll)
//! - Requested head pose bearings
//! - Bearing acceptance windows and the between-bearings corridor test
//!
//! Everything here is stateless and `Copy`, so one evaluator can be shared
//! across sessions.

pub mod angle;
pub mod bearing;
pub mod evaluation;
pub mod shapes;

pub use angle::Angle;
pub use bearing::{Axis, Bearing};
pub use evaluation::{AngleBearingEvaluation, DEFAULT_THRESHOLD_TOLERANCE};
pub use shapes::{Point, Rect, Size};

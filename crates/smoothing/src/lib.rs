//! Measurement Smoothing
//!
//! Moving averages over the last few face observations. Per-frame detector
//! output jitters; the session works on these averages instead.

mod filter;

pub use filter::{AngleSmoothing, RectSmoothing, Smoothing};

/// Samples averaged by the session's bounds and angle smoothers
pub const DEFAULT_WINDOW: usize = 5;

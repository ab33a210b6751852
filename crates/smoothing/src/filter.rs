//! Moving Average Filters

use face_geometry::{Angle, Rect};
use ring_buffer::CircularBuffer;

/// Sliding window mean of scalar samples
#[derive(Debug, Clone)]
pub struct Smoothing {
    window: CircularBuffer<f64>,
    smoothed: Option<f64>,
}

impl Smoothing {
    /// Create a new filter averaging up to `size` samples
    pub fn new(size: usize) -> Self {
        Self {
            window: CircularBuffer::new(size),
            smoothed: None,
        }
    }

    pub fn add_sample(&mut self, value: f64) {
        self.window.enqueue(value);
        self.recompute();
    }

    /// Drop the oldest sample so the window decays instead of resetting
    pub fn remove_first_sample(&mut self) {
        self.window.dequeue();
        self.recompute();
    }

    /// Mean of the buffered samples, `None` when there are none
    pub fn smoothed_value(&self) -> Option<f64> {
        self.smoothed
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    /// Reset the filter
    pub fn reset(&mut self) {
        self.window.clear();
        self.smoothed = None;
    }

    fn recompute(&mut self) {
        self.smoothed = self
            .window
            .reduce(|a, b| a + b)
            .map(|sum| sum / self.window.len() as f64);
    }
}

/// Independent smoothing of each rectangle field
#[derive(Debug, Clone)]
pub struct RectSmoothing {
    x: Smoothing,
    y: Smoothing,
    width: Smoothing,
    height: Smoothing,
}

impl RectSmoothing {
    pub fn new(size: usize) -> Self {
        Self {
            x: Smoothing::new(size),
            y: Smoothing::new(size),
            width: Smoothing::new(size),
            height: Smoothing::new(size),
        }
    }

    pub fn add_sample(&mut self, rect: &Rect) {
        self.x.add_sample(rect.x);
        self.y.add_sample(rect.y);
        self.width.add_sample(rect.width);
        self.height.add_sample(rect.height);
    }

    pub fn remove_first_sample(&mut self) {
        self.x.remove_first_sample();
        self.y.remove_first_sample();
        self.width.remove_first_sample();
        self.height.remove_first_sample();
    }

    pub fn smoothed_value(&self) -> Option<Rect> {
        Some(Rect::new(
            self.x.smoothed_value()?,
            self.y.smoothed_value()?,
            self.width.smoothed_value()?,
            self.height.smoothed_value()?,
        ))
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.width.reset();
        self.height.reset();
    }
}

/// Yaw and pitch smoothing; roll is not tracked
#[derive(Debug, Clone)]
pub struct AngleSmoothing {
    yaw: Smoothing,
    pitch: Smoothing,
}

impl AngleSmoothing {
    pub fn new(size: usize) -> Self {
        Self {
            yaw: Smoothing::new(size),
            pitch: Smoothing::new(size),
        }
    }

    pub fn add_sample(&mut self, angle: &Angle) {
        self.yaw.add_sample(angle.yaw);
        self.pitch.add_sample(angle.pitch);
    }

    pub fn remove_first_sample(&mut self) {
        self.yaw.remove_first_sample();
        self.pitch.remove_first_sample();
    }

    /// Smoothed yaw and pitch with zero roll
    pub fn smoothed_value(&self) -> Option<Angle> {
        Some(Angle::yaw_pitch(
            self.yaw.smoothed_value()?,
            self.pitch.smoothed_value()?,
        ))
    }

    pub fn reset(&mut self) {
        self.yaw.reset();
        self.pitch.reset();
    }
}

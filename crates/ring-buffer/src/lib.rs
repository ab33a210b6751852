//! Circular Ring Buffer
//!
//! Fixed-capacity FIFO buffer used to hold the most recent face
//! observations and smoothing samples of a liveness session.

mod buffer;

pub use buffer::CircularBuffer;

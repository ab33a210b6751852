//! Requested bearing sequence

use face_geometry::{AngleBearingEvaluation, Bearing};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bearings requested over one session
///
/// Starts with STRAIGHT. Each following bearing is drawn at random from the
/// pool, skipping the previous bearing and bearings that share its yaw so
/// consecutive poses differ visibly.
#[derive(Debug, Clone)]
pub struct BearingSequence {
    pool: Vec<Bearing>,
    evaluation: AngleBearingEvaluation,
    /// Bearings the sequence yields in total
    length: usize,
    yielded: usize,
    current: Bearing,
    rng: StdRng,
}

impl BearingSequence {
    pub fn new(pool: Vec<Bearing>, length: usize, evaluation: AngleBearingEvaluation) -> Self {
        Self::with_rng(pool, length, evaluation, StdRng::from_entropy())
    }

    /// Reproducible sequence
    pub fn seeded(pool: Vec<Bearing>, length: usize, evaluation: AngleBearingEvaluation, seed: u64) -> Self {
        Self::with_rng(pool, length, evaluation, StdRng::seed_from_u64(seed))
    }

    fn with_rng(pool: Vec<Bearing>, length: usize, evaluation: AngleBearingEvaluation, rng: StdRng) -> Self {
        Self {
            pool,
            evaluation,
            length: length.max(1),
            yielded: 1,
            current: Bearing::Straight,
            rng,
        }
    }

    /// Bearing currently requested
    pub fn current(&self) -> Bearing {
        self.current
    }

    pub fn is_exhausted(&self) -> bool {
        self.yielded >= self.length
    }

    /// Move to the next bearing, `None` once every bearing has been requested
    pub fn advance(&mut self) -> Option<Bearing> {
        if self.is_exhausted() {
            return None;
        }
        let previous = self.current;
        let previous_yaw = self.evaluation.angle_for_bearing(previous).yaw;
        let mut available: Vec<Bearing> = self
            .pool
            .iter()
            .copied()
            .filter(|&b| b != previous && self.evaluation.angle_for_bearing(b).yaw != previous_yaw)
            .collect();
        if available.is_empty() {
            available = self.pool.iter().copied().filter(|&b| b != previous).collect();
        }
        if !available.is_empty() {
            self.current = available[self.rng.gen_range(0..available.len())];
        }
        self.yielded += 1;
        Some(self.current)
    }
}

//! Hold variation sources
//!
//! Hold durations are jittered by values drawn from a [`VariationSource`].
//! Production runs use an entropy-seeded generator; tests inject a seeded or
//! scripted source so generated phase sequences are reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Continuous sequence of uniform values in `[0, 1)`
pub trait VariationSource: Send {
    fn next_uniform(&mut self) -> f64;
}

/// Entropy-seeded generator for normal playback
pub struct RandomVariation {
    rng: StdRng,
}

impl RandomVariation {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for RandomVariation {
    fn default() -> Self {
        Self::new()
    }
}

impl VariationSource for RandomVariation {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Deterministic generator that can be rewound to its first value
pub struct SeededVariation {
    seed: u64,
    rng: StdRng,
}

impl SeededVariation {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Restart the sequence from its first value
    pub fn restart(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

impl VariationSource for SeededVariation {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of values, cycling when exhausted
///
/// Values are clamped into `[0, 1)`. An empty list behaves like a constant
/// `0.5`, the draw that applies no jitter.
#[derive(Debug, Clone)]
pub struct SequenceVariation {
    values: Vec<f64>,
    index: usize,
}

impl SequenceVariation {
    pub fn new(values: Vec<f64>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self { values, index: 0 }
    }

    /// Source that always yields `value`
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    pub fn restart(&mut self) {
        self.index = 0;
    }

    /// Number of values drawn since creation or the last restart
    pub fn draws(&self) -> usize {
        self.index
    }
}

impl VariationSource for SequenceVariation {
    fn next_uniform(&mut self) -> f64 {
        if self.values.is_empty() {
            self.index += 1;
            return 0.5;
        }
        let value = self.values[self.index % self.values.len()];
        self.index += 1;
        value
    }
}

/// Jitter a duration by up to `fraction` in either direction.
///
/// Computes `duration · (1 + (2u − 1) · fraction)` for the next drawn `u`,
/// rounded to whole milliseconds. Exactly one value is drawn per call, even
/// when `fraction` is zero, so the draw sequence does not depend on the
/// configured variation.
pub fn apply_variation(duration_ms: u64, fraction: f64, source: &mut dyn VariationSource) -> u64 {
    let u = source.next_uniform();
    let factor = 1.0 + (2.0 * u - 1.0) * fraction;
    (duration_ms as f64 * factor).round().max(0.0) as u64
}

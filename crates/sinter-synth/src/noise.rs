//! Deterministic filtered-noise generation and seed derivation.
//!
//! All synthesis randomness flows through PCG32 generators seeded by
//! BLAKE3 derivation from a base seed, so rendering is reproducible and
//! every partial gets an independent noise stream regardless of the
//! order partials are rendered in.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::filter::Filter;

/// Derives an independent seed for one partial's named noise stream.
///
/// Hashes the base seed, the partial's index in its list, and a stream
/// key (e.g. `"bw"` for the bandwidth modulator) with BLAKE3 and takes
/// the first eight bytes.
pub fn derive_seed(base_seed: u64, partial_index: u32, stream: &str) -> u64 {
    let mut input = Vec::with_capacity(12 + stream.len());
    input.extend_from_slice(&base_seed.to_le_bytes());
    input.extend_from_slice(&partial_index.to_le_bytes());
    input.extend_from_slice(stream.as_bytes());
    let hash = blake3::hash(&input);
    u64::from_le_bytes(hash.as_bytes()[0..8].try_into().unwrap())
}

/// A gaussian noise source with an optional bandlimiting filter,
/// used as the stochastic modulator in bandwidth-enhanced synthesis.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    rng: Pcg32,
    filter: Filter,
    cached: Option<f64>,
}

impl NoiseGenerator {
    /// Creates a generator with the stock noise-modulator filter.
    pub fn new(seed: u64) -> Self {
        Self::with_filter(Filter::noise_prototype(), seed)
    }

    /// Creates a generator with a caller-supplied filter.
    pub fn with_filter(filter: Filter, seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            filter,
            cached: None,
        }
    }

    /// A unit-variance gaussian sample (Box–Muller, polar form).
    pub fn gaussian(&mut self) -> f64 {
        if let Some(g) = self.cached.take() {
            return g;
        }
        loop {
            let v1 = 2.0 * self.rng.gen::<f64>() - 1.0;
            let v2 = 2.0 * self.rng.gen::<f64>() - 1.0;
            let r = v1 * v1 + v2 * v2;
            if r > 0.0 && r < 1.0 {
                let fac = (-2.0 * r.ln() / r).sqrt();
                self.cached = Some(v1 * fac);
                return v2 * fac;
            }
        }
    }

    /// The next filtered noise sample.
    pub fn next_sample(&mut self) -> f64 {
        let g = self.gaussian();
        self.filter.sample(g)
    }
}

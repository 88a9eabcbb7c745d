//! Bandwidth association: distributing residual spectral energy as noise.
//!
//! Each frame's spectral energy is accumulated into overlapping
//! frequency regions, in two ledgers: amplitude-weighted contributions
//! of the retained (sinusoidal) peaks, and the energy of rejected peaks
//! (the surplus the sinusoids did not claim). Association then hands
//! each retained breakpoint its amplitude-proportional share of the
//! surplus in the regions around it, as added noise energy.
//!
//! Regions are centered on integer multiples of half the region width,
//! so adjacent regions overlap by half; a component splits its
//! contribution between the two nearest centers with a triangular
//! weighting.

use sinter_model::Breakpoint;

use crate::error::{AnalysisError, AnalysisResult};

/// Regions below this index never distribute noise; very low frequency
/// bandwidth enhancement is handled by the builder's low-frequency
/// correction instead.
const LOWEST_REGION: usize = 2;

/// Per-frame accumulator distributing unclaimed spectral energy among
/// retained spectral peaks.
pub struct BandwidthAssociator {
    weights: Vec<f64>,
    surplus: Vec<f64>,
    region_rate: f64,
}

impl BandwidthAssociator {
    /// Creates an associator with overlapping regions `region_width` Hz
    /// wide (centers spaced half that apart) covering `sample_rate` Hz.
    pub fn new(region_width: f64, sample_rate: f64) -> AnalysisResult<Self> {
        if !(region_width > 0.0) || !region_width.is_finite() {
            return Err(AnalysisError::invalid_param(
                "region_width",
                format!("must be positive, got {region_width}"),
            ));
        }
        if !(sample_rate > 0.0) {
            return Err(AnalysisError::InvalidSampleRate { rate: sample_rate });
        }
        let regions = (sample_rate / region_width).max(1.0) as usize;
        Ok(Self {
            weights: vec![0.0; regions],
            surplus: vec![0.0; regions],
            region_rate: 2.0 / region_width,
        })
    }

    /// Accumulates a retained sinusoidal peak's amplitude into the
    /// region weights.
    pub fn accumulate_sinusoid(&mut self, freq: f64, amp: f64) {
        if freq < 0.0 {
            return;
        }
        let bin = self.bin_frequency(freq);
        Self::distribute(bin, amp, &mut self.weights, self.surplus.len());
    }

    /// Accumulates a rejected peak's energy into the surplus.
    pub fn accumulate_noise(&mut self, freq: f64, amp: f64) {
        if freq <= 0.0 {
            return;
        }
        let bin = self.bin_frequency(freq);
        Self::distribute(bin, amp * amp, &mut self.surplus, self.weights.len());
    }

    /// The noise energy a component at (`freq`, `amp`) should receive:
    /// its amplitude-weighted share of the surplus in the two regions
    /// around `freq`.
    pub fn noise_energy(&self, freq: f64, amp: f64) -> f64 {
        if freq < 0.0 {
            return 0.0;
        }
        let bin = self.bin_frequency(freq);
        let below = self.region_below(bin);
        let above = below + 1;
        let alpha = self.alpha(bin);

        let mut noise = 0.0;
        if (above as usize) < self.surplus.len()
            && alpha != 0.0
            && above >= LOWEST_REGION as isize
            && self.weights[above as usize] > 0.0
        {
            noise += self.surplus[above as usize] * alpha * amp / self.weights[above as usize];
        }
        if below >= LOWEST_REGION as isize && self.weights[below as usize] > 0.0 {
            noise += self.surplus[below as usize] * (1.0 - alpha) * amp
                / self.weights[below as usize];
        }
        noise
    }

    /// Adds a breakpoint's associated noise energy in place.
    pub fn associate(&self, bp: &mut Breakpoint) {
        bp.add_noise_energy(self.noise_energy(bp.frequency, bp.amplitude));
    }

    /// Total unclaimed energy accumulated for the current frame.
    pub fn surplus_total(&self) -> f64 {
        self.surplus.iter().sum()
    }

    /// Clears both ledgers for the next frame.
    pub fn reset(&mut self) {
        self.weights.fill(0.0);
        self.surplus.fill(0.0);
    }

    /// Fractional region coordinate for a frequency in Hz.
    fn bin_frequency(&self, freq: f64) -> f64 {
        freq * self.region_rate
    }

    /// Index of the last region centered at or below `bin`, or -1.
    fn region_below(&self, bin: f64) -> isize {
        if bin < 0.0 {
            -1
        } else {
            (bin.floor() as isize).min(self.surplus.len() as isize - 1)
        }
    }

    /// Relative share of a component at `bin` going to the region above
    /// it; everything past the last center lumps into the last region.
    fn alpha(&self, bin: f64) -> f64 {
        if bin > self.surplus.len() as f64 {
            0.0
        } else {
            bin - bin.floor()
        }
    }

    fn distribute(bin: f64, x: f64, regions: &mut [f64], len: usize) {
        if bin < 0.0 {
            return;
        }
        let below = (bin.floor() as isize).min(len as isize - 1);
        let above = below + 1;
        let alpha = if bin > len as f64 { 0.0 } else { bin - bin.floor() };

        if (above as usize) < len {
            regions[above as usize] += alpha * x;
        }
        if below >= 0 {
            regions[below as usize] += (1.0 - alpha) * x;
        }
    }
}

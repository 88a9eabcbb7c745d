//! A single sample of a partial's parameter envelope.

use serde::{Deserialize, Serialize};

/// One time-stamped parameter sample of a [`Partial`](crate::Partial).
///
/// Carries the instantaneous frequency (Hz), amplitude (absolute),
/// bandwidth (fraction of total energy that is noise energy, in [0, 1]),
/// and phase (radians). Phase is only authoritative at a partial's onset
/// and at transitions from zero to nonzero amplitude; between breakpoints
/// synthesis accumulates phase from frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Time in seconds.
    pub time: f64,
    /// Frequency in Hz.
    pub frequency: f64,
    /// Amplitude (absolute, non-negative).
    pub amplitude: f64,
    /// Noise energy fraction in [0, 1]; 0 is a pure sinusoid, 1 pure noise.
    pub bandwidth: f64,
    /// Phase in radians.
    pub phase: f64,
}

impl Breakpoint {
    /// Creates a breakpoint, flooring the amplitude at zero and clipping
    /// the bandwidth to [0, 1].
    pub fn new(time: f64, frequency: f64, amplitude: f64, bandwidth: f64, phase: f64) -> Self {
        Self {
            time,
            frequency,
            amplitude: amplitude.max(0.0),
            bandwidth: bandwidth.clamp(0.0, 1.0),
            phase,
        }
    }

    /// The amplitude of the sinusoidal (non-noise) part of the energy.
    pub fn sinusoidal_amplitude(&self) -> f64 {
        self.amplitude * (1.0 - self.bandwidth).sqrt()
    }

    /// Adds noise energy by recomputing the amplitude and bandwidth so
    /// that the total energy grows by `energy` and the addition is all
    /// noise. Negative `energy` removes noise energy, but never more
    /// than is present; the sinusoidal energy is left intact.
    pub fn add_noise_energy(&mut self, energy: f64) {
        let mut total = self.amplitude * self.amplitude;
        let noise = total * self.bandwidth;
        if total < noise {
            total = noise;
        }

        if noise + energy > 0.0 {
            self.bandwidth = (noise + energy) / (total + energy);
            self.amplitude = (total + energy).sqrt();
        } else {
            self.bandwidth = 0.0;
            self.amplitude = (total - noise).sqrt();
        }
    }

    /// Returns a copy of this breakpoint at a different time.
    pub fn at_time(&self, time: f64) -> Self {
        Self { time, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_clamps_ranges() {
        let bp = Breakpoint::new(0.0, 440.0, -0.5, 1.5, 0.0);
        assert_eq!(bp.amplitude, 0.0);
        assert_eq!(bp.bandwidth, 1.0);

        let bp = Breakpoint::new(0.0, 440.0, 0.5, -0.25, 0.0);
        assert_eq!(bp.bandwidth, 0.0);
    }

    #[test]
    fn test_sinusoidal_amplitude() {
        let bp = Breakpoint::new(0.0, 440.0, 1.0, 0.0, 0.0);
        assert_relative_eq!(bp.sinusoidal_amplitude(), 1.0);

        let bp = Breakpoint::new(0.0, 440.0, 1.0, 1.0, 0.0);
        assert_relative_eq!(bp.sinusoidal_amplitude(), 0.0);

        let bp = Breakpoint::new(0.0, 440.0, 2.0, 0.75, 0.0);
        assert_relative_eq!(bp.sinusoidal_amplitude(), 1.0);
    }

    #[test]
    fn test_add_noise_energy_grows_total() {
        let mut bp = Breakpoint::new(0.0, 440.0, 1.0, 0.0, 0.0);
        bp.add_noise_energy(1.0);

        // Total energy doubles, all of the addition is noise.
        assert_relative_eq!(bp.amplitude, 2.0_f64.sqrt());
        assert_relative_eq!(bp.bandwidth, 0.5);
    }

    #[test]
    fn test_add_noise_energy_never_removes_sinusoid() {
        let mut bp = Breakpoint::new(0.0, 440.0, 1.0, 0.5, 0.0);
        // Remove more noise energy than is present.
        bp.add_noise_energy(-10.0);

        assert_eq!(bp.bandwidth, 0.0);
        assert_relative_eq!(bp.amplitude, 0.5_f64.sqrt());
    }

    #[test]
    fn test_add_noise_energy_to_silent_breakpoint() {
        let mut bp = Breakpoint::new(0.0, 440.0, 0.0, 0.0, 0.0);
        bp.add_noise_energy(0.25);

        assert_relative_eq!(bp.amplitude, 0.5);
        assert_relative_eq!(bp.bandwidth, 1.0);
    }
}

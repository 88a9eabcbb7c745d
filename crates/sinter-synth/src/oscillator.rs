//! The bandwidth-enhanced oscillator.
//!
//! One oscillator renders one partial: between breakpoints it ramps
//! radian frequency, amplitude, and bandwidth linearly per sample,
//! accumulates phase by integrating the instantaneous frequency, and
//! mixes a filtered-noise modulator against the carrier in proportion
//! to the bandwidth. Samples are accumulated into the caller's buffer.

use std::f64::consts::PI;

use sinter_model::Breakpoint;

use crate::noise::NoiseGenerator;

/// Size of one random-walk step of the jitter modulator, before
/// clamping to the envelope-bounded range.
const WALK_STEP: f64 = 0.5;

/// Target state for one linear segment of oscillation.
#[derive(Debug, Clone, Copy)]
pub struct OscTarget {
    /// Frequency in radians per sample.
    pub frequency: f64,
    /// Amplitude (absolute).
    pub amplitude: f64,
    /// Noise energy fraction in [0, 1].
    pub bandwidth: f64,
    /// Bound on the jitter deviation of the noise gain (0 disables).
    pub jitter_gain: f64,
    /// Pull of the jitter walk back toward the deterministic gain, in
    /// [0, 1].
    pub jitter_attraction: f64,
}

impl OscTarget {
    /// A target with no jitter.
    pub fn plain(frequency: f64, amplitude: f64, bandwidth: f64) -> Self {
        Self {
            frequency,
            amplitude,
            bandwidth,
            jitter_gain: 0.0,
            jitter_attraction: 0.0,
        }
    }
}

/// State of a single bandwidth-enhanced oscillator.
pub struct Oscillator {
    frequency: f64,
    amplitude: f64,
    bandwidth: f64,
    phase: f64,
    jitter_gain: f64,
    noise: NoiseGenerator,
    walk: Option<JitterWalk>,
}

/// Random-walk state perturbing the noise modulator gain.
struct JitterWalk {
    rng: NoiseGenerator,
    value: f64,
    period: usize,
    countdown: usize,
}

impl Oscillator {
    /// Creates an oscillator using the given noise source for its
    /// stochastic modulator. All state starts at zero.
    pub fn new(noise: NoiseGenerator) -> Self {
        Self {
            frequency: 0.0,
            amplitude: 0.0,
            bandwidth: 0.0,
            phase: 0.0,
            jitter_gain: 0.0,
            noise,
            walk: None,
        }
    }

    /// Enables the jitter random walk, updated every `period` samples,
    /// driven by its own noise source.
    pub fn enable_jitter(&mut self, rng: NoiseGenerator, period: usize) {
        self.walk = Some(JitterWalk {
            rng,
            value: 0.0,
            period: period.max(1),
            countdown: 0,
        });
    }

    /// Resets the instantaneous state from a breakpoint. Frequencies
    /// above the radian Nyquist rate mute the amplitude rather than
    /// alias.
    pub fn reset(&mut self, bp: &Breakpoint, sample_rate: f64) {
        self.frequency = radian_freq(bp.frequency, sample_rate);
        self.amplitude = if self.frequency > PI { 0.0 } else { bp.amplitude };
        self.bandwidth = bp.bandwidth.clamp(0.0, 1.0);
        self.phase = bp.phase;
        self.jitter_gain = 0.0;
        if let Some(walk) = self.walk.as_mut() {
            walk.value = 0.0;
            walk.countdown = 0;
        }
    }

    /// Re-anchors the phase, as at a zero-amplitude breakpoint.
    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
    }

    /// Current instantaneous amplitude.
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Current phase in radians.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Current instantaneous frequency in radians per sample.
    pub fn radian_frequency(&self) -> f64 {
        self.frequency
    }

    /// Accumulates samples into `buf`, ramping the state linearly from
    /// its current values to `target` across the buffer. The state
    /// adopts the target values afterwards even if the buffer is empty,
    /// so segments stay aligned with breakpoints.
    pub fn generate(&mut self, buf: &mut [f64], target: &OscTarget) {
        let mut target = *target;
        target.bandwidth = target.bandwidth.clamp(0.0, 1.0);
        if target.frequency > PI {
            // Radian Nyquist rate: ramp out rather than alias.
            target.amplitude = 0.0;
        }

        let n = buf.len();
        if n > 0 && (self.amplitude != 0.0 || target.amplitude != 0.0) {
            let d_freq = (target.frequency - self.frequency) / n as f64;
            let d_amp = (target.amplitude - self.amplitude) / n as f64;
            let d_bw = (target.bandwidth - self.bandwidth) / n as f64;
            let d_jgain = (target.jitter_gain - self.jitter_gain) / n as f64;

            let mut f = self.frequency;
            let mut a = self.amplitude;
            let mut b = self.bandwidth;
            let mut p = self.phase;
            let mut jg = self.jitter_gain;

            for sample in buf.iter_mut() {
                let noise = self.noise.next_sample();
                let mut noise_gain = (2.0 * b).sqrt();
                if let Some(walk) = self.walk.as_mut() {
                    if walk.countdown == 0 {
                        let pull = target.jitter_attraction.clamp(0.0, 1.0);
                        walk.value = ((1.0 - pull) * walk.value
                            + WALK_STEP * walk.rng.gaussian())
                        .clamp(-1.0, 1.0);
                        walk.countdown = walk.period;
                    }
                    walk.countdown -= 1;
                    noise_gain *= 1.0 + jg * walk.value;
                }

                // Carrier and modulation, scaled so the partial's
                // amplitude covers total (sinusoid plus noise) energy.
                let modulation = (1.0 - b).sqrt() + noise * noise_gain;
                *sample += modulation * a * p.cos();

                p += f;
                f += d_freq;
                a += d_amp;
                b += d_bw;
                if b < 0.0 {
                    b = 0.0;
                }
                jg += d_jgain;
            }

            // Keep the accumulated phase near zero so precision holds
            // over long renders.
            self.phase = p % (2.0 * PI);
        } else if n > 0 {
            // Nothing audible: advance phase across the silent span so
            // a later onset lands where it should.
            self.phase += 0.5 * (self.frequency + target.frequency) * n as f64;
            self.phase %= 2.0 * PI;
        }

        // Adopt the targets exactly; per-sample ramps can land slightly
        // off, and overshooting bandwidth or amplitude must not stick.
        self.frequency = target.frequency;
        self.amplitude = target.amplitude;
        self.bandwidth = target.bandwidth;
        self.jitter_gain = target.jitter_gain;
    }
}

/// Converts a frequency in Hz to radians per sample.
pub fn radian_freq(hz: f64, sample_rate: f64) -> f64 {
    hz * 2.0 * PI / sample_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 44100.0;

    fn oscillator() -> Oscillator {
        Oscillator::new(NoiseGenerator::new(42))
    }

    fn start_bp(freq: f64, amp: f64, bw: f64) -> Breakpoint {
        Breakpoint::new(0.0, freq, amp, bw, 0.0)
    }

    #[test]
    fn test_pure_sinusoid_amplitude_and_frequency() {
        let mut osc = oscillator();
        osc.reset(&start_bp(441.0, 0.5, 0.0), RATE);
        let mut buf = vec![0.0; 44100];
        osc.generate(&mut buf, &OscTarget::plain(radian_freq(441.0, RATE), 0.5, 0.0));

        let rms = (buf.iter().map(|x| x * x).sum::<f64>() / buf.len() as f64).sqrt();
        assert!((rms - 0.5 / 2.0_f64.sqrt()).abs() < 0.01, "rms {rms}");

        let crossings = buf.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count();
        assert!((crossings as i64 - 441).abs() <= 1, "crossings {crossings}");
    }

    #[test]
    fn test_phase_continuity_across_segments() {
        let mut osc = oscillator();
        osc.reset(&start_bp(440.0, 0.5, 0.0), RATE);
        let mut buf = vec![0.0; 2000];
        let target = OscTarget::plain(radian_freq(440.0, RATE), 0.5, 0.0);
        osc.generate(&mut buf[..1000], &target);
        osc.generate(&mut buf[1000..], &target);

        // No discontinuity at the segment boundary: successive samples
        // of a 440 Hz tone at 44.1 kHz never jump more than ~2π·f/sr·a.
        let max_step = radian_freq(440.0, RATE) * 0.5 * 1.1;
        for w in buf.windows(2) {
            assert!((w[1] - w[0]).abs() <= max_step, "step {}", (w[1] - w[0]).abs());
        }
    }

    #[test]
    fn test_above_nyquist_is_muted() {
        let mut osc = oscillator();
        osc.reset(&start_bp(30000.0, 0.5, 0.0), RATE);
        let mut buf = vec![0.0; 512];
        osc.generate(&mut buf, &OscTarget::plain(radian_freq(30000.0, RATE), 0.5, 0.0));
        assert!(buf.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_silent_segment_advances_phase() {
        let mut osc = oscillator();
        osc.reset(&start_bp(441.0, 0.0, 0.0), RATE);
        let mut silent = vec![0.0; 100];
        osc.generate(&mut silent, &OscTarget::plain(radian_freq(441.0, RATE), 0.0, 0.0));
        assert!(silent.iter().all(|&x| x == 0.0));

        // 100 samples at 441 Hz / 44.1 kHz is exactly one cycle: the
        // phase wraps back to where it started.
        let wrapped = osc.phase() % (2.0 * PI);
        assert!(
            wrapped.abs() < 1e-9 || (wrapped - 2.0 * PI).abs() < 1e-9,
            "phase {wrapped}"
        );
    }

    #[test]
    fn test_bandwidth_one_is_noise() {
        let mut osc = oscillator();
        osc.reset(&start_bp(441.0, 0.5, 1.0), RATE);
        let mut buf = vec![0.0; 4096];
        osc.generate(&mut buf, &OscTarget::plain(radian_freq(441.0, RATE), 0.5, 1.0));
        assert!(buf.iter().any(|&x| x != 0.0));

        // Same seed reproduces the identical noise stream.
        let mut osc2 = oscillator();
        osc2.reset(&start_bp(441.0, 0.5, 1.0), RATE);
        let mut buf2 = vec![0.0; 4096];
        osc2.generate(&mut buf2, &OscTarget::plain(radian_freq(441.0, RATE), 0.5, 1.0));
        assert_eq!(buf, buf2);
    }

    #[test]
    fn test_jitter_perturbs_noise_only() {
        // With zero bandwidth there is no noise term, so jitter has
        // nothing to perturb and the carrier is untouched.
        let mut plain = oscillator();
        plain.reset(&start_bp(440.0, 0.5, 0.0), RATE);
        let mut buf_plain = vec![0.0; 1024];
        plain.generate(&mut buf_plain, &OscTarget::plain(radian_freq(440.0, RATE), 0.5, 0.0));

        let mut jittered = oscillator();
        jittered.enable_jitter(NoiseGenerator::new(7), 64);
        jittered.reset(&start_bp(440.0, 0.5, 0.0), RATE);
        let mut buf_jit = vec![0.0; 1024];
        let target = OscTarget {
            jitter_gain: 0.5,
            jitter_attraction: 0.1,
            ..OscTarget::plain(radian_freq(440.0, RATE), 0.5, 0.0)
        };
        jittered.generate(&mut buf_jit, &target);
        assert_eq!(buf_plain, buf_jit);

        // With bandwidth, the jittered stream differs from the plain
        // one but is still deterministic.
        let run = |jitter: bool| -> Vec<f64> {
            let mut osc = oscillator();
            if jitter {
                osc.enable_jitter(NoiseGenerator::new(7), 64);
            }
            osc.reset(&start_bp(440.0, 0.5, 0.5), RATE);
            let mut buf = vec![0.0; 1024];
            let mut t = OscTarget::plain(radian_freq(440.0, RATE), 0.5, 0.5);
            if jitter {
                t.jitter_gain = 0.5;
                t.jitter_attraction = 0.1;
            }
            osc.generate(&mut buf, &t);
            buf
        };
        assert_ne!(run(true), run(false));
        assert_eq!(run(true), run(true));
    }
}

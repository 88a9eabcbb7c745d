//! Shared fixtures and measurement helpers for sinter integration
//! tests.

use sinter_model::{Breakpoint, Partial, PartialList};
use std::f64::consts::PI;

/// A constant-parameter partial spanning `[t0, t1]`.
pub fn constant_partial(label: i32, freq: f64, amp: f64, bw: f64, t0: f64, t1: f64) -> Partial {
    Partial::from_breakpoints(
        label,
        [
            Breakpoint::new(t0, freq, amp, bw, 0.0),
            Breakpoint::new(t1, freq, amp, bw, 0.0),
        ],
    )
}

/// A sampled sum of steady sine tones.
pub fn tone_buffer(tones: &[(f64, f64)], seconds: f64, rate: f64) -> Vec<f64> {
    let n = (seconds * rate) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / rate;
            tones.iter().map(|&(f, a)| a * (2.0 * PI * f * t).sin()).sum()
        })
        .collect()
}

/// Root-mean-square level of a sample slice.
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|x| x * x).sum::<f64>() / samples.len() as f64).sqrt()
}

/// Amplitude of the component at `freq` in a sample slice, by direct
/// projection onto the quadrature pair at that frequency. Accurate for
/// slices covering at least a few cycles.
pub fn tone_amplitude(samples: &[f64], rate: f64, freq: f64) -> f64 {
    let n = samples.len() as f64;
    let mut c = 0.0;
    let mut s = 0.0;
    for (i, &x) in samples.iter().enumerate() {
        let w = 2.0 * PI * freq * i as f64 / rate;
        c += x * w.cos();
        s += x * w.sin();
    }
    2.0 * (c * c + s * s).sqrt() / n
}

/// The frequency with the most energy in a sample slice, searched over
/// `lo..hi` Hz in steps fine enough to resolve the slice length.
pub fn dominant_frequency(samples: &[f64], rate: f64, lo: f64, hi: f64) -> f64 {
    let step = (rate / samples.len() as f64).max(1.0) * 0.5;
    let mut best = lo;
    let mut best_amp = -1.0;
    let mut f = lo;
    while f <= hi {
        let a = tone_amplitude(samples, rate, f);
        if a > best_amp {
            best_amp = a;
            best = f;
        }
        f += step;
    }
    best
}

/// Asserts that every partial's breakpoint times are strictly
/// increasing.
pub fn assert_strict_times(partials: &PartialList) {
    for (i, p) in partials.iter().enumerate() {
        let times: Vec<f64> = p.iter().map(|bp| bp.time).collect();
        assert!(
            times.windows(2).all(|w| w[0] < w[1]),
            "partial {i} (label {}) has non-increasing times: {times:?}",
            p.label()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_amplitude_measures_a_sine() {
        let buf = tone_buffer(&[(440.0, 0.5)], 0.25, 44100.0);
        let a = tone_amplitude(&buf, 44100.0, 440.0);
        assert!((a - 0.5).abs() < 0.01, "amplitude {a}");
        // A frequency far from the tone sees almost nothing.
        assert!(tone_amplitude(&buf, 44100.0, 1000.0) < 0.01);
    }

    #[test]
    fn test_dominant_frequency_finds_the_tone() {
        let buf = tone_buffer(&[(440.0, 0.5), (880.0, 0.2)], 0.25, 44100.0);
        let f = dominant_frequency(&buf, 44100.0, 100.0, 2000.0);
        assert!((f - 440.0).abs() < 10.0, "dominant {f}");
    }
}

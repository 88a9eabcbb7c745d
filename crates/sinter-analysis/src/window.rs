//! Kaiser analysis windows and their reassignment companions.
//!
//! The analysis window localizes each short-time frame; its shape
//! parameter trades main-lobe width against side-lobe attenuation
//! (Kaiser and Schafer, 1980). Reassignment needs two companion
//! windows derived from the analysis window: one ramped in time and one
//! ramped in frequency, combined here into a single complex-valued
//! window (frequency ramp in the real part, time ramp in the imaginary
//! part).

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Computes a Kaiser window of `len` samples with the given shape
/// parameter. A zero-length request yields an empty window.
pub fn kaiser(len: usize, shape: f64) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    if len == 1 {
        return vec![1.0];
    }

    let offset = -0.5 * (len as f64 - 1.0);
    let denom = bessel_i0(shape);
    let half_span_sq = ((len as f64 - 1.0) / 2.0).powi(2);

    (0..len)
        .map(|i| {
            let x = i as f64 + offset;
            let arg = (1.0 - x * x / half_span_sq).max(0.0).sqrt();
            bessel_i0(shape * arg) / denom
        })
        .collect()
}

/// Computes the Kaiser shape parameter giving the specified side-lobe
/// attenuation in (positive) dB. Attenuations at or below 13.26 dB are
/// unattainable and map to shape 0 (a rectangular window).
pub fn shape_for_attenuation(atten_db: f64) -> f64 {
    if atten_db > 60.0 {
        0.12438 * (atten_db + 6.3)
    } else if atten_db > 13.26 {
        0.76609 * (atten_db - 13.26).powf(0.4) + 0.09834 * (atten_db - 13.26)
    } else {
        0.0
    }
}

/// Computes the window length in samples for a desired main-lobe width
/// (specified as a fraction of the sample rate) at the given side-lobe
/// attenuation in dB.
pub fn length_for_width(normalized_width: f64, atten_db: f64) -> usize {
    use std::f64::consts::PI;
    let shape = shape_for_attenuation(atten_db);
    (1.0 + 2.0 * (PI * PI + shape * shape).sqrt() / (PI * normalized_width) + 0.5) as usize
}

/// Builds the complex reassignment window for an analysis window:
/// real part is the frequency-ramped window, imaginary part the
/// time-ramped window (ramp in samples, centered on the window middle).
pub fn reassignment_window(window: &[f64]) -> Vec<Complex<f64>> {
    let framp = frequency_ramped(window);
    let tramp = time_ramped(window);
    framp
        .iter()
        .zip(&tramp)
        .map(|(&re, &im)| Complex::new(re, im))
        .collect()
}

/// Scales the window by a ramp in samples centered on the window middle
/// (fractional center for even lengths).
fn time_ramped(window: &[f64]) -> Vec<f64> {
    let offset = 0.5 * (window.len() as f64 - 1.0);
    window
        .iter()
        .enumerate()
        .map(|(k, &w)| w * (k as f64 - offset))
        .collect()
}

/// Applies a frequency-domain ramp to the window by transforming it,
/// scaling each bin by its (signed, aliased) frequency in samples, and
/// transforming again. A double DFT index-reverses and scales by N, so
/// the result is recovered from the scaled imaginary part of the
/// reversed sequence.
fn frequency_ramped(window: &[f64]) -> Vec<f64> {
    let n = window.len();
    if n == 0 {
        return Vec::new();
    }

    let mut buf: Vec<Complex<f64>> = window.iter().map(|&w| Complex::new(w, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);

    fft.process(&mut buf);
    for (k, bin) in buf.iter_mut().enumerate() {
        let ramp = if k < n / 2 {
            k as f64
        } else {
            k as f64 - n as f64
        };
        *bin *= ramp;
    }
    fft.process(&mut buf);

    buf[1..].reverse();
    buf.iter().map(|c| -c.im / n as f64).collect()
}

/// Zeroth-order modified Bessel function of the first kind, by series
/// expansion.
fn bessel_i0(x: f64) -> f64 {
    let mut value = 1.0;
    let mut term: f64;
    let mut i = 1;
    loop {
        term = (0.5 * x).powi(i) / factorial(i);
        value += term * term;
        if term <= 1.0e-6 * value {
            return value;
        }
        i += 1;
    }
}

fn factorial(n: i32) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

//! Fourier engine: cached forward/inverse transforms over complex buffers.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// A fixed-length FFT/IFFT pair.
///
/// Plans are created once and reused for every frame. The inverse
/// transform is unnormalized; callers divide by [`Fourier::len`] when
/// they need a true inverse.
pub struct Fourier {
    len: usize,
    fwd: Arc<dyn Fft<f64>>,
    inv: Arc<dyn Fft<f64>>,
}

impl Fourier {
    /// Creates a transform pair of the given length.
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            len,
            fwd: planner.plan_fft_forward(len),
            inv: planner.plan_fft_inverse(len),
        }
    }

    /// Transform length in bins.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length transform.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// In-place forward transform. The buffer length must equal
    /// [`Fourier::len`].
    pub fn forward(&self, buf: &mut [Complex<f64>]) {
        debug_assert_eq!(buf.len(), self.len);
        self.fwd.process(buf);
    }

    /// In-place inverse transform (unnormalized).
    pub fn inverse(&self, buf: &mut [Complex<f64>]) {
        debug_assert_eq!(buf.len(), self.len);
        self.inv.process(buf);
    }

    /// The transform length used for an analysis window of `window_len`
    /// samples: the smallest power of two at least twice the window
    /// length, so spectra are oversampled by at least 2x.
    pub fn padded_length(window_len: usize) -> usize {
        (window_len.max(1) * 2).next_power_of_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_padded_length() {
        assert_eq!(Fourier::padded_length(5), 16);
        assert_eq!(Fourier::padded_length(8), 16);
        assert_eq!(Fourier::padded_length(9), 32);
        assert_eq!(Fourier::padded_length(511), 1024);
    }

    #[test]
    fn test_impulse_has_flat_spectrum() {
        let ft = Fourier::new(16);
        let mut buf = vec![Complex::new(0.0, 0.0); 16];
        buf[0] = Complex::new(1.0, 0.0);
        ft.forward(&mut buf);
        for bin in &buf {
            assert_relative_eq!(bin.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_forward_inverse_round_trip() {
        let ft = Fourier::new(32);
        let original: Vec<Complex<f64>> = (0..32)
            .map(|i| Complex::new((i as f64 * 0.37).sin(), (i as f64 * 0.11).cos()))
            .collect();
        let mut buf = original.clone();
        ft.forward(&mut buf);
        ft.inverse(&mut buf);
        for (a, b) in original.iter().zip(&buf) {
            assert_relative_eq!(a.re, b.re / 32.0, epsilon = 1e-10);
            assert_relative_eq!(a.im, b.im / 32.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_sinusoid_peaks_at_its_bin() {
        let n = 64;
        let ft = Fourier::new(n);
        let mut buf: Vec<Complex<f64>> = (0..n)
            .map(|i| Complex::new((2.0 * PI * 4.0 * i as f64 / n as f64).cos(), 0.0))
            .collect();
        ft.forward(&mut buf);
        let peak = (0..n / 2)
            .max_by(|&a, &b| buf[a].norm().partial_cmp(&buf[b].norm()).unwrap())
            .unwrap();
        assert_eq!(peak, 4);
    }
}

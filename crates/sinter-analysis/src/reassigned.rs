//! Reassigned short-time spectrum.
//!
//! A frame is transformed twice: once with the analysis window, and once
//! with the complex reassignment window (frequency ramp in the real
//! part, time ramp in the imaginary part). The ratio of the two spectra
//! yields per-bin corrections that relocate each bin's nominal time and
//! frequency to the instantaneous time and frequency of the energy the
//! bin actually captured.

use rustfft::num_complex::Complex;

use crate::fourier::Fourier;
use crate::window::reassignment_window;

/// Reassigned short-time Fourier spectrum of one analysis frame.
///
/// Construct once per analysis run and call
/// [`transform`](ReassignedSpectrum::transform) once per frame; the
/// correction accessors then refer to the most recent frame.
pub struct ReassignedSpectrum {
    window: Vec<f64>,
    ra_window: Vec<Complex<f64>>,
    fourier: Fourier,
    transform: Vec<Complex<f64>>,
    ra_transform: Vec<Complex<f64>>,
    magnitude_scale: f64,
}

impl ReassignedSpectrum {
    /// Creates a spectrum for the given analysis window. The transform
    /// length is the smallest power of two at least twice the window
    /// length.
    pub fn new(window: Vec<f64>) -> Self {
        let len = Fourier::padded_length(window.len());
        let winsum: f64 = window.iter().sum();
        let ra_window = reassignment_window(&window);
        Self {
            ra_window,
            fourier: Fourier::new(len),
            transform: vec![Complex::new(0.0, 0.0); len],
            ra_transform: vec![Complex::new(0.0, 0.0); len],
            magnitude_scale: 2.0 / winsum,
            window,
        }
    }

    /// The analysis window.
    pub fn window(&self) -> &[f64] {
        &self.window
    }

    /// Transform length in bins.
    pub fn len(&self) -> usize {
        self.fourier.len()
    }

    /// True if the transform length is zero (never in practice).
    pub fn is_empty(&self) -> bool {
        self.fourier.is_empty()
    }

    /// Computes both transforms of one frame.
    ///
    /// `frame` holds the samples to analyze and `center` is the index
    /// within `frame` of the sample that aligns with the window center.
    /// At buffer edges the frame may be shorter than the window; the
    /// window is clipped to match, and the transform input is rotated so
    /// the center sample lands at index zero, aligning phase.
    pub fn transform(&mut self, frame: &[f64], center: usize) {
        let half = self.window.len() / 2;
        debug_assert!(center < frame.len());
        debug_assert!(center <= half);

        // Skip the head of the window when the frame starts late.
        let win_offset = half - center;
        debug_assert!(frame.len() <= self.window.len() - win_offset);

        self.transform.fill(Complex::new(0.0, 0.0));
        self.ra_transform.fill(Complex::new(0.0, 0.0));
        for (i, &s) in frame.iter().enumerate() {
            self.transform[i] = Complex::new(s * self.window[win_offset + i], 0.0);
            self.ra_transform[i] = self.ra_window[win_offset + i] * s;
        }

        self.transform.rotate_left(center);
        self.ra_transform.rotate_left(center);

        self.fourier.forward(&mut self.transform);
        self.fourier.forward(&mut self.ra_transform);
    }

    /// Raw (window-scaled) magnitude of a bin.
    pub fn magnitude(&self, idx: usize) -> f64 {
        self.transform[idx].norm()
    }

    /// Frequency correction for a bin, in fractional bins. Non-finite
    /// for zero-energy bins; callers discard those.
    pub fn frequency_correction(&self, idx: usize) -> f64 {
        let flip = self.flip_index(idx);
        // The frequency reassignment transform is the circular-even part
        // of the ramped transform.
        let fra = 0.5 * (self.ra_transform[idx] + self.ra_transform[flip].conj());
        let x = self.transform[idx];
        let num = x.re * fra.im - x.im * fra.re;
        let oversampling = self.len() as f64 / self.ra_window.len() as f64;
        -oversampling * num / x.norm_sqr()
    }

    /// Time correction for a bin, in samples relative to the frame
    /// center. Non-finite for zero-energy bins.
    pub fn time_correction(&self, idx: usize) -> f64 {
        let flip = self.flip_index(idx);
        // The time reassignment transform is the circular-odd part of
        // the ramped transform divided by j.
        let tmp = self.ra_transform[idx] - self.ra_transform[flip].conj();
        let tra = Complex::new(0.5 * tmp.im, -0.5 * tmp.re);
        let x = self.transform[idx];
        let num = x.re * tra.re + x.im * tra.im;
        num / x.norm_sqr()
    }

    /// Reassigned frequency of a bin, in fractional bins.
    pub fn reassigned_frequency(&self, idx: usize) -> f64 {
        idx as f64 + self.frequency_correction(idx)
    }

    /// Component amplitude at a bin: the peak magnitude scaled to
    /// account for the analysis window.
    pub fn reassigned_magnitude(&self, idx: usize) -> f64 {
        self.magnitude_scale * self.transform[idx].norm()
    }

    /// Phase at a bin, shifted to the reassigned time according to the
    /// reassigned frequency (`frac_bin` in bins, `time_correction` in
    /// samples).
    pub fn reassigned_phase(&self, idx: usize, frac_bin: f64, time_correction: f64) -> f64 {
        use std::f64::consts::PI;
        let phase = self.transform[idx].arg();
        let shifted = phase + time_correction * frac_bin * 2.0 * PI / self.len() as f64;
        shifted % (2.0 * PI)
    }

    fn flip_index(&self, idx: usize) -> usize {
        if idx > 0 {
            self.len() - idx
        } else {
            0
        }
    }
}

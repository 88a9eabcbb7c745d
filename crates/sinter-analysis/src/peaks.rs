//! Spectral peak extraction and thinning.
//!
//! Peaks are local magnitude maxima of the reassigned spectrum. Each
//! retained peak becomes a prospective breakpoint with reassigned time,
//! frequency, amplitude, and phase. Peaks that fail the selection
//! criteria are not discarded outright: they carry real spectral energy,
//! so they are kept separately for the bandwidth associator to
//! redistribute as noise.

use sinter_model::Breakpoint;

use crate::reassigned::ReassignedSpectrum;

/// Peaks of one analysis frame, split into breakpoint candidates and
/// rejected (noise) peaks.
#[derive(Debug, Clone, Default)]
pub struct FramePeaks {
    /// Retained peaks, sorted by ascending frequency.
    pub kept: Vec<Breakpoint>,
    /// Rejected peaks: below the amplitude floor, or masked by a louder
    /// neighbor during thinning. Fuel for bandwidth association.
    pub rejected: Vec<Breakpoint>,
}

/// Selection criteria for peak extraction.
#[derive(Debug, Clone, Copy)]
pub struct PeakSelection {
    /// Center time of the frame, in seconds.
    pub frame_time: f64,
    /// Sample rate of the analyzed signal, in Hz.
    pub sample_rate: f64,
    /// Absolute magnitude threshold (linear amplitude).
    pub amp_threshold: f64,
    /// Minimum instantaneous frequency, in Hz.
    pub freq_floor: f64,
    /// Maximum |time correction|, in seconds; peaks displaced further
    /// belong to a neighboring frame.
    pub crop_time: f64,
}

/// Extracts reassigned spectral peaks from the current frame of
/// `spectrum`.
///
/// Scans for local magnitude maxima (a tie with the next bin resolves to
/// the lower-frequency bin), refines each with the reassignment
/// corrections, and applies the frequency floor, crop time, and
/// amplitude threshold. Bins with non-finite corrections are dropped at
/// detection. Peaks below the amplitude threshold land in `rejected`;
/// survivors land in `kept`, sorted by ascending frequency.
pub fn extract_peaks(spectrum: &ReassignedSpectrum, sel: &PeakSelection) -> FramePeaks {
    let mut frame = FramePeaks::default();
    let bins_to_hz = sel.sample_rate / spectrum.len() as f64;
    let crop_samples = sel.crop_time * sel.sample_rate;

    for j in 1..spectrum.len() / 2 - 1 {
        let mag = spectrum.magnitude(j);
        if !(mag > spectrum.magnitude(j - 1) && mag >= spectrum.magnitude(j + 1)) {
            continue;
        }

        let frac_bin = spectrum.reassigned_frequency(j);
        let freq = frac_bin * bins_to_hz;
        if !freq.is_finite() || freq < sel.freq_floor || freq <= 0.0 {
            continue;
        }

        let time_correction = spectrum.time_correction(j);
        if !time_correction.is_finite() || time_correction.abs() > crop_samples {
            continue;
        }

        let amp = spectrum.reassigned_magnitude(j);
        let phase = spectrum.reassigned_phase(j, frac_bin, time_correction);
        let time = sel.frame_time + time_correction / sel.sample_rate;

        if amp < sel.amp_threshold {
            frame
                .rejected
                .push(Breakpoint::new(time, freq, amp, 1.0, phase));
        } else {
            frame
                .kept
                .push(Breakpoint::new(time, freq, amp, 0.0, phase));
        }
    }

    frame
        .kept
        .sort_by(|a, b| a.frequency.partial_cmp(&b.frequency).unwrap());
    frame
}

/// Thins retained peaks to the requested partial density: any peak
/// within `freq_resolution` Hz of a louder surviving peak is moved to
/// the rejected set. Survivors stay sorted by ascending frequency.
pub fn thin_peaks(frame: &mut FramePeaks, freq_resolution: f64) {
    if frame.kept.len() < 2 {
        return;
    }

    let mut by_loudness: Vec<Breakpoint> = std::mem::take(&mut frame.kept);
    by_loudness.sort_by(|a, b| b.amplitude.partial_cmp(&a.amplitude).unwrap());

    let mut survivors: Vec<Breakpoint> = Vec::with_capacity(by_loudness.len());
    for bp in by_loudness {
        let masked = survivors
            .iter()
            .any(|s| (s.frequency - bp.frequency).abs() < freq_resolution);
        if masked {
            frame
                .rejected
                .push(Breakpoint::new(bp.time, bp.frequency, bp.amplitude, 1.0, bp.phase));
        } else {
            survivors.push(bp);
        }
    }

    survivors.sort_by(|a, b| a.frequency.partial_cmp(&b.frequency).unwrap());
    frame.kept = survivors;
}

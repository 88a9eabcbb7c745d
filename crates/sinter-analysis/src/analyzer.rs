//! The analysis pipeline: samples in, partials out.

use sinter_model::{BreakpointEnvelope, Envelope, PartialList, ProgressFn};

use crate::bandwidth::BandwidthAssociator;
use crate::builder::PartialBuilder;
use crate::channelize::Channelizer;
use crate::error::{AnalysisError, AnalysisResult};
use crate::peaks::{extract_peaks, thin_peaks, PeakSelection};
use crate::reassigned::ReassignedSpectrum;
use crate::window;

/// Configuration and entry point for reassigned bandwidth-enhanced
/// analysis.
///
/// The core parameter is the frequency resolution, the minimum
/// instantaneous frequency spacing between partials; every other
/// parameter is derived from it (or from the analysis window width) at
/// construction and can be overridden independently afterwards.
///
/// ```
/// use sinter_analysis::Analyzer;
/// use sinter_model::BreakpointEnvelope;
///
/// let samples = vec![0.0; 44100];
/// let analyzer = Analyzer::new(80.0).unwrap();
/// let partials = analyzer
///     .analyze(&samples, 44100.0, BreakpointEnvelope::constant(440.0))
///     .unwrap();
/// assert!(partials.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Analyzer {
    resolution: f64,
    window_width: f64,
    amp_floor: BreakpointEnvelope,
    freq_floor: f64,
    drift: f64,
    hop_time: f64,
    crop_time: f64,
    gap_frames: u32,
    floating_range_db: f64,
    low_freq_cutoff: f64,
    bw_region_width: f64,
    associate_bandwidth: bool,
}

impl Analyzer {
    /// Creates an analyzer from a frequency resolution in Hz, using a
    /// window exactly as wide as the resolution.
    pub fn new(resolution: f64) -> AnalysisResult<Self> {
        Self::new_with_width(resolution, resolution)
    }

    /// Creates an analyzer from independent frequency resolution and
    /// main-lobe window width, both in Hz. The window width should be
    /// near the resolution and never more than twice it.
    pub fn new_with_width(resolution: f64, window_width: f64) -> AnalysisResult<Self> {
        if !(resolution > 0.0) || !resolution.is_finite() {
            return Err(AnalysisError::invalid_param(
                "resolution",
                format!("must be positive, got {resolution}"),
            ));
        }
        if !(window_width > 0.0) || !window_width.is_finite() {
            return Err(AnalysisError::invalid_param(
                "window_width",
                format!("must be positive, got {window_width}"),
            ));
        }
        Ok(Self {
            resolution,
            window_width,
            // -90 dB catches everything above the 16-bit noise floor.
            amp_floor: BreakpointEnvelope::constant(-90.0),
            freq_floor: resolution,
            drift: 0.5 * resolution,
            // Hop of one over the lobe width keeps adjacent frames
            // just-overlapping (Allen 1977).
            hop_time: 1.0 / window_width,
            crop_time: 1.0 / window_width,
            gap_frames: 1,
            floating_range_db: 40.0,
            low_freq_cutoff: resolution,
            bw_region_width: 2000.0,
            associate_bandwidth: true,
        })
    }

    /// Frequency resolution in Hz.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Analysis window main-lobe width in Hz.
    pub fn window_width(&self) -> f64 {
        self.window_width
    }

    /// Amplitude floor envelope, in dB.
    pub fn amp_floor(&self) -> &BreakpointEnvelope {
        &self.amp_floor
    }

    /// Sets a fixed amplitude floor in (negative) dB.
    pub fn set_amp_floor(&mut self, db: f64) {
        self.amp_floor = BreakpointEnvelope::constant(db);
    }

    /// Sets a time-varying amplitude floor, in dB.
    pub fn set_amp_floor_envelope(&mut self, env: BreakpointEnvelope) {
        self.amp_floor = env;
    }

    /// Minimum instantaneous partial frequency in Hz.
    pub fn freq_floor(&self) -> f64 {
        self.freq_floor
    }

    /// Sets the minimum instantaneous partial frequency in Hz.
    pub fn set_freq_floor(&mut self, hz: f64) {
        self.freq_floor = hz;
    }

    /// Maximum frequency difference between consecutive breakpoints of
    /// one partial, in Hz.
    pub fn freq_drift(&self) -> f64 {
        self.drift
    }

    /// Sets the frequency drift tolerance in Hz.
    pub fn set_freq_drift(&mut self, hz: f64) {
        self.drift = hz;
    }

    /// Hop time between frame centers, in seconds.
    pub fn hop_time(&self) -> f64 {
        self.hop_time
    }

    /// Sets the hop time in seconds.
    pub fn set_hop_time(&mut self, seconds: f64) {
        self.hop_time = seconds;
    }

    /// Maximum reassigned-time displacement from the frame center, in
    /// seconds, beyond which a spectral point is unreliable.
    pub fn crop_time(&self) -> f64 {
        self.crop_time
    }

    /// Sets the crop time in seconds.
    pub fn set_crop_time(&mut self, seconds: f64) {
        self.crop_time = seconds;
    }

    /// Number of consecutive peakless frames bridged in a channel.
    pub fn gap_frames(&self) -> u32 {
        self.gap_frames
    }

    /// Sets the gap-bridging frame count.
    pub fn set_gap_frames(&mut self, frames: u32) {
        self.gap_frames = frames;
    }

    /// Floating-threshold range in dB: a peak starts a new partial only
    /// within this range of the loudest peak in its frame.
    pub fn floating_range(&self) -> f64 {
        self.floating_range_db
    }

    /// Sets the floating-threshold range in dB.
    pub fn set_floating_range(&mut self, db: f64) {
        self.floating_range_db = db;
    }

    /// Cutoff below which bandwidth enhancement is folded back into
    /// amplitude, in Hz.
    pub fn low_freq_cutoff(&self) -> f64 {
        self.low_freq_cutoff
    }

    /// Sets the low-frequency correction cutoff in Hz (0 disables).
    pub fn set_low_freq_cutoff(&mut self, hz: f64) {
        self.low_freq_cutoff = hz;
    }

    /// Width of the bandwidth-association regions in Hz.
    pub fn bw_region_width(&self) -> f64 {
        self.bw_region_width
    }

    /// Sets the bandwidth-association region width in Hz.
    pub fn set_bw_region_width(&mut self, hz: f64) {
        self.bw_region_width = hz;
    }

    /// True if residual energy is distributed as partial bandwidth.
    pub fn associate_bandwidth(&self) -> bool {
        self.associate_bandwidth
    }

    /// Enables or disables bandwidth association.
    pub fn set_associate_bandwidth(&mut self, enabled: bool) {
        self.associate_bandwidth = enabled;
    }

    /// Analyzes a sample buffer into a list of labeled partials.
    ///
    /// `reference` supplies the channelization reference frequency
    /// (typically an estimated fundamental, or a constant at the
    /// expected partial spacing). Peaks are labeled by channel and
    /// linked into partials per channel; labels carry through to the
    /// result. An empty buffer yields an empty list.
    pub fn analyze<R: Envelope>(
        &self,
        samples: &[f64],
        sample_rate: f64,
        reference: R,
    ) -> AnalysisResult<PartialList> {
        self.analyze_with_progress(samples, sample_rate, reference, None)
    }

    /// Like [`analyze`](Analyzer::analyze), reporting the fraction of
    /// frames processed through the optional callback.
    pub fn analyze_with_progress<R: Envelope>(
        &self,
        samples: &[f64],
        sample_rate: f64,
        reference: R,
        mut progress: Option<ProgressFn>,
    ) -> AnalysisResult<PartialList> {
        self.validate()?;
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(AnalysisError::InvalidSampleRate { rate: sample_rate });
        }
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        // Window attenuation comes from the deepest amplitude floor.
        let floor_db = self.deepest_floor_db();
        let shape = window::shape_for_attenuation(-floor_db);
        let mut winlen = window::length_for_width(self.window_width / sample_rate, -floor_db);
        if winlen % 2 == 0 {
            winlen += 1;
        }

        let mut spectrum = ReassignedSpectrum::new(window::kaiser(winlen, shape));
        let channelizer = Channelizer::new(reference);
        let mut builder = PartialBuilder::new(
            self.drift,
            self.gap_frames,
            self.floating_range_db,
            self.low_freq_cutoff,
        )?;
        let mut associator = if self.associate_bandwidth {
            Some(BandwidthAssociator::new(self.bw_region_width, sample_rate)?)
        } else {
            None
        };

        let hop = ((self.hop_time * sample_rate) as usize).max(1);
        let first_half = winlen / 2;
        let second_half = (winlen - 1) / 2;

        let mut center = 0usize;
        while center < samples.len() {
            let frame_time = center as f64 / sample_rate;
            let begin = center.saturating_sub(first_half);
            let end = (center + second_half + 1).min(samples.len());
            spectrum.transform(&samples[begin..end], center - begin);

            let selection = PeakSelection {
                frame_time,
                sample_rate,
                amp_threshold: 10.0_f64.powf(0.05 * self.amp_floor.value_at(frame_time)),
                freq_floor: self.freq_floor,
                crop_time: self.crop_time,
            };
            let mut frame = extract_peaks(&spectrum, &selection);
            thin_peaks(&mut frame, self.resolution);

            if let Some(assoc) = associator.as_mut() {
                for bp in &frame.rejected {
                    assoc.accumulate_noise(bp.frequency, bp.amplitude);
                }
                for bp in &frame.kept {
                    assoc.accumulate_sinusoid(bp.frequency, bp.amplitude);
                }
                for bp in &mut frame.kept {
                    assoc.associate(bp);
                }
                assoc.reset();
            }

            builder.add_frame(&channelizer.channelize(&frame.kept));

            if let Some(report) = progress.as_mut() {
                report(((center + hop) as f64 / samples.len() as f64).min(1.0));
            }
            center += hop;
        }

        Ok(builder.finish())
    }

    fn deepest_floor_db(&self) -> f64 {
        let deepest = self
            .amp_floor
            .iter()
            .map(|&(_, db)| db)
            .fold(f64::INFINITY, f64::min);
        if deepest.is_finite() {
            deepest
        } else {
            -90.0
        }
    }

    fn validate(&self) -> AnalysisResult<()> {
        let positive = [
            ("resolution", self.resolution),
            ("window_width", self.window_width),
            ("drift", self.drift),
            ("hop_time", self.hop_time),
            ("crop_time", self.crop_time),
            ("bw_region_width", self.bw_region_width),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(AnalysisError::invalid_param(
                    name,
                    format!("must be positive, got {value}"),
                ));
            }
        }
        let non_negative = [
            ("freq_floor", self.freq_floor),
            ("floating_range_db", self.floating_range_db),
            ("low_freq_cutoff", self.low_freq_cutoff),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(AnalysisError::invalid_param(
                    name,
                    format!("must be non-negative, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

//! Linking channelized peaks across frames into partials.
//!
//! One finite state machine per channel number, kept in a channel-keyed
//! table: a channel is either empty or growing a partial. Peaks extend
//! the growing partial when their frequency stays within the drift
//! tolerance; short runs of frames with no peak in a channel are bridged
//! (the envelope interpolates linearly across the gap); longer dropouts
//! terminate the partial and let a new one begin in that channel.

use std::collections::BTreeMap;

use sinter_model::{Breakpoint, Partial, PartialList, PartialView};

use crate::channelize::ChannelPeak;
use crate::error::{AnalysisError, AnalysisResult};

/// Builds partials from frames of channelized peaks.
///
/// Feed frames in time order with [`add_frame`](PartialBuilder::add_frame),
/// then call [`finish`](PartialBuilder::finish) to flush still-growing
/// partials and collect the result. Each partial's label is the channel
/// it grew in.
pub struct PartialBuilder {
    drift: f64,
    gap_frames: u32,
    floating_ratio: f64,
    low_freq_cutoff: f64,
    channels: BTreeMap<i32, Growing>,
    collected: PartialList,
}

struct Growing {
    partial: Partial,
    missed: u32,
}

impl PartialBuilder {
    /// Creates a builder.
    ///
    /// `drift` is the maximum frequency difference (Hz) between
    /// consecutive breakpoints of one partial. Up to `gap_frames`
    /// consecutive peakless frames in a channel are bridged.
    /// `floating_range_db` sets the floating threshold: a peak starts a
    /// new partial only if it is within that many dB of the loudest peak
    /// in its frame. Breakpoints at or below `low_freq_cutoff` (Hz) get
    /// their noise energy folded back into amplitude when building
    /// finishes; 0 disables the correction.
    pub fn new(
        drift: f64,
        gap_frames: u32,
        floating_range_db: f64,
        low_freq_cutoff: f64,
    ) -> AnalysisResult<Self> {
        if !(drift > 0.0) || !drift.is_finite() {
            return Err(AnalysisError::invalid_param(
                "drift",
                format!("must be positive, got {drift}"),
            ));
        }
        if !(floating_range_db >= 0.0) {
            return Err(AnalysisError::invalid_param(
                "floating_range_db",
                format!("must be non-negative, got {floating_range_db}"),
            ));
        }
        if !(low_freq_cutoff >= 0.0) {
            return Err(AnalysisError::invalid_param(
                "low_freq_cutoff",
                format!("must be non-negative, got {low_freq_cutoff}"),
            ));
        }
        Ok(Self {
            drift,
            gap_frames,
            floating_ratio: 10.0_f64.powf(-0.05 * floating_range_db),
            low_freq_cutoff,
            channels: BTreeMap::new(),
            collected: Vec::new(),
        })
    }

    /// Processes one frame of channelized peaks.
    pub fn add_frame(&mut self, peaks: &[ChannelPeak]) {
        let loudest = peaks
            .iter()
            .map(|p| p.breakpoint.amplitude)
            .fold(0.0, f64::max);
        let start_floor = loudest * self.floating_ratio;

        // When two peaks round to the same channel, keep the better one:
        // nearest in frequency to the growing partial, or the louder one
        // for a channel with nothing growing.
        let mut chosen: BTreeMap<i32, ChannelPeak> = BTreeMap::new();
        for &peak in peaks {
            match chosen.entry(peak.channel) {
                std::collections::btree_map::Entry::Vacant(slot) => {
                    slot.insert(peak);
                }
                std::collections::btree_map::Entry::Occupied(mut slot) => {
                    if self.prefer(&peak, slot.get()) {
                        slot.insert(peak);
                    }
                }
            }
        }

        for (&channel, peak) in &chosen {
            let extended = match self.channels.get_mut(&channel) {
                Some(growing) => {
                    let last_freq = growing
                        .partial
                        .last()
                        .map(|bp| bp.frequency)
                        .unwrap_or(peak.breakpoint.frequency);
                    if (peak.breakpoint.frequency - last_freq).abs() < self.drift {
                        growing.partial.insert(peak.breakpoint);
                        growing.missed = 0;
                        true
                    } else {
                        false
                    }
                }
                None => false,
            };
            if !extended {
                // Too far to be the same component (or nothing growing):
                // terminate whatever was there and maybe begin anew.
                if let Some(done) = self.channels.remove(&channel) {
                    self.collect(done.partial);
                }
                self.maybe_start(channel, peak.breakpoint, start_floor);
            }
        }

        // Channels that saw no peak this frame accrue a miss; beyond the
        // gap tolerance the partial terminates.
        let expired: Vec<i32> = self
            .channels
            .iter_mut()
            .filter_map(|(&channel, growing)| {
                if chosen.contains_key(&channel) {
                    return None;
                }
                growing.missed += 1;
                (growing.missed > self.gap_frames).then_some(channel)
            })
            .collect();
        for channel in expired {
            let done = self.channels.remove(&channel).unwrap();
            self.collect(done.partial);
        }
    }

    /// Flushes growing partials, applies the low-frequency correction,
    /// and returns everything built.
    pub fn finish(mut self) -> PartialList {
        let growing = std::mem::take(&mut self.channels);
        for (_, g) in growing {
            self.collect(g.partial);
        }

        if self.low_freq_cutoff > 0.0 {
            let cutoff = self.low_freq_cutoff;
            self.collected = self
                .collected
                .iter()
                .map(|p| LowFreqCorrection::new(p, cutoff).to_partial())
                .collect();
        }
        self.collected
    }

    fn prefer(&self, candidate: &ChannelPeak, incumbent: &ChannelPeak) -> bool {
        match self.channels.get(&candidate.channel) {
            Some(growing) => {
                let last_freq = match growing.partial.last() {
                    Some(bp) => bp.frequency,
                    None => return candidate.breakpoint.amplitude > incumbent.breakpoint.amplitude,
                };
                (candidate.breakpoint.frequency - last_freq).abs()
                    < (incumbent.breakpoint.frequency - last_freq).abs()
            }
            None => candidate.breakpoint.amplitude > incumbent.breakpoint.amplitude,
        }
    }

    fn maybe_start(&mut self, channel: i32, bp: Breakpoint, start_floor: f64) {
        // The floating threshold keeps quiet spectral clutter from
        // seeding partials while something much louder is sounding.
        if bp.amplitude < start_floor {
            return;
        }
        let mut partial = Partial::with_label(channel);
        partial.insert(bp);
        self.channels.insert(channel, Growing { partial, missed: 0 });
    }

    fn collect(&mut self, partial: Partial) {
        if !partial.is_empty() {
            self.collected.push(partial);
        }
    }
}

/// View that suppresses bandwidth enhancement below a cutoff frequency:
/// the noise energy is folded back into the sinusoidal amplitude and the
/// bandwidth zeroed. Reassignment statistics are unreliable for low
/// channels, and audible noise modulation down there sounds wrong.
pub struct LowFreqCorrection<V> {
    inner: V,
    cutoff: f64,
}

impl<V: PartialView> LowFreqCorrection<V> {
    /// Wraps `inner`, correcting breakpoints at or below `cutoff` Hz.
    pub fn new(inner: V, cutoff: f64) -> Self {
        Self { inner, cutoff }
    }
}

impl<V: PartialView> PartialView for LowFreqCorrection<V> {
    fn source(&self) -> &Partial {
        self.inner.source()
    }

    fn render(&self, bp: &Breakpoint) -> Breakpoint {
        let bp = self.inner.render(bp);
        if bp.frequency > self.cutoff {
            bp
        } else {
            Breakpoint {
                amplitude: bp.amplitude * (1.0 - bp.bandwidth).sqrt(),
                bandwidth: 0.0,
                ..bp
            }
        }
    }
}

//! Channel assignment for spectral peaks.
//!
//! A channel is an integer bucket derived from a caller-supplied
//! reference frequency envelope (typically an estimated fundamental).
//! Channel numbers give peaks a frame-to-frame identity that survives
//! absolute frequency drift such as vibrato: a peak riding the third
//! harmonic stays in channel 3 even as the fundamental moves.

use sinter_model::{Breakpoint, Envelope};

/// A spectral peak with its assigned frequency channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelPeak {
    /// The channel number (≥ 1); becomes the partial label.
    pub channel: i32,
    /// The underlying reassigned peak.
    pub breakpoint: Breakpoint,
}

/// Assigns peaks to channels of a reference frequency envelope.
pub struct Channelizer<E> {
    reference: E,
}

impl<E: Envelope> Channelizer<E> {
    /// Creates a channelizer around the given reference envelope.
    pub fn new(reference: E) -> Self {
        Self { reference }
    }

    /// The channel for a peak: its frequency divided by the reference
    /// frequency at the peak time, rounded to the nearest integer.
    /// `None` when the channel would be non-positive (including a
    /// non-positive reference value).
    pub fn channel_for(&self, bp: &Breakpoint) -> Option<i32> {
        let reference = self.reference.value_at(bp.time);
        if reference <= 0.0 || !reference.is_finite() {
            return None;
        }
        let channel = (bp.frequency / reference).round();
        if channel < 1.0 || channel > i32::MAX as f64 {
            return None;
        }
        Some(channel as i32)
    }

    /// Channelizes a frame of peaks, dropping peaks with no valid
    /// channel. Input order is preserved.
    pub fn channelize(&self, peaks: &[Breakpoint]) -> Vec<ChannelPeak> {
        peaks
            .iter()
            .filter_map(|bp| {
                self.channel_for(bp).map(|channel| ChannelPeak {
                    channel,
                    breakpoint: *bp,
                })
            })
            .collect()
    }
}

//! Partial trajectories and collections of them.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::Breakpoint;

/// An unordered collection of partials.
///
/// Iteration order is stable within a run; no stage depends on it for
/// correctness. Stages take ownership of the list they operate on and
/// return a new or mutated list.
pub type PartialList = Vec<Partial>;

/// Fade time used when evaluating amplitude exactly at an envelope
/// endpoint. Zero is dangerous with floating point round-off; one
/// nanosecond is short enough to be inaudible and long enough to dodge
/// rounding in the least significant mantissa bits for times up to hours.
pub const SHORTEST_SAFE_FADE: f64 = 1.0e-9;

/// A single bandwidth-enhanced component of a sound: a chain of
/// [`Breakpoint`]s at strictly increasing times, plus an integer label.
///
/// Label 0 means unlabeled; the analyzer assigns positive channel
/// numbers, and negative labels are left to callers. A partial with
/// fewer than two breakpoints has zero duration and no synthesizable
/// energy, but is still a valid value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partial {
    label: i32,
    breakpoints: Vec<Breakpoint>,
}

impl Partial {
    /// Creates an empty, unlabeled partial.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty partial with the given label.
    pub fn with_label(label: i32) -> Self {
        Self {
            label,
            breakpoints: Vec::new(),
        }
    }

    /// Builds a partial from breakpoints in any order.
    pub fn from_breakpoints(label: i32, breakpoints: impl IntoIterator<Item = Breakpoint>) -> Self {
        let mut p = Self::with_label(label);
        for bp in breakpoints {
            p.insert(bp);
        }
        p
    }

    /// This partial's label (0 = unlabeled).
    pub fn label(&self) -> i32 {
        self.label
    }

    /// Sets this partial's label.
    pub fn set_label(&mut self, label: i32) {
        self.label = label;
    }

    /// Number of breakpoints.
    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    /// True if this partial has no breakpoints.
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Iterates the breakpoints in time order.
    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.iter()
    }

    /// The earliest breakpoint, if any.
    pub fn first(&self) -> Option<&Breakpoint> {
        self.breakpoints.first()
    }

    /// The latest breakpoint, if any.
    pub fn last(&self) -> Option<&Breakpoint> {
        self.breakpoints.last()
    }

    /// Time of the first breakpoint, or `None` if empty.
    pub fn start_time(&self) -> Option<f64> {
        self.first().map(|bp| bp.time)
    }

    /// Time of the last breakpoint, or `None` if empty.
    pub fn end_time(&self) -> Option<f64> {
        self.last().map(|bp| bp.time)
    }

    /// Time spanned by the envelope; 0 for fewer than two breakpoints.
    pub fn duration(&self) -> f64 {
        match (self.start_time(), self.end_time()) {
            (Some(s), Some(e)) => e - s,
            _ => 0.0,
        }
    }

    /// Inserts a breakpoint, keeping times strictly increasing. A
    /// breakpoint at an exactly equal time replaces the existing one.
    pub fn insert(&mut self, bp: Breakpoint) {
        let idx = self.find_after(bp.time);
        if idx < self.breakpoints.len() && self.breakpoints[idx].time == bp.time {
            self.breakpoints[idx] = bp;
        } else {
            self.breakpoints.insert(idx, bp);
        }
    }

    /// Index of the first breakpoint at or after `time` (may be `len()`).
    pub fn find_after(&self, time: f64) -> usize {
        self.breakpoints.partition_point(|bp| bp.time < time)
    }

    /// Keeps only breakpoints satisfying the predicate.
    pub fn retain(&mut self, f: impl FnMut(&Breakpoint) -> bool) {
        self.breakpoints.retain(f);
    }

    /// Interpolated frequency at `time`. Outside the span, the nearest
    /// endpoint frequency holds. Returns 0 for an empty partial.
    pub fn frequency_at(&self, time: f64) -> f64 {
        match self.segment_at(time) {
            Segment::Empty => 0.0,
            Segment::Before(bp) | Segment::After(bp) => bp.frequency,
            Segment::Between(lo, hi, alpha) => {
                alpha * hi.frequency + (1.0 - alpha) * lo.frequency
            }
        }
    }

    /// Interpolated amplitude at `time`, fading to zero outside the span
    /// over [`SHORTEST_SAFE_FADE`]. Returns 0 for an empty partial.
    pub fn amplitude_at(&self, time: f64) -> f64 {
        self.amplitude_at_faded(time, SHORTEST_SAFE_FADE)
    }

    /// Interpolated amplitude with an explicit extrapolation fade time.
    pub fn amplitude_at_faded(&self, time: f64, fade: f64) -> f64 {
        match self.segment_at(time) {
            Segment::Empty => 0.0,
            Segment::Before(bp) => {
                let alpha = if fade > 0.0 {
                    (1.0 - (bp.time - time) / fade).max(0.0)
                } else if time < bp.time {
                    0.0
                } else {
                    1.0
                };
                alpha * bp.amplitude
            }
            Segment::After(bp) => {
                let alpha = if fade > 0.0 {
                    (1.0 - (time - bp.time) / fade).max(0.0)
                } else if time > bp.time {
                    0.0
                } else {
                    1.0
                };
                alpha * bp.amplitude
            }
            Segment::Between(lo, hi, alpha) => {
                alpha * hi.amplitude + (1.0 - alpha) * lo.amplitude
            }
        }
    }

    /// Interpolated bandwidth at `time`. Outside the span, the nearest
    /// endpoint bandwidth holds. Returns 0 for an empty partial.
    pub fn bandwidth_at(&self, time: f64) -> f64 {
        match self.segment_at(time) {
            Segment::Empty => 0.0,
            Segment::Before(bp) | Segment::After(bp) => bp.bandwidth,
            Segment::Between(lo, hi, alpha) => {
                alpha * hi.bandwidth + (1.0 - alpha) * lo.bandwidth
            }
        }
    }

    /// Phase at `time`, extrapolated outside the span (and interpolated
    /// between breakpoints) by the instantaneous frequency, wrapped into
    /// (-2π, 2π). Returns 0 for an empty partial.
    pub fn phase_at(&self, time: f64) -> f64 {
        match self.segment_at(time) {
            Segment::Empty => 0.0,
            Segment::Before(bp) => {
                let dp = 2.0 * PI * (bp.time - time) * bp.frequency;
                (bp.phase - dp) % (2.0 * PI)
            }
            Segment::After(bp) => {
                let dp = 2.0 * PI * (time - bp.time) * bp.frequency;
                (bp.phase + dp) % (2.0 * PI)
            }
            Segment::Between(lo, hi, alpha) => {
                let favg = alpha * hi.frequency + (1.0 - alpha) * lo.frequency;
                // Advance from the nearer breakpoint for accuracy.
                if alpha < 0.5 {
                    let dp = 2.0 * PI * (time - lo.time) * favg;
                    (lo.phase + dp) % (2.0 * PI)
                } else {
                    let dp = 2.0 * PI * (hi.time - time) * favg;
                    (hi.phase - dp) % (2.0 * PI)
                }
            }
        }
    }

    /// All four envelope parameters at `time` as one breakpoint, or
    /// `None` for an empty partial.
    pub fn parameters_at(&self, time: f64) -> Option<Breakpoint> {
        if self.is_empty() {
            return None;
        }
        Some(Breakpoint::new(
            time,
            self.frequency_at(time),
            self.amplitude_at(time),
            self.bandwidth_at(time),
            self.phase_at(time),
        ))
    }

    /// Accumulates `other`'s energy as noise energy in the part of this
    /// partial's envelope that overlaps `other`'s span in time.
    ///
    /// Zero-amplitude breakpoints do not absorb; they exist to anchor
    /// phase at onsets and are not analysis data.
    pub fn absorb(&mut self, other: &Partial) {
        let (Some(start), Some(end)) = (other.start_time(), other.end_time()) else {
            return;
        };
        let begin = self.find_after(start);
        for bp in &mut self.breakpoints[begin..] {
            if bp.time > end {
                break;
            }
            if bp.amplitude > 0.0 {
                let a = other.amplitude_at(bp.time);
                bp.add_noise_energy(a * a);
            }
        }
    }

    fn segment_at(&self, time: f64) -> Segment<'_> {
        if self.breakpoints.is_empty() {
            return Segment::Empty;
        }
        let idx = self.find_after(time);
        if idx == 0 {
            Segment::Before(&self.breakpoints[0])
        } else if idx == self.breakpoints.len() {
            Segment::After(&self.breakpoints[idx - 1])
        } else {
            let lo = &self.breakpoints[idx - 1];
            let hi = &self.breakpoints[idx];
            let alpha = (time - lo.time) / (hi.time - lo.time);
            Segment::Between(lo, hi, alpha)
        }
    }
}

impl<'a> IntoIterator for &'a Partial {
    type Item = &'a Breakpoint;
    type IntoIter = std::slice::Iter<'a, Breakpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.breakpoints.iter()
    }
}

/// Position of a query time relative to the envelope.
enum Segment<'a> {
    Empty,
    Before(&'a Breakpoint),
    After(&'a Breakpoint),
    Between(&'a Breakpoint, &'a Breakpoint, f64),
}

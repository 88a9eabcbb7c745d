//! Time dilation: warping partial envelopes onto new anchor times.

use sinter_model::{Partial, PartialList};

use crate::error::{MorphError, MorphResult};

/// Piecewise-linear time warp defined by `(initial, target)` anchor
/// pairs.
///
/// Breakpoints between anchors are shifted and stretched proportionally;
/// before the first anchor they scale with the leading segment (or shift
/// when the first anchor sits at time zero), and after the last anchor
/// they shift with the trailing segment. Both anchor sequences must be
/// strictly increasing, which keeps the warp monotonic and breakpoint
/// times strictly increasing.
#[derive(Debug, Clone)]
pub struct Dilator {
    initial: Vec<f64>,
    target: Vec<f64>,
}

impl Dilator {
    /// Creates a dilator from `(initial, target)` anchor pairs.
    /// Non-monotonic or negative anchors are rejected.
    pub fn new(anchors: &[(f64, f64)]) -> MorphResult<Self> {
        for &(i, t) in anchors {
            if !i.is_finite() || !t.is_finite() || i < 0.0 || t < 0.0 {
                return Err(MorphError::invalid_param(
                    "anchors",
                    format!("anchor times must be finite and non-negative, got ({i}, {t})"),
                ));
            }
        }
        for pair in anchors.windows(2) {
            if pair[1].0 <= pair[0].0 || pair[1].1 <= pair[0].1 {
                return Err(MorphError::invalid_param(
                    "anchors",
                    "anchor times must be strictly increasing in both columns",
                ));
            }
        }
        Ok(Self {
            initial: anchors.iter().map(|&(i, _)| i).collect(),
            target: anchors.iter().map(|&(_, t)| t).collect(),
        })
    }

    /// The warped time for an initial time. Identity when no anchors
    /// were given.
    pub fn warp_time(&self, time: f64) -> f64 {
        if self.initial.is_empty() {
            return time;
        }
        let idx = self.initial.partition_point(|&t| t < time);
        if idx == 0 {
            // Everything is later than `time`: stretch toward the first
            // anchor, or shift if the sound is anchored at zero.
            if self.initial[0] != 0.0 {
                time * self.target[0] / self.initial[0]
            } else {
                self.target[0] + (time - self.initial[0])
            }
        } else if idx == self.initial.len() {
            // Everything is earlier: shift with the last anchor.
            self.target[idx - 1] + (time - self.initial[idx - 1])
        } else {
            let stretch = (self.target[idx] - self.target[idx - 1])
                / (self.initial[idx] - self.initial[idx - 1]);
            self.target[idx - 1] + (time - self.initial[idx - 1]) * stretch
        }
    }

    /// Dilates one partial. Zero-breakpoint partials pass through
    /// untouched.
    ///
    /// Besides warping every breakpoint time, a breakpoint is inserted
    /// at each target anchor time that falls within the partial's span,
    /// so sparse envelopes stay aligned with each other between
    /// breakpoints after dilation.
    pub fn dilate_partial(&self, partial: &Partial) -> Partial {
        if partial.is_empty() || self.initial.is_empty() {
            return partial.clone();
        }

        let mut out = Partial::with_label(partial.label());
        for bp in partial {
            out.insert(bp.at_time(self.warp_time(bp.time)));
        }

        // An identity warp must not touch the envelope at all.
        if self.initial == self.target {
            return out;
        }

        let start = partial.start_time().unwrap();
        let end = partial.end_time().unwrap();
        for (idx, &anchor) in self.initial.iter().enumerate() {
            if anchor < start {
                continue;
            }
            if anchor > end {
                break;
            }
            if let Some(bp) = partial.parameters_at(anchor) {
                out.insert(bp.at_time(self.target[idx]));
            }
        }
        out
    }

    /// Dilates every partial in a list.
    pub fn dilate(&self, partials: PartialList) -> PartialList {
        partials.iter().map(|p| self.dilate_partial(p)).collect()
    }
}

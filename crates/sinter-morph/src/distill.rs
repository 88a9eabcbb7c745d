//! Distillation: one partial per label.
//!
//! Analysis leaves each channel's trajectory broken into fragments.
//! Distillation fuses all fragments sharing a nonzero label into a
//! single partial spanning the whole time range. Where fragments do not
//! overlap, their breakpoints are spliced with zero-amplitude
//! breakpoints inserted at the gap boundaries so synthesis fades cleanly
//! in and out. Where fragments overlap, the dominant (higher-amplitude)
//! fragment keeps the region and the other's energy is absorbed as
//! noise.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use sinter_model::{Breakpoint, Partial, PartialList};

use crate::error::{MorphError, MorphResult};

/// What to do with unlabeled (label 0) partials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnlabeledPolicy {
    /// Pass unlabeled partials through unmerged.
    #[default]
    Preserve,
    /// Remove unlabeled partials from the result.
    Drop,
}

/// Fuses same-labeled partials into one partial per distinct label.
#[derive(Debug, Clone)]
pub struct Distiller {
    fade_time: f64,
    unlabeled: UnlabeledPolicy,
}

impl Default for Distiller {
    /// A distiller with a 1 ms splice fade, preserving unlabeled
    /// partials.
    fn default() -> Self {
        Self {
            fade_time: 0.001,
            unlabeled: UnlabeledPolicy::Preserve,
        }
    }
}

impl Distiller {
    /// Creates a distiller with the given splice fade time in seconds.
    /// The fade must be positive so inserted nulls never collide with
    /// real breakpoints.
    pub fn new(fade_time: f64) -> MorphResult<Self> {
        if !(fade_time > 0.0) || !fade_time.is_finite() {
            return Err(MorphError::invalid_param(
                "fade_time",
                format!("must be positive, got {fade_time}"),
            ));
        }
        Ok(Self {
            fade_time,
            unlabeled: UnlabeledPolicy::Preserve,
        })
    }

    /// Sets the policy for unlabeled partials.
    pub fn with_unlabeled_policy(mut self, policy: UnlabeledPolicy) -> Self {
        self.unlabeled = policy;
        self
    }

    /// The splice fade time in seconds.
    pub fn fade_time(&self) -> f64 {
        self.fade_time
    }

    /// Distills a partial list: at most one partial per distinct
    /// nonzero label afterwards. Distilling an already-distilled list
    /// returns it unchanged.
    pub fn distill(&self, partials: PartialList) -> PartialList {
        let mut by_label: BTreeMap<i32, Vec<Partial>> = BTreeMap::new();
        let mut unlabeled: Vec<Partial> = Vec::new();
        for p in partials {
            if p.label() == 0 {
                unlabeled.push(p);
            } else {
                by_label.entry(p.label()).or_default().push(p);
            }
        }

        let mut out: PartialList = by_label
            .into_iter()
            .map(|(label, group)| self.distill_label(label, group))
            .collect();

        if self.unlabeled == UnlabeledPolicy::Preserve {
            out.extend(unlabeled);
        }
        out
    }

    /// Fuses one label's fragments. The dominant fragment (largest peak
    /// amplitude, then longest, then earliest) anchors the result;
    /// others contribute only where it carries no amplitude.
    fn distill_label(&self, label: i32, mut group: Vec<Partial>) -> Partial {
        group.sort_by(|a, b| {
            peak_amplitude(b)
                .partial_cmp(&peak_amplitude(a))
                .unwrap()
                .then(b.duration().partial_cmp(&a.duration()).unwrap())
                .then(
                    a.start_time()
                        .unwrap_or(0.0)
                        .partial_cmp(&b.start_time().unwrap_or(0.0))
                        .unwrap(),
                )
        });

        let mut iter = group.into_iter();
        let mut base = iter.next().unwrap_or_default();
        base.set_label(label);

        for p in iter {
            match self.contribution_end(&p, &base) {
                None => base.absorb(&p),
                Some(end) => {
                    // Absorb the part that overlaps the base...
                    if end < p.len() {
                        let tail = Partial::from_breakpoints(
                            0,
                            p.iter().skip(end.saturating_sub(1)).copied(),
                        );
                        base.absorb(&tail);
                    }
                    // ...and splice in the part that fits a gap.
                    self.merge(&mut base, &p, end);
                }
            }
        }
        base
    }

    /// Returns the end of the run of `p`'s breakpoints that fit into a
    /// zero-amplitude gap of `base` (the run always keeps `p`'s onset),
    /// or `None` if no breakpoint fits.
    fn contribution_end(&self, p: &Partial, base: &Partial) -> Option<usize> {
        let clearance = self.fade_time;
        let blocked = |t: f64| {
            base.amplitude_at(t) > 0.0 || base.amplitude_at(t + clearance) > 0.0
        };

        let times: Vec<f64> = p.iter().map(|bp| bp.time).collect();
        let begin = times.iter().position(|&t| !blocked(t))?;
        let end = times[begin..]
            .iter()
            .position(|&t| blocked(t))
            .map(|i| begin + i)
            .unwrap_or(times.len());
        Some(end)
    }

    /// Splices `p`'s breakpoints `[0, end)` into `base`, fading out and
    /// in with zero-amplitude breakpoints at the boundaries.
    fn merge(&self, base: &mut Partial, p: &Partial, end: usize) {
        let fade = self.fade_time;
        let mut contribution = Partial::from_breakpoints(0, p.iter().take(end).copied());
        if contribution.is_empty() {
            return;
        }
        contribution.absorb(base);

        let merge_start = contribution.start_time().unwrap();
        let merge_end = contribution.end_time().unwrap();

        let base_bps: Vec<Breakpoint> = base.iter().copied().collect();
        let remove_begin = base.find_after(merge_start - fade);
        let remove_end = base.find_after(merge_end + fade);

        let mut inserts: Vec<Breakpoint> = contribution.iter().copied().collect();
        if remove_end < base_bps.len() {
            let last = contribution.last().unwrap();
            if last.amplitude > 0.0 {
                inserts.push(null_after(last, fade));
            }
            let resume = &base_bps[remove_end];
            if resume.amplitude > 0.0 {
                inserts.push(null_before(resume, fade));
            }
        }
        if remove_begin > 0 {
            let first = contribution.first().unwrap();
            if first.amplitude > 0.0 {
                inserts.push(null_before(first, fade));
            }
            let precede = &base_bps[remove_begin - 1];
            if precede.amplitude > 0.0 {
                inserts.push(null_after(precede, fade));
            }
        }

        let lo = base_bps
            .get(remove_begin)
            .map(|bp| bp.time)
            .unwrap_or(f64::INFINITY);
        let hi = base_bps
            .get(remove_end)
            .map(|bp| bp.time)
            .unwrap_or(f64::INFINITY);
        base.retain(|bp| bp.time < lo || bp.time >= hi);

        for bp in inserts {
            base.insert(bp);
        }
    }
}

/// A zero-amplitude copy of `bp` placed `fade` earlier, phase rolled
/// back accordingly.
fn null_before(bp: &Breakpoint, fade: f64) -> Breakpoint {
    let dp = 2.0 * PI * fade * bp.frequency;
    Breakpoint {
        time: bp.time - fade,
        amplitude: 0.0,
        phase: (bp.phase - dp) % (2.0 * PI),
        ..*bp
    }
}

/// A zero-amplitude copy of `bp` placed `fade` later, phase advanced
/// accordingly.
fn null_after(bp: &Breakpoint, fade: f64) -> Breakpoint {
    let dp = 2.0 * PI * fade * bp.frequency;
    Breakpoint {
        time: bp.time + fade,
        amplitude: 0.0,
        phase: (bp.phase + dp) % (2.0 * PI),
        ..*bp
    }
}

fn peak_amplitude(p: &Partial) -> f64 {
    p.iter().map(|bp| bp.amplitude).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fragment(label: i32, t0: f64, t1: f64, freq: f64, amp: f64) -> Partial {
        Partial::from_breakpoints(
            label,
            [
                Breakpoint::new(t0, freq, amp, 0.0, 0.0),
                Breakpoint::new(t1, freq, amp, 0.0, 0.0),
            ],
        )
    }

    #[test]
    fn test_rejects_bad_fade_time() {
        assert!(Distiller::new(0.0).is_err());
        assert!(Distiller::new(-0.001).is_err());
        assert!(Distiller::new(f64::NAN).is_err());
    }

    #[test]
    fn test_one_partial_per_label_afterwards() {
        let distiller = Distiller::default();
        let partials = vec![
            fragment(1, 0.0, 0.4, 440.0, 0.5),
            fragment(1, 0.6, 1.0, 445.0, 0.5),
            fragment(2, 0.0, 1.0, 880.0, 0.3),
            fragment(2, 0.2, 0.5, 882.0, 0.1),
        ];
        let out = distiller.distill(partials);

        let mut labels: Vec<i32> = out.iter().map(|p| p.label()).collect();
        labels.sort_unstable();
        assert_eq!(labels, vec![1, 2]);
    }

    #[test]
    fn test_gap_splice_inserts_fade_nulls() {
        let distiller = Distiller::default();
        let out = distiller.distill(vec![
            fragment(1, 0.0, 0.4, 440.0, 0.5),
            fragment(1, 0.6, 1.0, 445.0, 0.4),
        ]);
        assert_eq!(out.len(), 1);
        let fused = &out[0];

        // Both fragments' spans survive.
        assert_relative_eq!(fused.amplitude_at(0.2), 0.5);
        assert_relative_eq!(fused.amplitude_at(0.8), 0.4);
        // The gap between them is silent.
        assert_eq!(fused.amplitude_at(0.5), 0.0);
        // Zero-amplitude splice breakpoints bound the quiet region.
        assert!(fused.iter().any(|bp| bp.amplitude == 0.0));
        // Times remain strictly increasing.
        let times: Vec<f64> = fused.iter().map(|bp| bp.time).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_overlap_keeps_dominant_fragment() {
        let distiller = Distiller::default();
        let dominant = Partial::from_breakpoints(
            1,
            [
                Breakpoint::new(0.0, 440.0, 0.8, 0.0, 0.0),
                Breakpoint::new(0.5, 440.0, 0.8, 0.0, 0.0),
                Breakpoint::new(1.0, 440.0, 0.8, 0.0, 0.0),
            ],
        );
        let out = distiller.distill(vec![dominant, fragment(1, 0.3, 0.7, 460.0, 0.2)]);
        assert_eq!(out.len(), 1);
        let fused = &out[0];

        // The louder fragment owns the overlap; the quieter one's
        // energy shows up as added noise, not as frequency content.
        assert_relative_eq!(fused.frequency_at(0.5), 440.0);
        assert!(fused.amplitude_at(0.5) >= 0.8);
        assert!(fused.bandwidth_at(0.5) > 0.0);
    }

    #[test]
    fn test_distillation_is_idempotent() {
        let distiller = Distiller::default();
        let once = distiller.distill(vec![
            fragment(1, 0.0, 0.4, 440.0, 0.5),
            fragment(1, 0.6, 1.0, 445.0, 0.4),
            fragment(3, 0.0, 1.0, 1320.0, 0.2),
        ]);
        let twice = distiller.distill(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unlabeled_policies() {
        let partials = vec![
            fragment(0, 0.0, 0.5, 200.0, 0.1),
            fragment(1, 0.0, 1.0, 440.0, 0.5),
        ];

        let preserved = Distiller::default().distill(partials.clone());
        assert_eq!(preserved.len(), 2);
        assert!(preserved.iter().any(|p| p.label() == 0));

        let dropped = Distiller::default()
            .with_unlabeled_policy(UnlabeledPolicy::Drop)
            .distill(partials);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].label(), 1);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        assert!(Distiller::default().distill(Vec::new()).is_empty());
    }
}

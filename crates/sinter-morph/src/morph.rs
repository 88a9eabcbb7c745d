//! Morphing: time-varying interpolation between two labeled partial
//! sets.

use std::collections::BTreeSet;
use std::sync::Arc;

use sinter_model::{Breakpoint, Envelope, Partial, PartialList};

use crate::error::{MorphError, MorphResult};

/// Interpolates corresponding partials of two distilled partial sets.
///
/// The morph weight runs from 0 (all source) to 1 (all target).
/// Frequency, amplitude, and bandwidth can each follow their own weight
/// envelope; a single envelope drives all three in the common case.
/// Weight values are clamped to [0, 1] at evaluation.
///
/// Partials are paired by label. A label present on only one side is
/// morphed against a silent stand-in, so it fades in or out with the
/// amplitude weight. Unlabeled partials have no correspondence and
/// crossfade the same way.
pub struct Morpher {
    freq_weight: Arc<dyn Envelope>,
    amp_weight: Arc<dyn Envelope>,
    bw_weight: Arc<dyn Envelope>,
}

impl Morpher {
    /// Creates a morpher driving all three parameters with one weight
    /// envelope.
    pub fn new(weight: impl Envelope + 'static) -> Self {
        let weight: Arc<dyn Envelope> = Arc::new(weight);
        Self {
            freq_weight: weight.clone(),
            amp_weight: weight.clone(),
            bw_weight: weight,
        }
    }

    /// Creates a morpher with separate frequency, amplitude, and
    /// bandwidth weight envelopes.
    pub fn with_weights(
        freq: impl Envelope + 'static,
        amp: impl Envelope + 'static,
        bw: impl Envelope + 'static,
    ) -> Self {
        Self {
            freq_weight: Arc::new(freq),
            amp_weight: Arc::new(amp),
            bw_weight: Arc::new(bw),
        }
    }

    /// Morphs two distilled partial sets into one.
    ///
    /// Fails if either input carries a nonzero label more than once.
    /// Morphing two empty lists yields an empty list.
    pub fn morph(&self, source: &PartialList, target: &PartialList) -> MorphResult<PartialList> {
        let source_labels = distilled_labels(source)?;
        let target_labels = distilled_labels(target)?;
        let labels: BTreeSet<i32> = source_labels.union(&target_labels).copied().collect();

        let silent = Partial::new();
        let mut out: PartialList = Vec::new();

        for &label in &labels {
            let p0 = source.iter().find(|p| p.label() == label).unwrap_or(&silent);
            let p1 = target.iter().find(|p| p.label() == label).unwrap_or(&silent);
            if let Some(morphed) = self.morph_partial(p0, p1, label) {
                out.push(morphed);
            }
        }

        // Unlabeled partials crossfade against silence.
        for p in source.iter().filter(|p| p.label() == 0) {
            if let Some(morphed) = self.morph_partial(p, &silent, 0) {
                out.push(morphed);
            }
        }
        for p in target.iter().filter(|p| p.label() == 0) {
            if let Some(morphed) = self.morph_partial(&silent, p, 0) {
                out.push(morphed);
            }
        }

        Ok(out)
    }

    /// Morphs one pair of partials, either of which may be empty. The
    /// result has a breakpoint at every time either side has one.
    /// Returns `None` when both sides are empty.
    pub fn morph_partial(&self, p0: &Partial, p1: &Partial, label: i32) -> Option<Partial> {
        if p0.is_empty() && p1.is_empty() {
            return None;
        }

        let mut out = Partial::with_label(label);
        for bp in p0.iter().chain(p1.iter()) {
            out.insert(self.morph_breakpoint(p0, p1, bp.time));
        }
        Some(out)
    }

    fn morph_breakpoint(&self, p0: &Partial, p1: &Partial, time: f64) -> Breakpoint {
        let wf = self.freq_weight.value_at(time).clamp(0.0, 1.0);
        let wa = self.amp_weight.value_at(time).clamp(0.0, 1.0);
        let wb = self.bw_weight.value_at(time).clamp(0.0, 1.0);

        match (p0.parameters_at(time), p1.parameters_at(time)) {
            (Some(src), None) => {
                // No counterpart: fade the source with the amp weight.
                Breakpoint::new(
                    time,
                    src.frequency,
                    (1.0 - wa) * src.amplitude,
                    src.bandwidth,
                    src.phase,
                )
            }
            (None, Some(tgt)) => Breakpoint::new(
                time,
                tgt.frequency,
                wa * tgt.amplitude,
                tgt.bandwidth,
                tgt.phase,
            ),
            (Some(src), Some(tgt)) => {
                // Phase follows whichever side is audible; interpolate
                // only when both are, to keep synthesis re-anchoring
                // continuous.
                let phase = if src.amplitude > 0.0 && tgt.amplitude > 0.0 {
                    wf * tgt.phase + (1.0 - wf) * src.phase
                } else if src.amplitude > 0.0 {
                    src.phase
                } else if tgt.amplitude > 0.0 {
                    tgt.phase
                } else {
                    wf * tgt.phase + (1.0 - wf) * src.phase
                };
                Breakpoint::new(
                    time,
                    wf * tgt.frequency + (1.0 - wf) * src.frequency,
                    wa * tgt.amplitude + (1.0 - wa) * src.amplitude,
                    wb * tgt.bandwidth + (1.0 - wb) * src.bandwidth,
                    phase,
                )
            }
            (None, None) => unreachable!("both partials empty"),
        }
    }
}

fn distilled_labels(partials: &PartialList) -> MorphResult<BTreeSet<i32>> {
    let mut labels = BTreeSet::new();
    for p in partials {
        if p.label() != 0 && !labels.insert(p.label()) {
            return Err(MorphError::NotDistilled { label: p.label() });
        }
    }
    Ok(labels)
}

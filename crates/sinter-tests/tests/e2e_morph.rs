//! Morphing behavior across the whole pipeline.

use sinter_morph::Morpher;
use sinter_synth::Synthesizer;
use sinter_tests::{constant_partial, dominant_frequency, rms, tone_amplitude};

const RATE: f64 = 44100.0;

#[test]
fn test_morph_boundaries_reproduce_endpoints() {
    let source = vec![constant_partial(1, 440.0, 1.0, 0.0, 0.0, 1.0)];
    let target = vec![constant_partial(1, 880.0, 1.0, 0.0, 0.0, 1.0)];

    let all_source = Morpher::new(|_t: f64| 0.0).morph(&source, &target).unwrap();
    let all_target = Morpher::new(|_t: f64| 1.0).morph(&source, &target).unwrap();

    for t in [0.0, 0.25, 0.5, 0.75, 1.0] {
        assert!((all_source[0].frequency_at(t) - 440.0).abs() < 1e-9);
        assert!((all_source[0].amplitude_at(t) - 1.0).abs() < 1e-9);
        assert!((all_target[0].frequency_at(t) - 880.0).abs() < 1e-9);
        assert!((all_target[0].amplitude_at(t) - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_linear_morph_sweeps_and_stays_bounded() {
    // 440 Hz source, 880 Hz target, one label each, morphed with
    // w(t) = t: the dominant frequency migrates monotonically upward
    // and the energy never explodes.
    let source = vec![constant_partial(1, 440.0, 1.0, 0.0, 0.0, 1.0)];
    let target = vec![constant_partial(1, 880.0, 1.0, 0.0, 0.0, 1.0)];

    let morphed = Morpher::new(|t: f64| t).morph(&source, &target).unwrap();
    assert_eq!(morphed.len(), 1);

    let synth = Synthesizer::new(RATE).unwrap();
    let samples = synth.render(&morphed).unwrap();

    // Output covers the morph's one-second span (plus the fade tail).
    assert!(samples.len() >= (1.0 * RATE) as usize);

    // Dominant frequency in consecutive windows rises monotonically
    // from near 440 toward 880.
    let window = (0.1 * RATE) as usize;
    let mut last_peak = 0.0;
    for w in 0..9 {
        let begin = w * window;
        let slice = &samples[begin..begin + window];
        let peak = dominant_frequency(slice, RATE, 300.0, 1000.0);
        assert!(
            peak >= last_peak - 5.0,
            "window {w}: peak {peak} fell below {last_peak}"
        );
        last_peak = peak;
    }
    assert!((dominant_frequency(&samples[..window], RATE, 300.0, 1000.0) - 440.0).abs() < 30.0);
    assert!(last_peak > 700.0, "final dominant frequency {last_peak}");

    // Energy stays bounded: a single unit-amplitude partial never
    // exceeds RMS 1/sqrt(2) by more than a little.
    for w in 0..9 {
        let begin = w * window;
        let level = rms(&samples[begin..begin + window]);
        assert!(level < 0.9, "window {w}: rms {level}");
    }
}

#[test]
fn test_morph_of_disjoint_labels_crossfades() {
    let source = vec![constant_partial(1, 440.0, 0.8, 0.0, 0.0, 1.0)];
    let target = vec![constant_partial(2, 660.0, 0.8, 0.0, 0.0, 1.0)];

    let morphed = Morpher::new(|t: f64| t).morph(&source, &target).unwrap();
    assert_eq!(morphed.len(), 2);

    let synth = Synthesizer::new(RATE).unwrap();
    let samples = synth.render(&morphed).unwrap();

    // Early on the source tone dominates; late the target does.
    let early = &samples[..(0.2 * RATE) as usize];
    let late = &samples[(0.8 * RATE) as usize..(1.0 * RATE) as usize];
    assert!(tone_amplitude(early, RATE, 440.0) > tone_amplitude(early, RATE, 660.0));
    assert!(tone_amplitude(late, RATE, 660.0) > tone_amplitude(late, RATE, 440.0));
}

//! End-to-end analyzer checks on synthetic tones.

use sinter_analysis::Analyzer;
use sinter_model::{BreakpointEnvelope, Partial};
use std::f64::consts::PI;

const RATE: f64 = 44100.0;

fn tone_buffer(tones: &[(f64, f64)], seconds: f64) -> Vec<f64> {
    let n = (seconds * RATE) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / RATE;
            tones.iter().map(|&(f, a)| a * (2.0 * PI * f * t).sin()).sum()
        })
        .collect()
}

fn longest(partials: &[Partial]) -> &Partial {
    partials
        .iter()
        .max_by(|a, b| a.duration().partial_cmp(&b.duration()).unwrap())
        .expect("no partials")
}

#[test]
fn test_recovers_a_steady_tone() {
    let samples = tone_buffer(&[(440.0, 0.5)], 1.0);
    let analyzer = Analyzer::new(415.0).unwrap();
    let partials = analyzer
        .analyze(&samples, RATE, BreakpointEnvelope::constant(440.0))
        .unwrap();

    assert!(!partials.is_empty());
    let main = longest(partials.as_slice());
    assert_eq!(main.label(), 1);
    // Spans most of the second.
    assert!(main.duration() > 0.8, "duration {}", main.duration());
    // Mid-signal parameters are near the truth.
    let mid_freq = main.frequency_at(0.5);
    let mid_amp = main.amplitude_at(0.5);
    assert!((mid_freq - 440.0).abs() < 5.0, "frequency {mid_freq}");
    assert!((mid_amp - 0.5).abs() < 0.05, "amplitude {mid_amp}");
}

#[test]
fn test_recovers_two_harmonics_with_channel_labels() {
    let samples = tone_buffer(&[(440.0, 0.5), (880.0, 0.25)], 1.0);
    let analyzer = Analyzer::new(415.0).unwrap();
    let partials = analyzer
        .analyze(&samples, RATE, BreakpointEnvelope::constant(440.0))
        .unwrap();

    let longest_with_label = |label: i32| -> &Partial {
        partials
            .iter()
            .filter(|p| p.label() == label)
            .max_by(|a, b| a.duration().partial_cmp(&b.duration()).unwrap())
            .unwrap_or_else(|| panic!("no partial labeled {label}"))
    };

    let f1 = longest_with_label(1);
    assert!((f1.frequency_at(0.5) - 440.0).abs() < 5.0);

    let f2 = longest_with_label(2);
    assert!((f2.frequency_at(0.5) - 880.0).abs() < 8.0);
    assert!((f2.amplitude_at(0.5) - 0.25).abs() < 0.05);
}

#[test]
fn test_analysis_is_deterministic() {
    let samples = tone_buffer(&[(523.25, 0.4)], 0.5);
    let analyzer = Analyzer::new(500.0).unwrap();
    let reference = BreakpointEnvelope::constant(523.25);

    let a = analyzer.analyze(&samples, RATE, &reference).unwrap();
    let b = analyzer.analyze(&samples, RATE, &reference).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_progress_reports_reach_completion() {
    let samples = tone_buffer(&[(440.0, 0.5)], 0.25);
    let analyzer = Analyzer::new(415.0).unwrap();

    let mut fractions = Vec::new();
    let mut record = |f: f64| fractions.push(f);
    analyzer
        .analyze_with_progress(
            &samples,
            RATE,
            BreakpointEnvelope::constant(440.0),
            Some(&mut record),
        )
        .unwrap();

    assert!(!fractions.is_empty());
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*fractions.last().unwrap(), 1.0);
}

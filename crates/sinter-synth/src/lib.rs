//! Sinter Synthesis
//!
//! Bandwidth-enhanced additive synthesis: renders a
//! [`PartialList`](sinter_model::PartialList) into a mono sample buffer.
//!
//! Each partial drives one [`Oscillator`]: frequency and amplitude ramp
//! linearly between breakpoints, phase accumulates continuously across
//! breakpoints, and the breakpoint bandwidth mixes a filtered-noise
//! modulator against the carrier. An optional [`Jitter`] configuration
//! perturbs the noise gain with a bounded random walk.
//!
//! # Determinism
//!
//! All randomness flows through PCG32 generators whose seeds derive via
//! BLAKE3 from the synthesizer's base seed and each partial's index.
//! The same partials and seed produce byte-identical buffers across
//! runs.
//!
//! ```
//! use sinter_model::{Breakpoint, Partial};
//! use sinter_synth::Synthesizer;
//!
//! let partial = Partial::from_breakpoints(1, [
//!     Breakpoint::new(0.0, 440.0, 0.5, 0.0, 0.0),
//!     Breakpoint::new(1.0, 440.0, 0.5, 0.0, 0.0),
//! ]);
//!
//! let synth = Synthesizer::new(44100.0).unwrap();
//! let samples = synth.render(&vec![partial]).unwrap();
//! assert!(samples.len() > 44100);
//! ```

pub mod error;
pub mod filter;
pub mod noise;
pub mod oscillator;
pub mod render;

pub use error::{SynthError, SynthResult};
pub use filter::Filter;
pub use noise::{derive_seed, NoiseGenerator};
pub use oscillator::{radian_freq, OscTarget, Oscillator};
pub use render::{Jitter, Synthesizer};

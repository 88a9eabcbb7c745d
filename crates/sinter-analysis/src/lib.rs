//! Sinter Analysis
//!
//! Reassigned bandwidth-enhanced spectral analysis: turns a sample
//! buffer into a list of labeled [`Partial`](sinter_model::Partial)
//! trajectories.
//!
//! # Pipeline
//!
//! Each short-time frame passes through:
//!
//! 1. [`reassigned`] - dual-FFT spectrum with per-bin time and
//!    frequency corrections relocating energy to its true instantaneous
//!    coordinates;
//! 2. [`peaks`] - local-maximum extraction with amplitude/frequency
//!    floors and amplitude-ranked thinning;
//! 3. [`channelize`] - channel numbers from a reference frequency
//!    envelope, giving peaks frame-to-frame identity;
//! 4. [`builder`] - per-channel linking with drift tolerance and gap
//!    bridging;
//! 5. [`bandwidth`] - distribution of unclaimed spectral energy as
//!    per-breakpoint noise.
//!
//! [`Analyzer`] wires the stages together behind a single configuration
//! surface:
//!
//! ```
//! use sinter_analysis::Analyzer;
//! use sinter_model::BreakpointEnvelope;
//! use std::f64::consts::PI;
//!
//! let rate = 44100.0;
//! let samples: Vec<f64> = (0..44100)
//!     .map(|i| (2.0 * PI * 440.0 * i as f64 / rate).sin() * 0.5)
//!     .collect();
//!
//! let analyzer = Analyzer::new(415.0).unwrap();
//! let partials = analyzer
//!     .analyze(&samples, rate, BreakpointEnvelope::constant(440.0))
//!     .unwrap();
//! assert!(!partials.is_empty());
//! ```

pub mod analyzer;
pub mod bandwidth;
pub mod builder;
pub mod channelize;
pub mod error;
pub mod fourier;
pub mod peaks;
pub mod reassigned;
pub mod window;

pub use analyzer::Analyzer;
pub use bandwidth::BandwidthAssociator;
pub use builder::{LowFreqCorrection, PartialBuilder};
pub use channelize::{ChannelPeak, Channelizer};
pub use error::{AnalysisError, AnalysisResult};
pub use fourier::Fourier;
pub use peaks::{extract_peaks, thin_peaks, FramePeaks, PeakSelection};
pub use reassigned::ReassignedSpectrum;

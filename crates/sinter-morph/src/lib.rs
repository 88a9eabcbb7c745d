//! Sinter Transformations
//!
//! Manipulations of analyzed partial sets, between analysis and
//! synthesis:
//!
//! - [`Distiller`] - fuses fragments sharing a label into exactly one
//!   partial per label, splicing non-overlapping pieces with fade-out /
//!   fade-in breakpoints and absorbing overlapped energy as noise;
//! - [`Dilator`] - piecewise-linear time warp aligning temporal
//!   features to new anchor times;
//! - [`Morpher`] - time-varying interpolation between two distilled
//!   partial sets, pairing partials by label.
//!
//! Each transformation consumes a
//! [`PartialList`](sinter_model::PartialList) and produces a new one;
//! breakpoint times remain strictly increasing throughout.
//!
//! ```
//! use sinter_model::{Breakpoint, Partial};
//! use sinter_morph::{Distiller, Morpher};
//!
//! let fragments = vec![
//!     Partial::from_breakpoints(1, [
//!         Breakpoint::new(0.0, 440.0, 0.5, 0.0, 0.0),
//!         Breakpoint::new(0.4, 440.0, 0.5, 0.0, 0.0),
//!     ]),
//!     Partial::from_breakpoints(1, [
//!         Breakpoint::new(0.6, 443.0, 0.4, 0.0, 0.0),
//!         Breakpoint::new(1.0, 443.0, 0.4, 0.0, 0.0),
//!     ]),
//! ];
//!
//! let distilled = Distiller::default().distill(fragments);
//! assert_eq!(distilled.len(), 1);
//!
//! let morphed = Morpher::new(|t: f64| t)
//!     .morph(&distilled, &Vec::new())
//!     .unwrap();
//! assert_eq!(morphed.len(), 1);
//! ```

pub mod dilate;
pub mod distill;
pub mod error;
pub mod morph;

pub use dilate::Dilator;
pub use distill::{Distiller, UnlabeledPolicy};
pub use error::{MorphError, MorphResult};
pub use morph::Morpher;

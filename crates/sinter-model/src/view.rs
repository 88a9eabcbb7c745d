//! Read-only, possibly transformed perspectives on a partial.
//!
//! A [`PartialView`] presents a partial's envelope through a
//! breakpoint-wise transformation without mutating the underlying data.
//! Views compose by wrapping one another; a view can be materialized
//! into a plain [`Partial`] when a stage needs to own the result.

use crate::{Breakpoint, Partial};

/// A filtered or altered read-only perspective on a [`Partial`].
///
/// Implementations transform breakpoints one at a time; interpolated
/// queries interpolate on the source envelope and transform the result.
pub trait PartialView {
    /// The partial being viewed.
    fn source(&self) -> &Partial;

    /// Transforms one breakpoint of the source envelope.
    fn render(&self, bp: &Breakpoint) -> Breakpoint;

    /// Interpolated parameters at `time`, seen through this view.
    fn parameters_at(&self, time: f64) -> Option<Breakpoint> {
        self.source().parameters_at(time).map(|bp| self.render(&bp))
    }

    /// Materializes the viewed envelope as an owned partial with the
    /// source's label.
    fn to_partial(&self) -> Partial {
        Partial::from_breakpoints(
            self.source().label(),
            self.source().iter().map(|bp| self.render(bp)),
        )
    }
}

impl PartialView for Partial {
    fn source(&self) -> &Partial {
        self
    }

    fn render(&self, bp: &Breakpoint) -> Breakpoint {
        *bp
    }
}

impl<V: PartialView + ?Sized> PartialView for &V {
    fn source(&self) -> &Partial {
        (**self).source()
    }

    fn render(&self, bp: &Breakpoint) -> Breakpoint {
        (**self).render(bp)
    }
}

/// A view that scales every breakpoint's amplitude by a constant factor.
pub struct ScaleAmplitude<V> {
    inner: V,
    factor: f64,
}

impl<V: PartialView> ScaleAmplitude<V> {
    /// Wraps `inner`, scaling amplitudes by `factor` (floored at zero).
    pub fn new(inner: V, factor: f64) -> Self {
        Self {
            inner,
            factor: factor.max(0.0),
        }
    }
}

impl<V: PartialView> PartialView for ScaleAmplitude<V> {
    fn source(&self) -> &Partial {
        self.inner.source()
    }

    fn render(&self, bp: &Breakpoint) -> Breakpoint {
        let bp = self.inner.render(bp);
        Breakpoint {
            amplitude: bp.amplitude * self.factor,
            ..bp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn partial() -> Partial {
        Partial::from_breakpoints(
            3,
            [
                Breakpoint::new(0.0, 440.0, 1.0, 0.1, 0.0),
                Breakpoint::new(1.0, 440.0, 0.5, 0.1, 0.0),
            ],
        )
    }

    #[test]
    fn test_identity_view() {
        let p = partial();
        let seen = p.parameters_at(0.5).unwrap();
        assert_relative_eq!(seen.amplitude, 0.75);
    }

    #[test]
    fn test_scale_amplitude_view() {
        let p = partial();
        let view = ScaleAmplitude::new(&p, 2.0);
        let seen = PartialView::parameters_at(&view, 0.5).unwrap();
        assert_relative_eq!(seen.amplitude, 1.5);
        // The source is untouched.
        assert_relative_eq!(p.amplitude_at(0.5), 0.75);
    }

    #[test]
    fn test_views_compose() {
        let p = partial();
        let view = ScaleAmplitude::new(ScaleAmplitude::new(&p, 2.0), 0.25);
        let out = view.to_partial();
        assert_eq!(out.label(), 3);
        assert_relative_eq!(out.first().unwrap().amplitude, 0.5);
    }
}

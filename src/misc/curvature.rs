use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OVector};

use crate::misc::FloatingPoint;

/// Curvature of a curve at a parameter, derived from the first and second
/// derivative vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Curvature<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// Unit tangent vector
    t: OVector<T, D>,
    /// Curvature vector
    k: OVector<T, D>,
    /// Set when the first derivative vanishes (a cusp); the tangent and
    /// curvature vectors are then degenerate but finite.
    singular: bool,
}

impl<T: FloatingPoint, D: DimName> Curvature<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Compute curvature from first and second derivatives:
    /// T = C' / |C'|
    /// K = (C'' - (C'' . T) T) / (C' . C')
    /// so that |K| = |C' x C''| / |C'|^3.
    ///
    /// A vanishing first derivative marks the result singular with zero
    /// curvature instead of producing NaN. If the second derivative is
    /// nonzero there, its unitized direction is used as the limit tangent.
    pub fn from_derivatives(deriv1: OVector<T, D>, deriv2: OVector<T, D>) -> Self {
        let n1 = deriv1.norm();
        if n1 <= T::default_epsilon() {
            let n2 = deriv2.norm();
            let t = if n2 <= T::default_epsilon() {
                OVector::zeros()
            } else {
                deriv2 / n2
            };
            Self {
                t,
                k: OVector::zeros(),
                singular: true,
            }
        } else {
            let tangent = deriv1.clone() / n1;
            let dot = deriv2.dot(&tangent);
            let inv = T::one() / deriv1.dot(&deriv1);
            let k = (deriv2 - tangent.clone() * dot) * inv;
            Self {
                t: tangent,
                k,
                singular: false,
            }
        }
    }

    /// Returns the unit tangent vector
    pub fn tangent_vector(&self) -> OVector<T, D> {
        self.t.clone()
    }

    /// Returns the curvature vector
    pub fn curvature_vector(&self) -> OVector<T, D> {
        self.k.clone()
    }

    /// Returns the curvature magnitude
    pub fn kappa(&self) -> T {
        self.k.norm()
    }

    /// True when the curvature was evaluated at a point with a vanishing
    /// first derivative
    pub fn is_singular(&self) -> bool {
        self.singular
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    use super::Curvature;

    #[test]
    fn unit_circle_curvature() {
        // derivatives of (cos t, sin t) at t = 0
        let c = Curvature::from_derivatives(Vector2::new(0., 1.), Vector2::new(-1., 0.));
        assert!(!c.is_singular());
        assert_relative_eq!(c.kappa(), 1.);
    }

    #[test]
    fn cusp_is_flagged_not_nan() {
        let c = Curvature::from_derivatives(Vector2::new(0., 0.), Vector2::new(2., 0.));
        assert!(c.is_singular());
        assert_eq!(c.kappa(), 0.);
        assert_relative_eq!(c.tangent_vector(), Vector2::new(1., 0.));
    }
}

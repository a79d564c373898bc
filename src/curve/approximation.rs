use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, U1};
use rand::rngs::ThreadRng;
use rand::Rng;

use crate::curve::nurbs_curve::dehomogenize;
use crate::curve::NurbsCurve;
use crate::error::{Error, Result};
use crate::misc::{three_points_are_flat, FloatingPoint};
use crate::polyline::PolyLine;

/// Sampling strategy for approximating a curve with a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApproximationStrategy<T> {
    /// Adaptive subdivision until the chord deviation from the curve drops
    /// below the tolerance.
    Chordal { tolerance: T },
    /// A fixed number of uniform parameter steps.
    Parametric { segments: usize },
    /// A fixed number of uniform arc-length steps.
    Equidistant { segments: usize },
}

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    /// Approximate the curve with a polyline using the given strategy.
    /// # Example
    /// ```
    /// use nurbex::prelude::*;
    /// use nalgebra::Point2;
    ///
    /// let curve = NurbsCurve2D::try_clamped(
    ///     &[
    ///         Point2::new(0., 0.),
    ///         Point2::new(1., 2.),
    ///         Point2::new(2., 0.),
    ///         Point2::new(3., 1.),
    ///     ],
    ///     3,
    /// ).unwrap();
    /// let polyline = curve
    ///     .approximate(ApproximationStrategy::Parametric { segments: 8 })
    ///     .unwrap();
    /// assert_eq!(polyline.points().len(), 9);
    /// ```
    pub fn approximate(
        &self,
        strategy: ApproximationStrategy<T>,
    ) -> Result<PolyLine<T, DimNameDiff<D, U1>>> {
        match strategy {
            ApproximationStrategy::Chordal { tolerance } => {
                if tolerance <= T::zero() {
                    return Err(Error::configuration(
                        "the chordal tolerance must be greater than zero",
                    ));
                }
                if self.degree() == 1 {
                    return Ok(PolyLine::new(self.dehomogenized_control_points()));
                }
                let mut rng = rand::rng();
                let (start, end) = self.knots_domain();
                Ok(PolyLine::new(approximate_chordal(
                    self, start, end, tolerance, &mut rng,
                )))
            }
            ApproximationStrategy::Parametric { segments } => {
                if segments == 0 {
                    return Err(Error::configuration(
                        "the number of segments must be greater than zero",
                    ));
                }
                Ok(PolyLine::new(self.sample_regular(segments + 1)))
            }
            ApproximationStrategy::Equidistant { segments } => {
                let samples = self.try_divide_by_count(segments)?;
                let mut points = samples
                    .iter()
                    .map(|s| self.point_at(s.parameter()))
                    .collect::<Result<Vec<_>>>()?;
                // quadrature noise can lose the final sample; close the gap
                let (_, end) = self.knots_domain();
                if points.len() <= segments {
                    points.push(self.point_at(end)?);
                }
                Ok(PolyLine::new(points))
            }
        }
    }
}

/// Subdivide recursively until a jittered midpoint probe finds the chord
/// flat. The probe parameter is randomized to avoid false positives on
/// symmetric curves whose exact midpoint lands back on the chord.
fn approximate_chordal<T: FloatingPoint, D>(
    curve: &NurbsCurve<T, D>,
    start: T,
    end: T,
    tol: T,
    rng: &mut ThreadRng,
) -> Vec<OPoint<T, DimNameDiff<D, U1>>>
where
    D: DimName + DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let p1 = dehomogenize(&curve.point(start));
    let delta = end - start;
    if delta < T::from_f64(1e-8).unwrap() {
        return vec![p1];
    }

    let p3 = dehomogenize(&curve.point(end));

    let t = 0.5_f64 + 0.2_f64 * rng.random::<f64>();
    let mid = start + delta * T::from_f64(t).unwrap();
    let p2 = dehomogenize(&curve.point(mid));

    let diff = &p1 - &p3;
    let diff2 = &p1 - &p2;
    if (diff.dot(&diff) < tol && diff2.dot(&diff2) > tol)
        || !three_points_are_flat(&p1, &p2, &p3, tol)
    {
        let exact_mid = start + (end - start) * T::from_f64(0.5).unwrap();
        let mut left_pts = approximate_chordal(curve, start, exact_mid, tol, rng);
        let right_pts = approximate_chordal(curve, exact_mid, end, tol, rng);
        left_pts.pop();
        [left_pts, right_pts].concat()
    } else {
        vec![p1, p3]
    }
}

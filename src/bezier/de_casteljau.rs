use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint};

use crate::misc::FloatingPoint;

/// The de Casteljau construction for a single Bezier segment: N control
/// points of degree N - 1 are repeatedly linearly interpolated at `t`.
///
/// Returns every interpolation level: level 0 is the input points, each
/// following level is one point shorter, and the last level holds the single
/// evaluated curve point. Useful both for evaluation and for visualizing the
/// geometric construction. Pure and O(N^2).
///
/// # Example
/// ```
/// use nurbex::prelude::de_casteljau;
/// use nalgebra::Point2;
///
/// let points = vec![
///     Point2::new(0., 0.),
///     Point2::new(1., 2.),
///     Point2::new(2., 0.),
/// ];
/// let levels = de_casteljau(&points, 0.5);
/// assert_eq!(levels.len(), 3);
/// assert_eq!(levels[1], vec![Point2::new(0.5, 1.0), Point2::new(1.5, 1.0)]);
/// assert_eq!(levels[2], vec![Point2::new(1.0, 1.0)]);
/// ```
pub fn de_casteljau<T: FloatingPoint, D: DimName>(
    points: &[OPoint<T, D>],
    t: T,
) -> Vec<Vec<OPoint<T, D>>>
where
    DefaultAllocator: Allocator<D>,
{
    if points.is_empty() {
        return vec![];
    }

    let mut levels = vec![points.to_vec()];
    while levels.last().unwrap().len() > 1 {
        let previous = levels.last().unwrap();
        let next = previous
            .windows(2)
            .map(|pair| OPoint {
                coords: pair[0].coords.lerp(&pair[1].coords, t),
            })
            .collect();
        levels.push(next);
    }

    levels
}

/// Evaluate a point on a Bezier segment via the de Casteljau construction.
pub fn point_on_bezier<T: FloatingPoint, D: DimName>(points: &[OPoint<T, D>], t: T) -> OPoint<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    let levels = de_casteljau(points, t);
    levels[levels.len() - 1][0].clone()
}

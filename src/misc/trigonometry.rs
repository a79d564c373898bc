use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint, RealField};

/// Flatness probe used by the chordal approximation: whether the triangle
/// spanned by three consecutive samples is small enough to stop subdividing.
pub fn three_points_are_flat<T: RealField + Copy, D: DimName>(
    p1: &OPoint<T, D>,
    p2: &OPoint<T, D>,
    p3: &OPoint<T, D>,
    tolerance: T,
) -> bool
where
    DefaultAllocator: Allocator<D>,
{
    let p21 = p2 - p1;
    let p31 = p3 - p1;
    if D::dim() == 2 {
        (p21[0] * p31[1] - p21[1] * p31[0]).abs() < tolerance
    } else {
        let norm = p21.cross(&p31);
        let area = norm.dot(&norm);
        area < tolerance
    }
}

/// Find the closest point on a segment
/// * `pt` - point to project
/// * `start` - start point of segment
/// * `end` - end point of segment
/// * `u0` - first param of segment
/// * `u1` - second param of segment
pub fn segment_closest_point<T: RealField + Copy, D: DimName>(
    pt: &OPoint<T, D>,
    start: &OPoint<T, D>,
    end: &OPoint<T, D>,
    u0: T,
    u1: T,
) -> (T, OPoint<T, D>)
where
    DefaultAllocator: Allocator<D>,
{
    let dif = end - start;
    let l = dif.norm();

    if l < T::default_epsilon() {
        return (u0, start.clone());
    }

    let o = start.clone();
    let r = dif / l;
    let o2pt = pt - &o;
    let do2ptr = o2pt.dot(&r);

    if do2ptr < T::zero() {
        (u0, start.clone())
    } else if do2ptr > l {
        (u1, end.clone())
    } else {
        (u0 + (u1 - u0) * do2ptr / l, (r * do2ptr + o.coords).into())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    use super::segment_closest_point;

    #[test]
    fn projection_inside_segment() {
        let (u, p) = segment_closest_point(
            &Point2::new(0.5, 1.0),
            &Point2::new(0., 0.),
            &Point2::new(1., 0.),
            0.,
            1.,
        );
        assert_relative_eq!(u, 0.5);
        assert_relative_eq!(p, Point2::new(0.5, 0.));
    }

    #[test]
    fn projection_clamped_to_ends() {
        let (u, p) = segment_closest_point(
            &Point2::new(-1., 1.),
            &Point2::new(0., 0.),
            &Point2::new(1., 0.),
            0.,
            1.,
        );
        assert_eq!(u, 0.);
        assert_eq!(p, Point2::new(0., 0.));
    }
}

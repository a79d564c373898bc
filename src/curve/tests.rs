use approx::assert_relative_eq;
use nalgebra::{Point2, Point3, Vector2};

use crate::curve::{ApproximationStrategy, NurbsCurve2D, NurbsCurve3D};
use crate::error::Error;

fn quarter_circle() -> NurbsCurve2D<f64> {
    let half_sqrt2 = 2.0_f64.sqrt() / 2.;
    NurbsCurve2D::try_weighted(
        &[
            Point2::new(1., 0.),
            Point2::new(1., 1.),
            Point2::new(0., 1.),
        ],
        &[1., half_sqrt2, 1.],
        2,
    )
    .unwrap()
}

fn wavy_cubic() -> NurbsCurve2D<f64> {
    NurbsCurve2D::try_clamped(
        &[
            Point2::new(0., 0.),
            Point2::new(1., 2.),
            Point2::new(2., -1.),
            Point2::new(3., 1.),
            Point2::new(4., 0.),
            Point2::new(5., 2.),
        ],
        3,
    )
    .unwrap()
}

#[test]
fn clamped_curve_interpolates_endpoints_for_any_degree() {
    let points = vec![
        Point2::new(0., 0.),
        Point2::new(1., 2.),
        Point2::new(2., -1.),
        Point2::new(3., 1.),
        Point2::new(4., 0.),
    ];
    for degree in 1..=4 {
        let curve = NurbsCurve2D::try_clamped(&points, degree).unwrap();
        let (start, end) = curve.knots_domain();
        assert_relative_eq!(curve.point_at(start).unwrap(), points[0]);
        assert_relative_eq!(curve.point_at(end).unwrap(), points[4]);
    }
}

#[test]
fn degree_one_curve_is_linear_interpolation() {
    let points = vec![
        Point2::new(0., 0.),
        Point2::new(2., 2.),
        Point2::new(4., 0.),
        Point2::new(6., 3.),
    ];
    let curve = NurbsCurve2D::polyline(&points).unwrap();
    // domain knots sit at the control points, half-way parameters at the
    // segment midpoints
    assert_relative_eq!(curve.point_at(0.5).unwrap(), Point2::new(1., 1.));
    assert_relative_eq!(curve.point_at(1.5).unwrap(), Point2::new(3., 1.));
    assert_relative_eq!(curve.point_at(2.5).unwrap(), Point2::new(5., 1.5));
    assert_relative_eq!(curve.point_at(2.0).unwrap(), points[2]);
}

#[test]
fn weighted_quadratic_traces_a_quarter_circle() {
    let curve = quarter_circle();
    let (start, end) = curve.knots_domain();
    for i in 0..=256 {
        let u = start + (end - start) * (i as f64) / 256.;
        let p = curve.point_at(u).unwrap();
        assert!(
            (p.coords.norm() - 1.).abs() < 1e-6,
            "radius {} at u {}",
            p.coords.norm(),
            u
        );
    }
    assert_relative_eq!(curve.point_at(start).unwrap(), Point2::new(1., 0.));
    assert_relative_eq!(curve.point_at(end).unwrap(), Point2::new(0., 1.));
}

#[test]
fn quarter_circle_has_unit_curvature_everywhere() {
    let curve = quarter_circle();
    for i in 0..=16 {
        let u = (i as f64) / 16.;
        let c = curve.curvature_at(u).unwrap();
        assert!(!c.is_singular());
        assert_relative_eq!(c.kappa(), 1., epsilon = 1e-9);
    }
}

#[test]
fn closed_curve_is_periodic_and_continuous() {
    let points = vec![
        Point3::new(1., 0., 0.),
        Point3::new(0., 1., 0.),
        Point3::new(-1., 0., 0.),
        Point3::new(0., -1., 0.),
    ];
    let curve = NurbsCurve3D::try_closed(&points, 2).unwrap();
    assert!(curve.is_closed());

    let (start, end) = curve.knots_domain();
    let period = end - start;

    assert_relative_eq!(
        curve.point_at(start).unwrap(),
        curve.point_at(end).unwrap(),
        epsilon = 1e-9
    );
    // continuity across the seam
    assert_relative_eq!(
        curve.point_at(end - 1e-9).unwrap(),
        curve.point_at(start).unwrap(),
        epsilon = 1e-6
    );
    // any parameter folds into the domain
    let u = start + period * 0.37;
    assert_relative_eq!(
        curve.point_at(u + period * 3.).unwrap(),
        curve.point_at(u).unwrap(),
        epsilon = 1e-9
    );
    assert_relative_eq!(
        curve.point_at(u - period * 2.).unwrap(),
        curve.point_at(u).unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn open_curve_rejects_parameters_outside_the_domain() {
    let curve = wavy_cubic();
    let (start, end) = curve.knots_domain();
    assert!(matches!(
        curve.point_at(start - 0.5),
        Err(Error::Domain { .. })
    ));
    assert!(matches!(curve.point_at(end + 0.5), Err(Error::Domain { .. })));
    assert!(matches!(
        curve.derivatives_at(end + 1., 1),
        Err(Error::Domain { .. })
    ));
    assert!(matches!(
        curve.curvature_at(start - 1.),
        Err(Error::Domain { .. })
    ));
    // the domain boundary itself evaluates
    assert!(curve.point_at(end).is_ok());
}

#[test]
fn construction_rejects_bad_configurations() {
    let points = vec![Point2::new(0., 0.), Point2::new(1., 1.)];
    // degree >= point count
    assert!(matches!(
        NurbsCurve2D::try_clamped(&points, 2),
        Err(Error::Configuration(_))
    ));
    // knot vector length mismatch
    let homogeneous = vec![
        Point3::new(0., 0., 1.),
        Point3::new(1., 1., 1.),
        Point3::new(2., 0., 1.),
    ];
    assert!(matches!(
        NurbsCurve2D::try_new(2, homogeneous.clone(), vec![0., 0., 0., 1., 1.]),
        Err(Error::Configuration(_))
    ));
    // decreasing knots
    assert!(matches!(
        NurbsCurve2D::try_new(2, homogeneous, vec![0., 0., 1., 0.5, 1., 1.]),
        Err(Error::Configuration(_))
    ));
    // mismatched weights
    assert!(matches!(
        NurbsCurve2D::try_weighted(
            &[
                Point2::new(0., 0.),
                Point2::new(1., 1.),
                Point2::new(2., 0.)
            ],
            &[1., 1.],
            2
        ),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn unblended_curve_passes_through_segment_joints() {
    let points = vec![
        Point2::new(0., 0.),
        Point2::new(1., 2.),
        Point2::new(2., 0.),
        Point2::new(3., -2.),
        Point2::new(4., 0.),
    ];
    let curve = NurbsCurve2D::try_unblended(&points, 2).unwrap();
    assert!(!curve.is_blended());
    // interior knots at multiplicity = degree pin the segment joints onto
    // the control polygon
    assert_relative_eq!(curve.point_at(0.).unwrap(), points[0]);
    assert_relative_eq!(curve.point_at(1.).unwrap(), points[2]);
    assert_relative_eq!(curve.point_at(2.).unwrap(), points[4]);

    // five points cannot form whole cubic segments
    assert!(NurbsCurve2D::try_unblended(&points, 3).is_err());
}

#[test]
fn refinement_preserves_the_curve() {
    let curve = wavy_cubic();
    let refined = curve.refined(&[0.5, 1.5, 2.5]).unwrap();

    assert_eq!(
        refined.control_points().len(),
        curve.control_points().len() + 3
    );
    assert_eq!(refined.knots().len(), curve.knots().len() + 3);

    let (start, end) = curve.knots_domain();
    for i in 0..=64 {
        let u = start + (end - start) * (i as f64) / 64.;
        assert_relative_eq!(
            refined.point_at(u).unwrap(),
            curve.point_at(u).unwrap(),
            epsilon = 1e-9
        );
    }
}

#[test]
fn refinement_validates_input() {
    let curve = wavy_cubic();
    assert!(matches!(
        curve.refined(&[1.0, 0.5]),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        curve.refined(&[99.0]),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn reversed_curve_traces_backwards() {
    let curve = quarter_circle();
    let reversed = curve.reversed();
    assert_relative_eq!(
        reversed.point_at(0.25).unwrap(),
        curve.point_at(0.75).unwrap(),
        epsilon = 1e-9
    );
    assert_relative_eq!(reversed.point_at(0.).unwrap(), Point2::new(0., 1.));
}

#[test]
fn transforms_allocate_new_curves() {
    let curve = quarter_circle();
    let translated = curve.translated(&Vector2::new(2., 3.));
    let scaled = curve.scaled(2.);

    let p = curve.point_at(0.5).unwrap();
    assert_relative_eq!(
        translated.point_at(0.5).unwrap(),
        Point2::new(p.x + 2., p.y + 3.),
        epsilon = 1e-9
    );
    // a rational curve scales about the origin, so the traced circle radius
    // doubles
    assert_relative_eq!(
        scaled.point_at(0.5).unwrap().coords.norm(),
        2.,
        epsilon = 1e-9
    );
    // the original is untouched
    assert_relative_eq!(curve.point_at(0.5).unwrap(), p);
}

#[test]
fn tangent_of_a_line_is_its_direction() {
    let curve = NurbsCurve2D::polyline(&[Point2::new(0., 0.), Point2::new(2., 1.)]).unwrap();
    let tangent = curve.tangent_at(0.5).unwrap();
    assert_relative_eq!(tangent, Vector2::new(2., 1.), epsilon = 1e-9);
}

#[test]
fn quarter_circle_length_and_division() {
    let curve = quarter_circle();
    let total = curve.try_length().unwrap();
    assert_relative_eq!(total, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);

    let samples = curve.try_divide_by_count(4).unwrap();
    assert_eq!(samples.len(), 5);
    for (i, s) in samples.iter().enumerate() {
        assert_relative_eq!(s.length(), total * (i as f64) / 4., epsilon = 1e-6);
    }
    let parameters: Vec<_> = samples.iter().map(|s| s.parameter()).collect();
    assert!(parameters.windows(2).all(|w| w[0] < w[1]));

    assert!(curve.try_divide_by_length(0.).is_err());
    assert!(curve.try_divide_by_length(100.).is_err());
    assert!(curve.try_divide_by_count(0).is_err());
}

#[test]
fn parametric_approximation_samples_uniform_parameters() {
    let curve = wavy_cubic();
    let polyline = curve
        .approximate(ApproximationStrategy::Parametric { segments: 10 })
        .unwrap();
    assert_eq!(polyline.npoints(), 11);
    let (start, end) = curve.knots_domain();
    assert_relative_eq!(polyline.points()[0], curve.point_at(start).unwrap());
    assert_relative_eq!(
        polyline.points()[10],
        curve.point_at(end).unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn equidistant_approximation_spaces_points_evenly() {
    let curve = quarter_circle();
    let polyline = curve
        .approximate(ApproximationStrategy::Equidistant { segments: 8 })
        .unwrap();
    assert_eq!(polyline.npoints(), 9);

    let lengths = polyline.segment_lengths();
    let first = lengths[0];
    for l in &lengths {
        assert_relative_eq!(*l, first, epsilon = 1e-4);
    }
}

#[test]
fn chordal_approximation_of_a_straight_curve_is_two_points() {
    let curve = NurbsCurve2D::try_clamped(
        &[
            Point2::new(0., 0.),
            Point2::new(1., 0.),
            Point2::new(2., 0.),
            Point2::new(3., 0.),
        ],
        3,
    )
    .unwrap();
    let polyline = curve
        .approximate(ApproximationStrategy::Chordal { tolerance: 1e-6 })
        .unwrap();
    assert_eq!(polyline.npoints(), 2);
    assert_relative_eq!(polyline.points()[0], Point2::new(0., 0.));
    assert_relative_eq!(polyline.points()[1], Point2::new(3., 0.));
}

#[test]
fn chordal_approximation_tracks_the_curve() {
    let curve = wavy_cubic();
    let polyline = curve
        .approximate(ApproximationStrategy::Chordal { tolerance: 1e-4 })
        .unwrap();
    assert!(polyline.npoints() > 2);
    let (start, end) = curve.knots_domain();
    assert_relative_eq!(polyline.points()[0], curve.point_at(start).unwrap());
    assert_relative_eq!(
        polyline.points()[polyline.npoints() - 1],
        curve.point_at(end).unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn knot_points_mark_the_distinct_domain_knots() {
    let curve = wavy_cubic();
    // knots [0 x4, 1, 2, 3 x4] have four distinct values in the domain
    let markers = curve.knot_points();
    assert_eq!(markers.len(), 4);
    assert_relative_eq!(markers[0], Point2::new(0., 0.));
    assert_relative_eq!(markers[3], Point2::new(5., 2.));
}

#[test]
fn frenet_frame_is_orthonormal() {
    let curve = NurbsCurve3D::try_clamped(
        &[
            Point3::new(0., 0., 0.),
            Point3::new(1., 2., 0.5),
            Point3::new(2., -1., 1.),
            Point3::new(3., 1., 1.5),
            Point3::new(4., 0., 2.),
        ],
        3,
    )
    .unwrap();
    let (start, end) = curve.knots_domain();
    for i in 1..8 {
        let u = start + (end - start) * (i as f64) / 8.;
        let frame = curve.frenet_frame_at(u).unwrap();
        assert!(!frame.is_degenerate());
        assert_relative_eq!(frame.tangent().norm(), 1., epsilon = 1e-9);
        assert_relative_eq!(frame.normal().norm(), 1., epsilon = 1e-9);
        assert_relative_eq!(frame.binormal().norm(), 1., epsilon = 1e-9);
        assert_relative_eq!(frame.tangent().dot(frame.normal()), 0., epsilon = 1e-9);
        assert_relative_eq!(frame.tangent().dot(frame.binormal()), 0., epsilon = 1e-9);
        assert_relative_eq!(frame.normal().dot(frame.binormal()), 0., epsilon = 1e-9);
    }
}

#[test]
fn planar_curve_has_zero_torsion() {
    let curve = NurbsCurve3D::try_clamped(
        &[
            Point3::new(0., 0., 0.),
            Point3::new(1., 2., 0.),
            Point3::new(2., -1., 0.),
            Point3::new(3., 1., 0.),
        ],
        3,
    )
    .unwrap();
    for i in 1..8 {
        let u = 0.1 * (i as f64);
        assert_relative_eq!(curve.torsion_at(u).unwrap(), 0., epsilon = 1e-9);
    }
}

#[test]
fn points_at_matches_scalar_evaluation() {
    let curve = wavy_cubic();
    let parameters = [0.0, 0.4, 1.3, 2.7, 3.0];
    let batch = curve.points_at(&parameters).unwrap();
    for (u, p) in parameters.iter().zip(&batch) {
        assert_relative_eq!(*p, curve.point_at(*u).unwrap());
    }
    // one bad parameter fails the whole batch
    assert!(curve.points_at(&[0.0, 99.0]).is_err());
}

#[test]
fn dehomogenized_control_points_recover_cartesian_input() {
    let curve = quarter_circle();
    let dehomogenized = curve.dehomogenized_control_points();
    assert_relative_eq!(dehomogenized[0], Point2::new(1., 0.));
    assert_relative_eq!(dehomogenized[1], Point2::new(1., 1.));
    assert_relative_eq!(dehomogenized[2], Point2::new(0., 1.));

    let weights = curve.weights();
    assert_relative_eq!(weights[1], 2.0_f64.sqrt() / 2.);
}

#[test]
fn cast_to_f32_keeps_the_shape() {
    let curve = quarter_circle();
    let cast: NurbsCurve2D<f32> = curve.cast();
    let p = cast.point_at(0.5).unwrap();
    let q = curve.point_at(0.5).unwrap();
    assert!((p.x - q.x as f32).abs() < 1e-5);
    assert!((p.y - q.y as f32).abs() < 1e-5);
}

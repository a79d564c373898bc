#![cfg(feature = "serde")]

use approx::assert_relative_eq;
use nalgebra::Point2;
use nurbex::prelude::*;

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

#[test]
fn curve_round_trips_through_json() {
    let curve = quarter_circle();
    let json = serde_json::to_string_pretty(&curve).unwrap();
    let back: NurbsCurve2D<f64> = serde_json::from_str(&json).unwrap();

    assert_eq!(back.degree(), curve.degree());
    assert_eq!(back.knots(), curve.knots());
    for i in 0..=16 {
        let u = (i as f64) / 16.;
        assert_relative_eq!(
            back.point_at(u).unwrap(),
            curve.point_at(u).unwrap(),
            epsilon = 1e-12
        );
    }
}

#[test]
fn polyline_round_trips_through_json() {
    let polyline = quarter_circle()
        .approximate(ApproximationStrategy::Parametric { segments: 8 })
        .unwrap();
    let json = serde_json::to_string(&polyline).unwrap();
    let back: PolyLine<f64, nalgebra::Const<2>> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, polyline);
}

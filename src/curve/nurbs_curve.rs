use gauss_quad::GaussLegendre;
use nalgebra::allocator::Allocator;
use nalgebra::{
    Const, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, OVector, U1, Vector3,
};
use simba::scalar::SupersetOf;

use crate::curve::CurveLengthParameter;
use crate::error::{Error, Result};
use crate::knot::KnotVector;
use crate::misc::{Binomial, Curvature, FloatingPoint, FrenetFrame};

/// NURBS curve representation
/// By generics, it can be used for 2D or 3D curves with f32 or f64 scalar
/// types. Control points are stored in homogeneous coordinates, the last
/// element being the weight.
///
/// Curves are immutable value objects: transforms and refinements return a
/// new curve, the original is never written through.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "T: serde::Serialize, OPoint<T, D>: serde::Serialize",
        deserialize = "T: serde::Deserialize<'de>, OPoint<T, D>: serde::Deserialize<'de>"
    ))
)]
pub struct NurbsCurve<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// control points with homogeneous coordinates
    /// the last element of the vector is the `weight`
    control_points: Vec<OPoint<T, D>>,
    degree: usize,
    /// knot vector of length `# of control points + degree + 1`
    knots: KnotVector<T>,
    /// closed curves wrap their control points and evaluate periodically
    closed: bool,
    /// an unblended curve decomposes into independent Bezier segments
    blended: bool,
}

/// 2D NURBS curve alias
pub type NurbsCurve2D<T> = NurbsCurve<T, Const<3>>;

/// 3D NURBS curve alias
pub type NurbsCurve3D<T> = NurbsCurve<T, Const<4>>;

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a new open NURBS curve from homogeneous control points and an
    /// explicit knot vector.
    /// # Failures
    /// - the degree is zero
    /// - the number of control points is not greater than the degree
    /// - the knot vector has the wrong length or is decreasing
    ///
    /// # Example
    /// ```
    /// use nurbex::prelude::*;
    /// use nalgebra::Point3;
    ///
    /// let w = 1.; // weight for each control point
    /// let control_points: Vec<Point3<f64>> = vec![
    ///     Point3::new(50., 50., w),
    ///     Point3::new(30., 370., w),
    ///     Point3::new(180., 350., w),
    ///     Point3::new(150., 100., w),
    ///     Point3::new(250., 50., w),
    ///     Point3::new(350., 100., w),
    ///     Point3::new(470., 400., w),
    /// ];
    /// let degree = 3;
    /// let m = control_points.len() + degree + 1;
    /// let knots = (0..m).map(|i| i as f64).collect();
    /// let nurbs = NurbsCurve::try_new(degree, control_points, knots);
    /// assert!(nurbs.is_ok());
    /// ```
    pub fn try_new(
        degree: usize,
        control_points: Vec<OPoint<T, D>>,
        knots: Vec<T>,
    ) -> Result<Self> {
        if degree == 0 {
            return Err(Error::configuration("degree must be at least one"));
        }
        if control_points.len() <= degree {
            return Err(Error::configuration(format!(
                "too few control points for degree {} curve, got {}",
                degree,
                control_points.len()
            )));
        }
        let knots = KnotVector::try_validated(knots, control_points.len(), degree)?;

        Ok(Self {
            degree,
            control_points,
            knots,
            closed: false,
            blended: true,
        })
    }

    /// Create a clamped curve through the given Cartesian control points
    /// with unit weights and a clamped uniform knot vector, so the curve
    /// interpolates its first and last control point.
    /// # Example
    /// ```
    /// use nurbex::prelude::*;
    /// use nalgebra::{Point2, Point3};
    /// use approx::assert_relative_eq;
    ///
    /// let points = vec![
    ///     Point2::new(0., 0.),
    ///     Point2::new(1., 2.),
    ///     Point2::new(2., 0.),
    ///     Point2::new(3., 1.),
    /// ];
    /// let curve = NurbsCurve2D::try_clamped(&points, 3).unwrap();
    /// let (start, end) = curve.knots_domain();
    /// assert_relative_eq!(curve.point_at(start).unwrap(), points[0]);
    /// assert_relative_eq!(curve.point_at(end).unwrap(), points[3]);
    /// ```
    pub fn try_clamped(points: &[OPoint<T, DimNameDiff<D, U1>>], degree: usize) -> Result<Self>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let weights = vec![T::one(); points.len()];
        Self::try_weighted(points, &weights, degree)
    }

    /// Create a rational clamped curve: each Cartesian control point carries
    /// a weight, multiplied into the homogeneous coordinates on storage.
    /// A weight of zero is permitted (the control point acts as a direction),
    /// but evaluating exactly where the interpolated weight vanishes yields
    /// non-finite coordinates.
    pub fn try_weighted(
        points: &[OPoint<T, DimNameDiff<D, U1>>],
        weights: &[T],
        degree: usize,
    ) -> Result<Self>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        if points.len() != weights.len() {
            return Err(Error::configuration(format!(
                "got {} weights for {} control points",
                weights.len(),
                points.len()
            )));
        }
        if degree == 0 {
            return Err(Error::configuration("degree must be at least one"));
        }
        if points.len() <= degree {
            return Err(Error::configuration(format!(
                "too few control points for degree {} curve, got {}",
                degree,
                points.len()
            )));
        }

        let control_points = points
            .iter()
            .zip(weights)
            .map(|(p, w)| homogenize(p, *w))
            .collect();

        Ok(Self {
            degree,
            control_points,
            knots: KnotVector::clamped_uniform(points.len(), degree),
            closed: false,
            blended: true,
        })
    }

    /// Create a closed curve: the first `degree` control points wrap around
    /// and a periodic knot vector is used, so the curve has no distinguished
    /// start or end. Evaluation accepts any parameter and folds it into the
    /// domain modulo the period.
    /// # Example
    /// ```
    /// use nurbex::prelude::*;
    /// use nalgebra::Point3;
    /// use approx::assert_relative_eq;
    ///
    /// let points: Vec<Point3<f64>> = vec![
    ///     Point3::new(-1.0, -1.0, 0.),
    ///     Point3::new(1.0, -1.0, 0.),
    ///     Point3::new(1.0, 1.0, 0.),
    /// ];
    /// let curve = NurbsCurve3D::try_closed(&points, 2).unwrap();
    /// let (start, end) = curve.knots_domain();
    /// let head = curve.point_at(start).unwrap();
    /// let tail = curve.point_at(end).unwrap();
    /// assert_relative_eq!(head, tail);
    /// ```
    pub fn try_closed(points: &[OPoint<T, DimNameDiff<D, U1>>], degree: usize) -> Result<Self>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let n = points.len();
        if degree == 0 {
            return Err(Error::configuration("degree must be at least one"));
        }
        if n <= degree {
            return Err(Error::configuration(format!(
                "too few control points for degree {} curve, got {}",
                degree, n
            )));
        }

        let control_points = (0..n + degree)
            .map(|i| homogenize(&points[i % n], T::one()))
            .collect();

        Ok(Self {
            degree,
            control_points,
            knots: KnotVector::periodic_uniform(n + degree, degree),
            closed: true,
            blended: true,
        })
    }

    /// Create an unblended curve: interior knots carry multiplicity equal to
    /// the degree, so the curve is a chain of independent Bezier segments
    /// whose ends lie on the control polygon.
    /// Requires `(n - 1) % degree == 0` for `n` control points.
    pub fn try_unblended(points: &[OPoint<T, DimNameDiff<D, U1>>], degree: usize) -> Result<Self>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let n = points.len();
        if degree == 0 || n <= degree {
            return Err(Error::configuration(format!(
                "too few control points for degree {} curve, got {}",
                degree, n
            )));
        }
        let knots = KnotVector::unblended(n, degree)?;
        let control_points = points.iter().map(|p| homogenize(p, T::one())).collect();

        Ok(Self {
            degree,
            control_points,
            knots,
            closed: false,
            blended: false,
        })
    }

    /// Create a degree-1 curve through the given points, which evaluates to
    /// the linear interpolation between consecutive control points.
    pub fn polyline(points: &[OPoint<T, DimNameDiff<D, U1>>]) -> Result<Self>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        Self::try_clamped(points, 1)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &KnotVector<T> {
        &self.knots
    }

    pub fn control_points(&self) -> &Vec<OPoint<T, D>> {
        &self.control_points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_blended(&self) -> bool {
        self.blended
    }

    pub fn is_clamped(&self) -> bool {
        self.knots.is_clamped(self.degree)
    }

    pub fn weights(&self) -> Vec<T> {
        self.control_points
            .iter()
            .map(|p| p[D::dim() - 1])
            .collect()
    }

    pub fn knots_domain(&self) -> (T, T) {
        self.knots.domain(self.degree)
    }

    pub fn knots_domain_interval(&self) -> T {
        let (d0, d1) = self.knots_domain();
        d1 - d0
    }

    /// Return the dehomogenized control points
    pub fn dehomogenized_control_points(&self) -> Vec<OPoint<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        self.control_points.iter().map(dehomogenize).collect()
    }

    /// Map a query parameter onto the evaluation domain.
    /// Open curves reject parameters outside the domain; closed curves fold
    /// the parameter modulo the period, wrap-around being defined behavior.
    fn normalized_parameter(&self, u: T) -> Result<T> {
        let (start, end) = self.knots_domain();
        if self.closed {
            let period = end - start;
            Ok(u - period * ((u - start) / period).floor())
        } else {
            let eps = T::default_epsilon();
            if u < start - eps || u > end + eps {
                Err(Error::Domain {
                    parameter: u.to_f64().unwrap_or(f64::NAN),
                    min: start.to_f64().unwrap_or(f64::NAN),
                    max: end.to_f64().unwrap_or(f64::NAN),
                })
            } else {
                Ok(u)
            }
        }
    }

    /// Evaluate the curve at a parameter to get a homogeneous point.
    /// The parameter must already lie inside the domain.
    pub(crate) fn point(&self, u: T) -> OPoint<T, D> {
        let n = self.knots.len() - self.degree - 2;
        let span = self.knots.find_span(n, self.degree, u);
        let basis = self.knots.basis_functions(span, u, self.degree);
        let mut position = OPoint::<T, D>::origin();
        for i in 0..=self.degree {
            position.coords += &self.control_points[span - self.degree + i].coords * basis[i];
        }
        position
    }

    /// Evaluate the curve at a parameter to get a dehomogenized point.
    /// Fails with a domain error for an open curve evaluated outside its
    /// domain; closed curves wrap instead.
    pub fn point_at(&self, u: T) -> Result<OPoint<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let u = self.normalized_parameter(u)?;
        Ok(dehomogenize(&self.point(u)))
    }

    /// Evaluate the curve at each of the given parameters.
    /// The whole batch fails on the first out-of-domain parameter.
    pub fn points_at(&self, parameters: &[T]) -> Result<Vec<OPoint<T, DimNameDiff<D, U1>>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        parameters.iter().map(|u| self.point_at(*u)).collect()
    }

    /// Sample the curve at a regular number of parameters across the domain.
    pub fn sample_regular(&self, samples: usize) -> Vec<OPoint<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let (start, end) = self.knots_domain();
        let us = T::from_usize(samples).unwrap();
        let step = (end - start) / (us - T::one());
        (0..samples)
            .map(|i| {
                let u = start + T::from_usize(i).unwrap() * step;
                dehomogenize(&self.point(u))
            })
            .collect()
    }

    /// Curve points at the distinct knot values inside the domain, the
    /// markers a display collaborator draws on the curve.
    pub fn knot_points(&self) -> Vec<OPoint<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let (start, end) = self.knots_domain();
        self.knots
            .multiplicity()
            .iter()
            .map(|m| *m.knot())
            .filter(|k| *k >= start && *k <= end)
            .map(|k| dehomogenize(&self.point(k)))
            .collect()
    }

    /// Evaluate the derivatives of the homogeneous curve at a parameter.
    /// Derivatives of order beyond the degree are zero vectors.
    fn derivatives(&self, u: T, order: usize) -> Vec<OVector<T, D>> {
        let n = self.knots.len() - self.degree - 2;

        let du = order.min(self.degree);
        let mut derivatives = vec![OVector::<T, D>::zeros(); order + 1];

        let span = self.knots.find_span(n, self.degree, u);
        let nders = self
            .knots
            .derivative_basis_functions(span, u, self.degree, du);
        for k in 0..=du {
            for j in 0..=self.degree {
                let w = &self.control_points[span - self.degree + j] * nders[k][j];
                let column = derivatives.get_mut(k).unwrap();
                w.coords.iter().enumerate().for_each(|(i, v)| {
                    column[i] += *v;
                });
            }
        }

        derivatives
    }

    /// Rational derivatives at a valid domain parameter: the quotient-rule
    /// expansion over the homogeneous curve derivatives. Differentiating the
    /// projected curve directly would be wrong for non-uniform weights.
    pub(crate) fn rational_derivatives(
        &self,
        u: T,
        order: usize,
    ) -> Vec<OVector<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let ders = self.derivatives(u, order);
        let a_ders: Vec<_> = ders
            .iter()
            .map(|d| {
                let mut spatial = vec![];
                for i in 0..D::dim() - 1 {
                    spatial.push(d[i]);
                }
                OVector::<T, DimNameDiff<D, U1>>::from_vec(spatial)
            })
            .collect();
        let w_ders: Vec<_> = ders.iter().map(|d| d[D::dim() - 1]).collect();

        let mut ck = vec![];
        let mut binom = Binomial::<T>::new();
        for k in 0..=order {
            let mut v = a_ders[k].clone();

            for i in 1..=k {
                let coef = binom.get(k, i) * w_ders[i];
                v -= &ck[k - i] * coef;
            }

            let dehom = v / w_ders[0];
            ck.push(dehom);
        }
        ck
    }

    /// Evaluate the 0th through order-th derivative vectors at a parameter.
    /// The 0th entry is the curve point as a vector from the origin.
    pub fn derivatives_at(
        &self,
        u: T,
        order: usize,
    ) -> Result<Vec<OVector<T, DimNameDiff<D, U1>>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let u = self.normalized_parameter(u)?;
        Ok(self.rational_derivatives(u, order))
    }

    /// Evaluate the tangent vector at a parameter.
    pub fn tangent_at(&self, u: T) -> Result<OVector<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let deriv = self.derivatives_at(u, 1)?;
        Ok(deriv[1].clone())
    }

    /// Evaluate the curvature at a parameter.
    /// A vanishing tangent reports zero curvature flagged as singular, never
    /// a NaN.
    /// # Example
    /// ```
    /// use nurbex::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    ///
    /// // quarter circle of radius 1
    /// let half_sqrt2 = 2.0_f64.sqrt() / 2.;
    /// let curve = NurbsCurve2D::try_weighted(
    ///     &[
    ///         Point2::new(1., 0.),
    ///         Point2::new(1., 1.),
    ///         Point2::new(0., 1.),
    ///     ],
    ///     &[1., half_sqrt2, 1.],
    ///     2,
    /// ).unwrap();
    /// let c = curve.curvature_at(0.5).unwrap();
    /// assert!(!c.is_singular());
    /// assert_relative_eq!(c.kappa(), 1., epsilon = 1e-9);
    /// ```
    pub fn curvature_at(&self, u: T) -> Result<Curvature<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let deriv = self.derivatives_at(u, 2)?;
        Ok(Curvature::from_derivatives(
            deriv[1].clone(),
            deriv[2].clone(),
        ))
    }

    /// Compute the length of the curve by Gauss-Legendre quadrature of the
    /// tangent magnitude over each distinct knot span.
    /// # Example
    /// ```
    /// use nurbex::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    ///
    /// let half_sqrt2 = 2.0_f64.sqrt() / 2.;
    /// let quarter = NurbsCurve2D::try_weighted(
    ///     &[
    ///         Point2::new(1., 0.),
    ///         Point2::new(1., 1.),
    ///         Point2::new(0., 1.),
    ///     ],
    ///     &[1., half_sqrt2, 1.],
    ///     2,
    /// ).unwrap();
    /// let length = quarter.try_length().unwrap();
    /// assert_relative_eq!(length, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
    /// ```
    pub fn try_length(&self) -> Result<T>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let gauss = self.quadrature();
        let length = self
            .knots
            .domain_spans(self.degree)
            .iter()
            .fold(T::zero(), |acc, (a, b)| {
                acc + self.span_length(&gauss, *a, *b)
            });
        Ok(length)
    }

    /// Divide the curve into parameters spaced a given arc length apart.
    /// The first sample sits at the domain start with length zero; a sample
    /// is produced for every whole multiple of `length` up to the total.
    pub fn try_divide_by_length(&self, length: T) -> Result<Vec<CurveLengthParameter<T>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        if length <= T::zero() {
            return Err(Error::configuration(
                "the dividing length must be greater than zero",
            ));
        }

        let gauss = self.quadrature();
        let spans = self.knots.domain_spans(self.degree);
        let span_lengths: Vec<T> = spans
            .iter()
            .map(|(a, b)| self.span_length(&gauss, *a, *b))
            .collect();
        let total = span_lengths.iter().fold(T::zero(), |a, b| a + *b);

        if total < length {
            return Err(Error::configuration(
                "the curve is too short to divide by the given length",
            ));
        }

        let (start, _) = self.knots_domain();
        let mut samples = vec![CurveLengthParameter::new(start, T::zero())];

        let eps = T::from_f64(1e-9).unwrap();
        let mut lc = length;
        let mut acc = T::zero();

        for (i, (a, b)) in spans.iter().enumerate() {
            let end_acc = acc + span_lengths[i];
            while lc <= end_acc + eps {
                let u = self.parameter_at_span_length(&gauss, *a, *b, lc - acc);
                samples.push(CurveLengthParameter::new(u, lc));
                lc += length;
            }
            acc = end_acc;
        }

        Ok(samples)
    }

    /// Divide the curve into a given number of equal arc-length segments.
    pub fn try_divide_by_count(&self, segments: usize) -> Result<Vec<CurveLengthParameter<T>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        if segments == 0 {
            return Err(Error::configuration(
                "the number of segments must be greater than zero",
            ));
        }
        let total = self.try_length()?;
        let length = total / T::from_usize(segments).unwrap();
        self.try_divide_by_length(length)
    }

    fn quadrature(&self) -> GaussLegendre {
        // GaussLegendre::new only fails below two nodes, 16 + degree is
        // always above that
        GaussLegendre::new(16 + self.degree).expect("at least two quadrature nodes")
    }

    fn span_length(&self, gauss: &GaussLegendre, a: T, b: T) -> T
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let left = a.to_f64().unwrap();
        let right = b.to_f64().unwrap();
        let sum = gauss.integrate(left, right, |x| {
            let x = T::from_f64(x).unwrap();
            let deriv = self.rational_derivatives(x, 1);
            deriv[1].norm().to_f64().unwrap()
        });
        T::from_f64(sum).unwrap()
    }

    /// Locate the parameter in the span `[a, b]` at which the arc length
    /// from `a` equals `target`, by bisection; the integrand is positive so
    /// the accumulated length is monotone in the parameter.
    fn parameter_at_span_length(&self, gauss: &GaussLegendre, a: T, b: T, target: T) -> T
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let tolerance = T::from_f64(1e-9).unwrap();
        let mut low = a;
        let mut high = b;
        let two = T::from_f64(2.).unwrap();

        for _ in 0..100 {
            let mid = (low + high) / two;
            let len = self.span_length(gauss, a, mid);
            if (len - target).abs() < tolerance || (high - low) < tolerance {
                return mid;
            }
            if len < target {
                low = mid;
            } else {
                high = mid;
            }
        }

        (low + high) / two
    }

    /// Return a refined curve with the given knots inserted, leaving the
    /// curve geometry unchanged. The curve must be clamped and the knots to
    /// insert must be sorted and lie inside the domain.
    pub fn refined(&self, knots_to_insert: &[T]) -> Result<Self> {
        if knots_to_insert.is_empty() {
            return Ok(self.clone());
        }
        if !self.is_clamped() {
            return Err(Error::configuration("curve must be clamped to refine knots"));
        }
        if knots_to_insert.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::configuration("knots to insert must be sorted"));
        }
        let (start, end) = self.knots_domain();
        if knots_to_insert[0] < start || knots_to_insert[knots_to_insert.len() - 1] > end {
            return Err(Error::configuration(
                "knots to insert must lie inside the curve domain",
            ));
        }

        let degree = self.degree;
        let control_points = &self.control_points;

        let n = control_points.len() - 1;
        let m = n + degree + 1;
        let r = knots_to_insert.len() - 1;
        let a = self.knots.find_span(n, degree, knots_to_insert[0]);
        let b = self.knots.find_span(n, degree, knots_to_insert[r]) + 1;

        let mut control_points_post = vec![OPoint::<T, D>::origin(); n + r + 2];
        let mut knots_post = vec![T::zero(); m + r + 2];

        control_points_post[..((a - degree) + 1)]
            .clone_from_slice(&control_points[..((a - degree) + 1)]);
        for i in (b - 1)..=n {
            control_points_post[i + r + 1] = control_points[i].clone();
        }

        for i in 0..=a {
            knots_post[i] = self.knots[i];
        }
        for i in (b + degree)..=m {
            knots_post[i + r + 1] = self.knots[i];
        }

        let mut i = b + degree - 1;
        let mut k = b + degree + r;

        for j in (0..=r).rev() {
            while knots_to_insert[j] <= self.knots[i] && i > a {
                control_points_post[k - degree - 1] = control_points[i - degree - 1].clone();
                knots_post[k] = self.knots[i];
                k -= 1;
                i -= 1;
            }
            control_points_post[k - degree - 1] = control_points_post[k - degree].clone();
            for l in 1..=degree {
                let ind = k - degree + l;
                let alpha = knots_post[k + l] - knots_to_insert[j];
                if alpha.abs() < T::default_epsilon() {
                    control_points_post[ind - 1] = control_points_post[ind].clone();
                } else {
                    let denom = knots_post[k + l] - self.knots[i - degree + l];
                    let weight = if denom != T::zero() {
                        alpha / denom
                    } else {
                        T::zero()
                    };
                    control_points_post[ind - 1] =
                        lerp(&control_points_post[ind - 1], &control_points_post[ind], T::one() - weight);
                }
            }
            knots_post[k] = knots_to_insert[j];
            k -= 1;
        }

        Ok(Self {
            degree,
            control_points: control_points_post,
            knots: KnotVector::new(knots_post),
            closed: self.closed,
            blended: self.blended,
        })
    }

    /// Return the curve walked in the opposite direction.
    pub fn reversed(&self) -> Self {
        let mut control_points = self.control_points.clone();
        control_points.reverse();
        Self {
            degree: self.degree,
            control_points,
            knots: self.knots.reversed(),
            closed: self.closed,
            blended: self.blended,
        }
    }

    /// Return the curve translated by a vector.
    pub fn translated(&self, translation: &OVector<T, DimNameDiff<D, U1>>) -> Self
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let control_points = self
            .control_points
            .iter()
            .map(|p| {
                let w = p[D::dim() - 1];
                let mut q = p.clone();
                // homogeneous coordinates scale the translation by the weight
                for i in 0..D::dim() - 1 {
                    q[i] += translation[i] * w;
                }
                q
            })
            .collect();
        Self {
            degree: self.degree,
            control_points,
            knots: self.knots.clone(),
            closed: self.closed,
            blended: self.blended,
        }
    }

    /// Return the curve scaled uniformly about the origin.
    pub fn scaled(&self, factor: T) -> Self {
        let control_points = self
            .control_points
            .iter()
            .map(|p| {
                let mut q = p.clone();
                for i in 0..D::dim() - 1 {
                    q[i] *= factor;
                }
                q
            })
            .collect();
        Self {
            degree: self.degree,
            control_points,
            knots: self.knots.clone(),
            closed: self.closed,
            blended: self.blended,
        }
    }

    /// Cast the curve to another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> NurbsCurve<F, D>
    where
        DefaultAllocator: Allocator<D>,
    {
        NurbsCurve {
            control_points: self.control_points.iter().map(|p| p.clone().cast()).collect(),
            degree: self.degree,
            knots: self.knots.cast(),
            closed: self.closed,
            blended: self.blended,
        }
    }
}

impl<T: FloatingPoint> NurbsCurve3D<T> {
    /// Evaluate the Frenet frame at a parameter.
    /// At a cusp (vanishing tangent) the frame is degenerate but finite: all
    /// frame vectors are zero. Along straight stretches, where the binormal
    /// direction is undefined, an arbitrary normal orthogonal to the tangent
    /// is chosen.
    pub fn frenet_frame_at(&self, u: T) -> Result<FrenetFrame<T>> {
        let deriv = self.derivatives_at(u, 2)?;
        let position = self.point_at(u)?;

        let n1 = deriv[1].norm();
        if n1 <= T::default_epsilon() {
            return Ok(FrenetFrame::new(
                position,
                Vector3::zeros(),
                Vector3::zeros(),
                Vector3::zeros(),
            ));
        }

        let tangent = &deriv[1] / n1;
        let b = deriv[1].cross(&deriv[2]);
        let nb = b.norm();

        let (normal, binormal) = if nb <= T::default_epsilon() {
            let normal = orthogonal_to(&tangent);
            let binormal = tangent.cross(&normal);
            (normal, binormal)
        } else {
            let binormal = b / nb;
            let normal = binormal.cross(&tangent);
            (normal, binormal)
        };

        Ok(FrenetFrame::new(position, tangent, normal, binormal))
    }

    /// Evaluate the torsion at a parameter. Zero along straight or planar
    /// stretches where the osculating plane is stationary or undefined.
    pub fn torsion_at(&self, u: T) -> Result<T> {
        let deriv = self.derivatives_at(u, 3)?;
        let b = deriv[1].cross(&deriv[2]);
        let nb2 = b.dot(&b);
        if nb2 <= T::default_epsilon() {
            Ok(T::zero())
        } else {
            Ok(b.dot(&deriv[3]) / nb2)
        }
    }
}

/// An arbitrary unit vector orthogonal to `v`, built against the smallest
/// component of `v` for numerical headroom.
fn orthogonal_to<T: FloatingPoint>(v: &nalgebra::Vector3<T>) -> nalgebra::Vector3<T> {
    let x = v.x.abs();
    let y = v.y.abs();
    let z = v.z.abs();
    let other = if x <= y && x <= z {
        nalgebra::Vector3::x()
    } else if y <= z {
        nalgebra::Vector3::y()
    } else {
        nalgebra::Vector3::z()
    };
    v.cross(&other).normalize()
}

/// Linear interpolation between two points by coordinates.
pub(crate) fn lerp<T: FloatingPoint, D: DimName>(
    a: &OPoint<T, D>,
    b: &OPoint<T, D>,
    t: T,
) -> OPoint<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    OPoint {
        coords: a.coords.lerp(&b.coords, t),
    }
}

/// Project a homogeneous point to Cartesian coordinates by perspective
/// division. A zero weight yields non-finite coordinates rather than a
/// failure, matching the interpretation of a zero-weight control point as a
/// direction.
pub fn dehomogenize<T: FloatingPoint, D: DimName>(
    point: &OPoint<T, D>,
) -> OPoint<T, DimNameDiff<D, U1>>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D> + Allocator<DimNameDiff<D, U1>>,
{
    let v = &point.coords;
    let w = v[D::dim() - 1];
    let coords = v.generic_view((0, 0), (<D as DimNameSub<U1>>::Output::name(), Const::<1>)) / w;
    OPoint { coords }
}

/// Lift a Cartesian point into homogeneous coordinates with the given
/// weight: the coordinates are multiplied by the weight, the weight becomes
/// the last component.
pub fn homogenize<T: FloatingPoint, D: DimName>(
    point: &OPoint<T, DimNameDiff<D, U1>>,
    weight: T,
) -> OPoint<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D> + Allocator<DimNameDiff<D, U1>>,
{
    let mut coords: Vec<T> = point.iter().map(|c| *c * weight).collect();
    coords.push(weight);
    OPoint::from_slice(&coords)
}

use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, OVector, U1};
use simba::scalar::SupersetOf;

use crate::curve::nurbs_curve::{dehomogenize, homogenize};
use crate::curve::NurbsCurve;
use crate::error::{Error, Result};
use crate::knot::KnotVector;
use crate::misc::{Binomial, FloatingPoint};
use crate::surface::SurfaceDirection;

/// NURBS surface representation
/// The tensor-product extension of the curve evaluator over two parametric
/// directions, with an `Nu x Nv` grid of homogeneous control points.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "T: serde::Serialize, OPoint<T, D>: serde::Serialize",
        deserialize = "T: serde::Deserialize<'de>, OPoint<T, D>: serde::Deserialize<'de>"
    ))
)]
pub struct NurbsSurface<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// control points with homogeneous coordinates, indexed `[u][v]`
    /// the last element of each point is the `weight`
    control_points: Vec<Vec<OPoint<T, D>>>,
    u_degree: usize,
    v_degree: usize,
    u_knots: KnotVector<T>,
    v_knots: KnotVector<T>,
}

/// 2D NURBS surface alias
pub type NurbsSurface2D<T> = NurbsSurface<T, nalgebra::Const<3>>;
/// 3D NURBS surface alias
pub type NurbsSurface3D<T> = NurbsSurface<T, nalgebra::Const<4>>;

impl<T: FloatingPoint, D: DimName> NurbsSurface<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a new NURBS surface from homogeneous control points and
    /// explicit knot vectors in both directions.
    /// # Failures
    /// - a degree is zero, or a grid dimension is not greater than its degree
    /// - the grid is empty or not rectangular
    /// - a knot vector has the wrong length or is decreasing
    pub fn try_new(
        u_degree: usize,
        v_degree: usize,
        u_knots: Vec<T>,
        v_knots: Vec<T>,
        control_points: Vec<Vec<OPoint<T, D>>>,
    ) -> Result<Self> {
        if u_degree == 0 || v_degree == 0 {
            return Err(Error::configuration("degrees must be at least one"));
        }

        let nu = control_points.len();
        if nu == 0 {
            return Err(Error::configuration("empty control point grid"));
        }
        let nv = control_points[0].len();
        if control_points.iter().any(|row| row.len() != nv) {
            return Err(Error::configuration(
                "control point grid rows must all have the same length",
            ));
        }
        if nu <= u_degree || nv <= v_degree {
            return Err(Error::configuration(format!(
                "too few control points for degrees ({}, {}), got a {}x{} grid",
                u_degree, v_degree, nu, nv
            )));
        }

        let u_knots = KnotVector::try_validated(u_knots, nu, u_degree)?;
        let v_knots = KnotVector::try_validated(v_knots, nv, v_degree)?;

        Ok(Self {
            control_points,
            u_degree,
            v_degree,
            u_knots,
            v_knots,
        })
    }

    /// Create a clamped surface from a rectangular grid of Cartesian control
    /// points with unit weights and clamped uniform knot vectors, so the
    /// surface interpolates the four corner points.
    pub fn try_clamped(
        points: &[Vec<OPoint<T, DimNameDiff<D, U1>>>],
        u_degree: usize,
        v_degree: usize,
    ) -> Result<Self>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let nu = points.len();
        if nu == 0 {
            return Err(Error::configuration("empty control point grid"));
        }
        let nv = points[0].len();
        if nu <= u_degree || nv <= v_degree {
            return Err(Error::configuration(format!(
                "too few control points for degrees ({}, {}), got a {}x{} grid",
                u_degree, v_degree, nu, nv
            )));
        }

        let control_points = points
            .iter()
            .map(|row| {
                row.iter().map(|p| homogenize(p, T::one())).collect()
            })
            .collect();

        Self::try_new(
            u_degree,
            v_degree,
            KnotVector::clamped_uniform(nu, u_degree).to_vec(),
            KnotVector::clamped_uniform(nv, v_degree).to_vec(),
            control_points,
        )
    }

    pub fn u_degree(&self) -> usize {
        self.u_degree
    }

    pub fn v_degree(&self) -> usize {
        self.v_degree
    }

    pub fn u_knots(&self) -> &KnotVector<T> {
        &self.u_knots
    }

    pub fn v_knots(&self) -> &KnotVector<T> {
        &self.v_knots
    }

    pub fn control_points(&self) -> &Vec<Vec<OPoint<T, D>>> {
        &self.control_points
    }

    /// Get the u domain of the knot vector by degree
    pub fn u_knots_domain(&self) -> (T, T) {
        self.u_knots.domain(self.u_degree)
    }

    /// Get the v domain of the knot vector by degree
    pub fn v_knots_domain(&self) -> (T, T) {
        self.v_knots.domain(self.v_degree)
    }

    fn validate_parameters(&self, u: T, v: T) -> Result<()> {
        let n = self.u_knots.len() - self.u_degree - 2;
        self.u_knots.try_find_span(n, self.u_degree, u)?;
        let m = self.v_knots.len() - self.v_degree - 2;
        self.v_knots.try_find_span(m, self.v_degree, v)?;
        Ok(())
    }

    /// Evaluate the surface at the given parameter pair to get a homogeneous
    /// point. The parameters must already lie inside both domains.
    pub(crate) fn point(&self, u: T, v: T) -> OPoint<T, D> {
        let n = self.u_knots.len() - self.u_degree - 2;
        let m = self.v_knots.len() - self.v_degree - 2;

        let u_span = self.u_knots.find_span(n, self.u_degree, u);
        let v_span = self.v_knots.find_span(m, self.v_degree, v);
        let u_basis = self.u_knots.basis_functions(u_span, u, self.u_degree);
        let v_basis = self.v_knots.basis_functions(v_span, v, self.v_degree);
        let uind = u_span - self.u_degree;

        let mut position = OPoint::<T, D>::origin();
        for l in 0..=self.v_degree {
            let mut temp = OPoint::<T, D>::origin();
            let vind = v_span - self.v_degree + l;

            // blend a u isoline
            for k in 0..=self.u_degree {
                temp.coords += &self.control_points[uind + k][vind].coords * u_basis[k];
            }

            position.coords += temp.coords * v_basis[l];
        }

        position
    }

    /// Evaluate the surface at the given parameter pair to get a
    /// dehomogenized point. Fails with a domain error when either parameter
    /// lies outside its direction's domain.
    /// # Example
    /// ```
    /// use nurbex::prelude::*;
    /// use nalgebra::Point3;
    /// use approx::assert_relative_eq;
    ///
    /// let grid: Vec<Vec<Point3<f64>>> = (0..4)
    ///     .map(|i| (0..4).map(|j| Point3::new(i as f64, j as f64, 0.)).collect())
    ///     .collect();
    /// let surface = NurbsSurface3D::try_clamped(&grid, 2, 2).unwrap();
    /// let (u0, _) = surface.u_knots_domain();
    /// let (v0, _) = surface.v_knots_domain();
    /// assert_relative_eq!(surface.point_at(u0, v0).unwrap(), Point3::new(0., 0., 0.));
    /// ```
    pub fn point_at(&self, u: T, v: T) -> Result<OPoint<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        self.validate_parameters(u, v)?;
        Ok(dehomogenize(&self.point(u, v)))
    }

    /// Evaluate the surface at each of the given parameter pairs.
    pub fn points_at(
        &self,
        parameters: &[(T, T)],
    ) -> Result<Vec<OPoint<T, DimNameDiff<D, U1>>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        parameters
            .iter()
            .map(|(u, v)| self.point_at(*u, *v))
            .collect()
    }

    /// Evaluate the derivatives of the homogeneous surface at a parameter
    /// pair, up to `order` in each direction.
    fn derivatives(&self, u: T, v: T, order: usize) -> Vec<Vec<OVector<T, D>>> {
        let n = self.u_knots.len() - self.u_degree - 2;
        let m = self.v_knots.len() - self.v_degree - 2;

        let du = order.min(self.u_degree);
        let dv = order.min(self.v_degree);
        let mut skl = vec![vec![OVector::<T, D>::zeros(); order + 1]; order + 1];
        let u_span = self.u_knots.find_span(n, self.u_degree, u);
        let v_span = self.v_knots.find_span(m, self.v_degree, v);
        let uders = self
            .u_knots
            .derivative_basis_functions(u_span, u, self.u_degree, du);
        let vders = self
            .v_knots
            .derivative_basis_functions(v_span, v, self.v_degree, dv);
        let mut temp = vec![OPoint::<T, D>::origin(); self.v_degree + 1];

        for k in 0..=du {
            for s in 0..=self.v_degree {
                temp[s] = OPoint::<T, D>::origin();
                for r in 0..=self.u_degree {
                    let w = &self.control_points[u_span - self.u_degree + r]
                        [v_span - self.v_degree + s]
                        * uders[k][r];
                    let column = temp.get_mut(s).unwrap();
                    w.coords.iter().enumerate().for_each(|(i, v)| {
                        column[i] += *v;
                    });
                }
            }

            let dd = (order - k).min(dv);
            for l in 0..=dd {
                for (s, item) in temp.iter().enumerate().take(self.v_degree + 1) {
                    let w = item * vders[l][s];
                    let column = skl[k].get_mut(l).unwrap();
                    w.coords.iter().enumerate().for_each(|(i, v)| {
                        column[i] += *v;
                    });
                }
            }
        }

        skl
    }

    /// Rational derivatives at a valid parameter pair.
    pub(crate) fn rational_derivatives(
        &self,
        u: T,
        v: T,
        order: usize,
    ) -> Vec<Vec<OVector<T, DimNameDiff<D, U1>>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let ders = self.derivatives(u, v, order);
        rational_derivatives(&ders, order)
    }

    /// Evaluate the mixed partial derivatives at a parameter pair: entry
    /// `[k][l]` is the derivative taken `k` times along u and `l` times
    /// along v, with `[0][0]` the surface point as a vector.
    pub fn derivatives_at(
        &self,
        u: T,
        v: T,
        order: usize,
    ) -> Result<Vec<Vec<OVector<T, DimNameDiff<D, U1>>>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        self.validate_parameters(u, v)?;
        Ok(self.rational_derivatives(u, v, order))
    }

    /// Evaluate the surface normal at a parameter pair, the cross product of
    /// the first partial derivatives.
    pub fn normal_at(&self, u: T, v: T) -> Result<OVector<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let deriv = self.derivatives_at(u, v, 1)?;
        Ok(deriv[1][0].cross(&deriv[0][1]))
    }

    /// Extract the isoparametric curve at a fixed parameter.
    /// With `SurfaceDirection::V` the parameter fixes v and the returned
    /// curve runs along u, and vice versa. The cross-section control points
    /// are the grid blended with the fixed direction's basis functions, so
    /// the curve traces the surface exactly.
    pub fn iso_curve(&self, t: T, direction: SurfaceDirection) -> Result<NurbsCurve<T, D>> {
        match direction {
            SurfaceDirection::V => {
                let m = self.v_knots.len() - self.v_degree - 2;
                let v_span = self.v_knots.try_find_span(m, self.v_degree, t)?;
                let v_basis = self.v_knots.basis_functions(v_span, t, self.v_degree);

                let section = self
                    .control_points
                    .iter()
                    .map(|row| {
                        let mut q = OPoint::<T, D>::origin();
                        for l in 0..=self.v_degree {
                            q.coords += &row[v_span - self.v_degree + l].coords * v_basis[l];
                        }
                        q
                    })
                    .collect();

                NurbsCurve::try_new(self.u_degree, section, self.u_knots.to_vec())
            }
            SurfaceDirection::U => {
                let n = self.u_knots.len() - self.u_degree - 2;
                let u_span = self.u_knots.try_find_span(n, self.u_degree, t)?;
                let u_basis = self.u_knots.basis_functions(u_span, t, self.u_degree);

                let nv = self.control_points[0].len();
                let section = (0..nv)
                    .map(|j| {
                        let mut q = OPoint::<T, D>::origin();
                        for k in 0..=self.u_degree {
                            q.coords +=
                                &self.control_points[u_span - self.u_degree + k][j].coords
                                    * u_basis[k];
                        }
                        q
                    })
                    .collect();

                NurbsCurve::try_new(self.v_degree, section, self.v_knots.to_vec())
            }
        }
    }

    /// Cast the surface to another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> NurbsSurface<F, D>
    where
        DefaultAllocator: Allocator<D>,
    {
        NurbsSurface {
            control_points: self
                .control_points
                .iter()
                .map(|row| row.iter().map(|p| p.clone().cast()).collect())
                .collect(),
            u_degree: self.u_degree,
            v_degree: self.v_degree,
            u_knots: self.u_knots.cast(),
            v_knots: self.v_knots.cast(),
        }
    }
}

/// Expand the rational derivatives of a surface from the homogeneous
/// derivatives: the two-directional quotient rule with binomial
/// coefficients.
fn rational_derivatives<T, D>(
    ders: &[Vec<OVector<T, D>>],
    order: usize,
) -> Vec<Vec<OVector<T, DimNameDiff<D, U1>>>>
where
    T: FloatingPoint,
    D: DimName + DimNameSub<U1>,
    DefaultAllocator: Allocator<D> + Allocator<DimNameDiff<D, U1>>,
{
    let a_ders: Vec<Vec<_>> = ders
        .iter()
        .map(|row| {
            row.iter()
                .map(|d| {
                    let mut spatial = vec![];
                    for i in 0..D::dim() - 1 {
                        spatial.push(d[i]);
                    }
                    OVector::<T, DimNameDiff<D, U1>>::from_vec(spatial)
                })
                .collect()
        })
        .collect();
    let w_ders: Vec<Vec<_>> = ders
        .iter()
        .map(|row| row.iter().map(|d| d[D::dim() - 1]).collect())
        .collect();

    let mut skl: Vec<Vec<OVector<T, DimNameDiff<D, U1>>>> = vec![];
    let mut binom = Binomial::<T>::new();

    for k in 0..=order {
        let mut row = vec![];

        for l in 0..=(order - k) {
            let mut v = a_ders[k][l].clone();
            for j in 1..=l {
                let coef = binom.get(l, j) * w_ders[0][j];
                v -= &row[l - j] * coef;
            }

            for i in 1..=k {
                let coef = binom.get(k, i) * w_ders[i][0];
                v -= &skl[k - i][l] * coef;
                let mut v2 = OVector::<T, DimNameDiff<D, U1>>::zeros();
                for j in 1..=l {
                    v2 += &skl[k - i][l - j] * binom.get(l, j) * w_ders[i][j];
                }
                v -= v2 * binom.get(k, i);
            }

            let v = v / w_ders[0][0];
            row.push(v);
        }

        skl.push(row);
    }

    skl
}

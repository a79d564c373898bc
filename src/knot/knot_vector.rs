use std::ops::Index;

use itertools::Itertools;
use nalgebra::convert;
use simba::scalar::SupersetOf;

use crate::error::{Error, Result};
use crate::knot::KnotMultiplicity;
use crate::misc::FloatingPoint;

/// Knot vector representation
/// An ordered, non-decreasing sequence of parameter values defining the
/// support of the B-spline basis functions.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnotVector<T>(Vec<T>);

impl<T: FloatingPoint> KnotVector<T> {
    pub fn new(knots: Vec<T>) -> Self {
        Self(knots)
    }

    /// Validate a caller-supplied knot vector for a curve with `n` control
    /// points of the given degree.
    /// A wrong length or a decreasing sequence is rejected outright rather
    /// than repaired; reordering knots would mask a caller error.
    pub fn try_validated(knots: Vec<T>, n: usize, degree: usize) -> Result<Self> {
        if knots.len() != n + degree + 1 {
            return Err(Error::configuration(format!(
                "invalid number of knots, got {}, expected {}",
                knots.len(),
                n + degree + 1
            )));
        }
        if knots.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::configuration("knot vector must be non-decreasing"));
        }
        Ok(Self(knots))
    }

    /// Create a clamped uniform knot vector for `n` control points and the
    /// given degree: the first and last knot each repeated `degree + 1`
    /// times, uniform interior knots.
    /// # Example
    /// ```
    /// use nurbex::prelude::KnotVector;
    /// let knots: KnotVector<f64> = KnotVector::clamped_uniform(4, 2);
    /// assert_eq!(knots.to_vec(), vec![0., 0., 0., 1., 2., 2., 2.]);
    /// ```
    pub fn clamped_uniform(n: usize, degree: usize) -> Self {
        let m = n + degree + 1;
        let knots = (0..m)
            .map(|i| {
                if i <= degree {
                    T::zero()
                } else if i >= n {
                    T::from_usize(n - degree).unwrap()
                } else {
                    T::from_usize(i - degree).unwrap()
                }
            })
            .collect();
        Self(knots)
    }

    /// Create a periodic (unclamped) uniform knot vector for `n` control
    /// points, used by closed curves whose control points wrap around.
    pub fn periodic_uniform(n: usize, degree: usize) -> Self {
        Self((0..n + degree + 1).map(|i| T::from_usize(i).unwrap()).collect())
    }

    /// Create a clamped knot vector whose interior knots have multiplicity
    /// equal to the degree, so the curve decomposes into independent Bezier
    /// segments meeting at control points (an "unblended" curve).
    /// Requires `(n - 1) % degree == 0`.
    /// # Example
    /// ```
    /// use nurbex::prelude::KnotVector;
    /// let knots: KnotVector<f64> = KnotVector::unblended(5, 2).unwrap();
    /// assert_eq!(knots.to_vec(), vec![0., 0., 0., 1., 1., 2., 2., 2.]);
    /// ```
    pub fn unblended(n: usize, degree: usize) -> Result<Self> {
        if degree == 0 || (n - 1) % degree != 0 {
            return Err(Error::configuration(format!(
                "{} control points cannot form whole segments of degree {}",
                n, degree
            )));
        }
        let nseg = (n - 1) / degree;
        let mut knots = Vec::with_capacity(n + degree + 1);
        for s in 0..=nseg {
            let mult = if s == 0 || s == nseg {
                degree + 1
            } else {
                degree
            };
            knots.extend(std::iter::repeat_n(T::from_usize(s).unwrap(), mult));
        }
        Ok(Self(knots))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.0.clone()
    }

    pub fn first(&self) -> T {
        self.0[0]
    }

    pub fn last(&self) -> T {
        self.0[self.0.len() - 1]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<T> {
        self.0.iter()
    }

    /// Get the domain of the knot vector by degree
    pub fn domain(&self, degree: usize) -> (T, T) {
        (self.0[degree], self.0[self.0.len() - 1 - degree])
    }

    /// The distinct knot intervals inside the domain, as (start, end) pairs.
    /// Repeated knots collapse to a single boundary; empty spans are dropped.
    pub fn domain_spans(&self, degree: usize) -> Vec<(T, T)> {
        let eps = T::default_epsilon();
        self.0[degree..self.0.len() - degree]
            .iter()
            .copied()
            .dedup_by(|a, b| (*a - *b).abs() <= eps)
            .tuple_windows()
            .collect()
    }

    /// Get the multiplicity of each knot
    /// # Example
    /// ```
    /// use nurbex::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// let mult = knots.multiplicity();
    /// assert_eq!(mult[0].multiplicity(), 3);
    /// assert_eq!(mult[1].multiplicity(), 1);
    /// assert_eq!(mult[2].multiplicity(), 1);
    /// assert_eq!(mult[3].multiplicity(), 3);
    /// ```
    pub fn multiplicity(&self) -> Vec<KnotMultiplicity<T>> {
        let mut mult = vec![];

        let mut current = KnotMultiplicity::new(self.0[0], 0);
        self.0.iter().for_each(|knot| {
            if (*knot - *current.knot()).abs() > T::default_epsilon() {
                mult.push(current.clone());
                current = KnotMultiplicity::new(*knot, 0);
            }
            current.increment_multiplicity();
        });
        mult.push(current);

        mult
    }

    /// Check if the knot vector is clamped
    /// `clamped` means the first and last knots have a multiplicity greater
    /// than the degree, so the curve interpolates its end control points.
    pub fn is_clamped(&self, degree: usize) -> bool {
        let multiplicity = self.multiplicity();
        match (multiplicity.first(), multiplicity.last()) {
            (Some(start), Some(end)) => {
                start.multiplicity() > degree && end.multiplicity() > degree
            }
            _ => false,
        }
    }

    /// Find the knot span index for a parameter inside the domain, or fail
    /// with a domain error. `n` is the highest control point index.
    /// The boundary case `u = knot[n + 1]` maps to the last valid span.
    pub fn try_find_span(&self, n: usize, degree: usize, u: T) -> Result<usize> {
        let (min, max) = (self.0[degree], self.0[n + 1]);
        let eps = T::default_epsilon();
        if u < min - eps || u > max + eps {
            return Err(Error::Domain {
                parameter: u.to_f64().unwrap_or(f64::NAN),
                min: min.to_f64().unwrap_or(f64::NAN),
                max: max.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok(self.find_span(n, degree, u))
    }

    /// Find the knot span index by binary search, such that
    /// `knot[span] <= u < knot[span + 1]`.
    /// # Example
    /// ```
    /// use nurbex::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 3., 3.]);
    /// assert_eq!(knots.find_span(4, 2, 2.5), 4);
    /// ```
    pub fn find_span(&self, n: usize, degree: usize, u: T) -> usize {
        if u > self[n + 1] - T::default_epsilon() {
            return n;
        }

        if u < self[degree] + T::default_epsilon() {
            return degree;
        }

        let mut low = degree;
        let mut high = n + 1;
        let mut mid = (low + high) / 2;
        while u < self[mid] || self[mid + 1] <= u {
            if u < self[mid] {
                high = mid;
            } else {
                low = mid;
            }
            let next = (low + high) / 2;
            if mid == next {
                break;
            }
            mid = next;
        }

        mid
    }

    /// Compute the non-vanishing basis functions at `u` in the given span
    /// with the triangular Cox-de Boor recurrence.
    /// Only the `degree + 1` nonzero values are produced; for a valid span
    /// they sum to one. Divisions by a repeated-knot interval never occur:
    /// the recurrence only divides by `right[r + 1] + left[j - r]`, which is
    /// nonzero for a parameter inside the span.
    pub fn basis_functions(&self, span: usize, u: T, degree: usize) -> Vec<T> {
        let mut basis = vec![T::zero(); degree + 1];
        let mut left = vec![T::zero(); degree + 1];
        let mut right = vec![T::zero(); degree + 1];

        basis[0] = T::one();

        for j in 1..=degree {
            left[j] = u - self[span + 1 - j];
            right[j] = self[span + j] - u;
            let mut saved = T::zero();

            for r in 0..j {
                let temp = basis[r] / (right[r + 1] + left[j - r]);
                basis[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }

            basis[j] = saved;
        }

        basis
    }

    /// Compute the non-vanishing basis functions and their derivatives up to
    /// `order`. Returns a table of size `(order + 1, degree + 1)`: row zero
    /// holds the basis function values, row k the k-th derivatives.
    pub fn derivative_basis_functions(
        &self,
        span: usize,
        u: T,
        degree: usize,
        order: usize,
    ) -> Vec<Vec<T>> {
        let mut ndu = vec![vec![T::zero(); degree + 1]; degree + 1];
        let mut left = vec![T::zero(); degree + 1];
        let mut right = vec![T::zero(); degree + 1];

        ndu[0][0] = T::one();

        for j in 1..=degree {
            left[j] = u - self[span + 1 - j];
            right[j] = self[span + j] - u;

            let mut saved = T::zero();
            for r in 0..j {
                // lower triangle stores the knot differences
                ndu[j][r] = right[r + 1] + left[j - r];
                let temp = ndu[r][j - 1] / ndu[j][r];

                // upper triangle stores the basis values
                ndu[r][j] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            ndu[j][j] = saved;
        }

        let mut ders = vec![vec![T::zero(); degree + 1]; order + 1];
        let mut a = vec![vec![T::zero(); degree + 1]; 2];

        for j in 0..=degree {
            ders[0][j] = ndu[j][degree];
        }

        let idegree = degree as isize;
        let order = order as isize;

        for r in 0..=idegree {
            // a holds the two most recent rows of alpha coefficients
            let mut s1 = 0;
            let mut s2 = 1;
            a[0][0] = T::one();

            for k in 1..=order {
                let mut d = T::zero();
                let rk = r - k;
                let pk = idegree - k;

                if r >= k {
                    a[s2][0] = a[s1][0] / ndu[(pk + 1) as usize][rk as usize];
                    d = a[s2][0] * ndu[rk as usize][pk as usize];
                }

                let j1 = if rk >= -1 { 1 } else { -rk };
                let j2 = if r - 1 <= pk { k - 1 } else { idegree - r };

                for j in j1..=j2 {
                    a[s2][j as usize] = (a[s1][j as usize] - a[s1][j as usize - 1])
                        / ndu[(pk + 1) as usize][(rk + j) as usize];
                    d += a[s2][j as usize] * ndu[(rk + j) as usize][pk as usize];
                }

                let uk = k as usize;
                let ur = r as usize;
                if r <= pk {
                    a[s2][uk] = -a[s1][(k - 1) as usize] / ndu[(pk + 1) as usize][ur];
                    d += a[s2][uk] * ndu[ur][pk as usize];
                }

                ders[uk][ur] = d;

                std::mem::swap(&mut s1, &mut s2);
            }
        }

        // multiply through by the factorial factors degree! / (degree - k)!
        let mut acc = idegree;
        for k in 1..=order {
            for j in 0..=idegree {
                ders[k as usize][j as usize] *= T::from_isize(acc).unwrap();
            }
            acc *= idegree - k;
        }
        ders
    }

    /// Returns the knot vector of the reversed curve: the same spans walked
    /// from the other end, offset to keep the original first knot.
    /// # Example
    /// ```
    /// use nurbex::prelude::KnotVector;
    /// let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 2.5, 3.5, 4.0, 4.0]);
    /// let rev = knots.reversed();
    /// assert_eq!(rev.to_vec(), vec![0.0, 0.0, 0.5, 1.5, 2.0, 3.0, 4.0, 4.0, 4.0]);
    /// ```
    pub fn reversed(&self) -> Self {
        let min = self.0[0];

        let mut next = vec![min];
        let len = self.len();
        for i in 1..len {
            next.push(next[i - 1] + (self[len - i] - self[len - i - 1]));
        }

        Self(next)
    }

    /// Cast the knot vector to another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> KnotVector<F> {
        KnotVector(self.0.iter().map(|v| convert(*v)).collect())
    }
}

impl<T> Index<usize> for KnotVector<T> {
    type Output = T;
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> FromIterator<T> for KnotVector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

use itertools::Itertools;
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint};

use crate::error::{Error, Result};
use crate::misc::{segment_closest_point, FloatingPoint};

/// An ordered sequence of Cartesian sample points approximating a curve.
/// A derived, disposable artifact: it does not own or reference the curve it
/// was sampled from.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "OPoint<T, D>: serde::Serialize",
        deserialize = "OPoint<T, D>: serde::Deserialize<'de>"
    ))
)]
pub struct PolyLine<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    points: Vec<OPoint<T, D>>,
}

impl<T: FloatingPoint, D: DimName> PolyLine<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    pub fn new(points: Vec<OPoint<T, D>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[OPoint<T, D>] {
        &self.points
    }

    pub fn npoints(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Length of each segment, in order.
    pub fn segment_lengths(&self) -> Vec<T> {
        self.points
            .iter()
            .tuple_windows()
            .map(|(a, b)| (b - a).norm())
            .collect()
    }

    /// Total length of the polyline.
    pub fn length(&self) -> T {
        self.segment_lengths()
            .iter()
            .fold(T::zero(), |acc, l| acc + *l)
    }

    /// Length of the longest segment, zero for a degenerate polyline.
    pub fn max_segment_length(&self) -> T {
        self.segment_lengths()
            .iter()
            .fold(T::zero(), |acc, l| acc.max(*l))
    }

    /// Remove intermediate points while keeping the deviation from the
    /// original polyline within `tolerance` and, when given, no chord longer
    /// than `max_segment_length`.
    ///
    /// The walk is greedy and monotonic: starting from the last kept point,
    /// the candidate chord is extended over successive points as long as
    /// every bypassed point stays within tolerance of the chord; the last
    /// valid chord before the first violation is kept and the walk restarts
    /// there. Endpoints are always retained, so the result is not guaranteed
    /// minimal, but it is deterministic.
    pub fn coarsen(&self, tolerance: T, max_segment_length: Option<T>) -> Result<Self> {
        if tolerance <= T::zero() {
            return Err(Error::configuration(
                "the coarsening tolerance must be greater than zero",
            ));
        }
        if let Some(maxlen) = max_segment_length {
            if maxlen <= T::zero() {
                return Err(Error::configuration(
                    "the maximum segment length must be greater than zero",
                ));
            }
        }

        let n = self.points.len();
        if n <= 2 {
            return Ok(self.clone());
        }

        let mut kept = vec![self.points[0].clone()];
        let mut i = 0;
        while i < n - 1 {
            let mut best = i + 1;
            for j in (i + 2)..n {
                if !self.chord_is_acceptable(i, j, tolerance, max_segment_length) {
                    break;
                }
                best = j;
            }
            kept.push(self.points[best].clone());
            i = best;
        }

        #[cfg(feature = "log")]
        log::debug!("coarsened from {} to {} points", n, kept.len());

        Ok(Self { points: kept })
    }

    /// Whether the chord from point `i` to point `j` may replace the run of
    /// points between them.
    fn chord_is_acceptable(
        &self,
        i: usize,
        j: usize,
        tolerance: T,
        max_segment_length: Option<T>,
    ) -> bool {
        let start = &self.points[i];
        let end = &self.points[j];

        if let Some(maxlen) = max_segment_length {
            if (end - start).norm() > maxlen {
                return false;
            }
        }

        self.points[i + 1..j].iter().all(|p| {
            let (_, closest) = segment_closest_point(p, start, end, T::zero(), T::one());
            (p - closest).norm() <= tolerance
        })
    }

    /// Split every segment longer than `max_segment_length` into equal
    /// parts, so no segment of the result exceeds it. Inserted points lie on
    /// the original segments, leaving the traced shape unchanged.
    pub fn refine(&self, max_segment_length: T) -> Result<Self> {
        if max_segment_length <= T::zero() {
            return Err(Error::configuration(
                "the maximum segment length must be greater than zero",
            ));
        }
        if self.points.len() < 2 {
            return Ok(self.clone());
        }

        let mut points = vec![];
        for (a, b) in self.points.iter().tuple_windows() {
            points.push(a.clone());
            let length = (b - a).norm();
            if length > max_segment_length {
                let parts = (length / max_segment_length)
                    .ceil()
                    .to_usize()
                    .unwrap_or(1);
                let step = T::one() / T::from_usize(parts).unwrap();
                for k in 1..parts {
                    let t = step * T::from_usize(k).unwrap();
                    points.push(OPoint {
                        coords: a.coords.lerp(&b.coords, t),
                    });
                }
            }
        }
        points.push(self.points[self.points.len() - 1].clone());

        Ok(Self { points })
    }
}

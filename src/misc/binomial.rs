use std::collections::HashMap;

use nalgebra::RealField;

/// A memoized binomial coefficient table.
/// The rational derivative expansion evaluates the same small coefficients
/// over and over, so computed values are cached per (n, k) pair.
pub struct Binomial<T> {
    memo: HashMap<(usize, usize), T>,
}

impl<T: RealField + Copy> Binomial<T> {
    pub fn new() -> Self {
        Self {
            memo: HashMap::new(),
        }
    }

    /// Returns the binomial coefficient of `n` and `k`.
    pub fn get(&mut self, n: usize, k: usize) -> T {
        if k == 0 || k == n {
            return T::one();
        } else if n == 0 || k > n {
            return T::zero();
        }

        let k = k.min(n - k);

        if let Some(&memoized) = self.memo.get(&(n, k)) {
            return memoized;
        }

        let r = self.get(n - 1, k) + self.get(n - 1, k - 1);
        self.memo.insert((n, k), r);
        r
    }
}

impl<T: RealField + Copy> Default for Binomial<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Binomial;

    #[test]
    fn pascal_row() {
        let mut binomial = Binomial::<f64>::new();
        assert_eq!(binomial.get(5, 0), 1.);
        assert_eq!(binomial.get(5, 1), 5.);
        assert_eq!(binomial.get(5, 2), 10.);
        assert_eq!(binomial.get(5, 3), 10.);
        assert_eq!(binomial.get(5, 4), 5.);
        assert_eq!(binomial.get(5, 5), 1.);
        assert_eq!(binomial.get(5, 6), 0.);
    }

    #[test]
    fn recurrence() {
        let mut binomial = Binomial::<f64>::new();
        for n in 2..10 {
            for k in 1..=n {
                assert_eq!(
                    binomial.get(n, k),
                    binomial.get(n - 1, k) + binomial.get(n - 1, k - 1)
                );
            }
        }
    }
}

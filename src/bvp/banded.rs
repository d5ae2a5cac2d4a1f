//! Banded linear systems.
//!
//! Collocation Jacobians only couple neighbouring mesh nodes, so the global
//! system is banded. This is Gaussian elimination with partial pivoting in the
//! band, storing the extra `kl` super-diagonals the row swaps can fill in.

/// Row-wise band storage of a square matrix with `kl` sub-diagonals and `ku`
/// super-diagonals.
#[derive(Debug, Clone)]
pub(super) struct BandedMatrix {
    size: usize,
    kl: usize,
    ku: usize,
    width: usize,
    data: Vec<f64>,
}

/// The matrix had an exactly zero pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Singular;

impl BandedMatrix {
    pub(super) fn zeros(size: usize, kl: usize, ku: usize) -> Self {
        let width = 2 * kl + ku + 1;
        Self {
            size,
            kl,
            ku,
            width,
            data: vec![0.; size * width],
        }
    }

    /// Position of `(row, col)` in `data`. Row `r` holds the columns
    /// `r - kl ..= r + kl + ku`.
    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        debug_assert!(col + self.kl >= row && col <= row + self.kl + self.ku);
        row * self.width + (col + self.kl - row)
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.offset(row, col)]
    }

    #[inline]
    fn get_mut(&mut self, row: usize, col: usize) -> &mut f64 {
        let offset = self.offset(row, col);
        &mut self.data[offset]
    }

    /// Accumulate `value` into entry `(row, col)`, which must be inside the
    /// declared band.
    pub(super) fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(col <= row + self.ku, "entry outside the upper band");
        *self.get_mut(row, col) += value;
    }

    /// Solve `A x = rhs` in place, consuming the factorization.
    pub(super) fn solve(mut self, rhs: &mut [f64]) -> Result<(), Singular> {
        let n = self.size;
        assert_eq!(rhs.len(), n);

        for k in 0..n {
            let last_row = (k + self.kl).min(n - 1);
            let last_col = (k + self.kl + self.ku).min(n - 1);

            let pivot_row = (k..=last_row)
                .max_by(|&a, &b| self.get(a, k).abs().total_cmp(&self.get(b, k).abs()))
                .unwrap_or(k);
            let pivot = self.get(pivot_row, k);
            if pivot == 0. || !pivot.is_finite() {
                return Err(Singular);
            }

            if pivot_row != k {
                for col in k..=last_col {
                    let a = self.offset(k, col);
                    let b = self.offset(pivot_row, col);
                    self.data.swap(a, b);
                }
                rhs.swap(k, pivot_row);
            }

            for row in k + 1..=last_row {
                let factor = self.get(row, k) / pivot;
                if factor == 0. {
                    continue;
                }
                for col in k..=last_col {
                    let value = self.get(k, col);
                    *self.get_mut(row, col) -= factor * value;
                }
                rhs[row] -= factor * rhs[k];
            }
        }

        for k in (0..n).rev() {
            let last_col = (k + self.kl + self.ku).min(n - 1);
            let sum: f64 = (k + 1..=last_col).map(|col| self.get(k, col) * rhs[col]).sum();
            rhs[k] = (rhs[k] - sum) / self.get(k, k);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn tridiagonal() {
        // -x_{i-1} + 2 x_i - x_{i+1} = 1 with x_{-1} = x_n = 0
        let n = 9;
        let mut matrix = BandedMatrix::zeros(n, 1, 1);
        for i in 0..n {
            matrix.add(i, i, 2.);
            if i > 0 {
                matrix.add(i, i - 1, -1.);
            }
            if i + 1 < n {
                matrix.add(i, i + 1, -1.);
            }
        }
        let mut rhs = vec![1.; n];
        matrix.solve(&mut rhs).unwrap();

        // Exact solution is the discrete parabola i (n + 1 - i) / 2 (1-based)
        for (i, x) in rhs.iter().enumerate() {
            let j = (i + 1) as f64;
            assert_abs_diff_eq!(*x, j * (n as f64 + 1. - j) / 2., epsilon = 1e-12);
        }
    }

    #[test]
    fn needs_pivoting() {
        // Zero on the leading diagonal forces a row swap
        let mut matrix = BandedMatrix::zeros(3, 1, 1);
        matrix.add(0, 1, 1.);
        matrix.add(1, 0, 1.);
        matrix.add(1, 1, 1.);
        matrix.add(1, 2, 1.);
        matrix.add(2, 1, 2.);
        matrix.add(2, 2, 1.);
        let mut rhs = vec![2., 6., 7.];
        matrix.solve(&mut rhs).unwrap();
        assert_abs_diff_eq!(rhs[0], 1., epsilon = 1e-12);
        assert_abs_diff_eq!(rhs[1], 2., epsilon = 1e-12);
        assert_abs_diff_eq!(rhs[2], 3., epsilon = 1e-12);
    }

    #[test]
    fn singular() {
        let mut matrix = BandedMatrix::zeros(2, 1, 1);
        matrix.add(0, 0, 1.);
        matrix.add(0, 1, 1.);
        matrix.add(1, 0, 1.);
        matrix.add(1, 1, 1.);
        let mut rhs = vec![1., 1.];
        assert_eq!(matrix.solve(&mut rhs), Err(Singular));
    }
}

//! Linear system assembly and solving.

use num_complex::Complex64;

use super::PIVOT_TOLERANCE;
use crate::error::{NodalError, Result};

/// Linear system Ax = b over named unknowns.
///
/// `A` may be rectangular: one row per equation, one column per unknown.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    /// Coefficient matrix A (row-major)
    pub a: Vec<Complex64>,
    /// Right-hand side b
    pub b: Vec<Complex64>,
    pub rows: usize,
    pub cols: usize,
    /// Unknown names, one per column (for error messages)
    pub unknowns: Vec<String>,
}

impl LinearSystem {
    /// Create an all-zero system.
    pub fn new(rows: usize, unknowns: Vec<String>) -> Self {
        let cols = unknowns.len();
        Self {
            a: vec![Complex64::new(0.0, 0.0); rows * cols],
            b: vec![Complex64::new(0.0, 0.0); rows],
            rows,
            cols,
            unknowns,
        }
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.a[row * self.cols + col]
    }

    /// Set matrix element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: Complex64) {
        self.a[row * self.cols + col] = value;
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: Complex64) {
        self.a[row * self.cols + col] += value;
    }
}

/// Something that can solve a [`LinearSystem`].
pub trait LinearBackend {
    /// Solve for the unknowns, in column order.
    ///
    /// Fails with [`NodalError::NoSolution`] for inconsistent systems and
    /// [`NodalError::UnderDetermined`] when some unknown is left free.
    fn solve(&self, system: &LinearSystem) -> Result<Vec<Complex64>>;
}

/// Gauss-Jordan elimination with partial pivoting on the augmented matrix.
#[derive(Debug, Clone, Copy)]
pub struct GaussianElimination {
    /// Pivots smaller than this (relative to the largest entry) count as zero
    pub pivot_tolerance: f64,
}

impl Default for GaussianElimination {
    fn default() -> Self {
        Self {
            pivot_tolerance: PIVOT_TOLERANCE,
        }
    }
}

impl LinearBackend for GaussianElimination {
    fn solve(&self, system: &LinearSystem) -> Result<Vec<Complex64>> {
        let (rows, cols) = (system.rows, system.cols);
        let width = cols + 1;

        // Augmented matrix [A | b]
        let mut m = vec![Complex64::new(0.0, 0.0); rows * width];
        for i in 0..rows {
            for j in 0..cols {
                m[i * width + j] = system.get(i, j);
            }
            m[i * width + cols] = system.b[i];
        }

        let scale = m.iter().map(|v| v.norm()).fold(0.0_f64, f64::max).max(1.0);
        let tiny = self.pivot_tolerance * scale;

        let mut pivot_cols = Vec::new();
        let mut free = Vec::new();
        let mut r = 0;

        for k in 0..cols {
            if r == rows {
                free.push(k);
                continue;
            }

            // Find pivot
            let mut max_val = m[r * width + k].norm();
            let mut max_row = r;
            for i in (r + 1)..rows {
                let val = m[i * width + k].norm();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val < tiny {
                free.push(k);
                continue;
            }

            // Swap rows if needed
            if max_row != r {
                for j in 0..width {
                    m.swap(r * width + j, max_row * width + j);
                }
            }

            let pivot = m[r * width + k];
            for j in k..width {
                m[r * width + j] /= pivot;
            }

            for i in 0..rows {
                if i == r {
                    continue;
                }
                let factor = m[i * width + k];
                if factor.norm() == 0.0 {
                    continue;
                }
                for j in k..width {
                    let delta = factor * m[r * width + j];
                    m[i * width + j] -= delta;
                }
            }

            pivot_cols.push(k);
            r += 1;
        }

        // Rows below the rank must read 0 = 0.
        if (r..rows).any(|i| m[i * width + cols].norm() > tiny) {
            return Err(NodalError::NoSolution);
        }

        if !free.is_empty() {
            return Err(NodalError::UnderDetermined {
                unknowns: free
                    .iter()
                    .map(|&k| system.unknowns[k].clone())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let mut x = vec![Complex64::new(0.0, 0.0); cols];
        for (i, &k) in pivot_cols.iter().enumerate() {
            x[k] = m[i * width + cols];
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn system(rows: &[&[f64]], b: &[f64]) -> LinearSystem {
        let cols = rows[0].len();
        let mut s = LinearSystem::new(rows.len(), (0..cols).map(|i| format!("x{}", i)).collect());
        for (i, row) in rows.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                s.set(i, j, c(*v));
            }
            s.b[i] = c(b[i]);
        }
        s
    }

    #[test]
    fn test_simple_system() {
        // 2x + y = 5, x + 3y = 10
        let s = system(&[&[2.0, 1.0], &[1.0, 3.0]], &[5.0, 10.0]);
        let x = GaussianElimination::default().solve(&s).unwrap();
        assert_abs_diff_eq!(x[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1].re, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pivoting_needed() {
        let s = system(&[&[0.0, 1.0], &[1.0, 0.0]], &[2.0, 3.0]);
        let x = GaussianElimination::default().solve(&s).unwrap();
        assert_abs_diff_eq!(x[0].re, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1].re, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_redundant_rows_are_fine() {
        let s = system(&[&[1.0, 1.0], &[2.0, 2.0], &[1.0, -1.0]], &[2.0, 4.0, 0.0]);
        let x = GaussianElimination::default().solve(&s).unwrap();
        assert_abs_diff_eq!(x[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inconsistent_system() {
        let s = system(&[&[1.0, 1.0], &[1.0, 1.0]], &[1.0, 2.0]);
        assert!(matches!(GaussianElimination::default().solve(&s), Err(NodalError::NoSolution)));
    }

    #[test]
    fn test_under_determined_names_free_unknowns() {
        let s = system(&[&[1.0, 1.0]], &[1.0]);
        match GaussianElimination::default().solve(&s) {
            Err(NodalError::UnderDetermined { unknowns }) => assert_eq!(unknowns, "x1"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_complex_system() {
        // (1+1j) x = 2j  =>  x = 1+1j
        let mut s = LinearSystem::new(1, vec!["x".into()]);
        s.set(0, 0, Complex64::new(1.0, 1.0));
        s.b[0] = Complex64::new(0.0, 2.0);
        let x = GaussianElimination::default().solve(&s).unwrap();
        assert_abs_diff_eq!(x[0].re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[0].im, 1.0, epsilon = 1e-12);
    }
}

use sprs::CsMat;

use super::preconditioner::Preconditioner;

/// Statistics from solver execution
#[derive(Debug, Clone)]
pub struct SolverStats {
    /// Number of iterations performed
    pub iterations: usize,

    /// Final relative residual ||r|| / ||b||
    pub relative_residual: f64,

    /// Whether the tolerance was reached
    pub converged: bool,

    /// Relative residual after every iteration
    pub history: Vec<f64>,

    /// Solve time in seconds
    pub solve_time: f64,
}

impl SolverStats {
    pub fn new() -> Self {
        Self {
            iterations: 0,
            relative_residual: 0.0,
            converged: false,
            history: Vec::new(),
            solve_time: 0.0,
        }
    }
}

impl Default for SolverStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for a linear operator A that can be applied to a vector x to get Ax
pub trait LinearOperator {
    /// Apply the operator to vector v: out = A * v
    fn apply(&self, v: &[f64]) -> Vec<f64>;

    /// Apply the operator to vector v and add to out: out += A * v
    fn apply_add(&self, v: &[f64], out: &mut [f64]) {
        let result = self.apply(v);
        for (o, val) in out.iter_mut().zip(result) {
            *o += val;
        }
    }

    /// Number of rows (output dimension)
    fn rows(&self) -> usize;

    /// Number of columns (input dimension)
    fn cols(&self) -> usize;
}

impl LinearOperator for CsMat<f64> {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        let mut result = vec![0.0; self.rows()];
        self.apply_add(v, &mut result);
        result
    }

    fn apply_add(&self, v: &[f64], out: &mut [f64]) {
        for (row_idx, row) in self.outer_iterator().enumerate() {
            let mut sum = 0.0;
            for (col_idx, &val) in row.iter() {
                sum += val * v[col_idx];
            }
            out[row_idx] += sum;
        }
    }

    fn rows(&self) -> usize {
        self.rows()
    }

    fn cols(&self) -> usize {
        self.cols()
    }
}

/// Iterative solver working in place on an initial guess
///
/// `x` holds the initial guess on entry and the solution on exit. Reaching the
/// iteration cap is reported through [`SolverStats::converged`], never as an
/// error.
pub trait Solver {
    fn solve_in_place<O, P>(&self, a: &O, b: &[f64], x: &mut [f64], precond: &P) -> SolverStats
    where
        O: LinearOperator,
        P: Preconditioner;

    /// Get solver name
    fn name(&self) -> &str;

    /// Get relative tolerance
    fn tolerance(&self) -> f64;

    /// Set relative tolerance
    fn set_tolerance(&mut self, tolerance: f64);
}

/// Helper functions for solver validation
pub struct SolverUtils;

impl SolverUtils {
    /// Compute residual r = b - Ax
    pub fn compute_residual<O: LinearOperator>(a: &O, x: &[f64], b: &[f64]) -> Vec<f64> {
        let ax = a.apply(x);
        b.iter().zip(ax.iter()).map(|(&bi, &axi)| bi - axi).collect()
    }

    /// Compute L2 norm of a vector
    pub fn norm(v: &[f64]) -> f64 {
        Self::dot(v, v).sqrt()
    }

    pub fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
    }

    /// Compute relative residual ||b - Ax|| / ||b||
    pub fn relative_residual<O: LinearOperator>(a: &O, x: &[f64], b: &[f64]) -> f64 {
        let r_norm = Self::norm(&Self::compute_residual(a, x, b));
        let b_norm = Self::norm(b);

        if b_norm < 1e-14 {
            r_norm
        } else {
            r_norm / b_norm
        }
    }
}

use std::time::Instant;

use super::preconditioner::Preconditioner;
use super::solver::{LinearOperator, Solver, SolverStats, SolverUtils};

/// Breakdown threshold relative to the magnitudes of the vectors involved
const BREAKDOWN_EPS: f64 = f64::EPSILON;

/// `dot` is numerically zero compared with `|a|·|b|`
fn vanishes(dot: f64, a: &[f64], b: &[f64]) -> bool {
    !dot.is_finite() || dot.abs() <= BREAKDOWN_EPS * SolverUtils::norm(a) * SolverUtils::norm(b)
}

/// Preconditioned Conjugate Gradient for symmetric positive (semi-)definite systems
///
/// The iterate is smoothed with a minimal-residual step after every CG
/// update (Zhou & Walker), so the reported residual history never increases.
/// The returned solution is the smoothed iterate.
pub struct ConjugateGradient {
    max_iterations: usize,
    tolerance: f64,
    name: String,
}

impl ConjugateGradient {
    pub fn new() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-4,
            name: "ConjugateGradient".to_string(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Solver for ConjugateGradient {
    fn solve_in_place<O, P>(&self, a: &O, b: &[f64], x: &mut [f64], precond: &P) -> SolverStats
    where
        O: LinearOperator,
        P: Preconditioner,
    {
        let n = b.len();
        let start = Instant::now();
        let b_norm = SolverUtils::norm(b);

        if b_norm == 0.0 {
            x.iter_mut().for_each(|v| *v = 0.0);
            return SolverStats {
                converged: true,
                solve_time: start.elapsed().as_secs_f64(),
                ..SolverStats::new()
            };
        }

        let mut r = SolverUtils::compute_residual(a, x, b);
        let mut z = precond.apply(&r);
        let mut p = z.clone();
        let mut rz = SolverUtils::dot(&r, &z);

        // smoothed iterate y and its residual s = b - A y
        let mut y = x.to_vec();
        let mut s = r.clone();
        let mut d = vec![0.0; n];

        let mut history = Vec::new();
        let mut converged = false;

        while history.len() < self.max_iterations {
            let ap = a.apply(&p);
            let p_ap = SolverUtils::dot(&p, &ap);
            if vanishes(p_ap, &p, &ap) {
                break;
            }
            let alpha = rz / p_ap;

            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
                d[i] = r[i] - s[i];
            }

            let dd = SolverUtils::dot(&d, &d);
            if dd > 0.0 {
                let eta = -SolverUtils::dot(&s, &d) / dd;
                for i in 0..n {
                    s[i] += eta * d[i];
                    y[i] += eta * (x[i] - y[i]);
                }
            }

            let rel = SolverUtils::norm(&s) / b_norm;
            history.push(rel);
            if rel < self.tolerance {
                converged = true;
                break;
            }

            z = precond.apply(&r);
            let rz_new = SolverUtils::dot(&r, &z);
            let beta = rz_new / rz;
            rz = rz_new;

            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }

        x.copy_from_slice(&y);

        SolverStats {
            iterations: history.len(),
            relative_residual: history.last().copied().unwrap_or(SolverUtils::norm(&s) / b_norm),
            converged,
            history,
            solve_time: start.elapsed().as_secs_f64(),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }
}

/// BiCGSTAB (Biconjugate Gradient Stabilized) solver for non-symmetric systems
pub struct BiCGSTAB {
    max_iterations: usize,
    tolerance: f64,
    name: String,
}

impl BiCGSTAB {
    pub fn new() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-4,
            name: "BiCGSTAB".to_string(),
        }
    }

    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }
}

impl Solver for BiCGSTAB {
    fn solve_in_place<O, P>(&self, a: &O, b: &[f64], x: &mut [f64], precond: &P) -> SolverStats
    where
        O: LinearOperator,
        P: Preconditioner,
    {
        let n = b.len();
        let start = Instant::now();
        let b_norm = SolverUtils::norm(b);

        if b_norm == 0.0 {
            x.iter_mut().for_each(|v| *v = 0.0);
            return SolverStats {
                converged: true,
                solve_time: start.elapsed().as_secs_f64(),
                ..SolverStats::new()
            };
        }

        let mut r = SolverUtils::compute_residual(a, x, b);
        let r_hat = r.clone();

        let mut rho = 1.0;
        let mut alpha = 1.0;
        let mut omega = 1.0;
        let mut v = vec![0.0; n];
        let mut p = vec![0.0; n];
        let mut s = vec![0.0; n];

        let mut history = Vec::new();
        let mut converged = false;

        while history.len() < self.max_iterations {
            let rho_prev = rho;
            rho = SolverUtils::dot(&r_hat, &r);
            if vanishes(rho, &r_hat, &r) {
                break;
            }

            if history.is_empty() {
                p.copy_from_slice(&r);
            } else {
                let beta = (rho / rho_prev) * (alpha / omega);
                for i in 0..n {
                    p[i] = r[i] + beta * (p[i] - omega * v[i]);
                }
            }

            let p_hat = precond.apply(&p);
            v = a.apply(&p_hat);

            let rhat_v = SolverUtils::dot(&r_hat, &v);
            if vanishes(rhat_v, &r_hat, &v) {
                break;
            }
            alpha = rho / rhat_v;

            for i in 0..n {
                s[i] = r[i] - alpha * v[i];
            }

            let s_rel = SolverUtils::norm(&s) / b_norm;
            if s_rel < self.tolerance {
                for i in 0..n {
                    x[i] += alpha * p_hat[i];
                }
                history.push(s_rel);
                converged = true;
                break;
            }

            let s_hat = precond.apply(&s);
            let t = a.apply(&s_hat);

            let t_t = SolverUtils::dot(&t, &t);
            if t_t == 0.0 || !t_t.is_finite() {
                break;
            }
            omega = SolverUtils::dot(&t, &s) / t_t;

            for i in 0..n {
                x[i] += alpha * p_hat[i] + omega * s_hat[i];
                r[i] = s[i] - omega * t[i];
            }

            let rel = SolverUtils::norm(&r) / b_norm;
            history.push(rel);
            if rel < self.tolerance {
                converged = true;
                break;
            }
            if omega == 0.0 {
                break;
            }
        }

        SolverStats {
            iterations: history.len(),
            relative_residual: history.last().copied().unwrap_or(1.0),
            converged,
            history,
            solve_time: start.elapsed().as_secs_f64(),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }
}

impl Default for BiCGSTAB {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self::new()
    }
}

fn report<S: Solver>(solver: &S, stats: &SolverStats) {
    if stats.converged {
        log::debug!(
            "{} converged in {} iterations (relative residual {:.3e})",
            solver.name(),
            stats.iterations,
            stats.relative_residual
        );
    } else {
        log::warn!(
            "{} stopped after {} iterations without reaching tolerance {:.1e} (relative residual {:.3e})",
            solver.name(),
            stats.iterations,
            solver.tolerance(),
            stats.relative_residual
        );
    }
}

/// Preconditioned CG on a symmetric system, solution left in `x`
///
/// Returns the relative residual after each iteration. `x` is used as the
/// initial guess.
pub fn solve_pcg<O, P>(
    rhs: &[f64],
    x: &mut [f64],
    tolerance: f64,
    max_iterations: usize,
    matrix: &O,
    precond: &P,
) -> Vec<f64>
where
    O: LinearOperator,
    P: Preconditioner,
{
    let solver = ConjugateGradient::new()
        .with_tolerance(tolerance)
        .with_max_iterations(max_iterations);
    let stats = solver.solve_in_place(matrix, rhs, x, precond);
    report(&solver, &stats);
    stats.history
}

/// Preconditioned BiCGSTAB on a non-symmetric system, solution left in `x`
pub fn solve_bicgstab<O, P>(
    rhs: &[f64],
    x: &mut [f64],
    tolerance: f64,
    max_iterations: usize,
    matrix: &O,
    precond: &P,
) -> Vec<f64>
where
    O: LinearOperator,
    P: Preconditioner,
{
    let solver = BiCGSTAB::new()
        .with_tolerance(tolerance)
        .with_max_iterations(max_iterations);
    let stats = solver.solve_in_place(matrix, rhs, x, precond);
    report(&solver, &stats);
    stats.history
}

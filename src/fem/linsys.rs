//! Reusable per-step linear system of a FEM model.
//!
//! Setup happens once per topology ([`LinearSystem::set_pattern`]); every
//! step then runs
//!
//! ```text
//! set_zero -> kernel.accumulate -> set_bc_ms -> set_precond -> solve_iteration
//! ```
//!
//! and the model integrates `x` into its state. The driver knows nothing about
//! the physics it serves.

use crate::error::{Error, Result};
use crate::fem::kernel::AssemblyKernel;
use crate::linalg::{master_slave, solve_bicgstab, solve_pcg, BlockSparseMatrix, ILUPreconditioner};
use crate::mesh::{JaggedArray, Mesh};

/// Matrix, right-hand side, solution and boundary flags over `(np, ndimval)` DOFs
pub struct LinearSystem {
    np: usize,
    ndimval: usize,
    /// Right-hand side, `(np, ndimval)` row-major
    pub f: Vec<f64>,
    /// Solution increment of the last solve
    pub x: Vec<f64>,
    /// Dirichlet flags, nonzero marks a fixed DOF
    pub bc: Vec<i32>,
    ms: Option<Vec<usize>>,
    matrix: BlockSparseMatrix,
    precond: Option<ILUPreconditioner>,
    /// Iteration cap of the Krylov solver
    pub max_iterations: usize,
    /// Relative residual at which the solver stops
    pub conv_ratio: f64,
    conv_hist: Vec<f64>,
}

impl LinearSystem {
    pub fn new(np: usize, ndimval: usize) -> Self {
        Self::with_storage(np, ndimval, true)
    }

    /// `symmetric` selects whether fixed DOFs also clear their matrix columns
    pub fn with_storage(np: usize, ndimval: usize, symmetric: bool) -> Self {
        let n = np * ndimval;
        Self {
            np,
            ndimval,
            f: vec![0.0; n],
            x: vec![0.0; n],
            bc: vec![0; n],
            ms: None,
            matrix: BlockSparseMatrix::initialize(np, ndimval, symmetric),
            precond: None,
            max_iterations: 1000,
            conv_ratio: 1e-4,
            conv_hist: Vec::new(),
        }
    }

    /// Build the sparsity pattern from a node adjacency
    ///
    /// With a master-slave array the pattern is extended so that slave rows
    /// and columns can be folded into their masters.
    pub fn set_pattern(&mut self, adjacency: &JaggedArray, ms: Option<&[usize]>) -> Result<()> {
        let pattern = match ms {
            Some(ms) => master_slave::extend_pattern(adjacency, ms, self.ndimval)?,
            None => adjacency.clone(),
        };
        self.matrix.set_pattern(&pattern)?;
        self.precond = Some(ILUPreconditioner::from_pattern(self.matrix.as_csmat())?);
        self.ms = ms.map(<[usize]>::to_vec);
        log::debug!(
            "linear system pattern: {} nodes x {} DOFs, {} non-zeros",
            self.np,
            self.ndimval,
            self.matrix.as_csmat().nnz()
        );
        Ok(())
    }

    pub fn np(&self) -> usize {
        self.np
    }

    pub fn ndimval(&self) -> usize {
        self.ndimval
    }

    pub fn has_pattern(&self) -> bool {
        self.matrix.has_pattern()
    }

    pub fn matrix(&self) -> &BlockSparseMatrix {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut BlockSparseMatrix {
        &mut self.matrix
    }

    pub fn master_slave(&self) -> Option<&[usize]> {
        self.ms.as_deref()
    }

    /// Relative residual after each iteration of the last solve
    pub fn conv_hist(&self) -> &[f64] {
        &self.conv_hist
    }

    /// Mark every DOF of node `ip` in dimensions `dims` as fixed
    ///
    /// Nothing is marked when `ip` or any of `dims` is out of range.
    pub fn fix_node(&mut self, ip: usize, dims: &[usize]) -> Result<()> {
        if ip >= self.np {
            return Err(Error::shape("fixed node index bound", self.np, ip));
        }
        if let Some(&d) = dims.iter().find(|&&d| d >= self.ndimval) {
            return Err(Error::shape("fixed DOF dimension bound", self.ndimval, d));
        }
        for &d in dims {
            self.bc[ip * self.ndimval + d] = 1;
        }
        Ok(())
    }

    fn require_pattern(&self, op: &'static str) -> Result<()> {
        if self.matrix.has_pattern() {
            Ok(())
        } else {
            Err(Error::PatternNotSet(op))
        }
    }

    /// Clear matrix values, right-hand side and the solution
    pub fn set_zero(&mut self) -> Result<()> {
        self.require_pattern("set_zero")?;
        self.matrix.set_zero();
        self.f.iter_mut().for_each(|v| *v = 0.0);
        self.x.iter_mut().for_each(|v| *v = 0.0);
        Ok(())
    }

    /// Let a kernel add its contributions to the matrix and right-hand side
    pub fn accumulate<F, K>(&mut self, kernel: &K, mesh: &Mesh, fields: &F) -> Result<()>
    where
        K: AssemblyKernel<F> + ?Sized,
    {
        self.require_pattern("accumulate")?;
        kernel.accumulate(&mut self.matrix, &mut self.f, mesh, fields)
    }

    /// Apply Dirichlet flags, then fold master-slave constraints
    pub fn set_bc_ms(&mut self) -> Result<()> {
        self.require_pattern("set_bc_ms")?;
        self.matrix.apply_dirichlet(&self.bc, &mut self.f)?;
        if let Some(ms) = &self.ms {
            self.matrix.apply_master_slave(ms, &mut self.f)?;
        }
        Ok(())
    }

    /// Refresh the ILU(0) factors from the current matrix values
    pub fn set_precond(&mut self) -> Result<()> {
        let precond = self.precond.as_mut().ok_or(Error::PatternNotSet("set_precond"))?;
        precond.set_value(self.matrix.as_csmat())?;
        precond.factorize();
        Ok(())
    }

    /// Solve for `x` with PCG, or BiCGSTAB when `is_asymmetric`
    ///
    /// `x` is the initial guess. Fixed DOFs of the solution are zeroed
    /// afterwards. Returns the last relative residual; the full history is in
    /// [`conv_hist`](Self::conv_hist). When no iteration ran, the result is
    /// 0 for a zero right-hand side and 1 otherwise.
    pub fn solve_iteration(&mut self, is_asymmetric: bool) -> Result<f64> {
        let precond = self.precond.as_ref().ok_or(Error::PatternNotSet("solve_iteration"))?;
        self.conv_hist = if is_asymmetric {
            solve_bicgstab(&self.f, &mut self.x, self.conv_ratio, self.max_iterations, &self.matrix, precond)
        } else {
            solve_pcg(&self.f, &mut self.x, self.conv_ratio, self.max_iterations, &self.matrix, precond)
        };
        for (xi, &fixed) in self.x.iter_mut().zip(&self.bc) {
            if fixed != 0 {
                *xi = 0.0;
            }
        }
        Ok(match self.conv_hist.last() {
            Some(&rel) => rel,
            None if self.f.iter().all(|&v| v == 0.0) => 0.0,
            None => 1.0,
        })
    }

    /// Copy master values onto slaves (no-op without constraints)
    pub fn distribute_value(&self, values: &mut [f64]) {
        if let Some(ms) = &self.ms {
            master_slave::distribute_value(values, ms);
        }
    }

    /// Full step cycle for a kernel: zero, assemble, constrain, precondition, solve
    pub fn assemble_and_solve<F, K>(
        &mut self,
        kernel: &K,
        mesh: &Mesh,
        fields: &F,
        is_asymmetric: bool,
    ) -> Result<f64>
    where
        K: AssemblyKernel<F> + ?Sized,
    {
        self.set_zero()?;
        self.accumulate(kernel, mesh, fields)?;
        self.set_bc_ms()?;
        self.set_precond()?;
        self.solve_iteration(is_asymmetric)
    }
}

//! Lowest vibration mode of a linear elastic solid by inverse iteration.
//!
//! The generalized problem `K u = ω² M u` with lumped `M` is made standard
//! by the substitution `y = M^½ u`:
//!
//! ```text
//! (M^-½ K M^-½ + I) y = (ω² + 1) y
//! ```
//!
//! The shift keeps the operator positive definite although `K` is singular.
//! Its null space (the six rigid-body modes, scaled by `M^½`) is removed from
//! the iterate after every solve so the iteration converges to the first
//! deformation mode.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::fem::kernels::SolidStaticKernel;
use crate::fem::{lumped_mass, LinearSystem};
use crate::linalg::SolverUtils;
use crate::mesh::{FieldRegistry, HasVectorField, Mesh, NodalField};

use super::{bound_mut, bound_ref, Bound, ModelState, PhysicsModel, TopologyUpdate};

/// Amplitude applied to the normalized eigenvector for display
const MODE_SCALE: f64 = 0.03;

const NUM_RIGID_MODES: usize = 6;

pub struct SolidLinearEigen {
    pub myu: f64,
    pub lambda: f64,
    /// Density of the lumped mass
    pub rho: f64,
    /// Seed of the random start vector
    pub seed: u64,
    mode: NodalField,
    ker: Vec<Vec<f64>>,
    mass_lumped_sqrt_inv: Vec<f64>,
    bound: Option<Bound>,
    state: ModelState,
}

impl Default for SolidLinearEigen {
    fn default() -> Self {
        Self {
            myu: 1.0,
            lambda: 0.1,
            rho: 1.0,
            seed: 0,
            mode: NodalField::zeros(0, 3),
            ker: Vec::new(),
            mass_lumped_sqrt_inv: Vec::new(),
            bound: None,
            state: ModelState::Uninitialized,
        }
    }
}

/// Rigid translations and rotations of `mesh`, weighted by `sqrt_mass`
fn rigid_modes(mesh: &Mesh, sqrt_mass: &[f64]) -> Vec<Vec<f64>> {
    let np = mesh.num_nodes();
    let mut ker = vec![vec![0.0; np * 3]; NUM_RIGID_MODES];
    for ip in 0..np {
        let s = sqrt_mass[ip];
        let p = mesh.position(ip);
        for d in 0..3 {
            ker[d][ip * 3 + d] = s;
        }
        ker[3][ip * 3 + 2] = -s * p[1];
        ker[3][ip * 3 + 1] = s * p[2];
        ker[4][ip * 3] = -s * p[2];
        ker[4][ip * 3 + 2] = s * p[0];
        ker[5][ip * 3 + 1] = -s * p[0];
        ker[5][ip * 3] = s * p[1];
    }
    ker
}

/// Modified Gram-Schmidt
fn orthonormalize(vectors: &mut [Vec<f64>]) {
    for i in 0..vectors.len() {
        let (done, rest) = vectors.split_at_mut(i + 1);
        let vi = &mut done[i];
        let norm = SolverUtils::norm(vi);
        if norm > 0.0 {
            vi.iter_mut().for_each(|v| *v /= norm);
        }
        for vj in rest.iter_mut() {
            let proj = SolverUtils::dot(vi, vj);
            vj.iter_mut().zip(vi.iter()).for_each(|(a, &b)| *a -= proj * b);
        }
    }
}

/// Remove the components of `x` along the orthonormal `basis`, then normalize
fn deflate_normalize(x: &mut [f64], basis: &[Vec<f64>]) {
    for k in basis {
        let proj = SolverUtils::dot(x, k);
        x.iter_mut().zip(k).for_each(|(a, &b)| *a -= proj * b);
    }
    let norm = SolverUtils::norm(x);
    if norm > 0.0 {
        x.iter_mut().for_each(|v| *v /= norm);
    }
}

impl SolidLinearEigen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute mass, rigid modes and the shifted operator for the current positions
    ///
    /// Resets the iterate to a random vector orthogonal to the rigid modes.
    pub fn updated_geometry(&mut self) -> Result<()> {
        let b = bound_mut(&mut self.bound)?;
        let ndim = b.mesh.ndim();
        if ndim != 3 {
            return Err(Error::UnsupportedDimension { what: "eigenmode extraction", dim: ndim });
        }
        let np = b.mesh.num_nodes();

        let mass = lumped_mass(&b.mesh, self.rho)?;
        if let Some(ip) = mass.iter().position(|&m| m <= 0.0) {
            return Err(Error::Mesh(format!("node {} has no mass", ip)));
        }
        let sqrt_mass: Vec<f64> = mass.iter().map(|m| m.sqrt()).collect();
        self.ker = rigid_modes(&b.mesh, &sqrt_mass);
        orthonormalize(&mut self.ker);
        self.mass_lumped_sqrt_inv = sqrt_mass.iter().map(|s| 1.0 / s).collect();

        self.mode = NodalField::zeros(np, 3);
        let kernel = SolidStaticKernel {
            myu: self.myu,
            lambda: self.lambda,
            rho: 0.0,
            gravity: [0.0; 3],
        };
        b.ls.set_zero()?;
        b.ls.accumulate(&kernel, &b.mesh, &self.mode)?;
        b.ls.matrix_mut().scale_left_right(&self.mass_lumped_sqrt_inv)?;
        b.ls.matrix_mut().add_diagonal(1.0)?;
        b.ls.set_precond()?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        b.ls.f.iter_mut().for_each(|v| *v = rng.gen_range(-1.0..1.0));
        deflate_normalize(&mut b.ls.f, &self.ker);
        log::debug!("eigen operator rebuilt for {} nodes", np);
        Ok(())
    }

    /// One inverse iteration step
    pub fn solve(&mut self) -> Result<()> {
        let b = bound_mut(&mut self.bound)?;
        b.ls.x.iter_mut().for_each(|v| *v = 0.0);
        b.ls.solve_iteration(false)?;
        deflate_normalize(&mut b.ls.x, &self.ker);
        b.ls.f.copy_from_slice(&b.ls.x);

        for (ip, &s) in self.mass_lumped_sqrt_inv.iter().enumerate() {
            for d in 0..3 {
                self.mode.set(ip, d, s * b.ls.x[ip * 3 + d] * MODE_SCALE);
            }
        }
        self.state = ModelState::Stepped;
        Ok(())
    }

    /// Physical displacement of the current mode, scaled for display
    pub fn mode(&self) -> &NodalField {
        &self.mode
    }

    /// Normalized iterate in mass-scaled coordinates
    pub fn eigenvector(&self) -> Result<&[f64]> {
        Ok(&bound_ref(&self.bound)?.ls.f)
    }

    /// Orthonormal rigid-body modes in mass-scaled coordinates
    pub fn rigid_modes(&self) -> &[Vec<f64>] {
        &self.ker
    }

    pub fn mass_lumped_sqrt_inv(&self) -> &[f64] {
        &self.mass_lumped_sqrt_inv
    }

    /// Rayleigh quotient estimate of ω² for the current iterate
    pub fn eigenvalue(&self) -> Result<f64> {
        let b = bound_ref(&self.bound)?;
        let y = &b.ls.f;
        let ay = b.ls.matrix().matvec(y)?;
        Ok(SolverUtils::dot(y, &ay) / SolverUtils::dot(y, y) - 1.0)
    }

    pub fn linsys(&self) -> Result<&LinearSystem> {
        Ok(&bound_ref(&self.bound)?.ls)
    }

    pub fn linsys_mut(&mut self) -> Result<&mut LinearSystem> {
        Ok(&mut bound_mut(&mut self.bound)?.ls)
    }
}

impl PhysicsModel for SolidLinearEigen {
    fn updated_topology(&mut self, mesh: Mesh, update: TopologyUpdate<'_>) -> Result<()> {
        if mesh.ndim() != 3 {
            return Err(Error::UnsupportedDimension { what: "eigenmode extraction", dim: mesh.ndim() });
        }
        self.bound = Some(Bound::new(mesh, 3, &update)?);
        self.state = ModelState::TopologyBound;
        self.updated_geometry()
    }

    fn step_time(&mut self) -> Result<()> {
        self.solve()
    }

    fn state(&self) -> ModelState {
        self.state
    }

    fn mesh(&self) -> Option<&Mesh> {
        self.bound.as_ref().map(|b| &b.mesh)
    }
}

impl FieldRegistry for SolidLinearEigen {
    fn field_names(&self) -> Vec<&'static str> {
        vec!["mode"]
    }

    fn field(&self, name: &str) -> Option<&NodalField> {
        match name {
            "mode" => Some(&self.mode),
            _ => None,
        }
    }
}

impl HasVectorField for SolidLinearEigen {
    fn vector_field(&self) -> &NodalField {
        &self.mode
    }

    fn vector_field_mut(&mut self) -> &mut NodalField {
        &mut self.mode
    }
}

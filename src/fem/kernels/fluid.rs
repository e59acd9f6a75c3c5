//! Incompressible flow on 2D P1-P1 triangles.
//!
//! Each node carries `(u, v, p)`. Equal-order interpolation is stabilized with
//! a Brezzi-Pitkäranta pressure Laplacian of weight `τ = h² / (12 μ)`, `h² = 2A`.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::fem::element::P1Geometry;
use crate::fem::kernel::{assemble_elements, gather, AssemblyKernel};
use crate::linalg::BlockSparseMatrix;
use crate::mesh::{ElementType, Mesh, NodalField};

const NDIMVAL: usize = 3;

/// Current flow state
pub struct StokesFields<'a> {
    pub value: &'a NodalField,
    /// Time derivative of `value`; ignored by the static kernel
    pub velocity: Option<&'a NodalField>,
}

fn check_mesh(mesh: &Mesh) -> Result<()> {
    if mesh.ndim() != 2 || mesh.elem_type() != ElementType::Tri3 {
        return Err(Error::UnsupportedDimension { what: "2D flow (triangles only)", dim: mesh.ndim() });
    }
    Ok(())
}

/// Element operator of the (Navier-)Stokes system
///
/// With `convection = Some((ρ, ū))` the Picard-linearized convective term
/// `ρ ∫ N_i ū·∇N_j` is added to the velocity blocks.
fn flow_operator(geo: &P1Geometry, myu: f64, convection: Option<(f64, [f64; 2])>) -> DMatrix<f64> {
    let area = geo.volume;
    let tau = 2.0 * area / (12.0 * myu);
    let g = &geo.grads;
    let mut emat = DMatrix::zeros(3 * NDIMVAL, 3 * NDIMVAL);
    for i in 0..3 {
        for j in 0..3 {
            let mut diffusion = myu * area * g[i].dot(&g[j]);
            if let Some((rho, ubar)) = convection {
                diffusion += rho * area / 3.0 * (ubar[0] * g[j][0] + ubar[1] * g[j][1]);
            }
            for a in 0..2 {
                emat[(i * NDIMVAL + a, j * NDIMVAL + a)] += diffusion;
                emat[(i * NDIMVAL + a, j * NDIMVAL + 2)] -= g[i][a] * area / 3.0;
                emat[(i * NDIMVAL + 2, j * NDIMVAL + a)] -= g[j][a] * area / 3.0;
            }
            emat[(i * NDIMVAL + 2, j * NDIMVAL + 2)] -= tau * area * g[i].dot(&g[j]);
        }
    }
    emat
}

/// Consistent mass on the velocity components only
fn velocity_mass(geo: &P1Geometry, rho: f64) -> DMatrix<f64> {
    let m = geo.mass();
    DMatrix::from_fn(3 * NDIMVAL, 3 * NDIMVAL, |r, c| {
        let (a, b) = (r % NDIMVAL, c % NDIMVAL);
        if a == b && a < 2 {
            rho * m[(r / NDIMVAL, c / NDIMVAL)]
        } else {
            0.0
        }
    })
}

fn body_force(geo: &P1Geometry, rho: f64, gravity: &[f64; 2]) -> DVector<f64> {
    let w = rho * geo.lumped();
    DVector::from_fn(3 * NDIMVAL, |r, _| match r % NDIMVAL {
        2 => 0.0,
        a => w * gravity[a],
    })
}

fn mean_velocity(u: &DVector<f64>) -> [f64; 2] {
    let mut ubar = [0.0; 2];
    for i in 0..3 {
        ubar[0] += u[i * NDIMVAL] / 3.0;
        ubar[1] += u[i * NDIMVAL + 1] / 3.0;
    }
    ubar
}

/// Steady Stokes flow in increment form: `A x = f - A u`
#[derive(Debug, Clone, Copy)]
pub struct StokesStaticKernel {
    pub myu: f64,
    pub gravity: [f64; 2],
}

impl<'a> AssemblyKernel<StokesFields<'a>> for StokesStaticKernel {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        mesh: &Mesh,
        fields: &StokesFields<'a>,
    ) -> Result<()> {
        check_mesh(mesh)?;
        assemble_elements(matrix, rhs, mesh.elements(), 3, |elem| {
            let geo = P1Geometry::new(mesh, elem)?;
            let emat = flow_operator(&geo, self.myu, None);
            let u = gather(fields.value.as_slice(), elem, NDIMVAL);
            let evec = body_force(&geo, 1.0, &self.gravity) - &emat * u;
            Ok((emat, evec))
        })
    }
}

/// Shared transient assembly with Newmark (γ) integration
///
/// `(ρM + dt γ A) x = f - ρM v - A (u + dt v)`.
fn transient(
    matrix: &mut BlockSparseMatrix,
    rhs: &mut [f64],
    mesh: &Mesh,
    fields: &StokesFields<'_>,
    (myu, rho, gravity, dt, gamma): (f64, f64, [f64; 2], f64, f64),
    convective: bool,
) -> Result<()> {
    check_mesh(mesh)?;
    let velocity = fields
        .velocity
        .ok_or(Error::shape("flow velocity", fields.value.as_slice().len(), 0))?;
    assemble_elements(matrix, rhs, mesh.elements(), 3, |elem| {
        let geo = P1Geometry::new(mesh, elem)?;
        let u = gather(fields.value.as_slice(), elem, NDIMVAL);
        let v = gather(velocity.as_slice(), elem, NDIMVAL);
        let convection = convective.then(|| (rho, mean_velocity(&u)));
        let op = flow_operator(&geo, myu, convection);
        let m = velocity_mass(&geo, rho);

        let evec = body_force(&geo, rho, &gravity) - &m * &v - &op * (u + &v * dt);
        let emat = m + op * (dt * gamma);
        Ok((emat, evec))
    })
}

/// Unsteady Stokes flow
#[derive(Debug, Clone, Copy)]
pub struct StokesDynamicKernel {
    pub rho: f64,
    pub myu: f64,
    pub gravity: [f64; 2],
    pub dt: f64,
    pub gamma: f64,
}

impl<'a> AssemblyKernel<StokesFields<'a>> for StokesDynamicKernel {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        mesh: &Mesh,
        fields: &StokesFields<'a>,
    ) -> Result<()> {
        let params = (self.myu, self.rho, self.gravity, self.dt, self.gamma);
        transient(matrix, rhs, mesh, fields, params, false)
    }
}

/// Unsteady Navier-Stokes flow, convection linearized about the current velocity
///
/// The resulting matrix is not symmetric.
#[derive(Debug, Clone, Copy)]
pub struct NavierStokesKernel {
    pub rho: f64,
    pub myu: f64,
    pub gravity: [f64; 2],
    pub dt: f64,
    pub gamma: f64,
}

impl<'a> AssemblyKernel<StokesFields<'a>> for NavierStokesKernel {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        mesh: &Mesh,
        fields: &StokesFields<'a>,
    ) -> Result<()> {
        let params = (self.myu, self.rho, self.gravity, self.dt, self.gamma);
        transient(matrix, rhs, mesh, fields, params, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_triangle() -> P1Geometry {
        P1Geometry::triangle([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]])
    }

    #[test]
    fn test_stokes_operator_symmetric() {
        let op = flow_operator(&reference_triangle(), 2.0, None);
        assert_relative_eq!(op.clone(), op.transpose(), epsilon = 1e-14);
    }

    #[test]
    fn test_convection_breaks_symmetry() {
        let op = flow_operator(&reference_triangle(), 1.0, Some((1.0, [1.0, 0.5])));
        assert!((op.clone() - op.transpose()).norm() > 1e-3);
    }

    #[test]
    fn test_velocity_mass_skips_pressure() {
        let m = velocity_mass(&reference_triangle(), 2.0);
        assert_relative_eq!(m[(2, 2)], 0.0);
        assert_relative_eq!(m[(0, 0)], 2.0 * 0.5 / 6.0, epsilon = 1e-14);
        // total mass per velocity component
        let total: f64 = (0..3).flat_map(|i| (0..3).map(move |j| (i, j))).map(|(i, j)| m[(i * 3, j * 3)]).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_rejects_3d_mesh() {
        let mesh = crate::mesh_generator::MeshGenerator::cube_tet(1, 1, 1, 1.0, 1.0, 1.0);
        assert!(check_mesh(&mesh).is_err());
    }
}

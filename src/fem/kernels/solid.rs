use nalgebra::{DMatrix, DVector};

use crate::error::Result;
use crate::fem::element::P1Geometry;
use crate::fem::kernel::{assemble_elements, expand_scalar, gather, AssemblyKernel};
use crate::linalg::BlockSparseMatrix;
use crate::mesh::{Mesh, NodalField};

/// Linear elastic element stiffness for Lamé parameters `(μ, λ)`
///
/// Block `(i, j)` entry `(a, b)` is
/// `vol · (λ g_i^a g_j^b + μ g_i^b g_j^a + μ δ_ab g_i·g_j)`.
pub fn elastic_stiffness(geo: &P1Geometry, ndim: usize, myu: f64, lambda: f64) -> DMatrix<f64> {
    let n = geo.n_nodes();
    DMatrix::from_fn(n * ndim, n * ndim, |r, c| {
        let (i, a) = (r / ndim, r % ndim);
        let (j, b) = (c / ndim, c % ndim);
        let (gi, gj) = (&geo.grads[i], &geo.grads[j]);
        let mut v = lambda * gi[a] * gj[b] + myu * gi[b] * gj[a];
        if a == b {
            v += myu * gi.dot(gj);
        }
        geo.volume * v
    })
}

fn body_force(geo: &P1Geometry, ndim: usize, rho: f64, gravity: &[f64; 3]) -> DVector<f64> {
    let w = rho * geo.lumped();
    DVector::from_fn(geo.n_nodes() * ndim, |r, _| w * gravity[r % ndim])
}

/// Static linear elasticity in increment form: `K x = f - K u`
#[derive(Debug, Clone, Copy)]
pub struct SolidStaticKernel {
    pub myu: f64,
    pub lambda: f64,
    pub rho: f64,
    pub gravity: [f64; 3],
}

impl AssemblyKernel<NodalField> for SolidStaticKernel {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        mesh: &Mesh,
        disp: &NodalField,
    ) -> Result<()> {
        let ndim = mesh.ndim();
        let nnoel = mesh.elem_type().n_nodes();
        assemble_elements(matrix, rhs, mesh.elements(), nnoel, |elem| {
            let geo = P1Geometry::new(mesh, elem)?;
            let k = elastic_stiffness(&geo, ndim, self.myu, self.lambda);
            let u = gather(disp.as_slice(), elem, ndim);
            let evec = body_force(&geo, ndim, self.rho, &self.gravity) - &k * u;
            Ok((k, evec))
        })
    }
}

/// Displacement, velocity and acceleration of a second-order transient field
pub struct DynamicFields<'a> {
    pub value: &'a NodalField,
    pub velocity: &'a NodalField,
    pub acceleration: &'a NodalField,
}

/// Dynamic linear elasticity with Newmark β/γ
///
/// The unknown is the acceleration increment `x`:
/// `(ρM + dt² β K) x = f - ρM a - K (u + dt v + ½ dt² a)`.
#[derive(Debug, Clone, Copy)]
pub struct SolidDynamicKernel {
    pub myu: f64,
    pub lambda: f64,
    pub rho: f64,
    pub gravity: [f64; 3],
    pub dt: f64,
    pub gamma: f64,
    pub beta: f64,
}

impl<'a> AssemblyKernel<DynamicFields<'a>> for SolidDynamicKernel {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        mesh: &Mesh,
        fields: &DynamicFields<'a>,
    ) -> Result<()> {
        let ndim = mesh.ndim();
        let nnoel = mesh.elem_type().n_nodes();
        let dt = self.dt;
        assemble_elements(matrix, rhs, mesh.elements(), nnoel, |elem| {
            let geo = P1Geometry::new(mesh, elem)?;
            let k = elastic_stiffness(&geo, ndim, self.myu, self.lambda);
            let m = expand_scalar(&geo.mass(), ndim) * self.rho;
            let u = gather(fields.value.as_slice(), elem, ndim);
            let v = gather(fields.velocity.as_slice(), elem, ndim);
            let a = gather(fields.acceleration.as_slice(), elem, ndim);

            let predicted = u + v * dt + &a * (0.5 * dt * dt);
            let evec = body_force(&geo, ndim, self.rho, &self.gravity) - &m * a - &k * predicted;
            let emat = m + k * (dt * dt * self.beta);
            Ok((emat, evec))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn unit_tet() -> P1Geometry {
        P1Geometry::tetrahedron([
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ])
    }

    #[test]
    fn test_stiffness_symmetric() {
        let k = elastic_stiffness(&unit_tet(), 3, 1.0, 0.3);
        assert_relative_eq!(k.clone(), k.transpose(), epsilon = 1e-14);
    }

    #[test]
    fn test_rigid_motions_are_zero_energy() {
        let geo = unit_tet();
        let k = elastic_stiffness(&geo, 3, 1.0, 0.5);
        let pts = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

        let translation = DVector::from_fn(12, |r, _| if r % 3 == 1 { 1.0 } else { 0.0 });
        // rotation about z: (-y, x, 0)
        let rotation = DVector::from_fn(12, |r, _| match r % 3 {
            0 => -pts[r / 3][1],
            1 => pts[r / 3][0],
            _ => 0.0,
        });
        assert!((&k * translation).norm() < 1e-12);
        assert!((&k * rotation).norm() < 1e-12);
    }

    #[test]
    fn test_body_force_total() {
        let geo = unit_tet();
        let f = body_force(&geo, 3, 2.0, &[0.0, 0.0, -1.0]);
        let total_z: f64 = (0..4).map(|i| f[i * 3 + 2]).sum();
        assert_relative_eq!(total_z, -2.0 / 6.0, epsilon = 1e-14);
    }
}

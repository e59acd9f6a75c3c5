use nalgebra::DVector;

use crate::error::Result;
use crate::fem::element::P1Geometry;
use crate::fem::kernel::{assemble_elements, gather, AssemblyKernel};
use crate::linalg::BlockSparseMatrix;
use crate::mesh::{Mesh, NodalField};

/// Current state of a first-order transient field
pub struct DiffuseFields<'a> {
    pub value: &'a NodalField,
    pub velocity: &'a NodalField,
}

/// `ρ ∂u/∂t - α Δu = source` with Newmark (γ) time integration
///
/// The unknown is the velocity increment `x`:
/// `(ρM + dt γ α K) x = source ∫N - ρM v - αK (u + dt v)`.
#[derive(Debug, Clone, Copy)]
pub struct DiffuseKernel {
    pub alpha: f64,
    pub rho: f64,
    pub source: f64,
    pub dt: f64,
    pub gamma: f64,
}

impl<'a> AssemblyKernel<DiffuseFields<'a>> for DiffuseKernel {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        mesh: &Mesh,
        fields: &DiffuseFields<'a>,
    ) -> Result<()> {
        let nnoel = mesh.elem_type().n_nodes();
        assemble_elements(matrix, rhs, mesh.elements(), nnoel, |elem| {
            let geo = P1Geometry::new(mesh, elem)?;
            let k = geo.laplacian() * self.alpha;
            let m = geo.mass() * self.rho;
            let u = gather(fields.value.as_slice(), elem, 1);
            let v = gather(fields.velocity.as_slice(), elem, 1);

            let evec = DVector::from_element(elem.len(), self.source * geo.lumped())
                - &m * &v
                - &k * (u + &v * self.dt);
            let emat = m + k * (self.dt * self.gamma);
            Ok((emat, evec))
        })
    }
}

use nalgebra::DVector;

use crate::error::Result;
use crate::fem::element::P1Geometry;
use crate::fem::kernel::{assemble_elements, gather, AssemblyKernel};
use crate::linalg::BlockSparseMatrix;
use crate::mesh::{Mesh, NodalField};

/// `-α Δu = source`, assembled in increment form
///
/// The right-hand side is `source · ∫N - K u`, so the solution is the
/// correction to the current value.
#[derive(Debug, Clone, Copy)]
pub struct PoissonKernel {
    pub alpha: f64,
    pub source: f64,
}

impl AssemblyKernel<NodalField> for PoissonKernel {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        mesh: &Mesh,
        value: &NodalField,
    ) -> Result<()> {
        let nnoel = mesh.elem_type().n_nodes();
        assemble_elements(matrix, rhs, mesh.elements(), nnoel, |elem| {
            let geo = P1Geometry::new(mesh, elem)?;
            let emat = geo.laplacian() * self.alpha;
            let u = gather(value.as_slice(), elem, 1);
            let evec = DVector::from_element(elem.len(), self.source * geo.lumped()) - &emat * u;
            Ok((emat, evec))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;
    use approx::assert_relative_eq;

    #[test]
    fn test_source_integrates_to_area() {
        let mesh = MeshGenerator::rectangle_tri(3, 2, 3.0, 2.0);
        let mut matrix = BlockSparseMatrix::initialize(mesh.num_nodes(), 1, true);
        matrix.set_pattern(&mesh.psup()).unwrap();
        let mut rhs = vec![0.0; mesh.num_nodes()];
        let value = NodalField::zeros(mesh.num_nodes(), 1);

        let kernel = PoissonKernel { alpha: 1.0, source: 2.0 };
        kernel.accumulate(&mut matrix, &mut rhs, &mesh, &value).unwrap();
        assert_relative_eq!(rhs.iter().sum::<f64>(), 12.0, epsilon = 1e-12);

        // constants are in the kernel of the Laplacian
        let y = matrix.matvec(&vec![1.0; mesh.num_nodes()]).unwrap();
        assert!(y.iter().all(|v| v.abs() < 1e-12));
    }
}

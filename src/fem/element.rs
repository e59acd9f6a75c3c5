use nalgebra::{DMatrix, Matrix2, Matrix3, Vector3};

use crate::error::{Error, Result};
use crate::mesh::{ElementType, Mesh};

/// Geometry of a linear (P1) simplex element
///
/// Shape function gradients are constant over the element. In 2D the third
/// gradient component is zero.
#[derive(Debug, Clone)]
pub struct P1Geometry {
    /// Area (triangle) or volume (tetrahedron)
    pub volume: f64,
    /// `grads[i]` is ∇N_i
    pub grads: Vec<Vector3<f64>>,
}

impl P1Geometry {
    /// Compute geometry of element `elem` of `mesh`
    ///
    /// Supports triangles in 2D and tetrahedra in 3D.
    pub fn new(mesh: &Mesh, elem: &[usize]) -> Result<Self> {
        match (mesh.elem_type(), mesh.ndim()) {
            (ElementType::Tri3, 2) => {
                let p: Vec<&[f64]> = elem.iter().map(|&ip| mesh.position(ip)).collect();
                Ok(Self::triangle([[p[0][0], p[0][1]], [p[1][0], p[1][1]], [p[2][0], p[2][1]]]))
            }
            (ElementType::Tet4, 3) => {
                let p: Vec<Vector3<f64>> = elem
                    .iter()
                    .map(|&ip| Vector3::from_column_slice(mesh.position(ip)))
                    .collect();
                Ok(Self::tetrahedron([p[0], p[1], p[2], p[3]]))
            }
            (elem_type, ndim) => Err(Error::Mesh(format!(
                "P1 geometry not available for {:?} elements in {}D",
                elem_type, ndim
            ))),
        }
    }

    /// Linear triangle, signed area made positive
    pub fn triangle(p: [[f64; 2]; 3]) -> Self {
        let jac = Matrix2::new(
            p[1][0] - p[0][0],
            p[2][0] - p[0][0],
            p[1][1] - p[0][1],
            p[2][1] - p[0][1],
        );
        let det = jac.determinant();
        let area = 0.5 * det.abs();

        // rows of J^{-1} are the gradients of N_1 and N_2
        let inv = jac.try_inverse().unwrap_or_else(Matrix2::zeros);
        let g1 = Vector3::new(inv[(0, 0)], inv[(0, 1)], 0.0);
        let g2 = Vector3::new(inv[(1, 0)], inv[(1, 1)], 0.0);
        let g0 = -(g1 + g2);

        Self {
            volume: area,
            grads: vec![g0, g1, g2],
        }
    }

    /// Linear tetrahedron
    pub fn tetrahedron(p: [Vector3<f64>; 4]) -> Self {
        let jac = Matrix3::from_columns(&[p[1] - p[0], p[2] - p[0], p[3] - p[0]]);
        let volume = jac.determinant().abs() / 6.0;

        let inv = jac.try_inverse().unwrap_or_else(Matrix3::zeros);
        let g: Vec<Vector3<f64>> = (0..3).map(|r| inv.row(r).transpose()).collect();
        let g0 = -(g[0] + g[1] + g[2]);

        Self {
            volume,
            grads: vec![g0, g[0], g[1], g[2]],
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.grads.len()
    }

    /// Stiffness `K_ij = vol · ∇N_i · ∇N_j`
    pub fn laplacian(&self) -> DMatrix<f64> {
        let n = self.n_nodes();
        DMatrix::from_fn(n, n, |i, j| self.volume * self.grads[i].dot(&self.grads[j]))
    }

    /// Consistent mass `M_ij = vol (1 + δ_ij) / (n (n + 1))`
    pub fn mass(&self) -> DMatrix<f64> {
        consistent_mass(self.n_nodes(), self.volume)
    }

    /// `∫ N_i`
    pub fn lumped(&self) -> f64 {
        self.volume / self.n_nodes() as f64
    }
}

/// Consistent mass matrix of a P1 simplex with `n` nodes
pub fn consistent_mass(n: usize, volume: f64) -> DMatrix<f64> {
    let scale = volume / (n * (n + 1)) as f64;
    DMatrix::from_fn(n, n, |i, j| if i == j { 2.0 * scale } else { scale })
}

/// Lumped (row-sum) nodal mass `Σ_e ρ · vol_e / n`
pub fn lumped_mass(mesh: &Mesh, rho: f64) -> Result<Vec<f64>> {
    let mut mass = vec![0.0; mesh.num_nodes()];
    for elem in mesh.element_iter() {
        let geo = P1Geometry::new(mesh, elem)?;
        let m = rho * geo.lumped();
        for &ip in elem {
            mass[ip] += m;
        }
    }
    Ok(mass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;
    use approx::assert_relative_eq;

    #[test]
    fn test_triangle_gradients() {
        let geo = P1Geometry::triangle([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        assert_relative_eq!(geo.volume, 0.5);
        assert_relative_eq!(geo.grads[0], Vector3::new(-1.0, -1.0, 0.0));
        assert_relative_eq!(geo.grads[1], Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(geo.grads[2], Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_tetrahedron_gradients_partition_of_unity() {
        let geo = P1Geometry::tetrahedron([
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 3.0),
        ]);
        assert_relative_eq!(geo.volume, 1.0, epsilon = 1e-14);
        let sum: Vector3<f64> = geo.grads.iter().sum();
        assert_relative_eq!(sum.norm(), 0.0, epsilon = 1e-14);
        assert_relative_eq!(geo.grads[1], Vector3::new(0.5, 0.0, 0.0), epsilon = 1e-14);
    }

    #[test]
    fn test_laplacian_rows_sum_to_zero() {
        let geo = P1Geometry::triangle([[0.0, 0.0], [2.0, 0.5], [0.3, 1.0]]);
        let k = geo.laplacian();
        for i in 0..3 {
            assert_relative_eq!(k.row(i).sum(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_consistent_mass_total() {
        assert_relative_eq!(consistent_mass(3, 0.5).sum(), 0.5, epsilon = 1e-14);
        assert_relative_eq!(consistent_mass(4, 2.0).sum(), 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_lumped_mass_total() {
        let mesh = MeshGenerator::cube_tet(2, 1, 1, 2.0, 1.0, 1.0);
        let mass = lumped_mass(&mesh, 3.0).unwrap();
        assert_relative_eq!(mass.iter().sum::<f64>(), 6.0, epsilon = 1e-12);
    }
}

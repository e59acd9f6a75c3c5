use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use crate::error::{Error, Result};
use crate::fem::kernel::{assemble_elements, AssemblyKernel};
use crate::linalg::BlockSparseMatrix;
use crate::mesh::{ElementType, Mesh, NodalField};
use crate::physics::sdf::SdfList;

/// Current cloth state; `quads` come from [`dihedral_quads`](crate::mesh::dihedral_quads)
pub struct ClothFields<'a> {
    pub value: &'a NodalField,
    pub quads: &'a [usize],
}

/// Mass-spring cloth linearized around the current positions
///
/// Every triangle edge carries a stretch spring and every dihedral quad a
/// bending spring between its two opposite vertices. Rest lengths come from
/// the mesh positions (2D meshes are lifted to `z = 0`).
#[derive(Debug, Clone, Copy)]
pub struct ClothKernel {
    pub stiff_stretch: f64,
    pub stiff_bend: f64,
}

fn rest_position(mesh: &Mesh, ip: usize) -> Vector3<f64> {
    let p = mesh.position(ip);
    Vector3::new(p[0], p[1], if p.len() > 2 { p[2] } else { 0.0 })
}

fn current_position(value: &NodalField, ip: usize) -> Vector3<f64> {
    Vector3::from_column_slice(value.node(ip))
}

/// Hessian and force of one spring `(p0, p1)`
///
/// The transverse part of the Hessian is clamped at zero so that compressed
/// springs stay positive semi-definite.
fn spring(p0: &Vector3<f64>, p1: &Vector3<f64>, rest: f64, stiffness: f64) -> (Matrix3<f64>, Vector3<f64>) {
    let d = p0 - p1;
    let len = d.norm();
    if len < 1e-12 {
        return (Matrix3::zeros(), Vector3::zeros());
    }
    let n = d / len;
    let nn = n * n.transpose();
    let transverse = (1.0 - rest / len).max(0.0);
    let hessian = (nn + (Matrix3::identity() - nn) * transverse) * stiffness;
    let force = n * (-stiffness * (len - rest));
    (hessian, force)
}

fn add_spring(
    emat: &mut DMatrix<f64>,
    evec: &mut DVector<f64>,
    (a, b): (usize, usize),
    hessian: &Matrix3<f64>,
    force: &Vector3<f64>,
) {
    for r in 0..3 {
        for c in 0..3 {
            let h = hessian[(r, c)];
            emat[(a * 3 + r, a * 3 + c)] += h;
            emat[(b * 3 + r, b * 3 + c)] += h;
            emat[(a * 3 + r, b * 3 + c)] -= h;
            emat[(b * 3 + r, a * 3 + c)] -= h;
        }
        evec[a * 3 + r] += force[r];
        evec[b * 3 + r] -= force[r];
    }
}

impl<'a> AssemblyKernel<ClothFields<'a>> for ClothKernel {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        mesh: &Mesh,
        fields: &ClothFields<'a>,
    ) -> Result<()> {
        if mesh.elem_type() != ElementType::Tri3 {
            return Err(Error::Mesh(format!(
                "cloth needs a triangle mesh, got {:?}",
                mesh.elem_type()
            )));
        }
        let value = fields.value;

        assemble_elements(matrix, rhs, mesh.elements(), 3, |tri| {
            let mut emat = DMatrix::zeros(9, 9);
            let mut evec = DVector::zeros(9);
            for k in 0..3 {
                let (a, b) = ((k + 1) % 3, (k + 2) % 3);
                let rest = (rest_position(mesh, tri[a]) - rest_position(mesh, tri[b])).norm();
                let (h, f) = spring(
                    &current_position(value, tri[a]),
                    &current_position(value, tri[b]),
                    rest,
                    self.stiff_stretch,
                );
                add_spring(&mut emat, &mut evec, (a, b), &h, &f);
            }
            Ok((emat, evec))
        })?;

        let diagonals: Vec<usize> = fields.quads.chunks(4).flat_map(|q| [q[0], q[1]]).collect();
        assemble_elements(matrix, rhs, &diagonals, 2, |pair| {
            let mut emat = DMatrix::zeros(6, 6);
            let mut evec = DVector::zeros(6);
            let rest = (rest_position(mesh, pair[0]) - rest_position(mesh, pair[1])).norm();
            let (h, f) = spring(
                &current_position(value, pair[0]),
                &current_position(value, pair[1]),
                rest,
                self.stiff_bend,
            );
            add_spring(&mut emat, &mut evec, (0, 1), &h, &f);
            Ok((emat, evec))
        })
    }
}

/// Position and velocity of point masses
pub struct MassPointFields<'a> {
    pub value: &'a NodalField,
    pub velocity: &'a NodalField,
}

/// Implicit-Euler inertia and gravity of lumped point masses
///
/// Adds `m / dt²` to each diagonal block and `m v / dt + m g` to the
/// right-hand side, for an unknown that is the position increment.
#[derive(Debug, Clone, Copy)]
pub struct MassPointKernel {
    pub mass: f64,
    pub dt: f64,
    pub gravity: [f64; 3],
}

impl<'a> AssemblyKernel<MassPointFields<'a>> for MassPointKernel {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        _mesh: &Mesh,
        fields: &MassPointFields<'a>,
    ) -> Result<()> {
        let ndim = matrix.ndim();
        if fields.velocity.shape() != (matrix.n_nodes(), ndim) {
            return Err(Error::shape("velocity", matrix.n_dofs(), fields.velocity.as_slice().len()));
        }
        let m = self.mass;
        let block: Vec<f64> = (0..ndim * ndim)
            .map(|k| if k / ndim == k % ndim { m / (self.dt * self.dt) } else { 0.0 })
            .collect();
        for ip in 0..matrix.n_nodes() {
            matrix.add_block(ip, ip, &block)?;
            for d in 0..ndim {
                rhs[ip * ndim + d] += m / self.dt * fields.velocity.get(ip, d) + m * self.gravity[d];
            }
        }
        Ok(())
    }
}

/// Current positions and the obstacles they collide with
pub struct ContactFields<'a> {
    pub value: &'a NodalField,
    pub obstacles: &'a SdfList,
}

/// Penalty contact against signed distance fields
///
/// A node closer than `clearance` to an obstacle surface is pushed out along
/// the field gradient with stiffness `stiffness`.
#[derive(Debug, Clone, Copy)]
pub struct ContactKernel {
    pub stiffness: f64,
    pub clearance: f64,
}

impl<'a> AssemblyKernel<ContactFields<'a>> for ContactKernel {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        _mesh: &Mesh,
        fields: &ContactFields<'a>,
    ) -> Result<()> {
        if matrix.ndim() != 3 {
            return Err(Error::UnsupportedDimension { what: "contact", dim: matrix.ndim() });
        }
        for ip in 0..matrix.n_nodes() {
            let p = current_position(fields.value, ip);
            for sdf in fields.obstacles.iter() {
                let (dist, normal) = sdf.projection(&p);
                let penetration = self.clearance - dist;
                if penetration <= 0.0 {
                    continue;
                }
                let hessian = normal * normal.transpose() * self.stiffness;
                matrix.add_block(ip, ip, hessian.transpose().as_slice())?;
                for d in 0..3 {
                    rhs[ip * 3 + d] += self.stiffness * penetration * normal[d];
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spring_at_rest_has_no_force() {
        let (h, f) = spring(&Vector3::new(1.0, 0.0, 0.0), &Vector3::zeros(), 1.0, 10.0);
        assert_relative_eq!(f.norm(), 0.0);
        assert_relative_eq!(h[(0, 0)], 10.0);
        assert_relative_eq!(h[(1, 1)], 0.0);
    }

    #[test]
    fn test_stretched_spring_pulls_together() {
        let (h, f) = spring(&Vector3::new(2.0, 0.0, 0.0), &Vector3::zeros(), 1.0, 10.0);
        assert_relative_eq!(f[0], -10.0);
        assert_relative_eq!(h[(1, 1)], 5.0);
    }

    #[test]
    fn test_compressed_spring_clamps_transverse_stiffness() {
        let (h, f) = spring(&Vector3::new(0.5, 0.0, 0.0), &Vector3::zeros(), 1.0, 10.0);
        assert_relative_eq!(f[0], 5.0);
        assert_relative_eq!(h[(2, 2)], 0.0);
    }
}

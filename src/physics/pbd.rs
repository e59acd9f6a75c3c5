//! Position-based dynamics with rigid shape-matching clusters.
//!
//! Explicit and matrix free: each step predicts positions from the velocity,
//! projects every node cluster (the node and its mesh neighbors) towards a
//! rigid transform of its rest shape, and derives the velocity from the
//! resulting displacement.

use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

use crate::error::{Error, Result};
use crate::mesh::{FieldRegistry, HasVectorField, JaggedArray, Mesh, NodalField};

use super::{remap_field, ModelState, PhysicsModel, TopologyUpdate};

/// Shape-matching PBD over a mesh
pub struct Pbd {
    pub dt: f64,
    /// Blend between the current and the matched position per projection, in `[0, 1]`
    pub stiffness: f64,
    /// Projection sweeps per step
    pub loop_count: usize,
    /// Per-node flag, nonzero pins the node at its current value
    pub bc: Vec<i32>,
    value: NodalField,
    velocity: NodalField,
    tpos: NodalField,
    clusters: JaggedArray,
    mesh: Option<Mesh>,
    state: ModelState,
}

impl Default for Pbd {
    fn default() -> Self {
        Self {
            dt: 0.1,
            stiffness: 0.5,
            loop_count: 1,
            bc: Vec::new(),
            value: NodalField::zeros(0, 0),
            velocity: NodalField::zeros(0, 0),
            tpos: NodalField::zeros(0, 0),
            clusters: JaggedArray::from_rows(&[]),
            mesh: None,
            state: ModelState::Uninitialized,
        }
    }
}

/// Reset pinned nodes of `tpos` to `value`
fn fix_points(tpos: &mut NodalField, bc: &[i32], value: &NodalField) {
    for (ip, &flag) in bc.iter().enumerate() {
        if flag != 0 {
            tpos.node_mut(ip).copy_from_slice(value.node(ip));
        }
    }
}

/// Rotation best aligning the rest shape `q` onto the current shape `p` in 2D
fn rotation_2d(p: &[Vector2<f64>], q: &[Vector2<f64>]) -> Matrix2<f64> {
    let mut a = Matrix2::zeros();
    for (pi, qi) in p.iter().zip(q) {
        a += pi * qi.transpose();
    }
    let theta = (a[(1, 0)] - a[(0, 1)]).atan2(a[(0, 0)] + a[(1, 1)]);
    let (s, c) = theta.sin_cos();
    Matrix2::new(c, -s, s, c)
}

/// Polar rotation of `Σ p qᵀ` via SVD, reflection removed
fn rotation_3d(p: &[Vector3<f64>], q: &[Vector3<f64>]) -> Matrix3<f64> {
    let mut a = Matrix3::zeros();
    for (pi, qi) in p.iter().zip(q) {
        a += pi * qi.transpose();
    }
    let svd = a.svd(true, true);
    let (Some(mut u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Matrix3::identity();
    };
    if (u * v_t).determinant() < 0.0 {
        let mut smallest = 0;
        for k in 1..3 {
            if svd.singular_values[k] < svd.singular_values[smallest] {
                smallest = k;
            }
        }
        u.column_mut(smallest).neg_mut();
    }
    u * v_t
}

/// One Gauss-Seidel sweep of rigid 2D shape matching over all clusters
///
/// `rest` holds the `(np, 2)` rest positions.
pub fn project_rigid_2d(tpos: &mut NodalField, stiffness: f64, clusters: &JaggedArray, rest: &[f64]) {
    for ic in 0..clusters.n_rows() {
        let members = clusters.row(ic);
        if members.len() < 2 {
            continue;
        }
        let w = 1.0 / members.len() as f64;
        let cur: Vec<_> = members.iter().map(|&ip| Vector2::new(tpos.get(ip, 0), tpos.get(ip, 1))).collect();
        let rst: Vec<_> = members.iter().map(|&ip| Vector2::new(rest[ip * 2], rest[ip * 2 + 1])).collect();
        let pc = cur.iter().sum::<Vector2<f64>>() * w;
        let qc = rst.iter().sum::<Vector2<f64>>() * w;
        let p: Vec<_> = cur.iter().map(|pi| pi - pc).collect();
        let q: Vec<_> = rst.iter().map(|qi| qi - qc).collect();

        let r = rotation_2d(&p, &q);
        for (k, &ip) in members.iter().enumerate() {
            let goal = pc + r * q[k];
            let next = goal * stiffness + cur[k] * (1.0 - stiffness);
            tpos.node_mut(ip).copy_from_slice(next.as_slice());
        }
    }
}

/// One Gauss-Seidel sweep of rigid 3D shape matching over all clusters
pub fn project_rigid_3d(tpos: &mut NodalField, stiffness: f64, clusters: &JaggedArray, rest: &[f64]) {
    for ic in 0..clusters.n_rows() {
        let members = clusters.row(ic);
        if members.len() < 2 {
            continue;
        }
        let w = 1.0 / members.len() as f64;
        let cur: Vec<_> = members.iter().map(|&ip| Vector3::from_column_slice(tpos.node(ip))).collect();
        let rst: Vec<_> = members.iter().map(|&ip| Vector3::from_column_slice(&rest[ip * 3..ip * 3 + 3])).collect();
        let pc = cur.iter().sum::<Vector3<f64>>() * w;
        let qc = rst.iter().sum::<Vector3<f64>>() * w;
        let p: Vec<_> = cur.iter().map(|pi| pi - pc).collect();
        let q: Vec<_> = rst.iter().map(|qi| qi - qc).collect();

        let r = rotation_3d(&p, &q);
        for (k, &ip) in members.iter().enumerate() {
            let goal = pc + r * q[k];
            let next = goal * stiffness + cur[k] * (1.0 - stiffness);
            tpos.node_mut(ip).copy_from_slice(next.as_slice());
        }
    }
}

impl Pbd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to `mesh`; the mesh positions are the rest shape and the start state
    pub fn with_mesh(mesh: Mesh) -> Result<Self> {
        let mut pbd = Self::default();
        pbd.updated_topology(mesh, TopologyUpdate::default())?;
        Ok(pbd)
    }

    /// Pin node `ip` to its current position; needs a bound mesh
    pub fn fix_node(&mut self, ip: usize) -> Result<()> {
        if self.mesh.is_none() {
            return Err(Error::NoTopology);
        }
        let np = self.bc.len();
        let flag = self.bc.get_mut(ip).ok_or_else(|| Error::shape("fixed node index bound", np, ip))?;
        *flag = 1;
        Ok(())
    }

    pub fn value(&self) -> &NodalField {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut NodalField {
        &mut self.value
    }

    pub fn velocity(&self) -> &NodalField {
        &self.velocity
    }

    pub fn velocity_mut(&mut self) -> &mut NodalField {
        &mut self.velocity
    }
}

impl PhysicsModel for Pbd {
    fn updated_topology(&mut self, mesh: Mesh, update: TopologyUpdate<'_>) -> Result<()> {
        if update.master_slave.is_some() {
            return Err(Error::MasterSlave("position-based dynamics has no linear system".into()));
        }
        let (np, ndim) = (mesh.num_nodes(), mesh.ndim());
        self.value = NodalField::from_vec(np, ndim, mesh.positions().to_vec())?;
        // positions restart from the new mesh; only the velocity is carried over
        self.velocity = remap_field(&self.velocity, np, ndim, update.mapper);
        self.tpos = self.value.clone();
        self.bc = vec![0; np];
        let mut clusters = mesh.psup().add_diagonal();
        clusters.sort();
        self.clusters = clusters;
        self.mesh = Some(mesh);
        self.state = ModelState::TopologyBound;
        Ok(())
    }

    fn step_time(&mut self) -> Result<()> {
        let mesh = self.mesh.as_ref().ok_or(Error::NoTopology)?;
        let ndim = mesh.ndim();

        for (t, (&u, &v)) in self
            .tpos
            .as_mut_slice()
            .iter_mut()
            .zip(self.value.as_slice().iter().zip(self.velocity.as_slice()))
        {
            *t = u + self.dt * v;
        }
        fix_points(&mut self.tpos, &self.bc, &self.value);
        for _ in 0..self.loop_count {
            match ndim {
                2 => project_rigid_2d(&mut self.tpos, self.stiffness, &self.clusters, mesh.positions()),
                3 => project_rigid_3d(&mut self.tpos, self.stiffness, &self.clusters, mesh.positions()),
                _ => return Err(Error::UnsupportedDimension { what: "shape matching", dim: ndim }),
            }
            fix_points(&mut self.tpos, &self.bc, &self.value);
        }

        for ((v, &t), &u) in self
            .velocity
            .as_mut_slice()
            .iter_mut()
            .zip(self.tpos.as_slice())
            .zip(self.value.as_slice())
        {
            *v = (t - u) / self.dt;
        }
        self.value.as_mut_slice().copy_from_slice(self.tpos.as_slice());
        self.state = ModelState::Stepped;
        Ok(())
    }

    fn state(&self) -> ModelState {
        self.state
    }

    fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }
}

impl FieldRegistry for Pbd {
    fn field_names(&self) -> Vec<&'static str> {
        vec!["value", "velocity"]
    }

    fn field(&self, name: &str) -> Option<&NodalField> {
        match name {
            "value" => Some(&self.value),
            "velocity" => Some(&self.velocity),
            _ => None,
        }
    }
}

impl HasVectorField for Pbd {
    fn vector_field(&self) -> &NodalField {
        &self.value
    }

    fn vector_field_mut(&mut self) -> &mut NodalField {
        &mut self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::ElementType;
    use crate::mesh_generator::MeshGenerator;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_2d_recovers_angle() {
        let q = [Vector2::new(1.0, 0.0), Vector2::new(-1.0, 0.0), Vector2::new(0.0, 0.5)];
        let rot = Matrix2::new(0.6, -0.8, 0.8, 0.6);
        let p: Vec<_> = q.iter().map(|qi| rot * qi).collect();
        assert_relative_eq!(rotation_2d(&p, &q), rot, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_3d_is_proper() {
        let q = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(-1.0, -1.0, -1.0),
        ];
        // mirror image: best proper rotation must not reflect
        let p: Vec<_> = q.iter().map(|qi| Vector3::new(-qi[0], qi[1], qi[2])).collect();
        let r = rotation_3d(&p, &q);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-10);
    }

    #[test]
    fn test_edge_relaxes_to_rest_length() {
        let mut mesh = Mesh::new(2, ElementType::Line2).unwrap();
        mesh.add_node(&[0.0, 0.0]).unwrap();
        mesh.add_node(&[1.0, 0.0]).unwrap();
        mesh.add_element(&[0, 1]).unwrap();

        let mut pbd = Pbd::with_mesh(mesh).unwrap();
        pbd.fix_node(0).unwrap();
        pbd.value_mut().set(1, 0, 2.0);

        let mut length = 2.0;
        for _ in 0..10 {
            pbd.velocity_mut().fill(0.0);
            pbd.step_time().unwrap();
            let next = pbd.value().get(1, 0);
            assert_relative_eq!(next, 0.625 * length + 0.375, epsilon = 1e-12);
            assert!(next < length && next > 1.0);
            length = next;
            assert_eq!(pbd.value().node(0), &[0.0, 0.0]);
        }
    }

    #[test]
    fn test_rest_shape_is_stationary() {
        let mesh = MeshGenerator::cube_tet(1, 1, 1, 1.0, 1.0, 1.0);
        let mut pbd = Pbd::with_mesh(mesh.clone()).unwrap();
        pbd.step_time().unwrap();
        for (a, b) in pbd.value().as_slice().iter().zip(mesh.positions()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
        assert!(pbd.velocity().as_slice().iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    fn test_step_before_topology() {
        let mut pbd = Pbd::new();
        assert!(matches!(pbd.step_time(), Err(Error::NoTopology)));
    }
}

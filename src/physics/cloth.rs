//! Implicit mass-spring cloth with penalty contact.

use crate::error::{Error, Result};
use crate::fem::kernels::{ClothFields, ClothKernel, ContactFields, ContactKernel, MassPointFields, MassPointKernel};
use crate::fem::LinearSystem;
use crate::mesh::{dihedral_quads, ElementType, FieldRegistry, HasVectorField, JaggedArray, Mesh, NodalField};

use super::sdf::SdfList;
use super::{bound_mut, bound_ref, remap_field, Bound, ModelState, PhysicsModel, TopologyUpdate};

/// Triangle cloth moving in 3D
///
/// The unknown of each step is the position increment. After the solve the
/// velocity is replaced by `x / dt` (implicit Euler), not accumulated.
pub struct Cloth {
    pub dt: f64,
    pub stiff_stretch: f64,
    pub stiff_bend: f64,
    /// Mass of every node
    pub mass_point: f64,
    pub gravity: [f64; 3],
    pub contact_stiffness: f64,
    pub contact_clearance: f64,
    /// Obstacles
    pub sdf: SdfList,
    value: NodalField,
    velocity: NodalField,
    quads: Vec<usize>,
    bound: Option<Bound>,
    state: ModelState,
}

impl Default for Cloth {
    fn default() -> Self {
        Self {
            dt: 0.1,
            stiff_stretch: 500.0,
            stiff_bend: 10.0,
            mass_point: 1.0,
            gravity: [0.0, 0.0, -1.0],
            contact_stiffness: 10000.0,
            contact_clearance: 0.1,
            sdf: SdfList::new(),
            value: NodalField::zeros(0, 3),
            velocity: NodalField::zeros(0, 3),
            quads: Vec::new(),
            bound: None,
            state: ModelState::Uninitialized,
        }
    }
}

impl Cloth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn solve(&mut self) -> Result<()> {
        let b = bound_mut(&mut self.bound)?;
        let mesh = &b.mesh;
        let ls = &mut b.ls;

        ls.set_zero()?;
        let stretch = ClothKernel { stiff_stretch: self.stiff_stretch, stiff_bend: self.stiff_bend };
        ls.accumulate(&stretch, mesh, &ClothFields { value: &self.value, quads: &self.quads })?;
        let inertia = MassPointKernel { mass: self.mass_point, dt: self.dt, gravity: self.gravity };
        ls.accumulate(&inertia, mesh, &MassPointFields { value: &self.value, velocity: &self.velocity })?;
        let contact = ContactKernel { stiffness: self.contact_stiffness, clearance: self.contact_clearance };
        ls.accumulate(&contact, mesh, &ContactFields { value: &self.value, obstacles: &self.sdf })?;
        ls.set_bc_ms()?;
        ls.set_precond()?;
        ls.solve_iteration(false)?;

        self.value.axpy(1.0, &ls.x);
        for (v, &dx) in self.velocity.as_mut_slice().iter_mut().zip(&ls.x) {
            *v = dx / self.dt;
        }
        ls.distribute_value(self.value.as_mut_slice());
        ls.distribute_value(self.velocity.as_mut_slice());
        self.state = ModelState::Stepped;
        Ok(())
    }

    /// Current node positions
    pub fn value(&self) -> &NodalField {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut NodalField {
        &mut self.value
    }

    pub fn velocity(&self) -> &NodalField {
        &self.velocity
    }

    /// Bending quads `[opp0, opp1, a, b]`
    pub fn quads(&self) -> &[usize] {
        &self.quads
    }

    pub fn linsys(&self) -> Result<&LinearSystem> {
        Ok(&bound_ref(&self.bound)?.ls)
    }

    pub fn linsys_mut(&mut self) -> Result<&mut LinearSystem> {
        Ok(&mut bound_mut(&mut self.bound)?.ls)
    }
}

impl PhysicsModel for Cloth {
    /// Without a mapper the cloth restarts at rest in the mesh positions
    fn updated_topology(&mut self, mesh: Mesh, update: TopologyUpdate<'_>) -> Result<()> {
        if mesh.elem_type() != ElementType::Tri3 {
            return Err(Error::Mesh(format!("cloth needs a triangle mesh, got {:?}", mesh.elem_type())));
        }
        let np = mesh.num_nodes();
        let quads = dihedral_quads(mesh.elements());
        let pattern = JaggedArray::from_elements(np, mesh.elements(), 3)
            .union(&JaggedArray::from_elements(np, &quads, 4));

        let mut value = remap_field(&self.value, np, 3, update.mapper);
        if update.mapper.is_none() {
            for ip in 0..np {
                let p = mesh.position(ip);
                value.node_mut(ip)[..p.len()].copy_from_slice(p);
            }
        }
        let velocity = remap_field(&self.velocity, np, 3, update.mapper);

        let bound = Bound::with_pattern(mesh, LinearSystem::new(np, 3), &pattern, &update)?;
        log::debug!("cloth bound to {} nodes, {} bending quads", np, quads.len() / 4);
        self.value = value;
        self.velocity = velocity;
        self.quads = quads;
        self.bound = Some(bound);
        self.state = ModelState::TopologyBound;
        Ok(())
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

impl FieldRegistry for Cloth {
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

impl HasVectorField for Cloth {
    fn vector_field(&self) -> &NodalField {
        &self.value
    }

    fn vector_field_mut(&mut self) -> &mut NodalField {
        &mut self.value
    }
}

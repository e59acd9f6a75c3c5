//! Transient scalar diffusion.

use crate::error::Result;
use crate::fem::kernels::{DiffuseFields, DiffuseKernel};
use crate::fem::{LinearSystem, NewmarkFirstOrder};
use crate::mesh::{FieldRegistry, HasScalarField, Mesh, NodalField};

use super::{bound_mut, bound_ref, remap_field, Bound, ModelState, PhysicsModel, TopologyUpdate};

/// `ρ ∂u/∂t = α Δu + source`, integrated with first-order Newmark
pub struct Diffuse {
    pub alpha: f64,
    pub rho: f64,
    pub source: f64,
    pub dt: f64,
    pub gamma_newmark: f64,
    value: NodalField,
    velocity: NodalField,
    bound: Option<Bound>,
    state: ModelState,
}

impl Default for Diffuse {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            rho: 1.0,
            source: 0.0,
            dt: 0.01,
            gamma_newmark: 0.6,
            value: NodalField::zeros(0, 1),
            velocity: NodalField::zeros(0, 1),
            bound: None,
            state: ModelState::Uninitialized,
        }
    }
}

impl Diffuse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn solve(&mut self) -> Result<()> {
        let scheme = NewmarkFirstOrder::new(self.dt, self.gamma_newmark)?;
        let kernel = DiffuseKernel {
            alpha: self.alpha,
            rho: self.rho,
            source: self.source,
            dt: self.dt,
            gamma: self.gamma_newmark,
        };
        let b = bound_mut(&mut self.bound)?;
        let fields = DiffuseFields { value: &self.value, velocity: &self.velocity };
        b.ls.assemble_and_solve(&kernel, &b.mesh, &fields, false)?;

        scheme.update(&mut self.value, &mut self.velocity, &b.ls.x);
        b.ls.distribute_value(self.value.as_mut_slice());
        b.ls.distribute_value(self.velocity.as_mut_slice());
        self.state = ModelState::Stepped;
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

    pub fn linsys(&self) -> Result<&LinearSystem> {
        Ok(&bound_ref(&self.bound)?.ls)
    }

    pub fn linsys_mut(&mut self) -> Result<&mut LinearSystem> {
        Ok(&mut bound_mut(&mut self.bound)?.ls)
    }
}

impl PhysicsModel for Diffuse {
    fn updated_topology(&mut self, mesh: Mesh, update: TopologyUpdate<'_>) -> Result<()> {
        let np = mesh.num_nodes();
        let bound = Bound::new(mesh, 1, &update)?;
        self.value = remap_field(&self.value, np, 1, update.mapper);
        self.velocity = remap_field(&self.velocity, np, 1, update.mapper);
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

impl FieldRegistry for Diffuse {
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

impl HasScalarField for Diffuse {
    fn scalar_field(&self) -> &NodalField {
        &self.value
    }

    fn scalar_field_mut(&mut self) -> &mut NodalField {
        &mut self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;
    use crate::error::Error;

    #[test]
    fn test_source_heats_domain() {
        let mesh = MeshGenerator::rectangle_tri(3, 3, 1.0, 1.0);
        let mut model = Diffuse { source: 1.0, ..Diffuse::default() };
        model.updated_topology(mesh, TopologyUpdate::default()).unwrap();
        model.linsys_mut().unwrap().fix_node(0, &[0]).unwrap();

        for _ in 0..5 {
            model.step_time().unwrap();
        }
        assert_eq!(model.value().get(0, 0), 0.0);
        assert_eq!(model.velocity().get(0, 0), 0.0);
        let total: f64 = model.value().as_slice().iter().sum();
        assert!(total > 0.0);
        assert!(model.value().is_finite());
    }

    #[test]
    fn test_registry() {
        let model = Diffuse::new();
        assert_eq!(model.field_names(), vec!["value", "velocity"]);
        assert!(model.field("velocity").is_some());
        assert!(model.field("acceleration").is_none());
    }

    #[test]
    fn test_bad_newmark_gamma_fails_before_solving() {
        let mesh = MeshGenerator::rectangle_tri(2, 2, 1.0, 1.0);
        let mut model = Diffuse { source: 1.0, gamma_newmark: 1.5, ..Diffuse::default() };
        model.updated_topology(mesh, TopologyUpdate::default()).unwrap();
        assert!(matches!(model.step_time(), Err(Error::Config(_))));
        assert_eq!(model.state(), ModelState::TopologyBound);
        assert!(model.linsys().unwrap().conv_hist().is_empty());
        assert!(model.value().as_slice().iter().all(|&v| v == 0.0));
    }
}

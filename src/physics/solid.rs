//! Linear elastic solids, static and dynamic.

use crate::error::Result;
use crate::fem::kernels::{DynamicFields, SolidDynamicKernel, SolidStaticKernel};
use crate::fem::{LinearSystem, NewmarkSecondOrder};
use crate::mesh::{FieldRegistry, HasVectorField, Mesh, NodalField};

use super::{bound_mut, bound_ref, remap_field, Bound, ModelState, PhysicsModel, TopologyUpdate};

/// Small-strain static equilibrium; `value` is the displacement
pub struct SolidLinearStatic {
    pub myu: f64,
    pub lambda: f64,
    pub rho: f64,
    pub gravity: [f64; 3],
    value: NodalField,
    bound: Option<Bound>,
    state: ModelState,
}

impl Default for SolidLinearStatic {
    fn default() -> Self {
        Self::new([0.0; 3])
    }
}

impl SolidLinearStatic {
    pub fn new(gravity: [f64; 3]) -> Self {
        Self {
            myu: 1.0,
            lambda: 0.0,
            rho: 1.0,
            gravity,
            value: NodalField::zeros(0, 0),
            bound: None,
            state: ModelState::Uninitialized,
        }
    }

    pub fn solve(&mut self) -> Result<()> {
        let kernel = SolidStaticKernel {
            myu: self.myu,
            lambda: self.lambda,
            rho: self.rho,
            gravity: self.gravity,
        };
        let b = bound_mut(&mut self.bound)?;
        b.ls.assemble_and_solve(&kernel, &b.mesh, &self.value, false)?;
        self.value.axpy(1.0, &b.ls.x);
        b.ls.distribute_value(self.value.as_mut_slice());
        self.state = ModelState::Stepped;
        Ok(())
    }

    pub fn value(&self) -> &NodalField {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut NodalField {
        &mut self.value
    }

    pub fn linsys(&self) -> Result<&LinearSystem> {
        Ok(&bound_ref(&self.bound)?.ls)
    }

    pub fn linsys_mut(&mut self) -> Result<&mut LinearSystem> {
        Ok(&mut bound_mut(&mut self.bound)?.ls)
    }
}

impl PhysicsModel for SolidLinearStatic {
    fn updated_topology(&mut self, mesh: Mesh, update: TopologyUpdate<'_>) -> Result<()> {
        let (np, ndim) = (mesh.num_nodes(), mesh.ndim());
        let bound = Bound::new(mesh, ndim, &update)?;
        self.value = remap_field(&self.value, np, ndim, update.mapper);
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

impl FieldRegistry for SolidLinearStatic {
    fn field_names(&self) -> Vec<&'static str> {
        vec!["value"]
    }

    fn field(&self, name: &str) -> Option<&NodalField> {
        match name {
            "value" => Some(&self.value),
            _ => None,
        }
    }
}

impl HasVectorField for SolidLinearStatic {
    fn vector_field(&self) -> &NodalField {
        &self.value
    }

    fn vector_field_mut(&mut self) -> &mut NodalField {
        &mut self.value
    }
}

/// Elastodynamics with second-order Newmark (β, γ)
pub struct SolidLinearDynamic {
    pub myu: f64,
    pub lambda: f64,
    pub rho: f64,
    pub gravity: [f64; 3],
    pub dt: f64,
    pub gamma_newmark: f64,
    pub beta_newmark: f64,
    value: NodalField,
    velocity: NodalField,
    acceleration: NodalField,
    bound: Option<Bound>,
    state: ModelState,
}

impl Default for SolidLinearDynamic {
    fn default() -> Self {
        Self::new([0.0; 3])
    }
}

impl SolidLinearDynamic {
    pub fn new(gravity: [f64; 3]) -> Self {
        Self {
            myu: 1.0,
            lambda: 0.0,
            rho: 1.0,
            gravity,
            dt: 0.1,
            gamma_newmark: 0.6,
            beta_newmark: 0.36,
            value: NodalField::zeros(0, 0),
            velocity: NodalField::zeros(0, 0),
            acceleration: NodalField::zeros(0, 0),
            bound: None,
            state: ModelState::Uninitialized,
        }
    }

    pub fn solve(&mut self) -> Result<()> {
        let scheme = NewmarkSecondOrder::new(self.dt, self.gamma_newmark, self.beta_newmark)?;
        let kernel = SolidDynamicKernel {
            myu: self.myu,
            lambda: self.lambda,
            rho: self.rho,
            gravity: self.gravity,
            dt: self.dt,
            gamma: self.gamma_newmark,
            beta: self.beta_newmark,
        };
        let b = bound_mut(&mut self.bound)?;
        let fields = DynamicFields {
            value: &self.value,
            velocity: &self.velocity,
            acceleration: &self.acceleration,
        };
        b.ls.assemble_and_solve(&kernel, &b.mesh, &fields, false)?;

        scheme.update(
            &mut self.value,
            &mut self.velocity,
            &mut self.acceleration,
            &b.ls.x,
        );
        for field in [&mut self.value, &mut self.velocity, &mut self.acceleration] {
            b.ls.distribute_value(field.as_mut_slice());
        }
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

    pub fn acceleration(&self) -> &NodalField {
        &self.acceleration
    }

    pub fn linsys(&self) -> Result<&LinearSystem> {
        Ok(&bound_ref(&self.bound)?.ls)
    }

    pub fn linsys_mut(&mut self) -> Result<&mut LinearSystem> {
        Ok(&mut bound_mut(&mut self.bound)?.ls)
    }
}

impl PhysicsModel for SolidLinearDynamic {
    fn updated_topology(&mut self, mesh: Mesh, update: TopologyUpdate<'_>) -> Result<()> {
        let (np, ndim) = (mesh.num_nodes(), mesh.ndim());
        let bound = Bound::new(mesh, ndim, &update)?;
        self.value = remap_field(&self.value, np, ndim, update.mapper);
        self.velocity = remap_field(&self.velocity, np, ndim, update.mapper);
        self.acceleration = remap_field(&self.acceleration, np, ndim, update.mapper);
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

impl FieldRegistry for SolidLinearDynamic {
    fn field_names(&self) -> Vec<&'static str> {
        vec!["value", "velocity", "acceleration"]
    }

    fn field(&self, name: &str) -> Option<&NodalField> {
        match name {
            "value" => Some(&self.value),
            "velocity" => Some(&self.velocity),
            "acceleration" => Some(&self.acceleration),
            _ => None,
        }
    }
}

impl HasVectorField for SolidLinearDynamic {
    fn vector_field(&self) -> &NodalField {
        &self.value
    }

    fn vector_field_mut(&mut self) -> &mut NodalField {
        &mut self.value
    }
}

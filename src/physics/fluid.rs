//! Incompressible 2D flow: steady Stokes, unsteady Stokes and Navier-Stokes.
//!
//! All three carry `(u, v, p)` per node. Pressure is fixed up to a constant
//! unless a pressure DOF is constrained, so callers usually fix one.

use crate::error::{Error, Result};
use crate::fem::kernels::{NavierStokesKernel, StokesDynamicKernel, StokesFields, StokesStaticKernel};
use crate::fem::{AssemblyKernel, LinearSystem, NewmarkFirstOrder};
use crate::mesh::{ElementType, FieldRegistry, HasVectorField, Mesh, NodalField};

use super::{bound_mut, bound_ref, remap_field, Bound, ModelState, PhysicsModel, TopologyUpdate};

const NDIMVAL: usize = 3;

fn check_flow_mesh(mesh: &Mesh) -> Result<()> {
    if mesh.ndim() != 2 || mesh.elem_type() != ElementType::Tri3 {
        return Err(Error::UnsupportedDimension { what: "2D flow (triangles only)", dim: mesh.ndim() });
    }
    Ok(())
}

/// Steady Stokes flow, solved in one linear step
pub struct StokesStatic2D {
    pub myu: f64,
    pub gravity: [f64; 2],
    value: NodalField,
    bound: Option<Bound>,
    state: ModelState,
}

impl Default for StokesStatic2D {
    fn default() -> Self {
        Self {
            myu: 1.0,
            gravity: [0.0, 0.0],
            value: NodalField::zeros(0, NDIMVAL),
            bound: None,
            state: ModelState::Uninitialized,
        }
    }
}

impl StokesStatic2D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn solve(&mut self) -> Result<()> {
        let kernel = StokesStaticKernel { myu: self.myu, gravity: self.gravity };
        let b = bound_mut(&mut self.bound)?;
        let fields = StokesFields { value: &self.value, velocity: None };
        b.ls.assemble_and_solve(&kernel, &b.mesh, &fields, false)?;
        self.value.axpy(1.0, &b.ls.x);
        b.ls.distribute_value(self.value.as_mut_slice());
        self.state = ModelState::Stepped;
        Ok(())
    }

    /// `(u, v, p)` per node
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

impl PhysicsModel for StokesStatic2D {
    fn updated_topology(&mut self, mesh: Mesh, update: TopologyUpdate<'_>) -> Result<()> {
        check_flow_mesh(&mesh)?;
        let np = mesh.num_nodes();
        let bound = Bound::new(mesh, NDIMVAL, &update)?;
        self.value = remap_field(&self.value, np, NDIMVAL, update.mapper);
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

impl FieldRegistry for StokesStatic2D {
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

impl HasVectorField for StokesStatic2D {
    fn vector_field(&self) -> &NodalField {
        &self.value
    }

    fn vector_field_mut(&mut self) -> &mut NodalField {
        &mut self.value
    }
}

/// State and binding shared by the transient flow models
struct TransientFlow {
    value: NodalField,
    velocity: NodalField,
    bound: Option<Bound>,
    state: ModelState,
}

impl TransientFlow {
    fn new() -> Self {
        Self {
            value: NodalField::zeros(0, NDIMVAL),
            velocity: NodalField::zeros(0, NDIMVAL),
            bound: None,
            state: ModelState::Uninitialized,
        }
    }

    fn bind(&mut self, mesh: Mesh, update: TopologyUpdate<'_>, symmetric: bool) -> Result<()> {
        check_flow_mesh(&mesh)?;
        let np = mesh.num_nodes();
        let ls = LinearSystem::with_storage(np, NDIMVAL, symmetric);
        let psup = mesh.psup();
        let bound = Bound::with_pattern(mesh, ls, &psup, &update)?;
        self.value = remap_field(&self.value, np, NDIMVAL, update.mapper);
        self.velocity = remap_field(&self.velocity, np, NDIMVAL, update.mapper);
        self.bound = Some(bound);
        self.state = ModelState::TopologyBound;
        Ok(())
    }

    fn step<K>(&mut self, kernel: &K, dt: f64, gamma: f64, is_asymmetric: bool) -> Result<()>
    where
        K: for<'a> AssemblyKernel<StokesFields<'a>>,
    {
        let scheme = NewmarkFirstOrder::new(dt, gamma)?;
        let b = bound_mut(&mut self.bound)?;
        let fields = StokesFields { value: &self.value, velocity: Some(&self.velocity) };
        b.ls.assemble_and_solve(kernel, &b.mesh, &fields, is_asymmetric)?;
        scheme.update(&mut self.value, &mut self.velocity, &b.ls.x);
        b.ls.distribute_value(self.value.as_mut_slice());
        b.ls.distribute_value(self.velocity.as_mut_slice());
        self.state = ModelState::Stepped;
        Ok(())
    }

    fn field(&self, name: &str) -> Option<&NodalField> {
        match name {
            "value" => Some(&self.value),
            "velocity" => Some(&self.velocity),
            _ => None,
        }
    }
}

/// Unsteady Stokes flow with first-order Newmark
pub struct StokesDynamic2D {
    pub myu: f64,
    pub rho: f64,
    pub gravity: [f64; 2],
    pub dt: f64,
    pub gamma_newmark: f64,
    flow: TransientFlow,
}

impl Default for StokesDynamic2D {
    fn default() -> Self {
        Self {
            myu: 1.0,
            rho: 1.0,
            gravity: [0.0, 0.0],
            dt: 0.005,
            gamma_newmark: 0.6,
            flow: TransientFlow::new(),
        }
    }
}

/// Unsteady Navier-Stokes flow, solved with BiCGSTAB
pub struct NavierStokes2D {
    pub myu: f64,
    pub rho: f64,
    pub gravity: [f64; 2],
    pub dt: f64,
    pub gamma_newmark: f64,
    flow: TransientFlow,
}

impl Default for NavierStokes2D {
    fn default() -> Self {
        Self {
            myu: 1.0,
            rho: 1000.0,
            gravity: [0.0, 0.0],
            dt: 0.1,
            gamma_newmark: 0.6,
            flow: TransientFlow::new(),
        }
    }
}

impl StokesDynamic2D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn solve(&mut self) -> Result<()> {
        let kernel = StokesDynamicKernel {
            rho: self.rho,
            myu: self.myu,
            gravity: self.gravity,
            dt: self.dt,
            gamma: self.gamma_newmark,
        };
        self.flow.step(&kernel, self.dt, self.gamma_newmark, false)
    }
}

impl NavierStokes2D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn solve(&mut self) -> Result<()> {
        let kernel = NavierStokesKernel {
            rho: self.rho,
            myu: self.myu,
            gravity: self.gravity,
            dt: self.dt,
            gamma: self.gamma_newmark,
        };
        self.flow.step(&kernel, self.dt, self.gamma_newmark, true)
    }
}

macro_rules! transient_flow_model {
    ($model:ty, $symmetric:expr) => {
        impl $model {
            /// `(u, v, p)` per node
            pub fn value(&self) -> &NodalField {
                &self.flow.value
            }

            pub fn value_mut(&mut self) -> &mut NodalField {
                &mut self.flow.value
            }

            pub fn velocity(&self) -> &NodalField {
                &self.flow.velocity
            }

            pub fn linsys(&self) -> Result<&LinearSystem> {
                Ok(&bound_ref(&self.flow.bound)?.ls)
            }

            pub fn linsys_mut(&mut self) -> Result<&mut LinearSystem> {
                Ok(&mut bound_mut(&mut self.flow.bound)?.ls)
            }
        }

        impl PhysicsModel for $model {
            fn updated_topology(&mut self, mesh: Mesh, update: TopologyUpdate<'_>) -> Result<()> {
                self.flow.bind(mesh, update, $symmetric)
            }

            fn step_time(&mut self) -> Result<()> {
                self.solve()
            }

            fn state(&self) -> ModelState {
                self.flow.state
            }

            fn mesh(&self) -> Option<&Mesh> {
                self.flow.bound.as_ref().map(|b| &b.mesh)
            }
        }

        impl FieldRegistry for $model {
            fn field_names(&self) -> Vec<&'static str> {
                vec!["value", "velocity"]
            }

            fn field(&self, name: &str) -> Option<&NodalField> {
                self.flow.field(name)
            }
        }

        impl HasVectorField for $model {
            fn vector_field(&self) -> &NodalField {
                &self.flow.value
            }

            fn vector_field_mut(&mut self) -> &mut NodalField {
                &mut self.flow.value
            }
        }
    };
}

transient_flow_model!(StokesDynamic2D, true);
// convection makes the matrix non-symmetric
transient_flow_model!(NavierStokes2D, false);

//! Scalar Poisson problem `-α Δu = source`.

use crate::error::Result;
use crate::fem::kernels::PoissonKernel;
use crate::fem::LinearSystem;
use crate::mesh::{FieldRegistry, HasScalarField, Mesh, NodalField};

use super::{bound_mut, bound_ref, remap_field, Bound, ModelState, PhysicsModel, TopologyUpdate};

/// Steady scalar diffusion solved in one linear step
///
/// Each [`solve`](Poisson::solve) adds the correction `x` to `value`, so a
/// second solve on an unchanged problem gives a (near) zero increment.
pub struct Poisson {
    pub alpha: f64,
    pub source: f64,
    value: NodalField,
    bound: Option<Bound>,
    state: ModelState,
}

impl Default for Poisson {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl Poisson {
    pub fn new(alpha: f64, source: f64) -> Self {
        Self {
            alpha,
            source,
            value: NodalField::zeros(0, 1),
            bound: None,
            state: ModelState::Uninitialized,
        }
    }

    pub fn solve(&mut self) -> Result<()> {
        let kernel = PoissonKernel { alpha: self.alpha, source: self.source };
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

    /// Prescribe values on fixed nodes before solving
    pub fn value_mut(&mut self) -> &mut NodalField {
        &mut self.value
    }

    pub fn linsys(&self) -> Result<&LinearSystem> {
        Ok(&bound_ref(&self.bound)?.ls)
    }

    /// Boundary flags and solver settings live here
    pub fn linsys_mut(&mut self) -> Result<&mut LinearSystem> {
        Ok(&mut bound_mut(&mut self.bound)?.ls)
    }
}

impl PhysicsModel for Poisson {
    fn updated_topology(&mut self, mesh: Mesh, update: TopologyUpdate<'_>) -> Result<()> {
        let np = mesh.num_nodes();
        let bound = Bound::new(mesh, 1, &update)?;
        self.value = remap_field(&self.value, np, 1, update.mapper);
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

impl FieldRegistry for Poisson {
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

impl HasScalarField for Poisson {
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
    use crate::error::Error;
    use crate::mesh_generator::MeshGenerator;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_before_topology() {
        let mut model = Poisson::default();
        assert_eq!(model.state(), ModelState::Uninitialized);
        assert!(matches!(model.solve(), Err(Error::NoTopology)));
        assert!(model.linsys_mut().is_err());
    }

    #[test]
    fn test_linear_profile() {
        let mesh = MeshGenerator::rectangle_tri(4, 4, 1.0, 1.0);
        let mut model = Poisson::default();
        model.updated_topology(mesh, TopologyUpdate::default()).unwrap();
        assert_eq!(model.state(), ModelState::TopologyBound);

        let mesh = model.mesh().unwrap().clone();
        let ls = model.linsys_mut().unwrap();
        ls.conv_ratio = 1e-10;
        let mut left = Vec::new();
        for ip in 0..mesh.num_nodes() {
            let x = mesh.position(ip)[0];
            if x < 1e-9 || x > 1.0 - 1e-9 {
                ls.fix_node(ip, &[0]).unwrap();
            }
            if x < 1e-9 {
                left.push(ip);
            }
        }
        for ip in left {
            model.value_mut().set(ip, 0, 1.0);
        }
        model.solve().unwrap();
        assert_eq!(model.state(), ModelState::Stepped);

        for ip in 0..mesh.num_nodes() {
            let x = mesh.position(ip)[0];
            assert_relative_eq!(model.value().get(ip, 0), 1.0 - x, epsilon = 1e-6);
        }
    }
}

//! Physical models built on the linear-system driver, plus position-based dynamics.
//!
//! Every model follows the same life cycle: `updated_topology` binds it to a
//! mesh and allocates its fields and linear system, then `step_time` (or
//! `solve`) assembles, solves and integrates the increment into the fields.

pub mod sdf;
pub mod poisson;
pub mod diffuse;
pub mod solid;
pub mod eigen;
pub mod cloth;
pub mod fluid;
pub mod pbd;

pub use sdf::{Plane, SdfList, SignedDistanceField, Sphere};
pub use poisson::Poisson;
pub use diffuse::Diffuse;
pub use solid::{SolidLinearDynamic, SolidLinearStatic};
pub use eigen::SolidLinearEigen;
pub use cloth::Cloth;
pub use fluid::{NavierStokes2D, StokesDynamic2D, StokesStatic2D};
pub use pbd::Pbd;

use crate::error::{Error, Result};
use crate::fem::LinearSystem;
use crate::mesh::{JaggedArray, Mesh, NodalField, NodeMapper};

/// Life-cycle state of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// No mesh bound yet
    Uninitialized,
    /// Fields and linear system allocated for the current mesh
    TopologyBound,
    /// At least one step taken on the current mesh
    Stepped,
}

/// Optional inputs of a topology change
#[derive(Default, Clone, Copy)]
pub struct TopologyUpdate<'a> {
    /// Fills values of new nodes after remeshing; old values are kept in the
    /// leading rows
    pub mapper: Option<&'a dyn NodeMapper>,
    /// Per-DOF master array, see [`crate::linalg::master_slave`]
    pub master_slave: Option<&'a [usize]>,
}

impl<'a> TopologyUpdate<'a> {
    pub fn with_mapper(mapper: &'a dyn NodeMapper) -> Self {
        Self {
            mapper: Some(mapper),
            master_slave: None,
        }
    }

    pub fn with_master_slave(master_slave: &'a [usize]) -> Self {
        Self {
            mapper: None,
            master_slave: Some(master_slave),
        }
    }
}

/// Common interface of all models
pub trait PhysicsModel {
    /// Bind to a (new) mesh, reallocating fields and the linear system
    fn updated_topology(&mut self, mesh: Mesh, update: TopologyUpdate<'_>) -> Result<()>;

    /// Advance one step
    fn step_time(&mut self) -> Result<()>;

    fn state(&self) -> ModelState;

    /// Bound mesh, if any
    fn mesh(&self) -> Option<&Mesh>;
}

/// Mesh and linear system of a model bound to a topology
pub(crate) struct Bound {
    pub mesh: Mesh,
    pub ls: LinearSystem,
}

impl Bound {
    /// Symmetric linear system over the element adjacency of `mesh`
    pub fn new(mesh: Mesh, ndimval: usize, update: &TopologyUpdate<'_>) -> Result<Self> {
        let ls = LinearSystem::new(mesh.num_nodes(), ndimval);
        let psup = mesh.psup();
        Self::with_pattern(mesh, ls, &psup, update)
    }

    /// Bind a caller-built linear system using an explicit node adjacency
    pub fn with_pattern(
        mesh: Mesh,
        mut ls: LinearSystem,
        adjacency: &JaggedArray,
        update: &TopologyUpdate<'_>,
    ) -> Result<Self> {
        if ls.np() != mesh.num_nodes() {
            return Err(Error::shape("linear system nodes", mesh.num_nodes(), ls.np()));
        }
        ls.set_pattern(adjacency, update.master_slave)?;
        Ok(Self { mesh, ls })
    }
}

pub(crate) fn bound_ref(bound: &Option<Bound>) -> Result<&Bound> {
    bound.as_ref().ok_or(Error::NoTopology)
}

pub(crate) fn bound_mut(bound: &mut Option<Bound>) -> Result<&mut Bound> {
    bound.as_mut().ok_or(Error::NoTopology)
}

/// Reallocate a field for `np` nodes, carrying old values through `mapper`
///
/// Without a mapper the new field is zero.
pub(crate) fn remap_field(
    old: &NodalField,
    np: usize,
    ndim: usize,
    mapper: Option<&dyn NodeMapper>,
) -> NodalField {
    let mut field = NodalField::zeros(np, ndim);
    if let Some(mapper) = mapper {
        if old.ndim() == ndim {
            field.copy_leading_rows(old);
        }
        mapper.map(&mut field);
    }
    field
}

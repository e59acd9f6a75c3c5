//! Reference P1 element kernels, one per physical model.

pub mod poisson;
pub mod diffuse;
pub mod solid;
pub mod cloth;
pub mod fluid;

pub use poisson::PoissonKernel;
pub use diffuse::{DiffuseFields, DiffuseKernel};
pub use solid::{elastic_stiffness, DynamicFields, SolidDynamicKernel, SolidStaticKernel};
pub use cloth::{ClothFields, ClothKernel, ContactFields, ContactKernel, MassPointFields, MassPointKernel};
pub use fluid::{NavierStokesKernel, StokesDynamicKernel, StokesFields, StokesStaticKernel};

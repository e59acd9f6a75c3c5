pub mod element;
pub mod kernel;
pub mod kernels;
pub mod linsys;
pub mod time_integration;

pub use element::{consistent_mass, lumped_mass, P1Geometry};
pub use kernel::{assemble_elements, AssemblyKernel};
pub use linsys::LinearSystem;
pub use time_integration::{NewmarkFirstOrder, NewmarkSecondOrder};

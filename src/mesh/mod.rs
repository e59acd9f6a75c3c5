pub mod topology;
pub mod geometry;
pub mod fields;
pub mod mapper;

pub use topology::{JaggedArray, dihedral_quads};
pub use geometry::{Mesh, ElementType};
pub use fields::{NodalField, FieldRegistry, HasScalarField, HasVectorField};
pub use mapper::{NodeMapper, InterpolationMap};

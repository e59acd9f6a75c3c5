pub mod error;
pub mod mesh;
pub mod mesh_generator;
pub mod linalg;
pub mod fem;
pub mod physics;
pub mod config;
pub mod bc;     // Prescribed values
pub mod utils;

pub use error::{Error, Result};
pub use mesh::{ElementType, FieldRegistry, HasScalarField, HasVectorField, InterpolationMap, JaggedArray, Mesh, NodalField, NodeMapper};
pub use mesh_generator::MeshGenerator;
pub use linalg::{solve_bicgstab, solve_pcg, BiCGSTAB, BlockSparseMatrix, ConjugateGradient, ILUPreconditioner, LinearOperator, Preconditioner, Solver, SolverStats};
pub use fem::{AssemblyKernel, LinearSystem, NewmarkFirstOrder, NewmarkSecondOrder};
pub use physics::{
    Cloth, Diffuse, ModelState, NavierStokes2D, Pbd, PhysicsModel, Plane, Poisson, SdfList, SignedDistanceField,
    SolidLinearDynamic, SolidLinearEigen, SolidLinearStatic, Sphere, StokesDynamic2D, StokesStatic2D, TopologyUpdate,
};
pub use config::SimulationConfig;
pub use bc::FieldValueSetter;
pub use utils::{ExpressionEvaluator, MathExpression};

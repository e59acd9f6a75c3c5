pub mod solver;
pub mod sparse;
pub mod master_slave;
pub mod iterative;
pub mod preconditioner;

pub use solver::{LinearOperator, Solver, SolverStats, SolverUtils};
pub use sparse::BlockSparseMatrix;
pub use iterative::{solve_bicgstab, solve_pcg, BiCGSTAB, ConjugateGradient};
pub use preconditioner::{ILUPreconditioner, IdentityPreconditioner, Preconditioner};

//! Utility modules
//!
//! Helpers that are not tied to a specific physics model.

pub mod expr;

pub use expr::{ExpressionEvaluator, MathExpression};

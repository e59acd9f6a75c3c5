//! Time-dependent prescribed values
//!
//! A [`FieldValueSetter`] drives one component of a field on a set of nodes
//! from a math expression in `t, x, y, z`. The nodes are normally also fixed
//! in the model's linear system so that the solver leaves the prescribed
//! values alone.

use crate::error::{Error, Result};
use crate::mesh::{Mesh, NodalField};
use crate::utils::expr::{ExpressionEvaluator, MathExpression};

/// Sets `value[ip, idim] = position[ip, idim] + expr(t, x, y, z)` each step
pub struct FieldValueSetter<E: ExpressionEvaluator = MathExpression> {
    evaluator: E,
    idim: usize,
    nodes: Vec<usize>,
    dt: f64,
    time: f64,
}

impl FieldValueSetter<MathExpression> {
    pub fn new(expression: &str, idim: usize, nodes: Vec<usize>, dt: f64) -> Result<Self> {
        Self::with_evaluator(MathExpression::new(), expression, idim, nodes, dt)
    }
}

impl<E: ExpressionEvaluator> FieldValueSetter<E> {
    pub fn with_evaluator(mut evaluator: E, expression: &str, idim: usize, nodes: Vec<usize>, dt: f64) -> Result<Self> {
        for key in ["t", "x", "y", "z"] {
            evaluator.set_key(key, 0.0);
        }
        evaluator.set_expression(expression)?;
        Ok(Self {
            evaluator,
            idim,
            nodes,
            dt,
            time: 0.0,
        })
    }

    /// Time after the last step
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Advance time by `dt` and write the prescribed values into `value`
    pub fn step_time(&mut self, mesh: &Mesh, value: &mut NodalField) -> Result<()> {
        let ndim = mesh.ndim();
        if self.idim >= ndim || self.idim >= value.ndim() {
            return Err(Error::UnsupportedDimension { what: "prescribed component", dim: self.idim });
        }
        if value.n_nodes() != mesh.num_nodes() {
            return Err(Error::shape("prescribed field nodes", mesh.num_nodes(), value.n_nodes()));
        }
        if let Some(&bad) = self.nodes.iter().find(|&&ip| ip >= mesh.num_nodes()) {
            return Err(Error::Mesh(format!("prescribed node {} out of bounds", bad)));
        }

        self.time += self.dt;
        self.evaluator.set_key("t", self.time);
        for &ip in &self.nodes {
            let p = mesh.position(ip);
            self.evaluator.set_key("x", p[0]);
            self.evaluator.set_key("y", p[1]);
            if ndim == 3 {
                self.evaluator.set_key("z", p[2]);
            }
            let offset = self.evaluator.eval()?;
            value.set(ip, self.idim, p[self.idim] + offset);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;
    use approx::assert_relative_eq;

    #[test]
    fn test_prescribed_translation() {
        let mesh = MeshGenerator::rectangle_tri(2, 1, 2.0, 1.0);
        let mut value = NodalField::from_vec(mesh.num_nodes(), 2, mesh.positions().to_vec()).unwrap();
        let mut setter = FieldValueSetter::new("0.5 * t + y", 0, vec![2, 5], 0.1).unwrap();

        setter.step_time(&mesh, &mut value).unwrap();
        setter.step_time(&mesh, &mut value).unwrap();
        assert_relative_eq!(setter.time(), 0.2);
        // node 2 at (2, 0), node 5 at (2, 1)
        assert_relative_eq!(value.get(2, 0), 2.1);
        assert_relative_eq!(value.get(5, 0), 3.1);
        assert_relative_eq!(value.get(5, 1), 1.0);
        assert_relative_eq!(value.get(0, 0), 0.0);
    }

    #[test]
    fn test_bad_expression_rejected() {
        assert!(FieldValueSetter::new("sin(", 0, vec![0], 0.1).is_err());
    }

    #[test]
    fn test_component_out_of_range() {
        let mesh = MeshGenerator::rectangle_tri(1, 1, 1.0, 1.0);
        let mut value = NodalField::zeros(mesh.num_nodes(), 2);
        let mut setter = FieldValueSetter::new("z", 2, vec![0], 0.1).unwrap();
        assert!(setter.step_time(&mesh, &mut value).is_err());
        assert_relative_eq!(setter.time(), 0.0);
    }
}

//! Remapping of nodal values after remeshing.
//!
//! When a mesh is refined, new nodes are appended after the old ones. The
//! model copies the old values into the leading rows of the new arrays and a
//! [`NodeMapper`] fills in the rest.

use super::fields::NodalField;

/// Fills values of new nodes from existing ones
pub trait NodeMapper {
    /// `values` already holds the old values in its leading rows
    fn map(&self, values: &mut NodalField);
}

/// Each new node is a weighted combination of parent nodes
///
/// Entry `k` describes node `first_new + k`.
#[derive(Debug, Clone, Default)]
pub struct InterpolationMap {
    first_new: usize,
    parents: Vec<Vec<(usize, f64)>>,
}

impl InterpolationMap {
    pub fn new(first_new: usize) -> Self {
        Self {
            first_new,
            parents: Vec::new(),
        }
    }

    /// Register the next new node as `sum(w * parent)`
    pub fn push(&mut self, parents: Vec<(usize, f64)>) -> &mut Self {
        self.parents.push(parents);
        self
    }

    /// Register the next new node as the midpoint of an edge
    pub fn push_midpoint(&mut self, a: usize, b: usize) -> &mut Self {
        self.push(vec![(a, 0.5), (b, 0.5)])
    }

    pub fn num_new_nodes(&self) -> usize {
        self.parents.len()
    }
}

impl NodeMapper for InterpolationMap {
    fn map(&self, values: &mut NodalField) {
        let ndim = values.ndim();
        // parents may themselves be new nodes, so fill in order
        for (k, parents) in self.parents.iter().enumerate() {
            let ip = self.first_new + k;
            if ip >= values.n_nodes() {
                break;
            }
            for idim in 0..ndim {
                let v: f64 = parents.iter().map(|&(jp, w)| w * values.get(jp, idim)).sum();
                values.set(ip, idim, v);
            }
        }
    }
}

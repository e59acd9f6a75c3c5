use crate::error::{Error, Result};

/// Dense nodal field of shape `(n_nodes, ndim)`, stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct NodalField {
    n_nodes: usize,
    ndim: usize,
    data: Vec<f64>,
}

impl NodalField {
    pub fn zeros(n_nodes: usize, ndim: usize) -> Self {
        Self {
            n_nodes,
            ndim,
            data: vec![0.0; n_nodes * ndim],
        }
    }

    /// Wrap an existing flat array
    pub fn from_vec(n_nodes: usize, ndim: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != n_nodes * ndim {
            return Err(Error::shape("nodal field", n_nodes * ndim, data.len()));
        }
        Ok(Self { n_nodes, ndim, data })
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// `(n_nodes, ndim)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_nodes, self.ndim)
    }

    pub fn get(&self, ip: usize, idim: usize) -> f64 {
        self.data[ip * self.ndim + idim]
    }

    pub fn set(&mut self, ip: usize, idim: usize, value: f64) {
        self.data[ip * self.ndim + idim] = value;
    }

    pub fn node(&self, ip: usize) -> &[f64] {
        &self.data[ip * self.ndim..(ip + 1) * self.ndim]
    }

    pub fn node_mut(&mut self, ip: usize) -> &mut [f64] {
        &mut self.data[ip * self.ndim..(ip + 1) * self.ndim]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    /// `self += alpha * other`
    pub fn axpy(&mut self, alpha: f64, other: &[f64]) {
        debug_assert_eq!(self.data.len(), other.len());
        for (a, &b) in self.data.iter_mut().zip(other) {
            *a += alpha * b;
        }
    }

    /// Copy the overlapping leading rows of `other` (same `ndim`)
    pub fn copy_leading_rows(&mut self, other: &NodalField) {
        let n = self.data.len().min(other.data.len());
        self.data[..n].copy_from_slice(&other.data[..n]);
    }

    /// Values of component `idim` for all nodes
    pub fn component(&self, idim: usize) -> Vec<f64> {
        (0..self.n_nodes).map(|ip| self.get(ip, idim)).collect()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Named access to the fields a model exposes (for visualization / export)
pub trait FieldRegistry {
    /// Names of all fields the model exposes
    fn field_names(&self) -> Vec<&'static str>;

    /// Look up a field by name
    fn field(&self, name: &str) -> Option<&NodalField>;
}

/// Model whose primary unknown is a scalar per node
pub trait HasScalarField {
    fn scalar_field(&self) -> &NodalField;
    fn scalar_field_mut(&mut self) -> &mut NodalField;
}

/// Model whose primary unknown is a vector per node
pub trait HasVectorField {
    fn vector_field(&self) -> &NodalField;
    fn vector_field_mut(&mut self) -> &mut NodalField;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodal_field_access() {
        let mut f = NodalField::zeros(3, 2);
        f.set(1, 1, 4.0);
        assert_eq!(f.shape(), (3, 2));
        assert_eq!(f.get(1, 1), 4.0);
        assert_eq!(f.node(1), &[0.0, 4.0]);
        assert_eq!(f.component(1), vec![0.0, 4.0, 0.0]);
    }

    #[test]
    fn test_from_vec_shape_check() {
        assert!(NodalField::from_vec(2, 2, vec![0.0; 3]).is_err());
        assert!(NodalField::from_vec(2, 2, vec![0.0; 4]).is_ok());
    }

    #[test]
    fn test_axpy_and_copy() {
        let mut a = NodalField::zeros(2, 1);
        a.axpy(2.0, &[1.0, 3.0]);
        assert_eq!(a.as_slice(), &[2.0, 6.0]);

        let mut b = NodalField::zeros(3, 1);
        b.copy_leading_rows(&a);
        assert_eq!(b.as_slice(), &[2.0, 6.0, 0.0]);
    }
}

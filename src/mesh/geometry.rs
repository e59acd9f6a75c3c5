use crate::error::{Error, Result};
use super::topology::JaggedArray;

/// Supported linear element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// 2-node segment (used for spring / PBD edge meshes)
    Line2,
    /// 3-node linear triangle
    Tri3,
    /// 4-node linear tetrahedron
    Tet4,
}

impl ElementType {
    /// Number of nodes per element
    pub fn n_nodes(self) -> usize {
        match self {
            ElementType::Line2 => 2,
            ElementType::Tri3 => 3,
            ElementType::Tet4 => 4,
        }
    }

    /// Topological dimension of the element
    pub fn dimension(self) -> usize {
        match self {
            ElementType::Line2 => 1,
            ElementType::Tri3 => 2,
            ElementType::Tet4 => 3,
        }
    }
}

/// Mesh with flat node coordinates and single-type connectivity
///
/// Positions are stored row-major as `(num_nodes, ndim)`, elements as
/// `(num_elements, elem_type.n_nodes())`.
#[derive(Debug, Clone)]
pub struct Mesh {
    ndim: usize,
    elem_type: ElementType,
    positions: Vec<f64>,
    elements: Vec<usize>,
}

impl Mesh {
    /// Create an empty mesh embedded in `ndim` space (2 or 3)
    pub fn new(ndim: usize, elem_type: ElementType) -> Result<Self> {
        if ndim != 2 && ndim != 3 {
            return Err(Error::UnsupportedDimension { what: "mesh", dim: ndim });
        }
        if elem_type.dimension() > ndim {
            return Err(Error::Mesh(format!(
                "{:?} elements cannot live in {}D space",
                elem_type, ndim
            )));
        }
        Ok(Self {
            ndim,
            elem_type,
            positions: Vec::new(),
            elements: Vec::new(),
        })
    }

    /// Build a mesh from flat arrays, validating connectivity
    pub fn from_arrays(
        ndim: usize,
        positions: Vec<f64>,
        elem_type: ElementType,
        elements: Vec<usize>,
    ) -> Result<Self> {
        let mut mesh = Self::new(ndim, elem_type)?;
        if positions.len() % ndim != 0 {
            return Err(Error::shape("positions", (positions.len() / ndim) * ndim, positions.len()));
        }
        mesh.positions = positions;
        let nnoel = elem_type.n_nodes();
        if elements.len() % nnoel != 0 {
            return Err(Error::Mesh(format!(
                "connectivity length {} is not a multiple of {}",
                elements.len(),
                nnoel
            )));
        }
        let np = mesh.num_nodes();
        if let Some(&bad) = elements.iter().find(|&&ip| ip >= np) {
            return Err(Error::Mesh(format!(
                "node index {} out of bounds (mesh has {} nodes)",
                bad, np
            )));
        }
        mesh.elements = elements;
        Ok(mesh)
    }

    /// Assemble a mesh from arrays already known to be consistent
    pub(crate) fn from_parts(
        ndim: usize,
        positions: Vec<f64>,
        elem_type: ElementType,
        elements: Vec<usize>,
    ) -> Self {
        debug_assert!(elements.iter().all(|&ip| ip < positions.len() / ndim));
        Self {
            ndim,
            elem_type,
            positions,
            elements,
        }
    }

    /// Add a node, returning its index
    pub fn add_node(&mut self, coords: &[f64]) -> Result<usize> {
        if coords.len() != self.ndim {
            return Err(Error::shape("node coordinates", self.ndim, coords.len()));
        }
        let idx = self.num_nodes();
        self.positions.extend_from_slice(coords);
        Ok(idx)
    }

    /// Add an element, returning its index
    pub fn add_element(&mut self, nodes: &[usize]) -> Result<usize> {
        if nodes.len() != self.elem_type.n_nodes() {
            return Err(Error::Mesh(format!(
                "element type {:?} requires {} nodes, got {}",
                self.elem_type,
                self.elem_type.n_nodes(),
                nodes.len()
            )));
        }
        let np = self.num_nodes();
        for &ip in nodes {
            if ip >= np {
                return Err(Error::Mesh(format!(
                    "node index {} out of bounds (mesh has {} nodes)",
                    ip, np
                )));
            }
        }
        let idx = self.num_elements();
        self.elements.extend_from_slice(nodes);
        Ok(idx)
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    pub fn elem_type(&self) -> ElementType {
        self.elem_type
    }

    pub fn num_nodes(&self) -> usize {
        self.positions.len() / self.ndim
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len() / self.elem_type.n_nodes()
    }

    /// Flat `(num_nodes, ndim)` coordinate array
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Coordinates of one node
    pub fn position(&self, ip: usize) -> &[f64] {
        &self.positions[ip * self.ndim..(ip + 1) * self.ndim]
    }

    /// Flat connectivity array
    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    /// Node indices of one element
    pub fn element(&self, ie: usize) -> &[usize] {
        let nnoel = self.elem_type.n_nodes();
        &self.elements[ie * nnoel..(ie + 1) * nnoel]
    }

    /// Iterate over element connectivities
    pub fn element_iter(&self) -> impl Iterator<Item = &[usize]> {
        self.elements.chunks(self.elem_type.n_nodes())
    }

    /// Point-to-surrounding-points adjacency (sorted, without diagonal)
    pub fn psup(&self) -> JaggedArray {
        JaggedArray::from_elements(self.num_nodes(), &self.elements, self.elem_type.n_nodes())
    }

    /// Per-axis `(min, max)` of the node coordinates
    pub fn minmax_xyz(&self) -> Option<Vec<(f64, f64)>> {
        if self.positions.is_empty() {
            return None;
        }
        let mut bounds: Vec<(f64, f64)> = self.position(0).iter().map(|&c| (c, c)).collect();
        for ip in 1..self.num_nodes() {
            for (b, &c) in bounds.iter_mut().zip(self.position(ip)) {
                b.0 = b.0.min(c);
                b.1 = b.1.max(c);
            }
        }
        Some(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_creation() {
        let mut mesh = Mesh::new(2, ElementType::Tri3).unwrap();
        mesh.add_node(&[0.0, 0.0]).unwrap();
        mesh.add_node(&[1.0, 0.0]).unwrap();
        mesh.add_node(&[0.0, 1.0]).unwrap();
        mesh.add_element(&[0, 1, 2]).unwrap();

        assert_eq!(mesh.num_nodes(), 3);
        assert_eq!(mesh.num_elements(), 1);
        assert_eq!(mesh.position(1), &[1.0, 0.0]);
        assert_eq!(mesh.element(0), &[0, 1, 2]);
    }

    #[test]
    fn test_invalid_dimension() {
        assert!(Mesh::new(1, ElementType::Line2).is_err());
        assert!(Mesh::new(2, ElementType::Tet4).is_err());
    }

    #[test]
    fn test_invalid_element() {
        let mut mesh = Mesh::new(2, ElementType::Tri3).unwrap();
        mesh.add_node(&[0.0, 0.0]).unwrap();
        assert!(mesh.add_element(&[0, 1]).is_err());
        assert!(mesh.add_element(&[0, 1, 2]).is_err());
        assert!(mesh.add_node(&[0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_from_arrays_validates_indices() {
        let result = Mesh::from_arrays(2, vec![0.0, 0.0, 1.0, 0.0], ElementType::Line2, vec![0, 2]);
        assert!(result.is_err());
    }

    #[test]
    fn test_minmax() {
        let mesh = Mesh::from_arrays(
            3,
            vec![-1.0, -2.0, -3.0, 1.0, 2.0, 3.0],
            ElementType::Line2,
            vec![0, 1],
        )
        .unwrap();
        let bounds = mesh.minmax_xyz().unwrap();
        assert_eq!(bounds, vec![(-1.0, 1.0), (-2.0, 2.0), (-3.0, 3.0)]);
    }
}

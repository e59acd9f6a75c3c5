//! Block-sparse system matrix over a node adjacency pattern.
//!
//! The scalar CSR pattern is the node pattern (psup plus diagonal) expanded by
//! `ndim x ndim` blocks. Rows of one node are contiguous and columns inside a
//! row are sorted, so the storage position of any entry follows from the node
//! pattern alone:
//!
//! `ndim² · index[i] + d · len(i) · ndim + pos(j) · ndim + e`
//!
//! for scalar row `i·ndim + d` and column `j·ndim + e`.

use nalgebra::DMatrix;
use sprs::CsMat;

use super::solver::LinearOperator;
use crate::error::{Error, Result};
use crate::mesh::JaggedArray;

/// Block-sparse matrix with a fixed per-topology pattern
#[derive(Debug, Clone)]
pub struct BlockSparseMatrix {
    n_nodes: usize,
    ndim: usize,
    symmetric: bool,
    /// Node pattern including the diagonal, rows sorted
    pattern: Option<JaggedArray>,
    mat: CsMat<f64>,
}

fn row_start(pattern: &JaggedArray, ndim: usize, row: usize) -> (usize, usize) {
    let (i, d) = (row / ndim, row % ndim);
    let len = pattern.row(i).len();
    (ndim * ndim * pattern.index()[i] + d * len * ndim, len)
}

fn entry_index(pattern: &JaggedArray, ndim: usize, row: usize, col: usize) -> Option<usize> {
    let (start, _) = row_start(pattern, ndim, row);
    let pos = pattern.row(row / ndim).binary_search(&(col / ndim)).ok()?;
    Some(start + pos * ndim + col % ndim)
}

impl BlockSparseMatrix {
    /// Zero matrix of `n_nodes * ndim` rows with no pattern yet
    ///
    /// `symmetric` selects whether Dirichlet elimination clears columns as well
    /// as rows, which keeps a symmetric matrix symmetric for CG.
    pub fn initialize(n_nodes: usize, ndim: usize, symmetric: bool) -> Self {
        let n = n_nodes * ndim;
        Self {
            n_nodes,
            ndim,
            symmetric,
            pattern: None,
            mat: CsMat::new((n, n), vec![0; n + 1], Vec::new(), Vec::new()),
        }
    }

    /// Allocate non-zero storage for a node adjacency
    ///
    /// The diagonal is added if missing. Rows need not be sorted. Values are
    /// zero afterwards.
    pub fn set_pattern(&mut self, adjacency: &JaggedArray) -> Result<()> {
        if adjacency.n_rows() != self.n_nodes {
            return Err(Error::shape("adjacency rows", self.n_nodes, adjacency.n_rows()));
        }
        if let Some(&bad) = adjacency.data().iter().find(|&&j| j >= self.n_nodes) {
            return Err(Error::Mesh(format!(
                "adjacency references node {} (matrix has {} nodes)",
                bad, self.n_nodes
            )));
        }
        let pattern = adjacency.add_diagonal();
        let nd = self.ndim;
        let n = self.n_nodes * nd;

        let mut indptr = Vec::with_capacity(n + 1);
        let mut indices = Vec::with_capacity(pattern.nnz() * nd * nd);
        indptr.push(0);
        for i in 0..self.n_nodes {
            for _ in 0..nd {
                for &j in pattern.row(i) {
                    indices.extend((0..nd).map(|e| j * nd + e));
                }
                indptr.push(indices.len());
            }
        }
        let data = vec![0.0; indices.len()];
        self.mat = CsMat::new((n, n), indptr, indices, data);
        self.pattern = Some(pattern);
        Ok(())
    }

    pub fn has_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Number of scalar rows
    pub fn n_dofs(&self) -> usize {
        self.n_nodes * self.ndim
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// Node pattern including the diagonal
    pub fn pattern(&self) -> Option<&JaggedArray> {
        self.pattern.as_ref()
    }

    /// Scalar CSR storage
    pub fn as_csmat(&self) -> &CsMat<f64> {
        &self.mat
    }

    /// Value at scalar `(row, col)`, zero outside the pattern
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.pattern
            .as_ref()
            .and_then(|p| entry_index(p, self.ndim, row, col))
            .map_or(0.0, |idx| self.mat.data()[idx])
    }

    fn pattern_ref(&self, op: &'static str) -> Result<&JaggedArray> {
        self.pattern.as_ref().ok_or(Error::PatternNotSet(op))
    }

    /// Clear all values, keeping the pattern
    pub fn set_zero(&mut self) {
        self.mat.data_mut().iter_mut().for_each(|v| *v = 0.0);
    }

    /// Add an `ndim x ndim` row-major block at node pair `(i, j)`
    pub fn add_block(&mut self, i: usize, j: usize, block: &[f64]) -> Result<()> {
        let nd = self.ndim;
        if block.len() != nd * nd {
            return Err(Error::shape("matrix block", nd * nd, block.len()));
        }
        let pattern = self.pattern.as_ref().ok_or(Error::PatternNotSet("add_block"))?;
        let data = self.mat.data_mut();
        for d in 0..nd {
            let idx = entry_index(pattern, nd, i * nd + d, j * nd)
                .ok_or(Error::OutsidePattern { row: i * nd + d, col: j * nd })?;
            for e in 0..nd {
                data[idx + e] += block[d * nd + e];
            }
        }
        Ok(())
    }

    /// Scatter an element matrix ordered `(node, dim)` into the global matrix
    pub fn merge_element(&mut self, nodes: &[usize], emat: &DMatrix<f64>) -> Result<()> {
        let nd = self.ndim;
        let size = nodes.len() * nd;
        if emat.nrows() != size || emat.ncols() != size {
            return Err(Error::shape("element matrix", size, emat.nrows()));
        }
        let pattern = self.pattern.as_ref().ok_or(Error::PatternNotSet("merge_element"))?;
        let data = self.mat.data_mut();
        for (a, &ip) in nodes.iter().enumerate() {
            for (b, &jp) in nodes.iter().enumerate() {
                for d in 0..nd {
                    let idx = entry_index(pattern, nd, ip * nd + d, jp * nd)
                        .ok_or(Error::OutsidePattern { row: ip * nd + d, col: jp * nd })?;
                    for e in 0..nd {
                        data[idx + e] += emat[(a * nd + d, b * nd + e)];
                    }
                }
            }
        }
        Ok(())
    }

    /// Eliminate fixed DOFs (`bc != 0`)
    ///
    /// Rows of fixed DOFs become unit rows with zero right-hand side. For
    /// symmetric storage the matching columns are cleared too.
    pub fn apply_dirichlet(&mut self, bc: &[i32], rhs: &mut [f64]) -> Result<()> {
        let n = self.n_dofs();
        if bc.len() != n {
            return Err(Error::shape("bc", n, bc.len()));
        }
        if rhs.len() != n {
            return Err(Error::shape("rhs", n, rhs.len()));
        }
        let nd = self.ndim;
        let symmetric = self.symmetric;
        let pattern = self.pattern.as_ref().ok_or(Error::PatternNotSet("apply_dirichlet"))?;
        let data = self.mat.data_mut();

        for row in 0..n {
            let (start, len) = row_start(pattern, nd, row);
            let cols = pattern.row(row / nd);
            if bc[row] != 0 {
                data[start..start + len * nd].iter_mut().for_each(|v| *v = 0.0);
                if let Some(idx) = entry_index(pattern, nd, row, row) {
                    data[idx] = 1.0;
                }
                rhs[row] = 0.0;
            } else if symmetric {
                for (pos, &jp) in cols.iter().enumerate() {
                    for e in 0..nd {
                        if bc[jp * nd + e] != 0 {
                            data[start + pos * nd + e] = 0.0;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Fold slave DOFs into their masters
    ///
    /// `ms[s] == m` ties DOF `s` to DOF `m`; `ms[s] == s` leaves it free. Each
    /// slave row is added to its master row, each slave column to its master
    /// column, and the slave becomes an identity row with zero right-hand side.
    /// The pattern must have been extended with
    /// [`extend_pattern`](super::master_slave::extend_pattern).
    pub fn apply_master_slave(&mut self, ms: &[usize], rhs: &mut [f64]) -> Result<()> {
        let n = self.n_dofs();
        super::master_slave::validate(ms, n)?;
        if rhs.len() != n {
            return Err(Error::shape("rhs", n, rhs.len()));
        }
        let nd = self.ndim;
        let pattern = self.pattern.as_ref().ok_or(Error::PatternNotSet("apply_master_slave"))?;
        let data = self.mat.data_mut();

        for s in 0..n {
            let m = ms[s];
            if m == s {
                continue;
            }
            let (s_start, len) = row_start(pattern, nd, s);
            let neighbors = pattern.row(s / nd);

            // row s -> row m
            for (pos, &jp) in neighbors.iter().enumerate() {
                for e in 0..nd {
                    let v = data[s_start + pos * nd + e];
                    if v != 0.0 {
                        let col = jp * nd + e;
                        let idx = entry_index(pattern, nd, m, col)
                            .ok_or(Error::OutsidePattern { row: m, col })?;
                        data[idx] += v;
                    }
                }
            }
            rhs[m] += rhs[s];

            // column s -> column m, over the rows that can hold column s
            for &kp in neighbors {
                for d in 0..nd {
                    let row = kp * nd + d;
                    let Some(idx_s) = entry_index(pattern, nd, row, s) else {
                        continue;
                    };
                    let v = data[idx_s];
                    if v != 0.0 {
                        let idx_m = entry_index(pattern, nd, row, m)
                            .ok_or(Error::OutsidePattern { row, col: m })?;
                        data[idx_m] += v;
                        data[idx_s] = 0.0;
                    }
                }
            }

            data[s_start..s_start + len * nd].iter_mut().for_each(|v| *v = 0.0);
            if let Some(idx) = entry_index(pattern, nd, s, s) {
                data[idx] = 1.0;
            }
            rhs[s] = 0.0;
        }
        Ok(())
    }

    /// `A <- D A D` with `D = diag(scale)` repeated over the DOFs of each node
    pub fn scale_left_right(&mut self, scale: &[f64]) -> Result<()> {
        if scale.len() != self.n_nodes {
            return Err(Error::shape("scale", self.n_nodes, scale.len()));
        }
        let nd = self.ndim;
        let pattern = self.pattern.as_ref().ok_or(Error::PatternNotSet("scale_left_right"))?;
        let data = self.mat.data_mut();
        for row in 0..self.n_nodes * nd {
            let (start, _) = row_start(pattern, nd, row);
            let si = scale[row / nd];
            for (pos, &jp) in pattern.row(row / nd).iter().enumerate() {
                let sij = si * scale[jp];
                for v in &mut data[start + pos * nd..start + (pos + 1) * nd] {
                    *v *= sij;
                }
            }
        }
        Ok(())
    }

    /// Add `value` to every diagonal entry
    pub fn add_diagonal(&mut self, value: f64) -> Result<()> {
        let nd = self.ndim;
        let n = self.n_dofs();
        let pattern = self.pattern.as_ref().ok_or(Error::PatternNotSet("add_diagonal"))?;
        let data = self.mat.data_mut();
        for row in 0..n {
            if let Some(idx) = entry_index(pattern, nd, row, row) {
                data[idx] += value;
            }
        }
        Ok(())
    }

    /// `out = A * v` after checking that the pattern is set
    pub fn matvec(&self, v: &[f64]) -> Result<Vec<f64>> {
        self.pattern_ref("matvec")?;
        if v.len() != self.n_dofs() {
            return Err(Error::shape("matvec input", self.n_dofs(), v.len()));
        }
        Ok(self.mat.apply(v))
    }
}

impl LinearOperator for BlockSparseMatrix {
    fn apply(&self, v: &[f64]) -> Vec<f64> {
        self.mat.apply(v)
    }

    fn apply_add(&self, v: &[f64], out: &mut [f64]) {
        self.mat.apply_add(v, out)
    }

    fn rows(&self) -> usize {
        self.n_dofs()
    }

    fn cols(&self) -> usize {
        self.n_dofs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Path graph 0 - 1 - 2
    fn path3() -> JaggedArray {
        JaggedArray::from_rows(&[vec![1], vec![2, 0], vec![1]])
    }

    #[test]
    fn test_pattern_adds_diagonal() {
        let mut mat = BlockSparseMatrix::initialize(3, 2, true);
        assert!(!mat.has_pattern());
        mat.set_pattern(&path3()).unwrap();
        assert_eq!(mat.pattern().unwrap().row(1), &[0, 1, 2]);
        // (2 + 3 + 2) node entries, 4 scalars each
        assert_eq!(mat.as_csmat().nnz(), 28);
        assert_eq!(mat.as_csmat().rows(), 6);
    }

    #[test]
    fn test_operations_require_pattern() {
        let mut mat = BlockSparseMatrix::initialize(2, 1, true);
        let mut rhs = vec![0.0; 2];
        assert!(matches!(
            mat.apply_dirichlet(&[0, 1], &mut rhs),
            Err(Error::PatternNotSet(_))
        ));
        assert!(mat.add_block(0, 0, &[1.0]).is_err());
        assert!(mat.matvec(&[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_add_block_and_value() {
        let mut mat = BlockSparseMatrix::initialize(3, 2, false);
        mat.set_pattern(&path3()).unwrap();
        mat.add_block(1, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        mat.add_block(1, 2, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(mat.value(2, 4), 2.0);
        assert_eq!(mat.value(2, 5), 2.0);
        assert_eq!(mat.value(3, 4), 3.0);
        assert_eq!(mat.value(3, 5), 4.0);
        assert_eq!(mat.value(0, 4), 0.0);

        let err = mat.add_block(0, 2, &[0.0; 4]).unwrap_err();
        assert!(matches!(err, Error::OutsidePattern { row: 0, col: 4 }));
    }

    #[test]
    fn test_merge_element_matches_matvec() {
        let mut mat = BlockSparseMatrix::initialize(3, 1, true);
        mat.set_pattern(&path3()).unwrap();
        let emat = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]);
        mat.merge_element(&[0, 1], &emat).unwrap();
        mat.merge_element(&[1, 2], &emat).unwrap();

        let y = mat.matvec(&[1.0, 2.0, 4.0]).unwrap();
        assert_eq!(y, vec![-1.0, -1.0, 2.0]);
    }

    #[test]
    fn test_dirichlet_symmetric_clears_columns() {
        let mut mat = BlockSparseMatrix::initialize(3, 1, true);
        mat.set_pattern(&path3()).unwrap();
        let emat = DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]);
        mat.merge_element(&[0, 1], &emat).unwrap();
        mat.merge_element(&[1, 2], &emat).unwrap();

        let mut rhs = vec![1.0, 1.0, 1.0];
        mat.apply_dirichlet(&[1, 0, 0], &mut rhs).unwrap();
        assert_eq!(rhs, vec![0.0, 1.0, 1.0]);
        assert_eq!(mat.value(0, 0), 1.0);
        assert_eq!(mat.value(0, 1), 0.0);
        assert_eq!(mat.value(1, 0), 0.0);
        assert_eq!(mat.value(1, 1), 4.0);
    }

    #[test]
    fn test_dirichlet_nonsymmetric_keeps_columns() {
        let mut mat = BlockSparseMatrix::initialize(3, 1, false);
        mat.set_pattern(&path3()).unwrap();
        let emat = DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]);
        mat.merge_element(&[0, 1], &emat).unwrap();

        let mut rhs = vec![1.0; 3];
        mat.apply_dirichlet(&[1, 0, 0], &mut rhs).unwrap();
        assert_eq!(mat.value(0, 1), 0.0);
        assert_eq!(mat.value(1, 0), -1.0);
    }

    #[test]
    fn test_scale_and_add_diagonal() {
        let mut mat = BlockSparseMatrix::initialize(3, 1, true);
        mat.set_pattern(&path3()).unwrap();
        let emat = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        mat.merge_element(&[0, 1], &emat).unwrap();
        mat.scale_left_right(&[2.0, 3.0, 1.0]).unwrap();
        assert_relative_eq!(mat.value(0, 0), 4.0);
        assert_relative_eq!(mat.value(0, 1), 6.0);
        assert_relative_eq!(mat.value(1, 1), 9.0);

        mat.add_diagonal(1.0).unwrap();
        assert_relative_eq!(mat.value(2, 2), 1.0);
        assert_relative_eq!(mat.value(1, 1), 10.0);
        assert!(mat.scale_left_right(&[1.0]).is_err());
    }

    #[test]
    fn test_set_zero_keeps_pattern() {
        let mut mat = BlockSparseMatrix::initialize(3, 1, true);
        mat.set_pattern(&path3()).unwrap();
        mat.add_diagonal(5.0).unwrap();
        mat.set_zero();
        assert_eq!(mat.as_csmat().nnz(), 7);
        assert!(mat.as_csmat().data().iter().all(|&v| v == 0.0));
    }
}

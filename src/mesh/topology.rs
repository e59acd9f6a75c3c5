use std::collections::{BTreeSet, HashMap};

/// Compressed adjacency list (index array + neighbor array)
///
/// Row `i` holds `data[index[i]..index[i + 1]]`. Used for the
/// point-to-surrounding-points graph that defines matrix sparsity and for PBD
/// clusters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JaggedArray {
    index: Vec<usize>,
    data: Vec<usize>,
}

impl JaggedArray {
    /// Build from an explicit list of rows
    pub fn from_rows(rows: &[Vec<usize>]) -> Self {
        let mut index = Vec::with_capacity(rows.len() + 1);
        let mut data = Vec::new();
        index.push(0);
        for row in rows {
            data.extend_from_slice(row);
            index.push(data.len());
        }
        Self { index, data }
    }

    /// Build from raw index/data arrays
    pub fn from_raw(index: Vec<usize>, data: Vec<usize>) -> Option<Self> {
        if index.first() != Some(&0) || index.last() != Some(&data.len()) {
            return None;
        }
        if index.windows(2).any(|w| w[0] > w[1]) {
            return None;
        }
        Some(Self { index, data })
    }

    /// Point-to-surrounding-points graph of an element mesh
    ///
    /// Every pair of distinct nodes sharing an element is connected. Rows are
    /// sorted, unique, and exclude the node itself.
    pub fn from_elements(n_nodes: usize, elements: &[usize], nnoel: usize) -> Self {
        let mut rows: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n_nodes];
        for elem in elements.chunks(nnoel) {
            for &ip in elem {
                for &jp in elem {
                    if ip != jp {
                        rows[ip].insert(jp);
                    }
                }
            }
        }
        Self::from_sets(&rows)
    }

    pub(crate) fn from_sets(rows: &[BTreeSet<usize>]) -> Self {
        let mut index = Vec::with_capacity(rows.len() + 1);
        let mut data = Vec::new();
        index.push(0);
        for row in rows {
            data.extend(row.iter().copied());
            index.push(data.len());
        }
        Self { index, data }
    }

    pub(crate) fn to_sets(&self) -> Vec<BTreeSet<usize>> {
        (0..self.n_rows()).map(|i| self.row(i).iter().copied().collect()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.index.len() - 1
    }

    /// Total number of stored neighbors
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn row(&self, i: usize) -> &[usize] {
        &self.data[self.index[i]..self.index[i + 1]]
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn data(&self) -> &[usize] {
        &self.data
    }

    /// Copy with each row `i` extended by `i` itself (kept sorted)
    pub fn add_diagonal(&self) -> Self {
        let mut rows = self.to_sets();
        for (i, row) in rows.iter_mut().enumerate() {
            row.insert(i);
        }
        Self::from_sets(&rows)
    }

    /// Sort every row in place
    pub fn sort(&mut self) {
        for i in 0..self.n_rows() {
            self.data[self.index[i]..self.index[i + 1]].sort_unstable();
        }
    }

    /// Row-wise union of two graphs over the same node set
    pub fn union(&self, other: &JaggedArray) -> Self {
        debug_assert_eq!(self.n_rows(), other.n_rows());
        let mut rows = self.to_sets();
        for (i, row) in rows.iter_mut().enumerate() {
            row.extend(other.row(i).iter().copied());
        }
        Self::from_sets(&rows)
    }
}

/// Quads `[opp0, opp1, a, b]` for every interior edge `(a, b)` of a triangle mesh
///
/// `opp0` and `opp1` are the vertices opposite to the shared edge in the two
/// adjacent triangles. Boundary edges produce no quad.
pub fn dihedral_quads(triangles: &[usize]) -> Vec<usize> {
    let mut edge_owner: HashMap<(usize, usize), usize> = HashMap::new();
    let mut quads = Vec::new();
    for tri in triangles.chunks(3) {
        for k in 0..3 {
            let a = tri[(k + 1) % 3];
            let b = tri[(k + 2) % 3];
            let opp = tri[k];
            let key = (a.min(b), a.max(b));
            match edge_owner.remove(&key) {
                Some(other) => quads.extend_from_slice(&[other, opp, key.0, key.1]),
                None => {
                    edge_owner.insert(key, opp);
                }
            }
        }
    }
    quads
}

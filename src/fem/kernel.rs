//! Element assembly kernels.
//!
//! A kernel adds element contributions of one physical model to the global
//! matrix and right-hand side. Models own a kernel and pass it their current
//! field state; the linear-system driver never sees which physics it solves.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::linalg::BlockSparseMatrix;
use crate::mesh::Mesh;

/// Strategy that accumulates one model's contributions into a linear system
///
/// `F` is the borrowed field state the kernel reads (current value, velocity,
/// ...). Contributions must stay inside the matrix pattern; the right-hand side
/// holds the residual so that the solution is an increment.
pub trait AssemblyKernel<F> {
    fn accumulate(
        &self,
        matrix: &mut BlockSparseMatrix,
        rhs: &mut [f64],
        mesh: &Mesh,
        fields: &F,
    ) -> Result<()>;
}

/// Compute element matrices in parallel and merge them in element order
///
/// `compute` returns the element matrix and element right-hand side, both
/// ordered `(node, dim)`. Merging follows the connectivity order, so the
/// assembled system does not depend on thread scheduling.
pub fn assemble_elements<C>(
    matrix: &mut BlockSparseMatrix,
    rhs: &mut [f64],
    connectivity: &[usize],
    nnoel: usize,
    compute: C,
) -> Result<()>
where
    C: Fn(&[usize]) -> Result<(DMatrix<f64>, DVector<f64>)> + Sync,
{
    let ndim = matrix.ndim();
    if rhs.len() != matrix.n_dofs() {
        return Err(Error::shape("rhs", matrix.n_dofs(), rhs.len()));
    }

    let locals: Vec<Result<(DMatrix<f64>, DVector<f64>)>> =
        connectivity.par_chunks(nnoel).map(&compute).collect();

    for (elem, local) in connectivity.chunks(nnoel).zip(locals) {
        let (emat, evec) = local?;
        matrix.merge_element(elem, &emat)?;
        for (a, &ip) in elem.iter().enumerate() {
            for d in 0..ndim {
                rhs[ip * ndim + d] += evec[a * ndim + d];
            }
        }
    }
    Ok(())
}

/// Gather nodal values of an element ordered `(node, dim)`
pub fn gather(values: &[f64], elem: &[usize], ndim: usize) -> DVector<f64> {
    DVector::from_iterator(
        elem.len() * ndim,
        elem.iter()
            .flat_map(|&ip| values[ip * ndim..(ip + 1) * ndim].iter().copied()),
    )
}

/// Expand a scalar element matrix to `ndim` uncoupled components
pub fn expand_scalar(scalar: &DMatrix<f64>, ndim: usize) -> DMatrix<f64> {
    let n = scalar.nrows();
    DMatrix::from_fn(n * ndim, n * ndim, |r, c| {
        if r % ndim == c % ndim {
            scalar[(r / ndim, c / ndim)]
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::JaggedArray;

    #[test]
    fn test_gather_and_expand() {
        let values = vec![0.0, 1.0, 10.0, 11.0, 20.0, 21.0];
        let local = gather(&values, &[2, 0], 2);
        assert_eq!(local.as_slice(), &[20.0, 21.0, 0.0, 1.0]);

        let scalar = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let expanded = expand_scalar(&scalar, 2);
        assert_eq!(expanded[(0, 2)], 2.0);
        assert_eq!(expanded[(1, 3)], 2.0);
        assert_eq!(expanded[(0, 3)], 0.0);
        assert_eq!(expanded[(3, 1)], 3.0);
    }

    #[test]
    fn test_assemble_elements_ordered_merge() {
        let connectivity = vec![0, 1, 1, 2];
        let psup = JaggedArray::from_elements(3, &connectivity, 2);
        let mut matrix = BlockSparseMatrix::initialize(3, 1, true);
        matrix.set_pattern(&psup).unwrap();
        let mut rhs = vec![0.0; 3];

        assemble_elements(&mut matrix, &mut rhs, &connectivity, 2, |_elem| {
            Ok((
                DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]),
                DVector::from_vec(vec![0.5, 0.5]),
            ))
        })
        .unwrap();

        assert_eq!(matrix.value(1, 1), 2.0);
        assert_eq!(matrix.value(0, 2), 0.0);
        assert_eq!(rhs, vec![0.5, 1.0, 0.5]);
    }
}

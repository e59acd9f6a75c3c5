use sprs::CsMat;

use crate::error::{Error, Result};

/// Preconditioner trait for iterative solvers
///
/// Solves M z = r approximately (where M ≈ A)
pub trait Preconditioner {
    /// Apply preconditioner: solve M z = r
    fn apply(&self, r: &[f64]) -> Vec<f64>;
}

/// Identity preconditioner (no preconditioning)
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        r.to_vec()
    }
}

const PIVOT_EPS: f64 = 1e-15;

/// Incomplete LU preconditioner with zero fill-in (ILU(0))
///
/// M = L * U ≈ A, with L and U sharing the sparsity pattern of A. The
/// skeleton is built once per pattern; values are refreshed with
/// [`set_value`](Self::set_value) and [`factorize`](Self::factorize) after
/// every assembly. A zero pivot marks the factors unusable and the
/// preconditioner acts as the identity until the next successful factorization.
pub struct ILUPreconditioner {
    /// Combined L and U factors sharing the same sparsity as the original matrix.
    factors: CsMat<f64>,
    indptr: Vec<usize>,
    /// Position of the diagonal entry of each row in `factors.data()`.
    diag_indices: Vec<usize>,
    valid: bool,
}

impl ILUPreconditioner {
    /// Build the factor skeleton for the pattern of `a`
    ///
    /// Every row must store its diagonal entry.
    pub fn from_pattern(a: &CsMat<f64>) -> Result<Self> {
        let n = a.rows();
        let indptr = a.indptr().raw_storage().to_vec();
        let indices = a.indices();

        let mut diag_indices = vec![0; n];
        for (i, diag) in diag_indices.iter_mut().enumerate() {
            *diag = (indptr[i]..indptr[i + 1])
                .find(|&idx| indices[idx] == i)
                .ok_or(Error::PatternNotSet("ILU(0) needs a stored diagonal in every row"))?;
        }

        let mut factors = a.clone();
        factors.data_mut().iter_mut().for_each(|v| *v = 0.0);

        Ok(Self {
            factors,
            indptr,
            diag_indices,
            valid: false,
        })
    }

    /// Build the skeleton, copy the values of `a` and factorize
    pub fn new(a: &CsMat<f64>) -> Result<Self> {
        let mut precond = Self::from_pattern(a)?;
        precond.set_value(a)?;
        precond.factorize();
        Ok(precond)
    }

    /// Copy the values of a matrix with the same pattern into the factors
    pub fn set_value(&mut self, a: &CsMat<f64>) -> Result<()> {
        if a.rows() != self.factors.rows() {
            return Err(Error::shape("ILU(0) rows", self.factors.rows(), a.rows()));
        }
        if a.nnz() != self.factors.nnz() {
            return Err(Error::shape("ILU(0) non-zeros", self.factors.nnz(), a.nnz()));
        }
        self.factors.data_mut().copy_from_slice(a.data());
        self.valid = false;
        Ok(())
    }

    /// Factorize in place, returning whether the factors are usable
    pub fn factorize(&mut self) -> bool {
        match Self::factorize_in_place(&mut self.factors, &self.indptr, &self.diag_indices) {
            Ok(()) => self.valid = true,
            Err(row) => {
                log::warn!("ILU(0) breakdown: zero pivot in row {}, falling back to identity", row);
                self.valid = false;
            }
        }
        self.valid
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    fn factorize_in_place(
        factors: &mut CsMat<f64>,
        indptr: &[usize],
        diag_indices: &[usize],
    ) -> std::result::Result<(), usize> {
        let n = factors.rows();
        let indices = factors.indices().to_vec();
        let data = factors.data_mut();

        for i in 0..n {
            let row_start = indptr[i];
            let row_i_end = indptr[i + 1];
            let diag_i = diag_indices[i];

            // Elimination using previous rows k < i
            for k_idx_abs in row_start..diag_i {
                let k = indices[k_idx_abs];
                let k_diag = diag_indices[k];
                let k_end = indptr[k + 1];

                let diag_val_k = data[k_diag];
                if diag_val_k.abs() < PIVOT_EPS {
                    return Err(k);
                }

                let val_ik = data[k_idx_abs] / diag_val_k;
                data[k_idx_abs] = val_ik;

                // A(i, j) -= A(i, k) * A(k, j) for j > k, merging the sorted column lists
                let mut cur_i_idx = k_idx_abs + 1;
                for k_j_idx in k_diag + 1..k_end {
                    let col_j = indices[k_j_idx];
                    while cur_i_idx < row_i_end && indices[cur_i_idx] < col_j {
                        cur_i_idx += 1;
                    }
                    if cur_i_idx == row_i_end {
                        break;
                    }
                    if indices[cur_i_idx] == col_j {
                        data[cur_i_idx] -= val_ik * data[k_j_idx];
                    }
                }
            }
            if data[diag_i].abs() < PIVOT_EPS {
                return Err(i);
            }
        }
        Ok(())
    }
}

impl Preconditioner for ILUPreconditioner {
    fn apply(&self, r: &[f64]) -> Vec<f64> {
        let mut z = r.to_vec();
        if !self.valid {
            return z;
        }

        let n = self.factors.rows();
        let indptr = &self.indptr;
        let indices = self.factors.indices();
        let data = self.factors.data();

        // Forward solve: L y = r (unit diagonal)
        for i in 0..n {
            let mut sum = 0.0;
            for idx in indptr[i]..self.diag_indices[i] {
                sum += data[idx] * z[indices[idx]];
            }
            z[i] -= sum;
        }

        // Backward solve: U x = y
        for i in (0..n).rev() {
            let diag = self.diag_indices[i];
            let mut sum = 0.0;
            for idx in diag + 1..indptr[i + 1] {
                sum += data[idx] * z[indices[idx]];
            }
            z[i] = (z[i] - sum) / data[diag];
        }

        z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sprs::TriMat;

    fn tridiagonal() -> CsMat<f64> {
        // [ 2 -1  0 ]
        // [-1  2 -1 ]
        // [ 0 -1  2 ]
        let mut triplets = TriMat::new((3, 3));
        triplets.add_triplet(0, 0, 2.0);
        triplets.add_triplet(0, 1, -1.0);
        triplets.add_triplet(1, 0, -1.0);
        triplets.add_triplet(1, 1, 2.0);
        triplets.add_triplet(1, 2, -1.0);
        triplets.add_triplet(2, 1, -1.0);
        triplets.add_triplet(2, 2, 2.0);
        triplets.to_csr()
    }

    #[test]
    fn test_identity_preconditioner() {
        let r = vec![1.0, 2.0, 3.0];
        assert_eq!(IdentityPreconditioner.apply(&r), r);
    }

    #[test]
    fn test_ilu0_exact_on_tridiagonal() {
        // A tridiagonal matrix has no fill-in, so ILU(0) is the exact LU
        let a = tridiagonal();
        let precond = ILUPreconditioner::new(&a).unwrap();
        assert!(precond.is_valid());

        // A * [1, 2, 3] = [0, 0, 4]
        let z = precond.apply(&[0.0, 0.0, 4.0]);
        assert_relative_eq!(z[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(z[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(z[2], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ilu0_refactorize_with_new_values() {
        let a = tridiagonal();
        let mut precond = ILUPreconditioner::from_pattern(&a).unwrap();
        assert!(!precond.is_valid());

        let scaled = a.map(|v| 2.0 * v);
        precond.set_value(&scaled).unwrap();
        assert!(precond.factorize());

        let z = precond.apply(&[0.0, 0.0, 8.0]);
        assert_relative_eq!(z[2], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ilu0_breakdown_falls_back_to_identity() {
        let a = CsMat::new((2, 2), vec![0, 1, 2], vec![0, 1], vec![0.0, 1.0]);

        let precond = ILUPreconditioner::new(&a).unwrap();
        assert!(!precond.is_valid());
        assert_eq!(precond.apply(&[3.0, 4.0]), vec![3.0, 4.0]);
    }

    #[test]
    fn test_missing_diagonal_is_error() {
        let mut triplets = TriMat::new((2, 2));
        triplets.add_triplet(0, 1, 1.0);
        triplets.add_triplet(1, 0, 1.0);
        let a: CsMat<f64> = triplets.to_csr();
        assert!(ILUPreconditioner::from_pattern(&a).is_err());
    }

    #[test]
    fn test_set_value_shape_mismatch() {
        let a = tridiagonal();
        let mut precond = ILUPreconditioner::from_pattern(&a).unwrap();
        let mut triplets = TriMat::new((3, 3));
        triplets.add_triplet(0, 0, 1.0);
        triplets.add_triplet(1, 1, 1.0);
        triplets.add_triplet(2, 2, 1.0);
        let diag: CsMat<f64> = triplets.to_csr();
        assert!(precond.set_value(&diag).is_err());
    }
}

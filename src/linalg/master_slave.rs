//! Master-slave DOF constraints.
//!
//! A constraint array holds one entry per scalar DOF: `ms[s] == m` ties slave
//! `s` to master `m`, `ms[s] == s` marks a free DOF. Masters must be free.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::mesh::JaggedArray;

/// Constraint array with every DOF free
pub fn identity(n_dofs: usize) -> Vec<usize> {
    (0..n_dofs).collect()
}

/// Check length, index range and that no master is itself a slave
pub fn validate(ms: &[usize], n_dofs: usize) -> Result<()> {
    if ms.len() != n_dofs {
        return Err(Error::shape("master-slave array", n_dofs, ms.len()));
    }
    for (s, &m) in ms.iter().enumerate() {
        if m >= n_dofs {
            return Err(Error::MasterSlave(format!(
                "DOF {} refers to master {} out of range {}",
                s, m, n_dofs
            )));
        }
        if ms[m] != m {
            return Err(Error::MasterSlave(format!(
                "master {} of DOF {} is itself tied to {}",
                m, s, ms[m]
            )));
        }
    }
    Ok(())
}

/// Extend a node adjacency so that folding slaves into masters stays inside the pattern
///
/// For each slave node `is` with master node `im`, `im` gains every neighbor
/// of `is` (and `is` itself) and each of those neighbors gains `im`. The rule is
/// applied until nothing changes, so chains of slaves sharing neighbors are
/// covered as well. The result stays symmetric.
pub fn extend_pattern(psup: &JaggedArray, ms: &[usize], ndim: usize) -> Result<JaggedArray> {
    validate(ms, psup.n_rows() * ndim)?;

    let pairs: BTreeSet<(usize, usize)> = ms
        .iter()
        .enumerate()
        .filter(|&(s, &m)| s != m)
        .map(|(s, &m)| (s / ndim, m / ndim))
        .filter(|&(is, im)| is != im)
        .collect();

    let mut rows = psup.to_sets();
    loop {
        let mut changed = false;
        for &(is, im) in &pairs {
            let mut linked: Vec<usize> = rows[is].iter().copied().collect();
            linked.push(is);
            for k in linked {
                if k == im {
                    continue;
                }
                changed |= rows[im].insert(k);
                changed |= rows[k].insert(im);
            }
        }
        if !changed {
            break;
        }
    }
    Ok(JaggedArray::from_sets(&rows))
}

/// Copy master values onto their slaves after a solve
pub fn distribute_value(values: &mut [f64], ms: &[usize]) {
    for (s, &m) in ms.iter().enumerate() {
        if m != s {
            values[s] = values[m];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(validate(&[0, 1, 2], 3).is_ok());
        assert!(validate(&[0, 0, 2], 3).is_ok());
        assert!(validate(&[0, 1], 3).is_err());
        assert!(validate(&[0, 5, 2], 3).is_err());
        // master 1 is itself a slave of 0
        assert!(matches!(validate(&[0, 0, 1], 3), Err(Error::MasterSlave(_))));
    }

    #[test]
    fn test_extend_pattern_links_master_to_slave_neighbors() {
        // chain 0 - 1 - 2 - 3, node 3 tied to node 0
        let psup = JaggedArray::from_rows(&[vec![1], vec![0, 2], vec![1, 3], vec![2]]);
        let ext = extend_pattern(&psup, &[0, 1, 2, 0], 1).unwrap();
        assert_eq!(ext.row(0), &[1, 2, 3]);
        assert_eq!(ext.row(2), &[0, 1, 3]);
        assert_eq!(ext.row(3), &[0, 2]);
        assert_eq!(ext.row(1), &[0, 2]);
    }

    #[test]
    fn test_extend_pattern_without_slaves_is_unchanged() {
        let psup = JaggedArray::from_rows(&[vec![1], vec![0]]);
        let ext = extend_pattern(&psup, &identity(4), 2).unwrap();
        assert_eq!(ext, psup);
    }

    #[test]
    fn test_distribute_value() {
        let mut v = vec![1.0, 2.0, 0.0, 7.0];
        distribute_value(&mut v, &[0, 1, 1, 0]);
        assert_eq!(v, vec![1.0, 2.0, 2.0, 1.0]);
    }
}

//! Arena-backed training set construction
//!
//! Every row of a [`TrainingSet`] is carved out of one contiguous node arena
//! of `nb_feat * (nb_dim + 1)` slots, so row `i` starts at
//! `arena + i * (nb_dim + 1)` and the whole set is released as three blocks
//! (arena, row-pointer table, labels) rather than row by row.

use crate::core::{BridgeError, Result, SvmNode, SvmProblem};
use crate::marshal::{allocate, node::check_index_range};
use libc::c_int;
use log::debug;

/// Training rows and labels in the engine's `svm_problem` layout
///
/// The `SvmProblem` header is the first field, so a pointer to a
/// `TrainingSet` is also a valid `svm_problem*` for the host.
#[repr(C)]
#[derive(Debug)]
pub struct TrainingSet {
    problem: SvmProblem,
    labels: Vec<f64>,
    rows: Vec<*const SvmNode>,
    arena: Vec<SvmNode>,
    dim: usize,
}

impl TrainingSet {
    /// Build a training set from a row-major dense buffer
    ///
    /// # Arguments
    /// * `data` - `nb_feat * nb_dim` values, row-major
    /// * `labels` - one label per row
    /// * `nb_feat` - number of rows
    /// * `nb_dim` - values per row; every row has the same dimensionality
    pub fn from_dense(data: &[f64], labels: &[f64], nb_feat: usize, nb_dim: usize) -> Result<Self> {
        if nb_feat == 0 {
            return Err(BridgeError::InvalidArgument(
                "training set needs at least one row".to_string(),
            ));
        }
        if nb_dim == 0 {
            return Err(BridgeError::InvalidArgument(
                "training rows need at least one feature".to_string(),
            ));
        }
        if nb_feat > c_int::MAX as usize {
            return Err(BridgeError::InvalidArgument(format!(
                "row count {nb_feat} exceeds the engine's range"
            )));
        }
        check_index_range(nb_dim)?;

        let expected = nb_feat.checked_mul(nb_dim).ok_or_else(|| {
            BridgeError::InvalidArgument(format!("{nb_feat} x {nb_dim} overflows"))
        })?;
        if data.len() != expected {
            return Err(BridgeError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        if labels.len() != nb_feat {
            return Err(BridgeError::DimensionMismatch {
                expected: nb_feat,
                actual: labels.len(),
            });
        }

        let stride = nb_dim + 1;
        let slots = nb_feat.checked_mul(stride).ok_or_else(|| {
            BridgeError::InvalidArgument(format!("arena of {nb_feat} x {stride} overflows"))
        })?;

        let mut arena = allocate::<SvmNode>(slots)?;
        for row in data.chunks_exact(nb_dim) {
            arena.extend(
                row.iter()
                    .enumerate()
                    .map(|(j, &value)| SvmNode::new((j + 1) as c_int, value)),
            );
            arena.push(SvmNode::sentinel());
        }

        let mut rows = allocate::<*const SvmNode>(nb_feat)?;
        rows.extend(arena.chunks_exact(stride).map(|row| row.as_ptr()));

        let mut y = allocate::<f64>(nb_feat)?;
        y.extend_from_slice(labels);

        let problem = SvmProblem {
            l: nb_feat as c_int,
            y: y.as_ptr(),
            x: rows.as_ptr(),
        };

        debug!("built training set: {nb_feat} rows x {nb_dim} features, {slots} arena slots");

        Ok(Self {
            problem,
            labels: y,
            rows,
            arena,
            dim: nb_dim,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Features per row, sentinel excluded
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Row `i` including its sentinel
    ///
    /// # Panics
    /// Panics if `i >= len()`
    pub fn row(&self, i: usize) -> &[SvmNode] {
        let stride = self.dim + 1;
        &self.arena[i * stride..(i + 1) * stride]
    }

    /// Base of the node arena
    pub fn arena_ptr(&self) -> *const SvmNode {
        self.arena.as_ptr()
    }

    /// Total node slots in the arena
    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }

    /// The layout-exact view handed to the engine
    pub fn problem(&self) -> &SvmProblem {
        &self.problem
    }

    /// Release the arena, the row-pointer table and the labels
    pub fn free(self) {
        debug!("freeing training set of {} rows", self.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> TrainingSet {
        let data = [0.0, 0.0, 0.0, 1.0, 5.0, 5.0, 5.0, 6.0];
        let labels = [-1.0, -1.0, 1.0, 1.0];
        TrainingSet::from_dense(&data, &labels, 4, 2).expect("valid training set")
    }

    #[test]
    fn test_row_pointers_follow_arena_stride() {
        let set = sample_set();
        let base = set.arena_ptr();

        assert_eq!(set.arena_len(), 4 * 3);
        for i in 0..set.len() {
            let expected = unsafe { base.add(i * 3) };
            assert_eq!(set.problem().row_ptr(i), expected);
        }
    }

    #[test]
    fn test_rows_are_sentinel_terminated() {
        let set = sample_set();

        for i in 0..set.len() {
            let row = set.row(i);
            assert_eq!(row.len(), 3);
            assert_eq!(row[0].index, 1);
            assert_eq!(row[1].index, 2);
            assert!(row[2].is_sentinel());
            assert_eq!(set.problem().row(i), row);
        }
        assert_eq!(set.row(3)[1].value, 6.0);
    }

    #[test]
    fn test_labels_copied_in_order() {
        let set = sample_set();
        assert_eq!(set.labels(), &[-1.0, -1.0, 1.0, 1.0]);
        assert_eq!(set.problem().labels(), set.labels());
        assert_eq!(set.problem().len(), 4);
    }

    #[test]
    fn test_view_survives_move() {
        let set = sample_set();
        let base = set.arena_ptr();
        let boxed = Box::new(set);

        assert_eq!(boxed.problem().row_ptr(0), base);
        assert_eq!(boxed.problem().row(2)[0].value, 5.0);
    }

    #[test]
    fn test_rejects_empty_shapes() {
        assert!(matches!(
            TrainingSet::from_dense(&[], &[], 0, 2),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            TrainingSet::from_dense(&[], &[1.0], 1, 0),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rejects_mismatched_buffers() {
        let result = TrainingSet::from_dense(&[1.0, 2.0, 3.0], &[1.0, -1.0], 2, 2);
        assert!(matches!(
            result,
            Err(BridgeError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));

        let result = TrainingSet::from_dense(&[1.0, 2.0, 3.0, 4.0], &[1.0], 2, 2);
        assert!(matches!(
            result,
            Err(BridgeError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_rejects_overflowing_shape() {
        let result = TrainingSet::from_dense(&[], &[], usize::MAX / 2, 4);
        assert!(matches!(result, Err(BridgeError::InvalidArgument(_))));
    }
}

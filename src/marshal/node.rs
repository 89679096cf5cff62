//! Dense buffer to sparse node sequence conversion

use crate::core::{nodes_until_sentinel, BridgeError, Result, SvmNode};
use crate::marshal::allocate;
use libc::c_int;
use std::ptr;

/// Sparse feature vector in the engine's node layout
///
/// Holds `len() + 1` contiguous nodes; the last one is the `-1` sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    nodes: Box<[SvmNode]>,
}

/// Convert a dense buffer into a sentinel-terminated sparse vector
///
/// Slot `i` receives index `i + 1` and `data[i]`; zeros are kept so the
/// slot layout stays positional.
pub fn marshal_vector(data: &[f64]) -> Result<FeatureVector> {
    check_index_range(data.len())?;

    let slots = data.len() + 1;
    let mut nodes = allocate::<SvmNode>(slots)?;

    nodes.extend(
        data.iter()
            .enumerate()
            .map(|(i, &value)| SvmNode::new((i + 1) as c_int, value)),
    );
    nodes.push(SvmNode::sentinel());

    Ok(FeatureVector {
        nodes: nodes.into_boxed_slice(),
    })
}

/// Fail when 1-based feature indices up to `dim` would not fit a `c_int`
pub(crate) fn check_index_range(dim: usize) -> Result<()> {
    if dim >= c_int::MAX as usize {
        return Err(BridgeError::InvalidArgument(format!(
            "dimension {dim} exceeds the engine's index range"
        )));
    }
    Ok(())
}

impl FeatureVector {
    /// Number of features, sentinel excluded
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All node slots including the sentinel
    pub fn nodes(&self) -> &[SvmNode] {
        &self.nodes
    }

    /// `(index, value)` pairs without the sentinel
    pub fn iter(&self) -> impl Iterator<Item = (c_int, f64)> + '_ {
        self.nodes[..self.len()]
            .iter()
            .map(|node| (node.index, node.value))
    }

    pub fn as_ptr(&self) -> *const SvmNode {
        self.nodes.as_ptr()
    }

    /// Hand the node buffer to the host; release it with [`Self::from_raw`]
    pub fn into_raw(self) -> *mut SvmNode {
        Box::into_raw(self.nodes).cast::<SvmNode>()
    }

    /// Reclaim a buffer produced by [`Self::into_raw`]
    ///
    /// The length is re-derived from the sentinel.
    ///
    /// # Safety
    /// `raw` must come from [`Self::into_raw`] and must not have been
    /// reclaimed before.
    pub unsafe fn from_raw(raw: *mut SvmNode) -> Self {
        let len = nodes_until_sentinel(raw).len();
        let nodes = Box::from_raw(ptr::slice_from_raw_parts_mut(raw, len));
        Self { nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshal_slot_layout() {
        let data = [0.5, 0.0, -3.25, 7.0];
        let vector = marshal_vector(&data).expect("marshal should succeed");

        assert_eq!(vector.len(), 4);
        assert_eq!(vector.nodes().len(), 5);
        for (i, node) in vector.nodes()[..4].iter().enumerate() {
            assert_eq!(node.index, i as c_int + 1);
            assert_eq!(node.value, data[i]);
        }
        assert_eq!(vector.nodes()[4].index, -1);
    }

    #[test]
    fn test_marshal_empty_buffer() {
        let vector = marshal_vector(&[]).expect("empty buffer is valid");
        assert!(vector.is_empty());
        assert_eq!(vector.nodes(), &[SvmNode::sentinel()]);
    }

    #[test]
    fn test_iter_skips_sentinel() {
        let vector = marshal_vector(&[1.0, 2.0]).unwrap();
        let pairs: Vec<_> = vector.iter().collect();
        assert_eq!(pairs, vec![(1, 1.0), (2, 2.0)]);
    }

    #[test]
    fn test_raw_round_trip_recovers_length() {
        let vector = marshal_vector(&[3.0, 1.0, 4.0]).unwrap();
        let expected = vector.clone();

        let raw = vector.into_raw();
        unsafe {
            assert_eq!((*raw.add(3)).index, -1);
            let back = FeatureVector::from_raw(raw);
            assert_eq!(back, expected);
        }
    }

    #[test]
    fn test_index_range_check() {
        assert!(check_index_range(10).is_ok());
        assert!(matches!(
            check_index_range(c_int::MAX as usize),
            Err(BridgeError::InvalidArgument(_))
        ));
    }
}

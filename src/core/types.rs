//! Core type definitions shared with the SVM engine
//!
//! The `#[repr(C)]` structs in this module reproduce libsvm's `svm_node`,
//! `svm_problem` and `svm_parameter` field for field, so a pointer to any of
//! them can be handed across the host boundary unchanged.

use crate::core::{BridgeError, Result};
use libc::{c_double, c_int};
use serde::{Deserialize, Serialize};
use std::slice;

/// Index value marking the end of a sparse node sequence
pub const SENTINEL_INDEX: c_int = -1;

/// One `(index, value)` pair of a sparse feature vector
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvmNode {
    pub index: c_int,
    pub value: c_double,
}

impl SvmNode {
    /// Create a feature node
    pub fn new(index: c_int, value: c_double) -> Self {
        Self { index, value }
    }

    /// The terminating node of every sequence
    pub fn sentinel() -> Self {
        Self {
            index: SENTINEL_INDEX,
            value: 0.0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.index == SENTINEL_INDEX
    }
}

/// Borrow a sentinel-terminated node sequence, sentinel included
///
/// # Safety
/// `start` must point to a live sequence that contains a node with index
/// `-1`, and that sequence must outlive `'a`.
pub(crate) unsafe fn nodes_until_sentinel<'a>(start: *const SvmNode) -> &'a [SvmNode] {
    let mut len = 0;
    while (*start.add(len)).index != SENTINEL_INDEX {
        len += 1;
    }
    slice::from_raw_parts(start, len + 1)
}

/// SVM formulation selector, numbered as in libsvm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SvmType {
    CSvc = 0,
    NuSvc = 1,
    OneClass = 2,
    EpsilonSvr = 3,
    NuSvr = 4,
}

impl SvmType {
    pub fn from_raw(code: c_int) -> Result<Self> {
        match code {
            0 => Ok(SvmType::CSvc),
            1 => Ok(SvmType::NuSvc),
            2 => Ok(SvmType::OneClass),
            3 => Ok(SvmType::EpsilonSvr),
            4 => Ok(SvmType::NuSvr),
            other => Err(BridgeError::InvalidArgument(format!(
                "unknown svm type code {other}"
            ))),
        }
    }

    pub fn as_raw(self) -> c_int {
        self as c_int
    }

    /// Whether predictions are class labels
    pub fn is_classification(self) -> bool {
        matches!(self, SvmType::CSvc | SvmType::NuSvc)
    }

    /// Whether predictions are real-valued targets
    pub fn is_regression(self) -> bool {
        matches!(self, SvmType::EpsilonSvr | SvmType::NuSvr)
    }
}

/// Kernel selector, numbered as in libsvm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelType {
    Linear = 0,
    Poly = 1,
    Rbf = 2,
    Sigmoid = 3,
    Precomputed = 4,
}

impl KernelType {
    pub fn from_raw(code: c_int) -> Result<Self> {
        match code {
            0 => Ok(KernelType::Linear),
            1 => Ok(KernelType::Poly),
            2 => Ok(KernelType::Rbf),
            3 => Ok(KernelType::Sigmoid),
            4 => Ok(KernelType::Precomputed),
            other => Err(BridgeError::InvalidArgument(format!(
                "unknown kernel type code {other}"
            ))),
        }
    }

    pub fn as_raw(self) -> c_int {
        self as c_int
    }
}

/// Layout-exact view of a training set (`svm_problem`)
///
/// Only ever reachable by reference from a live [`crate::TrainingSet`], which
/// owns the label buffer, the row-pointer table and the node arena.
#[repr(C)]
#[derive(Debug)]
pub struct SvmProblem {
    pub(crate) l: c_int,
    pub(crate) y: *const c_double,
    pub(crate) x: *const *const SvmNode,
}

impl SvmProblem {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.l.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels in row order
    pub fn labels(&self) -> &[f64] {
        if self.is_empty() {
            return &[];
        }
        // SAFETY: the owning TrainingSet keeps `l` labels alive behind `y`.
        unsafe { slice::from_raw_parts(self.y, self.len()) }
    }

    /// Start of row `i` inside the node arena
    ///
    /// # Panics
    /// Panics if `i >= len()`
    pub fn row_ptr(&self, i: usize) -> *const SvmNode {
        assert!(i < self.len(), "row {i} out of range for {} rows", self.len());
        // SAFETY: the pointer table holds exactly `l` entries.
        unsafe { *self.x.add(i) }
    }

    /// Row `i` as a sentinel-terminated slice
    pub fn row(&self, i: usize) -> &[SvmNode] {
        // SAFETY: every row written by the problem builder ends with a sentinel.
        unsafe { nodes_until_sentinel(self.row_ptr(i)) }
    }

    /// All rows in order
    pub fn rows(&self) -> impl Iterator<Item = &[SvmNode]> + '_ {
        (0..self.len()).map(move |i| self.row(i))
    }
}

/// Layout-exact hyperparameter record (`svm_parameter`)
///
/// Embedded in [`crate::Parameters`], which owns the weight arrays the two
/// pointers refer to. Both pointers are null when `nr_weight` is zero.
#[repr(C)]
#[derive(Debug)]
pub struct SvmParameter {
    pub(crate) svm_type: c_int,
    pub(crate) kernel_type: c_int,
    pub(crate) degree: c_int,
    pub(crate) gamma: c_double,
    pub(crate) coef0: c_double,

    pub(crate) cache_size: c_double,
    pub(crate) eps: c_double,
    pub(crate) c: c_double,
    pub(crate) nr_weight: c_int,
    pub(crate) weight_label: *const c_int,
    pub(crate) weight: *const c_double,
    pub(crate) nu: c_double,
    pub(crate) p: c_double,
    pub(crate) shrinking: c_int,
    pub(crate) probability: c_int,
}

impl SvmParameter {
    pub fn svm_type(&self) -> Result<SvmType> {
        SvmType::from_raw(self.svm_type)
    }

    pub fn kernel_type(&self) -> Result<KernelType> {
        KernelType::from_raw(self.kernel_type)
    }

    pub fn degree(&self) -> i32 {
        self.degree
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn coef0(&self) -> f64 {
        self.coef0
    }

    /// Kernel cache size in MB
    pub fn cache_size(&self) -> f64 {
        self.cache_size
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn nu(&self) -> f64 {
        self.nu
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn shrinking(&self) -> bool {
        self.shrinking != 0
    }

    pub fn probability(&self) -> bool {
        self.probability != 0
    }

    pub fn nr_weight(&self) -> usize {
        self.nr_weight.max(0) as usize
    }

    /// Class labels of the weight table, empty when absent
    pub fn weight_labels(&self) -> &[c_int] {
        if self.nr_weight() == 0 || self.weight_label.is_null() {
            return &[];
        }
        // SAFETY: the owning Parameters keeps `nr_weight` labels alive.
        unsafe { slice::from_raw_parts(self.weight_label, self.nr_weight()) }
    }

    /// Weights parallel to [`Self::weight_labels`], empty when absent
    pub fn weights(&self) -> &[c_double] {
        if self.nr_weight() == 0 || self.weight.is_null() {
            return &[];
        }
        // SAFETY: the owning Parameters keeps `nr_weight` weights alive.
        unsafe { slice::from_raw_parts(self.weight, self.nr_weight()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_sentinel_node() {
        let node = SvmNode::sentinel();
        assert!(node.is_sentinel());
        assert_eq!(node.index, -1);
        assert!(!SvmNode::new(1, 0.5).is_sentinel());
    }

    #[test]
    fn test_nodes_until_sentinel() {
        let nodes = vec![
            SvmNode::new(1, 1.0),
            SvmNode::new(2, 2.0),
            SvmNode::sentinel(),
            SvmNode::new(9, 9.0),
        ];
        let slice = unsafe { nodes_until_sentinel(nodes.as_ptr()) };
        assert_eq!(slice.len(), 3);
        assert!(slice[2].is_sentinel());
    }

    #[test]
    fn test_svm_type_codes() {
        assert_eq!(SvmType::from_raw(0).unwrap(), SvmType::CSvc);
        assert_eq!(SvmType::from_raw(4).unwrap(), SvmType::NuSvr);
        assert_eq!(SvmType::EpsilonSvr.as_raw(), 3);
        assert!(SvmType::from_raw(5).is_err());
        assert!(SvmType::CSvc.is_classification());
        assert!(SvmType::EpsilonSvr.is_regression());
        assert!(!SvmType::OneClass.is_classification());
        assert!(!SvmType::OneClass.is_regression());
    }

    #[test]
    fn test_kernel_type_codes() {
        assert_eq!(KernelType::from_raw(2).unwrap(), KernelType::Rbf);
        assert_eq!(KernelType::Precomputed.as_raw(), 4);
        assert!(matches!(
            KernelType::from_raw(-1),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_node_layout() {
        assert_eq!(size_of::<SvmNode>(), 16);
        assert_eq!(offset_of!(SvmNode, index), 0);
        assert_eq!(offset_of!(SvmNode, value), 8);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_problem_layout() {
        assert_eq!(size_of::<SvmProblem>(), 24);
        assert_eq!(offset_of!(SvmProblem, l), 0);
        assert_eq!(offset_of!(SvmProblem, y), 8);
        assert_eq!(offset_of!(SvmProblem, x), 16);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_parameter_layout() {
        assert_eq!(offset_of!(SvmParameter, svm_type), 0);
        assert_eq!(offset_of!(SvmParameter, kernel_type), 4);
        assert_eq!(offset_of!(SvmParameter, degree), 8);
        assert_eq!(offset_of!(SvmParameter, gamma), 16);
        assert_eq!(offset_of!(SvmParameter, coef0), 24);
        assert_eq!(offset_of!(SvmParameter, cache_size), 32);
        assert_eq!(offset_of!(SvmParameter, eps), 40);
        assert_eq!(offset_of!(SvmParameter, c), 48);
        assert_eq!(offset_of!(SvmParameter, nr_weight), 56);
        assert_eq!(offset_of!(SvmParameter, weight_label), 64);
        assert_eq!(offset_of!(SvmParameter, weight), 72);
        assert_eq!(offset_of!(SvmParameter, nu), 80);
        assert_eq!(offset_of!(SvmParameter, p), 88);
        assert_eq!(offset_of!(SvmParameter, shrinking), 96);
        assert_eq!(offset_of!(SvmParameter, probability), 100);
        assert_eq!(size_of::<SvmParameter>(), 104);
    }
}

//! C ABI for hosts that drive the bridge through raw pointers
//!
//! Every handle returned here is a `Box` turned into a raw pointer and must
//! go back through the matching `free_*` function exactly once. Failures
//! never unwind across the boundary: they are logged with `log::error!` and
//! reported as a null pointer, `NaN` or `false`.

use crate::api::{Bridge, Model};
use crate::core::{BridgeError, KernelType, Result, SvmNode, SvmType};
use crate::engine::NativeModel;
use crate::marshal::{marshal_vector, FeatureVector, Parameters, TrainingSet};
use libc::{c_char, c_double, c_int};
use log::error;
use std::ffi::CStr;
use std::path::PathBuf;
use std::ptr;
use std::slice;

/// Model handle handed to the host
pub type ModelHandle = Model<NativeModel>;

/// Borrow `len` host values, treating an empty buffer as valid even if null
unsafe fn host_slice<'a, T>(data: *const T, len: c_int, what: &'static str) -> Result<&'a [T]> {
    let len = usize::try_from(len)
        .map_err(|_| BridgeError::InvalidArgument(format!("negative length {len} for {what}")))?;
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(BridgeError::NullHandle(what));
    }
    Ok(slice::from_raw_parts(data, len))
}

unsafe fn host_path(name: *const c_char) -> Result<PathBuf> {
    if name.is_null() {
        return Err(BridgeError::NullHandle("model file name"));
    }
    let name = CStr::from_ptr(name)
        .to_str()
        .map_err(|e| BridgeError::InvalidArgument(format!("model file name: {e}")))?;
    Ok(PathBuf::from(name))
}

fn into_handle<T>(result: Result<T>, operation: &str) -> *mut T {
    match result {
        Ok(value) => Box::into_raw(Box::new(value)),
        Err(e) => {
            error!("{operation}: {e}");
            ptr::null_mut()
        }
    }
}

fn into_value(result: Result<f64>, operation: &str) -> c_double {
    result.unwrap_or_else(|e| {
        error!("{operation}: {e}");
        f64::NAN
    })
}

/// Marshal a dense vector into a sentinel-terminated node buffer
///
/// # Safety
/// `data` must point to `size` readable doubles when `size > 0`.
#[no_mangle]
pub unsafe extern "C" fn init_node(data: *const c_double, size: c_int) -> *mut SvmNode {
    match host_slice(data, size, "feature buffer").and_then(marshal_vector) {
        Ok(vector) => vector.into_raw(),
        Err(e) => {
            error!("init_node: {e}");
            ptr::null_mut()
        }
    }
}

/// Release a buffer returned by [`init_node`]
///
/// # Safety
/// `node` must be null or an unreleased pointer from [`init_node`].
#[no_mangle]
pub unsafe extern "C" fn free_node(node: *mut SvmNode) {
    if !node.is_null() {
        drop(FeatureVector::from_raw(node));
    }
}

/// Build an arena-backed training set from row-major dense data
///
/// # Safety
/// `data` must hold `nb_feat * nb_dim` doubles and `labels` `nb_feat`.
#[no_mangle]
pub unsafe extern "C" fn make_samples(
    data: *const c_double,
    labels: *const c_double,
    nb_feat: c_int,
    nb_dim: c_int,
) -> *mut TrainingSet {
    let result = samples_from_host(data, labels, nb_feat, nb_dim);
    into_handle(result, "make_samples")
}

unsafe fn samples_from_host(
    data: *const c_double,
    labels: *const c_double,
    nb_feat: c_int,
    nb_dim: c_int,
) -> Result<TrainingSet> {
    let rows = usize::try_from(nb_feat)
        .map_err(|_| BridgeError::InvalidArgument(format!("negative nb_feat {nb_feat}")))?;
    let dim = usize::try_from(nb_dim)
        .map_err(|_| BridgeError::InvalidArgument(format!("negative nb_dim {nb_dim}")))?;
    let total = rows
        .checked_mul(dim)
        .and_then(|n| c_int::try_from(n).ok())
        .ok_or_else(|| BridgeError::InvalidArgument(format!("{rows} x {dim} overflows")))?;

    let data = host_slice(data, total, "sample buffer")?;
    let labels = host_slice(labels, nb_feat, "label buffer")?;
    TrainingSet::from_dense(data, labels, rows, dim)
}

/// Release a set returned by [`make_samples`]
///
/// # Safety
/// `samples` must be null or an unreleased pointer from [`make_samples`].
#[no_mangle]
pub unsafe extern "C" fn free_sample(samples: *mut TrainingSet) {
    if !samples.is_null() {
        Box::from_raw(samples).free();
    }
}

/// Build a hyperparameter record; weight arrays are copied
///
/// # Safety
/// When `nr_weight > 0`, `weight_label` and `weight` must each point to
/// `nr_weight` readable values.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn make_param(
    svm_type: c_int,
    kernel_type: c_int,
    degree: c_int,
    gamma: c_double,
    coef0: c_double,
    nu: c_double,
    cache_size: c_double,
    c: c_double,
    eps: c_double,
    p: c_double,
    shrinking: c_int,
    probability: c_int,
    nr_weight: c_int,
    weight_label: *const c_int,
    weight: *const c_double,
) -> *mut Parameters {
    let result = (|| -> Result<Parameters> {
        let labels = host_slice(weight_label, nr_weight, "weight labels")?.to_vec();
        let weights = host_slice(weight, nr_weight, "weights")?.to_vec();
        Parameters::from_raw_parts(
            SvmType::from_raw(svm_type)?,
            KernelType::from_raw(kernel_type)?,
            degree,
            gamma,
            coef0,
            nu,
            cache_size,
            c,
            eps,
            p,
            shrinking != 0,
            probability != 0,
            labels,
            weights,
        )
    })();
    into_handle(result, "make_param")
}

/// Release a record that was never passed to training
///
/// # Safety
/// `param` must be null or an unconsumed pointer from [`make_param`].
#[no_mangle]
pub unsafe extern "C" fn free_param(param: *mut Parameters) {
    if !param.is_null() {
        drop(Box::from_raw(param));
    }
}

/// Train a model; `param` is consumed even on failure
///
/// # Safety
/// `samples` must be a live set from [`make_samples`]; `param` must be an
/// unconsumed pointer from [`make_param`].
#[no_mangle]
pub unsafe extern "C" fn train_model(
    samples: *const TrainingSet,
    param: *mut Parameters,
) -> *mut ModelHandle {
    let params = (!param.is_null()).then(|| *Box::from_raw(param));
    let result = match (samples.as_ref(), params) {
        (Some(set), Some(params)) => Bridge::new().train(set, params),
        (None, _) => Err(BridgeError::NullHandle("samples")),
        (_, None) => Err(BridgeError::NullHandle("param")),
    };
    into_handle(result, "train_model")
}

/// Cross validate into `target`; `param` is consumed even on failure
///
/// # Safety
/// `samples` must be a live set from [`make_samples`], `param` an
/// unconsumed pointer from [`make_param`] and `target` must have one
/// writable slot per training row.
#[no_mangle]
pub unsafe extern "C" fn cross_valid_model(
    samples: *const TrainingSet,
    param: *mut Parameters,
    k_fold: c_int,
    target: *mut c_double,
) {
    let params = (!param.is_null()).then(|| *Box::from_raw(param));
    let result = cross_validate_from_host(samples, params, k_fold, target);
    if let Err(e) = result {
        error!("cross_valid_model: {e}");
    }
}

unsafe fn cross_validate_from_host(
    samples: *const TrainingSet,
    params: Option<Parameters>,
    k_fold: c_int,
    target: *mut c_double,
) -> Result<()> {
    let set = samples.as_ref().ok_or(BridgeError::NullHandle("samples"))?;
    let params = params.ok_or(BridgeError::NullHandle("param"))?;
    if target.is_null() {
        return Err(BridgeError::NullHandle("target"));
    }
    let nr_fold = usize::try_from(k_fold)
        .map_err(|_| BridgeError::InvalidArgument(format!("negative fold count {k_fold}")))?;
    let target = slice::from_raw_parts_mut(target, set.len());
    Bridge::new().cross_validate(set, params, nr_fold, target)
}

/// Predict a dense vector; `NaN` on error
///
/// # Safety
/// `model` must be a live model handle and `data` must hold `size` doubles.
#[no_mangle]
pub unsafe extern "C" fn predict_one(
    model: *const ModelHandle,
    data: *const c_double,
    size: c_int,
) -> c_double {
    let result = model
        .as_ref()
        .ok_or(BridgeError::NullHandle("model"))
        .and_then(|model| model.predict(host_slice(data, size, "feature buffer")?));
    into_value(result, "predict_one")
}

/// Predict a dense vector and write `nr_class` probabilities; `NaN` on error
///
/// # Safety
/// As [`predict_one`]; `prob_estimates` must have [`model_nr_class`]
/// writable slots.
#[no_mangle]
pub unsafe extern "C" fn predict_one_with_prob(
    model: *const ModelHandle,
    data: *const c_double,
    size: c_int,
    prob_estimates: *mut c_double,
) -> c_double {
    let result = model
        .as_ref()
        .ok_or(BridgeError::NullHandle("model"))
        .and_then(|model| {
            if prob_estimates.is_null() {
                return Err(BridgeError::NullHandle("probability buffer"));
            }
            let prob = slice::from_raw_parts_mut(prob_estimates, model.nr_class());
            model.predict_with_probabilities(host_slice(data, size, "feature buffer")?, prob)
        });
    into_value(result, "predict_one_with_prob")
}

/// Number of classes of a model, `-1` for a null handle
///
/// # Safety
/// `model` must be null or a live model handle.
#[no_mangle]
pub unsafe extern "C" fn model_nr_class(model: *const ModelHandle) -> c_int {
    match model.as_ref() {
        Some(model) => c_int::try_from(model.nr_class()).unwrap_or(c_int::MAX),
        None => {
            error!("model_nr_class: {}", BridgeError::NullHandle("model"));
            -1
        }
    }
}

/// Save a model to a file
///
/// # Safety
/// `model` must be a live model handle and `model_file_name` a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn save_model(
    model: *const ModelHandle,
    model_file_name: *const c_char,
) -> bool {
    let result = model
        .as_ref()
        .ok_or(BridgeError::NullHandle("model"))
        .and_then(|model| Ok(model.save(host_path(model_file_name)?)));
    result.unwrap_or_else(|e| {
        error!("save_model: {e}");
        false
    })
}

/// Load a model written by [`save_model`]
///
/// # Safety
/// `model_file_name` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn load_model(model_file_name: *const c_char) -> *mut ModelHandle {
    let result = host_path(model_file_name).and_then(|path| Bridge::new().load_model(path));
    into_handle(result, "load_model")
}

/// Release a model handle
///
/// # Safety
/// `model` must be null or an unreleased pointer from [`train_model`] or
/// [`load_model`].
#[no_mangle]
pub unsafe extern "C" fn free_model(model: *mut ModelHandle) {
    if !model.is_null() {
        Box::from_raw(model).free();
    }
}

//! Numeric boundary types
//!
//! Every metric accepts and returns [`Tensor`], a dynamically shaped `f32`
//! ndarray. Results computed on other representations (host `f64` buffers,
//! counts, fixed-dimension arrays) are converted through [`IntoTensor`] so the
//! caller always sees one output representation.

use ndarray::{arr0, Array, Array1, ArrayD, ArrayView1, ArrayView2, ArrayViewD, Dimension, Ix1, Ix2};

use crate::error::{MetricError, Result};
use crate::functional::classification::to_categorical;

/// Native tensor type observed by every caller
pub type Tensor = ArrayD<f32>;

/// Conversion into the native [`Tensor`] representation
pub trait IntoTensor {
    fn into_tensor(self) -> Tensor;
}

impl IntoTensor for f32 {
    fn into_tensor(self) -> Tensor {
        arr0(self).into_dyn()
    }
}

impl IntoTensor for f64 {
    fn into_tensor(self) -> Tensor {
        arr0(self as f32).into_dyn()
    }
}

impl IntoTensor for usize {
    fn into_tensor(self) -> Tensor {
        arr0(self as f32).into_dyn()
    }
}

impl IntoTensor for Vec<f32> {
    fn into_tensor(self) -> Tensor {
        Array1::from(self).into_dyn()
    }
}

impl IntoTensor for Vec<f64> {
    fn into_tensor(self) -> Tensor {
        self.into_iter().map(|v| v as f32).collect::<Array1<f32>>().into_dyn()
    }
}

impl<D: Dimension> IntoTensor for Array<f32, D> {
    fn into_tensor(self) -> Tensor {
        self.into_dyn()
    }
}

impl<D: Dimension> IntoTensor for Array<f64, D> {
    fn into_tensor(self) -> Tensor {
        self.mapv(|v| v as f32).into_dyn()
    }
}

impl<D: Dimension> IntoTensor for Array<usize, D> {
    fn into_tensor(self) -> Tensor {
        self.mapv(|v| v as f32).into_dyn()
    }
}

/// Extract the single value of a scalar-like tensor
pub fn scalar_value(tensor: &Tensor) -> Result<f32> {
    if tensor.len() != 1 {
        return Err(MetricError::shape_mismatch(
            "a single element".to_string(),
            format!("shape {:?}", tensor.shape()),
        ));
    }
    tensor
        .iter()
        .next()
        .copied()
        .ok_or_else(|| MetricError::invalid_input("empty tensor"))
}

/// Copy a tensor into a flat host buffer
pub fn to_host(tensor: ArrayViewD<f32>) -> Vec<f64> {
    tensor.iter().map(|&v| v as f64).collect()
}

/// Check that prediction and target share the same leading dimension
pub fn check_leading_dim(pred: &Tensor, target: &Tensor) -> Result<usize> {
    if pred.ndim() == 0 || target.ndim() == 0 {
        return Err(MetricError::shape_mismatch(
            "at least one dimension".to_string(),
            format!("pred {:?}, target {:?}", pred.shape(), target.shape()),
        ));
    }
    let n = pred.shape()[0];
    if target.shape()[0] != n {
        return Err(MetricError::shape_mismatch(
            format!("{} samples", n),
            format!("{} samples", target.shape()[0]),
        ));
    }
    Ok(n)
}

/// View a tensor as a vector
pub fn as_vector<'a>(tensor: &'a Tensor, what: &str) -> Result<ArrayView1<'a, f32>> {
    tensor.view().into_dimensionality::<Ix1>().map_err(|_| {
        MetricError::shape_mismatch(format!("1-d {}", what), format!("shape {:?}", tensor.shape()))
    })
}

/// View a tensor as a `(N, C)` matrix
pub fn as_matrix<'a>(tensor: &'a Tensor, what: &str) -> Result<ArrayView2<'a, f32>> {
    tensor.view().into_dimensionality::<Ix2>().map_err(|_| {
        MetricError::shape_mismatch(format!("2-d {}", what), format!("shape {:?}", tensor.shape()))
    })
}

/// Labels must stay below 2^24, the range where `f32` holds every integer
pub const MAX_LABEL: f32 = 16_777_216.0;

/// Interpret a vector of `f32` as class labels
pub fn as_labels(values: ArrayView1<f32>) -> Result<Array1<usize>> {
    values
        .iter()
        .map(|&v| {
            if !(v.is_finite() && v >= 0.0 && v.fract() == 0.0) {
                Err(MetricError::invalid_input(format!(
                    "label {} is not a non-negative integer",
                    v
                )))
            } else if v >= MAX_LABEL {
                Err(MetricError::invalid_input(format!(
                    "label {} is not below {}",
                    v, MAX_LABEL
                )))
            } else {
                Ok(v as usize)
            }
        })
        .collect()
}

/// Resolve a prediction/target pair into label vectors.
///
/// Predictions may be labels `(N,)` or class scores `(N, C)`; scores are
/// reduced with argmax. Targets are always labels `(N,)`.
pub fn resolve_labels(pred: &Tensor, target: &Tensor) -> Result<(Array1<usize>, Array1<usize>)> {
    check_leading_dim(pred, target)?;
    let target_labels = as_labels(as_vector(target, "target")?)?;
    let pred_labels = match pred.ndim() {
        1 => as_labels(as_vector(pred, "prediction")?)?,
        2 => to_categorical(as_matrix(pred, "prediction")?),
        _ => {
            return Err(MetricError::shape_mismatch(
                "(N,) labels or (N, C) scores".to_string(),
                format!("shape {:?}", pred.shape()),
            ))
        }
    };
    Ok((pred_labels, target_labels))
}

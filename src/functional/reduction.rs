use std::fmt;
use std::str::FromStr;

use ndarray::{arr0, Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};
use crate::types::Tensor;

/// Element-wise reduction applied to per-sample or per-class scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    #[default]
    Mean,
    Sum,
    None,
}

impl FromStr for Reduction {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" | "elementwise_mean" => Ok(Reduction::Mean),
            "sum" => Ok(Reduction::Sum),
            "none" => Ok(Reduction::None),
            other => Err(MetricError::invalid_parameter(
                "reduction".to_string(),
                format!("unknown reduction '{}', expected one of mean, sum, none", other),
            )),
        }
    }
}

/// Averaging strategy for per-class ratio metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassAverage {
    /// Pool counts over all classes before dividing
    #[default]
    Micro,
    /// Unweighted mean of the per-class scores
    Macro,
    /// Per-class scores weighted by class support
    Weighted,
    /// Per-class scores, no averaging
    None,
}

impl FromStr for ClassAverage {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "micro" => Ok(ClassAverage::Micro),
            "macro" => Ok(ClassAverage::Macro),
            "weighted" => Ok(ClassAverage::Weighted),
            "none" => Ok(ClassAverage::None),
            other => Err(MetricError::invalid_parameter(
                "average".to_string(),
                format!(
                    "unknown averaging mode '{}', expected one of micro, macro, weighted, none",
                    other
                ),
            )),
        }
    }
}

impl fmt::Display for ClassAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClassAverage::Micro => "micro",
            ClassAverage::Macro => "macro",
            ClassAverage::Weighted => "weighted",
            ClassAverage::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// Reduce a vector of scores
pub fn reduce(values: ArrayView1<f32>, reduction: Reduction) -> Tensor {
    match reduction {
        Reduction::Mean => {
            let mean = if values.is_empty() { 0.0 } else { values.sum() / values.len() as f32 };
            arr0(mean).into_dyn()
        }
        Reduction::Sum => arr0(values.sum()).into_dyn(),
        Reduction::None => values.to_owned().into_dyn(),
    }
}

/// Divide, substituting `zero_division` where the denominator is zero
pub fn safe_divide(num: ArrayView1<f32>, denom: ArrayView1<f32>, zero_division: f32) -> Array1<f32> {
    num.iter()
        .zip(denom.iter())
        .map(|(&n, &d)| if d == 0.0 { zero_division } else { n / d })
        .collect()
}

/// Reduce per-class fractions `num / denom` according to `average`.
///
/// `weights` are the per-class supports used by [`ClassAverage::Weighted`].
/// Averaged modes return a 0-d tensor, [`ClassAverage::None`] a `(C,)` tensor.
pub fn class_reduce(
    num: ArrayView1<f32>,
    denom: ArrayView1<f32>,
    weights: ArrayView1<f32>,
    average: ClassAverage,
    zero_division: f32,
) -> Result<Tensor> {
    if num.len() != denom.len() || num.len() != weights.len() {
        return Err(MetricError::shape_mismatch(
            format!("{} classes", num.len()),
            format!("{} denominators, {} weights", denom.len(), weights.len()),
        ));
    }

    let reduced = match average {
        ClassAverage::Micro => {
            let d = denom.sum();
            let value = if d == 0.0 { zero_division } else { num.sum() / d };
            arr0(value).into_dyn()
        }
        ClassAverage::Macro => {
            let fractions = safe_divide(num, denom, zero_division);
            reduce(fractions.view(), Reduction::Mean)
        }
        ClassAverage::Weighted => {
            let fractions = safe_divide(num, denom, zero_division);
            let total = weights.sum();
            let value = if total == 0.0 {
                zero_division
            } else {
                fractions.iter().zip(weights.iter()).map(|(f, w)| f * w / total).sum()
            };
            arr0(value).into_dyn()
        }
        ClassAverage::None => safe_divide(num, denom, zero_division).into_dyn(),
    };

    Ok(reduced)
}

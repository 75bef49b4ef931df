use ndarray::{arr0, ArrayD, ArrayViewD, Zip};

use super::reduction::Reduction;
use crate::error::{MetricError, Result};
use crate::types::Tensor;

fn check_same_shape(pred: &ArrayViewD<f32>, target: &ArrayViewD<f32>) -> Result<()> {
    if pred.shape() != target.shape() {
        return Err(MetricError::shape_mismatch(
            format!("{:?}", pred.shape()),
            format!("{:?}", target.shape()),
        ));
    }
    if pred.is_empty() {
        return Err(MetricError::invalid_input("prediction and target are empty"));
    }
    Ok(())
}

fn elementwise<F>(pred: ArrayViewD<f32>, target: ArrayViewD<f32>, f: F) -> Result<ArrayD<f32>>
where
    F: Fn(f32, f32) -> f32,
{
    check_same_shape(&pred, &target)?;
    let mut out = ArrayD::<f32>::zeros(pred.raw_dim());
    Zip::from(&mut out)
        .and(&pred)
        .and(&target)
        .for_each(|o, &p, &t| *o = f(p, t));
    Ok(out)
}

fn reduce_elementwise(errors: ArrayD<f32>, reduction: Reduction) -> Tensor {
    match reduction {
        Reduction::Mean => {
            let n = errors.len() as f32;
            arr0(errors.sum() / n).into_dyn()
        }
        Reduction::Sum => arr0(errors.sum()).into_dyn(),
        Reduction::None => errors,
    }
}

/// Mean squared error
pub fn mse(pred: ArrayViewD<f32>, target: ArrayViewD<f32>, reduction: Reduction) -> Result<Tensor> {
    let errors = elementwise(pred, target, |p, t| (p - t) * (p - t))?;
    Ok(reduce_elementwise(errors, reduction))
}

/// Root mean squared error
pub fn rmse(pred: ArrayViewD<f32>, target: ArrayViewD<f32>, reduction: Reduction) -> Result<Tensor> {
    Ok(mse(pred, target, reduction)?.mapv(f32::sqrt))
}

/// Mean absolute error
pub fn mae(pred: ArrayViewD<f32>, target: ArrayViewD<f32>, reduction: Reduction) -> Result<Tensor> {
    let errors = elementwise(pred, target, |p, t| (p - t).abs())?;
    Ok(reduce_elementwise(errors, reduction))
}

/// Root mean squared logarithmic error; all values must exceed -1
pub fn rmsle(pred: ArrayViewD<f32>, target: ArrayViewD<f32>, reduction: Reduction) -> Result<Tensor> {
    if pred.iter().chain(target.iter()).any(|&v| v <= -1.0) {
        return Err(MetricError::invalid_input("rmsle requires all values to be greater than -1"));
    }
    let errors = elementwise(pred, target, |p, t| {
        let d = p.ln_1p() - t.ln_1p();
        d * d
    })?;
    Ok(reduce_elementwise(errors, reduction).mapv(f32::sqrt))
}

/// Peak signal-to-noise ratio in units of `10 * log_base`.
///
/// `data_range` defaults to the span of the target values. Identical inputs
/// give positive infinity.
pub fn psnr(pred: ArrayViewD<f32>, target: ArrayViewD<f32>, data_range: Option<f32>, base: f32) -> Result<f32> {
    if !(base.is_finite() && base > 0.0 && base != 1.0) {
        return Err(MetricError::invalid_parameter(
            "base".to_string(),
            format!("must be positive and different from 1, got {}", base),
        ));
    }

    let range = match data_range {
        Some(r) if r > 0.0 => r,
        Some(r) => {
            return Err(MetricError::invalid_parameter(
                "data_range".to_string(),
                format!("must be positive, got {}", r),
            ))
        }
        None => {
            let max = target.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let min = target.iter().copied().fold(f32::INFINITY, f32::min);
            max - min
        }
    };

    let errors = elementwise(pred, target, |p, t| (p - t) * (p - t))?;
    let mse = errors.sum() / errors.len() as f32;
    if mse == 0.0 {
        return Ok(f32::INFINITY);
    }

    let psnr_base_e = 2.0 * range.ln() - mse.ln();
    Ok(psnr_base_e * (10.0 / base.ln()))
}

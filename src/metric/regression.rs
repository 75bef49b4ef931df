//! Regression metrics over same-shaped prediction and target tensors

use super::{Metric, SyncContext};
use crate::error::Result;
use crate::functional::{self, Reduction};
use crate::types::{IntoTensor, Tensor};

macro_rules! elementwise_metric {
    ($(#[$doc:meta])* $metric:ident, $name:literal, $func:path) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default)]
        pub struct $metric {
            reduction: Reduction,
            sync: SyncContext,
        }

        impl $metric {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn with_reduction(mut self, reduction: Reduction) -> Self {
                self.reduction = reduction;
                self
            }
        }

        impl_synchronized!($metric, $name);

        impl Metric for $metric {
            type Output = Tensor;

            fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
                $func(pred.view(), target.view(), self.reduction)
            }
        }
    };
}

elementwise_metric!(
    /// Mean squared error
    Mse,
    "mse",
    functional::mse
);
elementwise_metric!(
    /// Root mean squared error
    Rmse,
    "rmse",
    functional::rmse
);
elementwise_metric!(
    /// Mean absolute error
    Mae,
    "mae",
    functional::mae
);
elementwise_metric!(
    /// Root mean squared logarithmic error
    Rmsle,
    "rmsle",
    functional::rmsle
);

/// Peak signal-to-noise ratio.
///
/// Without an explicit `data_range` each rank measures the span of its own
/// targets, so set one when the shards cover different value ranges.
#[derive(Debug, Clone)]
pub struct Psnr {
    data_range: Option<f32>,
    base: f32,
    sync: SyncContext,
}

impl Psnr {
    pub fn new() -> Self {
        Self {
            data_range: None,
            base: 10.0,
            sync: SyncContext::default(),
        }
    }

    pub fn with_data_range(mut self, range: f32) -> Self {
        self.data_range = Some(range);
        self
    }

    pub fn with_base(mut self, base: f32) -> Self {
        self.base = base;
        self
    }
}

impl Default for Psnr {
    fn default() -> Self {
        Self::new()
    }
}

impl_synchronized!(Psnr, "psnr");

impl Metric for Psnr {
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        Ok(functional::psnr(pred.view(), target.view(), self.data_range, self.base)?.into_tensor())
    }
}

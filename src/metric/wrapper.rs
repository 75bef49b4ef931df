//! Wrappers turning plain functions into synchronised metrics

use std::marker::PhantomData;

use super::{Metric, SyncContext, Synchronized};
use crate::distributed::ReduceOp;
use crate::error::Result;
use crate::types::{check_leading_dim, to_host, IntoTensor, Tensor};

/// Metric over native tensors
pub struct TensorMetric<F> {
    name: String,
    func: F,
    sync: SyncContext,
}

impl<F> TensorMetric<F>
where
    F: Fn(&Tensor, &Tensor) -> Result<Tensor> + Send + Sync,
{
    pub fn new(name: &str, func: F) -> Self {
        Self {
            name: name.to_string(),
            func,
            sync: SyncContext::default(),
        }
    }

    pub fn with_reduce_op(mut self, op: ReduceOp) -> Self {
        self.sync.set_op(op);
        self
    }
}

impl<F> Synchronized for TensorMetric<F>
where
    F: Fn(&Tensor, &Tensor) -> Result<Tensor> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn sync_context(&self) -> &SyncContext {
        &self.sync
    }

    fn sync_context_mut(&mut self) -> &mut SyncContext {
        &mut self.sync
    }
}

impl<F> Metric for TensorMetric<F>
where
    F: Fn(&Tensor, &Tensor) -> Result<Tensor> + Send + Sync,
{
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        check_leading_dim(pred, target)?;
        (self.func)(pred, target)
    }
}

/// Metric whose computation runs on flat `f64` host buffers.
///
/// Inputs are copied out of the native tensors and the result is converted
/// back, so callers see the same [`Tensor`] output as with [`TensorMetric`].
pub struct HostMetric<F, R> {
    name: String,
    func: F,
    sync: SyncContext,
    _output: PhantomData<fn() -> R>,
}

impl<F, R> HostMetric<F, R>
where
    F: Fn(&[f64], &[f64]) -> Result<R> + Send + Sync,
    R: IntoTensor,
{
    pub fn new(name: &str, func: F) -> Self {
        Self {
            name: name.to_string(),
            func,
            sync: SyncContext::default(),
            _output: PhantomData,
        }
    }

    pub fn with_reduce_op(mut self, op: ReduceOp) -> Self {
        self.sync.set_op(op);
        self
    }
}

impl<F, R> Synchronized for HostMetric<F, R>
where
    F: Fn(&[f64], &[f64]) -> Result<R> + Send + Sync,
    R: IntoTensor,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn sync_context(&self) -> &SyncContext {
        &self.sync
    }

    fn sync_context_mut(&mut self) -> &mut SyncContext {
        &mut self.sync
    }
}

impl<F, R> Metric for HostMetric<F, R>
where
    F: Fn(&[f64], &[f64]) -> Result<R> + Send + Sync,
    R: IntoTensor,
{
    type Output = Tensor;

    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        check_leading_dim(pred, target)?;
        let pred = to_host(pred.view());
        let target = to_host(target.view());
        Ok((self.func)(&pred, &target)?.into_tensor())
    }
}

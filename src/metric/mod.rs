//! Metric objects with transparent distributed reduction
//!
//! A metric is a pure local computation ([`Metric::compute`]) plus a
//! [`SyncContext`]: the reduction mode and the process group it reduces over.
//! [`Metric::forward`] runs the computation and, when the context is active,
//! reduces every tensor of the result across all ranks before returning it.
//!
//! Metrics start out attached to [`SingleProcess`], so they behave as plain
//! functions until a driver calls [`attach_reducer`] on the model that owns
//! them.

pub mod classification;
pub mod regression;
pub mod wrapper;

use std::fmt;
use std::sync::Arc;

use log::{info, trace};

use crate::distributed::{single_process, ReduceOp, Reducer, Reducible, SingleProcess};
use crate::error::Result;
use crate::types::Tensor;

pub use classification::{
    Accuracy, AveragePrecision, Auroc, ConfusionMatrix, Dice, FBeta, Iou, MulticlassPrecisionRecallCurve,
    MulticlassRoc, Precision, PrecisionRecallCurve, Recall, Roc,
};
pub use regression::{Mae, Mse, Psnr, Rmse, Rmsle};
pub use wrapper::{HostMetric, TensorMetric};

/// Reduction mode plus the process group to reduce over
#[derive(Clone)]
pub struct SyncContext {
    op: ReduceOp,
    reducer: Arc<dyn Reducer>,
}

impl SyncContext {
    pub fn new(op: ReduceOp) -> Self {
        Self {
            op,
            reducer: single_process(),
        }
    }

    pub fn op(&self) -> ReduceOp {
        self.op
    }

    pub fn reducer(&self) -> &Arc<dyn Reducer> {
        &self.reducer
    }

    pub fn set_op(&mut self, op: ReduceOp) {
        self.op = op;
    }

    pub fn set_reducer(&mut self, reducer: Arc<dyn Reducer>) {
        self.reducer = reducer;
    }

    /// True when `forward` will issue collectives
    pub fn is_active(&self) -> bool {
        self.op != ReduceOp::None && self.reducer.is_distributed()
    }

    /// Reduce `output` across the group, or leave it untouched when inactive
    pub fn sync<R: Reducible + ?Sized>(&self, output: &mut R) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        output.sync(self.reducer.as_ref(), self.op)
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new(ReduceOp::default())
    }
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("op", &self.op)
            .field("rank", &self.reducer.rank())
            .field("world_size", &self.reducer.world_size())
            .finish()
    }
}

/// Object-safe view of a metric used by the distributed driver
pub trait Synchronized: Send + Sync {
    fn name(&self) -> &str;

    fn sync_context(&self) -> &SyncContext;

    fn sync_context_mut(&mut self) -> &mut SyncContext;

    /// Install the process group this metric reduces over
    fn attach(&mut self, reducer: Arc<dyn Reducer>) {
        self.sync_context_mut().set_reducer(reducer);
    }

    /// Return to single-process behaviour
    fn detach(&mut self) {
        self.sync_context_mut().set_reducer(Arc::new(SingleProcess));
    }
}

/// A metric computed on a prediction/target pair
pub trait Metric: Synchronized {
    type Output: Reducible;

    /// Compute the metric on this rank's data only
    fn compute(&self, pred: &Tensor, target: &Tensor) -> Result<Self::Output>;

    /// Compute locally, then reduce across the process group if one is attached
    fn forward(&self, pred: &Tensor, target: &Tensor) -> Result<Self::Output> {
        let mut output = self.compute(pred, target)?;
        let context = self.sync_context();
        trace!(
            "{} computed on rank {} (sync: {})",
            self.name(),
            context.reducer().rank(),
            context.is_active()
        );
        context.sync(&mut output)?;
        Ok(output)
    }
}

/// Implemented by models so a driver can find the metrics they own
pub trait HasMetrics {
    fn metrics_mut(&mut self) -> Vec<&mut dyn Synchronized>;
}

/// Attach `reducer` to every metric of `model`; returns how many were attached
pub fn attach_reducer<M: HasMetrics + ?Sized>(model: &mut M, reducer: Arc<dyn Reducer>) -> usize {
    let rank = reducer.rank();
    let world_size = reducer.world_size();
    let mut count = 0;
    for metric in model.metrics_mut() {
        metric.attach(Arc::clone(&reducer));
        count += 1;
    }
    info!("attached rank {}/{} to {} metrics", rank, world_size, count);
    count
}

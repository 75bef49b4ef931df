//! Collective reduction across data-parallel workers
//!
//! A [`Reducer`] is the handle a worker holds on its process group. Metrics
//! call [`Reducer::all_reduce`] on every tensor of their local result; the
//! call blocks until every rank in the group has contributed, then leaves the
//! reduced value in place on all ranks.
//!
//! Every rank must issue the same collectives in the same order. The group
//! cannot detect a missing call, it can only time out.

pub mod local;
pub mod runner;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ndarray::{arr0, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};
use crate::types::Tensor;

pub use local::{LocalProcessGroup, LocalReducer};
pub use runner::{run_workers, shard};

/// How values from all ranks are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceOp {
    Sum,
    /// Sum, then divide by the world size
    #[default]
    Mean,
    Max,
    Min,
    /// Keep the local value, issue no collective
    None,
}

impl ReduceOp {
    /// Fold `other` into the running accumulator
    pub fn combine(self, acc: &mut Tensor, other: &Tensor) {
        match self {
            ReduceOp::Sum | ReduceOp::Mean => *acc += other,
            ReduceOp::Max => Zip::from(acc).and(other).for_each(|a, &b| *a = a.max(b)),
            ReduceOp::Min => Zip::from(acc).and(other).for_each(|a, &b| *a = a.min(b)),
            ReduceOp::None => {}
        }
    }

    /// Apply the post-processing step once all contributions are in
    pub fn finalize(self, acc: &mut Tensor, world_size: usize) {
        if self == ReduceOp::Mean && world_size > 0 {
            acc.mapv_inplace(|v| v / world_size as f32);
        }
    }
}

impl FromStr for ReduceOp {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(ReduceOp::Sum),
            "mean" | "avg" => Ok(ReduceOp::Mean),
            "max" => Ok(ReduceOp::Max),
            "min" => Ok(ReduceOp::Min),
            "none" => Ok(ReduceOp::None),
            other => Err(MetricError::invalid_parameter(
                "reduce_op".to_string(),
                format!("unknown reduction '{}', expected one of sum, mean, max, min, none", other),
            )),
        }
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReduceOp::Sum => "sum",
            ReduceOp::Mean => "mean",
            ReduceOp::Max => "max",
            ReduceOp::Min => "min",
            ReduceOp::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// Collective-communication handle for one rank of a process group
pub trait Reducer: Send + Sync + fmt::Debug {
    fn rank(&self) -> usize;

    fn world_size(&self) -> usize;

    /// Reduce `tensor` in place across all ranks.
    ///
    /// Blocks until every rank has called it for the same round. Fails on
    /// disagreeing shapes or ops, departed peers and timeouts.
    fn all_reduce(&self, tensor: &mut Tensor, op: ReduceOp) -> Result<()>;

    fn is_distributed(&self) -> bool {
        self.world_size() > 1
    }
}

/// Reducer used when no process group exists; every collective is a no-op
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Reducer for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn world_size(&self) -> usize {
        1
    }

    fn all_reduce(&self, _tensor: &mut Tensor, _op: ReduceOp) -> Result<()> {
        Ok(())
    }
}

/// Shared handle to the single-process reducer
pub fn single_process() -> Arc<dyn Reducer> {
    Arc::new(SingleProcess)
}

/// Reduce a set of per-rank tensors at one place.
///
/// The reference semantics every [`Reducer`] must reproduce.
pub fn reduce_tensors(tensors: &[Tensor], op: ReduceOp) -> Result<Tensor> {
    let first = tensors
        .first()
        .ok_or_else(|| MetricError::invalid_input("nothing to reduce"))?;

    let mut acc = first.clone();
    if op == ReduceOp::None {
        return Ok(acc);
    }
    for tensor in &tensors[1..] {
        if tensor.shape() != acc.shape() {
            return Err(MetricError::shape_mismatch(
                format!("{:?}", acc.shape()),
                format!("{:?}", tensor.shape()),
            ));
        }
        op.combine(&mut acc, tensor);
    }
    op.finalize(&mut acc, tensors.len());
    Ok(acc)
}

/// Values that can be synchronised through a [`Reducer`].
///
/// Composite outputs reduce their parts in a fixed order so every rank
/// issues the same sequence of collectives.
pub trait Reducible {
    fn sync(&mut self, reducer: &dyn Reducer, op: ReduceOp) -> Result<()>;
}

impl Reducible for Tensor {
    fn sync(&mut self, reducer: &dyn Reducer, op: ReduceOp) -> Result<()> {
        reducer.all_reduce(self, op)
    }
}

impl<A: Reducible, B: Reducible> Reducible for (A, B) {
    fn sync(&mut self, reducer: &dyn Reducer, op: ReduceOp) -> Result<()> {
        self.0.sync(reducer, op)?;
        self.1.sync(reducer, op)
    }
}

impl<A: Reducible, B: Reducible, C: Reducible> Reducible for (A, B, C) {
    fn sync(&mut self, reducer: &dyn Reducer, op: ReduceOp) -> Result<()> {
        self.0.sync(reducer, op)?;
        self.1.sync(reducer, op)?;
        self.2.sync(reducer, op)
    }
}

impl<T: Reducible> Reducible for Vec<T> {
    fn sync(&mut self, reducer: &dyn Reducer, op: ReduceOp) -> Result<()> {
        // ranks must agree on the element count before reducing element-wise
        let mut longest = arr0(self.len() as f32).into_dyn();
        let mut shortest = longest.clone();
        reducer.all_reduce(&mut longest, ReduceOp::Max)?;
        reducer.all_reduce(&mut shortest, ReduceOp::Min)?;
        if longest != shortest {
            return Err(MetricError::communication(format!(
                "ranks disagree on the number of outputs ({} to {})",
                shortest[[]],
                longest[[]]
            )));
        }

        for item in self.iter_mut() {
            item.sync(reducer, op)?;
        }
        Ok(())
    }
}

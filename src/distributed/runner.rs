use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::debug;
use ndarray::{Axis, Slice};

use super::{LocalProcessGroup, Reducer};
use crate::error::{MetricError, Result};
use crate::types::Tensor;

/// Run `worker` once per rank on its own thread, sharing one process group.
///
/// Results come back in rank order. If any rank fails, the error of the rank
/// that failed first on its own account is returned in preference to the
/// communication errors it caused on its peers.
pub fn run_workers<T, F>(world_size: usize, timeout: Duration, worker: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize, Arc<dyn Reducer>) -> Result<T> + Sync,
{
    let reducers = LocalProcessGroup::new(world_size, timeout)?;
    debug!("spawning {} metric workers", world_size);

    let outcomes: Vec<Result<T>> = thread::scope(|scope| {
        let worker = &worker;
        let handles: Vec<_> = reducers
            .into_iter()
            .enumerate()
            .map(|(rank, reducer)| {
                scope.spawn(move || {
                    let reducer: Arc<dyn Reducer> = Arc::new(reducer);
                    worker(rank, reducer)
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(rank, handle)| {
                handle
                    .join()
                    .map_err(|_| MetricError::communication(format!("worker {} panicked", rank)))
                    .and_then(|outcome| outcome)
            })
            .collect()
    });

    let root_cause = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .find(|err| !err.is_collective_failure())
        .cloned();
    if let Some(err) = root_cause {
        return Err(err);
    }
    outcomes.into_iter().collect()
}

/// Contiguous slice of a batch along axis 0 for `rank`.
///
/// Shards differ in size by at most one row; the first `N % world_size`
/// ranks get the extra rows.
pub fn shard(batch: &Tensor, rank: usize, world_size: usize) -> Result<Tensor> {
    if world_size == 0 || rank >= world_size {
        return Err(MetricError::invalid_parameter(
            "rank".to_string(),
            format!("rank {} is outside a world of {}", rank, world_size),
        ));
    }
    if batch.ndim() == 0 {
        return Err(MetricError::shape_mismatch(
            "at least one dimension".to_string(),
            "a scalar".to_string(),
        ));
    }

    let n = batch.shape()[0];
    let base = n / world_size;
    let extra = n % world_size;
    let start = rank * base + rank.min(extra);
    let len = base + usize::from(rank < extra);

    Ok(batch
        .slice_axis(Axis(0), Slice::from(start..start + len))
        .to_owned())
}

//! In-process process group backed by a mutex and condition variable.
//!
//! Each rank owns a [`LocalReducer`]; all of them share one round state.
//! Rounds are numbered, so the same group serves any number of collectives.
//! The last rank to arrive finalises the round and wakes the others.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::{ReduceOp, Reducer};
use crate::error::{MetricError, Result};
use crate::types::Tensor;

#[derive(Debug, Default)]
struct RoundState {
    generation: u64,
    arrived: usize,
    op: Option<ReduceOp>,
    acc: Option<Tensor>,
    failure: Option<MetricError>,
    /// Outcome of the most recently completed round
    completed: Option<std::result::Result<Tensor, MetricError>>,
    departed: Vec<usize>,
    poisoned: Option<String>,
}

impl RoundState {
    fn check_health(&self) -> Result<()> {
        if let Some(reason) = &self.poisoned {
            return Err(MetricError::communication(format!("process group is broken: {}", reason)));
        }
        if let Some(rank) = self.departed.first() {
            return Err(MetricError::communication(format!("rank {} left the process group", rank)));
        }
        Ok(())
    }

    fn contribute(&mut self, tensor: &Tensor, op: ReduceOp) {
        if self.failure.is_some() {
            return;
        }
        let round_op = match self.op {
            Some(round_op) => round_op,
            None => {
                self.op = Some(op);
                self.acc = Some(tensor.clone());
                return;
            }
        };

        if round_op != op {
            self.failure = Some(MetricError::communication(format!(
                "ranks disagree on the reduction: {} vs {}",
                round_op, op
            )));
            return;
        }

        let mismatch = match self.acc.as_mut() {
            Some(acc) if acc.shape() == tensor.shape() => {
                op.combine(acc, tensor);
                None
            }
            Some(acc) => Some(MetricError::shape_mismatch(
                format!("{:?} on every rank", acc.shape()),
                format!("{:?}", tensor.shape()),
            )),
            None => Some(MetricError::communication("round accumulator missing")),
        };
        if mismatch.is_some() {
            self.failure = mismatch;
        }
    }

    fn finish(&mut self, world_size: usize) -> std::result::Result<Tensor, MetricError> {
        let outcome = match (self.failure.take(), self.acc.take(), self.op) {
            (Some(err), _, _) => Err(err),
            (None, Some(mut acc), Some(op)) => {
                op.finalize(&mut acc, world_size);
                Ok(acc)
            }
            _ => Err(MetricError::communication("round completed without contributions")),
        };

        self.completed = Some(outcome.clone());
        self.generation += 1;
        self.arrived = 0;
        self.op = None;
        outcome
    }
}

#[derive(Debug)]
struct Shared {
    world_size: usize,
    timeout: Duration,
    state: Mutex<RoundState>,
    round_done: Condvar,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, RoundState>> {
        self.state
            .lock()
            .map_err(|_| MetricError::communication("process group lock poisoned"))
    }
}

/// Factory for an in-process group of `world_size` ranks
pub struct LocalProcessGroup;

impl LocalProcessGroup {
    /// Create the group and return one reducer per rank, in rank order.
    ///
    /// `timeout` bounds how long a rank waits for its peers in one round.
    pub fn new(world_size: usize, timeout: Duration) -> Result<Vec<LocalReducer>> {
        if world_size == 0 {
            return Err(MetricError::invalid_parameter(
                "world_size".to_string(),
                "a process group needs at least one rank".to_string(),
            ));
        }

        let shared = Arc::new(Shared {
            world_size,
            timeout,
            state: Mutex::new(RoundState::default()),
            round_done: Condvar::new(),
        });

        Ok((0..world_size)
            .map(|rank| LocalReducer {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect())
    }
}

/// One rank's handle on a [`LocalProcessGroup`].
///
/// Dropping it counts as leaving the group: peers blocked in, or later
/// entering, a collective fail instead of waiting for the timeout.
#[derive(Debug)]
pub struct LocalReducer {
    rank: usize,
    shared: Arc<Shared>,
}

impl Reducer for LocalReducer {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.shared.world_size
    }

    fn all_reduce(&self, tensor: &mut Tensor, op: ReduceOp) -> Result<()> {
        if op == ReduceOp::None || self.shared.world_size == 1 {
            return Ok(());
        }

        let mut state = self.shared.lock()?;
        state.check_health()?;

        let generation = state.generation;
        debug!(
            "rank {} entering all_reduce #{} ({}, shape {:?})",
            self.rank,
            generation,
            op,
            tensor.shape()
        );

        state.contribute(tensor, op);
        state.arrived += 1;

        if state.arrived == self.shared.world_size {
            let outcome = state.finish(self.shared.world_size);
            self.shared.round_done.notify_all();
            *tensor = outcome?;
            return Ok(());
        }

        let deadline = Instant::now().checked_add(self.shared.timeout);
        while state.generation == generation {
            state.check_health()?;

            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        warn!(
                            "rank {} timed out in all_reduce #{} after {:?}",
                            self.rank, generation, self.shared.timeout
                        );
                        state.poisoned = Some(format!("rank {} timed out", self.rank));
                        self.shared.round_done.notify_all();
                        return Err(MetricError::Timeout {
                            rank: self.rank,
                            waited: self.shared.timeout,
                        });
                    }
                    deadline - now
                }
                None => Duration::from_secs(3600),
            };

            let (guard, _) = self
                .shared
                .round_done
                .wait_timeout(state, remaining)
                .map_err(|_| MetricError::communication("process group lock poisoned"))?;
            state = guard;
        }

        let outcome = state
            .completed
            .clone()
            .ok_or_else(|| MetricError::communication("round finished without an outcome"))?;
        *tensor = outcome?;
        Ok(())
    }
}

impl Drop for LocalReducer {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.departed.push(self.rank);
        }
        self.shared.round_done.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::thread;

    #[test]
    fn test_group_requires_ranks() {
        assert!(LocalProcessGroup::new(0, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_all_reduce_sum_and_mean_across_threads() {
        let reducers = LocalProcessGroup::new(3, Duration::from_secs(5)).unwrap();
        let handles: Vec<_> = reducers
            .into_iter()
            .map(|reducer| {
                thread::spawn(move || {
                    let rank = reducer.rank() as f32;
                    let mut sum = array![rank, 1.0].into_dyn();
                    reducer.all_reduce(&mut sum, ReduceOp::Sum).unwrap();
                    let mut mean = array![rank].into_dyn();
                    reducer.all_reduce(&mut mean, ReduceOp::Mean).unwrap();
                    (sum, mean)
                })
            })
            .collect();

        for handle in handles {
            let (sum, mean) = handle.join().unwrap();
            assert_eq!(sum, array![3.0f32, 3.0].into_dyn());
            assert_eq!(mean, array![1.0f32].into_dyn());
        }
    }

    #[test]
    fn test_shape_disagreement_fails_every_rank() {
        let reducers = LocalProcessGroup::new(2, Duration::from_secs(5)).unwrap();
        let handles: Vec<_> = reducers
            .into_iter()
            .map(|reducer| {
                thread::spawn(move || {
                    let len = reducer.rank() + 1;
                    let mut t = Tensor::zeros(ndarray::IxDyn(&[len]));
                    reducer.all_reduce(&mut t, ReduceOp::Sum)
                })
            })
            .collect();

        for handle in handles {
            assert!(matches!(handle.join().unwrap(), Err(MetricError::ShapeMismatch { .. })));
        }
    }

    #[test]
    fn test_op_disagreement_fails_every_rank() {
        let reducers = LocalProcessGroup::new(2, Duration::from_secs(5)).unwrap();
        let handles: Vec<_> = reducers
            .into_iter()
            .map(|reducer| {
                thread::spawn(move || {
                    let op = if reducer.rank() == 0 { ReduceOp::Sum } else { ReduceOp::Max };
                    let mut t = array![1.0f32, 2.0].into_dyn();
                    reducer.all_reduce(&mut t, op)
                })
            })
            .collect();

        for handle in handles {
            assert!(matches!(handle.join().unwrap(), Err(MetricError::Communication(_))));
        }
    }

    #[test]
    fn test_missing_peer_times_out() {
        let mut reducers = LocalProcessGroup::new(2, Duration::from_millis(50)).unwrap();
        let lonely = reducers.remove(0);
        let absent = reducers.remove(0);

        let mut t = array![1.0f32].into_dyn();
        let err = lonely.all_reduce(&mut t, ReduceOp::Sum).unwrap_err();
        assert!(matches!(err, MetricError::Timeout { rank: 0, .. }));

        // the group stays broken afterwards
        let err = absent.all_reduce(&mut t, ReduceOp::Sum).unwrap_err();
        assert!(matches!(err, MetricError::Communication(_)));
    }

    #[test]
    fn test_departed_peer_fails_fast() {
        let mut reducers = LocalProcessGroup::new(2, Duration::from_secs(30)).unwrap();
        let survivor = reducers.remove(0);
        drop(reducers);

        let start = Instant::now();
        let mut t = array![1.0f32].into_dyn();
        let err = survivor.all_reduce(&mut t, ReduceOp::Mean).unwrap_err();
        assert!(matches!(err, MetricError::Communication(_)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_world_of_one_is_identity() {
        let reducers = LocalProcessGroup::new(1, Duration::from_millis(10)).unwrap();
        let mut t = array![0.75f32].into_dyn();
        reducers[0].all_reduce(&mut t, ReduceOp::Mean).unwrap();
        assert_eq!(t, array![0.75f32].into_dyn());
    }
}

//! # ddp-metrics - Metrics with Transparent Distributed Reduction
//!
//! Classification and regression metrics that compute on a rank's local batch
//! and, when a process group is attached, reduce their result across every
//! rank before handing it back. The same metric object works unchanged in a
//! single process and under data-parallel evaluation.
//!
//! ## Key Features
//!
//! - **Functional metrics**: accuracy, precision/recall/F-beta, confusion
//!   matrix, ROC and precision-recall curves, AUROC, average precision, dice,
//!   IoU and the usual regression errors as pure functions
//! - **Metric objects**: the same metrics with a pluggable reduction mode
//!   (`sum`, `mean`, `max`, `min`, `none`)
//! - **Wrappers**: turn any tensor or host-buffer function into a
//!   synchronised metric
//! - **In-process groups**: a thread-backed all-reduce for simulating
//!   several ranks, with timeouts and peer-departure detection
//!
//! ## Quick Start
//!
//! ```rust
//! use ddp_metrics::distributed::{run_workers, shard};
//! use ddp_metrics::metric::{Accuracy, Metric, Synchronized};
//! use ndarray::array;
//! use std::time::Duration;
//!
//! let pred = array![0.0, 1.0, 1.0, 0.0].into_dyn();
//! let target = array![0.0, 1.0, 0.0, 0.0].into_dyn();
//!
//! let per_rank = run_workers(2, Duration::from_secs(5), |rank, reducer| {
//!     let mut accuracy = Accuracy::new();
//!     accuracy.attach(reducer);
//!     accuracy.forward(&shard(&pred, rank, 2)?, &shard(&target, rank, 2)?)
//! })
//! .unwrap();
//!
//! // rank 0 saw 2/2 correct, rank 1 saw 1/2: every rank gets the mean
//! assert_eq!(per_rank[0][[]], 0.75);
//! assert_eq!(per_rank[1][[]], 0.75);
//! ```
//!
//! ## Module Organization
//!
//! - [`functional`] - Stateless metric functions
//! - [`metric`] - Metric objects, the sync context and the host contract
//! - [`distributed`] - Reduce ops, the reducer contract and in-process groups
//! - [`builders`] - Build metrics from a shared configuration
//! - [`config`] - Serializable configuration
//! - [`history`] - Per-step record of reduced values
//! - [`types`] - The tensor type and boundary conversions
//! - [`error`] - Error types and result handling

#[macro_use]
pub mod macros;

pub mod builders;
pub mod config;
pub mod distributed;
pub mod error;
pub mod functional;
pub mod history;
pub mod metric;
pub mod types;

pub use error::{MetricError, Result};
pub use types::{IntoTensor, Tensor};

/// Implement [`Synchronized`](crate::metric::Synchronized) for a metric type
/// that keeps its [`SyncContext`](crate::metric::SyncContext) in a field named `sync`,
/// together with the `with_reduce_op` / `with_reducer` builder methods.
///
/// The name is either a literal or an expression over the metric.
///
/// # Examples
///
/// ```
/// use ddp_metrics::impl_synchronized;
/// use ddp_metrics::metric::{SyncContext, Synchronized};
///
/// struct Throughput {
///     sync: SyncContext,
/// }
///
/// impl_synchronized!(Throughput, "throughput");
///
/// let metric = Throughput { sync: SyncContext::default() };
/// assert_eq!(metric.name(), "throughput");
/// ```
#[macro_export]
macro_rules! impl_synchronized {
    ($metric:ty, |$this:ident| $name:expr) => {
        impl $crate::metric::Synchronized for $metric {
            fn name(&self) -> &str {
                let $this = self;
                $name
            }

            fn sync_context(&self) -> &$crate::metric::SyncContext {
                &self.sync
            }

            fn sync_context_mut(&mut self) -> &mut $crate::metric::SyncContext {
                &mut self.sync
            }
        }

        impl $metric {
            /// Set how results are combined across ranks
            pub fn with_reduce_op(mut self, op: $crate::distributed::ReduceOp) -> Self {
                self.sync.set_op(op);
                self
            }

            /// Attach the process group used for reduction
            pub fn with_reducer(
                mut self,
                reducer: ::std::sync::Arc<dyn $crate::distributed::Reducer>,
            ) -> Self {
                self.sync.set_reducer(reducer);
                self
            }
        }
    };
    ($metric:ty, $name:literal) => {
        $crate::impl_synchronized!($metric, |_metric| $name);
    };
}

pub mod metric;

pub use metric::MetricBuilder;

pub mod metrics;

pub use metrics::{MetricsRuntime, OtelMetricsSink};

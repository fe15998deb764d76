//! Observability: runtime counters and the metrics sink boundary.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventPerf, EventReport, EventState, TableCounters, TableSummary};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};

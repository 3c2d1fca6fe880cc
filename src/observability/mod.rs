//! Observability: structured logging and in-process metrics.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_verbosity, LogFormat};
pub use metrics::{metrics, MetricsCollector, MetricsSnapshot};

//! # Observability
//!
//! Structured logging, span helpers and metric recording for gantry.
//! The library never installs a metrics exporter; embedding services decide
//! where counters go.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::MetricsRecorder;

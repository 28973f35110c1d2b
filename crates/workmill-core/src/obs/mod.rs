//! Observability: engine event instrumentation and sink abstractions.
//!
//! Engine logic does not touch counter state directly; all
//! instrumentation flows through [`EngineEvent`] and [`EventSink`].

pub(crate) mod metrics;
pub(crate) mod sink;

pub use metrics::MetricsReport;
pub use sink::{EngineEvent, EventSink};

/// Snapshot of the process-local engine counters.
#[must_use]
pub fn metrics_report() -> MetricsReport {
    metrics::report()
}

/// Reset the process-local engine counters.
pub fn metrics_reset() {
    metrics::reset();
}

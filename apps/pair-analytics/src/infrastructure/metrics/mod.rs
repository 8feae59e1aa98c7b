//! Prometheus Metrics Module
//!
//! # Metrics Categories
//!
//! - **Feed**: Ticks ingested, events dropped, reconnects
//! - **Storage**: Tick buffer depth, bars persisted and failed
//! - **Analytics**: Resample cycle latency, alerts fired
//!
//! Metrics are exposed at `/metrics` on the HTTP port. Recording before
//! [`init_metrics`] is a no-op.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::bars::Timeframe;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder, or return the existing handle.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Feed
    describe_counter!(
        "pair_analytics_ticks_ingested_total",
        "Total trade ticks appended to the tick store"
    );
    describe_counter!(
        "pair_analytics_feed_events_dropped_total",
        "Total feed events discarded as malformed"
    );
    describe_counter!(
        "pair_analytics_reconnects_total",
        "Total trade stream reconnection attempts"
    );

    // Storage
    describe_gauge!(
        "pair_analytics_tick_buffer_len",
        "Ticks currently held per symbol"
    );
    describe_counter!(
        "pair_analytics_bars_persisted_total",
        "Total bars upserted into durable storage"
    );
    describe_counter!(
        "pair_analytics_bar_persist_failures_total",
        "Total bar upserts that failed"
    );

    // Analytics
    describe_histogram!(
        "pair_analytics_resample_cycle_seconds",
        "Duration of one resample cycle"
    );
    describe_counter!(
        "pair_analytics_alerts_triggered_total",
        "Total alert notifications fired"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for why a feed event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Not valid JSON or missing fields.
    Malformed,
    /// Price or size not a finite number.
    InvalidNumber,
}

impl DropReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::InvalidNumber => "invalid_number",
        }
    }
}

/// Record a tick appended for `symbol`.
pub fn record_tick_ingested(symbol: &str) {
    counter!(
        "pair_analytics_ticks_ingested_total",
        "symbol" => symbol.to_string()
    )
    .increment(1);
}

/// Record a discarded feed event.
pub fn record_feed_event_dropped(symbol: &str, reason: DropReason) {
    counter!(
        "pair_analytics_feed_events_dropped_total",
        "symbol" => symbol.to_string(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record a trade stream reconnection attempt.
pub fn record_reconnect(symbol: &str) {
    counter!(
        "pair_analytics_reconnects_total",
        "symbol" => symbol.to_string()
    )
    .increment(1);
}

/// Update the tick buffer depth for `symbol`.
#[allow(clippy::cast_precision_loss)]
pub fn set_tick_buffer_len(symbol: &str, len: usize) {
    gauge!(
        "pair_analytics_tick_buffer_len",
        "symbol" => symbol.to_string()
    )
    .set(len as f64);
}

/// Record a bar upsert.
pub fn record_bar_persisted(timeframe: Timeframe) {
    counter!(
        "pair_analytics_bars_persisted_total",
        "timeframe" => timeframe.as_str()
    )
    .increment(1);
}

/// Record a failed bar upsert.
pub fn record_bar_persist_failure(timeframe: Timeframe) {
    counter!(
        "pair_analytics_bar_persist_failures_total",
        "timeframe" => timeframe.as_str()
    )
    .increment(1);
}

/// Record the duration of one resample cycle.
pub fn record_resample_cycle(duration: Duration) {
    histogram!("pair_analytics_resample_cycle_seconds").record(duration.as_secs_f64());
}

/// Record alerts fired by one evaluation.
pub fn record_alerts_triggered(count: usize) {
    if count > 0 {
        counter!("pair_analytics_alerts_triggered_total").increment(count as u64);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_reason_as_str() {
        assert_eq!(DropReason::Malformed.as_str(), "malformed");
        assert_eq!(DropReason::InvalidNumber.as_str(), "invalid_number");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_tick_ingested("btcusdt");
        record_bar_persisted(Timeframe::OneMinute);
        record_resample_cycle(Duration::from_millis(3));
        record_alerts_triggered(0);
    }
}

//! Resample Loop
//!
//! Every interval, snapshots each tracked symbol, resamples it into the
//! latest bar per timeframe and upserts those bars. A failed upsert is logged
//! and skipped; the next cycle rewrites the same bucket anyway.
//!
//! Only the newest bucket is written per cycle. If a cycle runs late, buckets
//! that closed in between are never persisted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::application::ports::BarRepository;
use crate::domain::bars::Resampler;
use crate::domain::tick::TickStore;
use crate::infrastructure::metrics;

/// Default resample period.
pub const DEFAULT_RESAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of one resample cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Symbols snapshotted.
    pub symbols: usize,
    /// Bars written.
    pub persisted: usize,
    /// Bars whose write failed.
    pub failed: usize,
}

/// Periodic resample-and-persist task.
pub struct ResampleLoop<R: BarRepository + ?Sized> {
    store: Arc<TickStore>,
    repository: Arc<R>,
    resampler: Resampler,
    interval: Duration,
    cancel: CancellationToken,
}

impl<R: BarRepository + ?Sized> ResampleLoop<R> {
    /// Create a loop over every symbol in `store`.
    #[must_use]
    pub const fn new(
        store: Arc<TickStore>,
        repository: Arc<R>,
        resampler: Resampler,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            repository,
            resampler,
            interval,
            cancel,
        }
    }

    /// Run until cancelled. The stop signal is checked before every cycle
    /// and while sleeping.
    pub async fn run(self) {
        tracing::info!(
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            timeframes = ?self.resampler.timeframes(),
            "Resample loop started"
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let report = self.run_cycle().await;
            if report.failed > 0 {
                tracing::warn!(
                    persisted = report.persisted,
                    failed = report.failed,
                    "Resample cycle completed with failures"
                );
            } else {
                tracing::trace!(persisted = report.persisted, "Resample cycle completed");
            }

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!("Resample loop stopped");
    }

    /// Resample and persist the latest bars for every tracked symbol once.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();

        for symbol in self.store.symbols() {
            let snapshot = self.store.snapshot(&symbol);
            report.symbols += 1;
            metrics::set_tick_buffer_len(&symbol, snapshot.len());

            for bar in self.resampler.latest_bars(&snapshot) {
                match self.repository.put(&bar).await {
                    Ok(()) => {
                        report.persisted += 1;
                        metrics::record_bar_persisted(bar.timeframe);
                    }
                    Err(e) => {
                        report.failed += 1;
                        metrics::record_bar_persist_failure(bar.timeframe);
                        tracing::error!(
                            error = %e,
                            symbol = %bar.symbol,
                            timeframe = %bar.timeframe,
                            bucket = %bar.bucket_start,
                            "Failed to persist bar"
                        );
                    }
                }
            }
        }

        metrics::record_resample_cycle(started.elapsed());
        report
    }
}

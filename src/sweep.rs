//! Background reclamation of expired share links and files.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::config::SweepConfig;
use crate::object_store::ObjectStore;
use crate::retry::{retry, RetryPolicy};
use crate::storage::Database;

/// Cumulative counters across all sweep iterations, shared with the
/// observability endpoint.
#[derive(Debug, Default)]
pub struct SweepMetrics {
    runs: AtomicU64,
    files_deleted: AtomicU64,
    links_deactivated: AtomicU64,
    failed_deletes: AtomicU64,
    last_duration_ms: AtomicU64,
}

impl SweepMetrics {
    fn record(&self, summary: &SweepSummary) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.files_deleted
            .fetch_add(summary.files_deleted, Ordering::Relaxed);
        self.links_deactivated
            .fetch_add(summary.links_deactivated, Ordering::Relaxed);
        self.failed_deletes
            .fetch_add(summary.failed_deletes, Ordering::Relaxed);
        self.last_duration_ms
            .store(summary.duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SweepMetricsSnapshot {
        SweepMetricsSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
            links_deactivated: self.links_deactivated.load(Ordering::Relaxed),
            failed_deletes: self.failed_deletes.load(Ordering::Relaxed),
            last_duration_ms: self.last_duration_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SweepMetricsSnapshot {
    pub runs: u64,
    pub files_deleted: u64,
    pub links_deactivated: u64,
    pub failed_deletes: u64,
    pub last_duration_ms: u64,
}

/// Counts from a single sweep iteration.
#[derive(Debug, Default)]
pub struct SweepSummary {
    pub files_deleted: u64,
    pub links_deactivated: u64,
    pub failed_deletes: u64,
    pub duration: Duration,
}

/// Periodically deactivates time-expired links and reaps expired files:
/// blob first, metadata second, so a failed blob delete leaves the record in
/// place for the next sweep rather than orphaning unlocatable storage.
pub struct ExpirySweeper {
    db: Database,
    store: Arc<dyn ObjectStore>,
    config: SweepConfig,
    metrics: Arc<SweepMetrics>,
}

impl ExpirySweeper {
    pub fn new(
        db: Database,
        store: Arc<dyn ObjectStore>,
        config: SweepConfig,
        metrics: Arc<SweepMetrics>,
    ) -> Self {
        Self {
            db,
            store,
            config,
            metrics,
        }
    }

    /// Perpetual loop. Errors are logged and shorten the next sleep; only
    /// task abort (process shutdown) stops it.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "Expiry sweeper started"
        );

        loop {
            match self.sweep_once().await {
                Ok(summary) => {
                    tracing::info!(
                        files_deleted = summary.files_deleted,
                        links_deactivated = summary.links_deactivated,
                        failed_deletes = summary.failed_deletes,
                        duration_ms = summary.duration.as_millis() as u64,
                        "Sweep complete"
                    );
                    tokio::time::sleep(self.config.interval).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Sweep iteration failed");
                    let backoff = self.config.interval.min(Duration::from_secs(60));
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// One bounded reconciliation pass. Batches cap how much of the store a
    /// single iteration can hold; the remainder is picked up next time.
    pub async fn sweep_once(&self) -> anyhow::Result<SweepSummary> {
        let started = Instant::now();
        let now = Utc::now();
        let batch = self.config.batch_size;

        let mut summary = SweepSummary::default();

        let db = self.db.clone();
        summary.links_deactivated =
            tokio::task::spawn_blocking(move || db.deactivate_expired_links(now, batch)).await??;

        // Files become eligible one interval after expiry, so a download
        // resolved just before expiry is not racing its own blob delete.
        let cutoff = now - chrono::Duration::from_std(self.config.interval)?;
        let db = self.db.clone();
        let expired = tokio::task::spawn_blocking(move || db.expired_files(cutoff, batch)).await??;

        let policy = RetryPolicy::new(self.config.retry_attempts, self.config.retry_backoff);
        for file in expired {
            let removed = retry(policy, || {
                self.store.remove(&file.bucket, &file.object_name)
            })
            .await;

            match removed {
                Ok(()) => {
                    let db = self.db.clone();
                    let id = file.id.clone();
                    tokio::task::spawn_blocking(move || db.delete_file(&id)).await??;
                    summary.files_deleted += 1;
                    tracing::debug!(file_id = %file.id, "Reaped expired file");
                }
                Err(e) => {
                    // Keep the record so the delete is retried next sweep
                    summary.failed_deletes += 1;
                    tracing::error!(
                        file_id = %file.id,
                        bucket = %file.bucket,
                        object_name = %file.object_name,
                        error = %e,
                        "Blob delete exhausted retries, keeping metadata"
                    );
                }
            }
        }

        summary.duration = started.elapsed();
        self.metrics.record(&summary);
        Ok(summary)
    }
}

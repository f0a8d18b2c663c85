//! Per-device pipeline counters.
//!
//! Counters are lock-free so the scheduler thread, the pipeline and the CLI
//! can all touch them without coordination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running counters for one device pipeline.
#[derive(Debug)]
pub struct PipelineStats {
    device: String,
    cycles: AtomicU64,
    samples_accepted: AtomicU64,
    malformed_records: AtomicU64,
    poll_failures: AtomicU64,
    peaks_detected: AtomicU64,
    strikes: AtomicU64,
    misses: AtomicU64,
    triggers_queued: AtomicU64,
    triggers_dropped: AtomicU64,
    missing_assets: AtomicU64,
    ticks_skipped: AtomicU64,
    started: DateTime<Utc>,
}

impl PipelineStats {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            cycles: AtomicU64::new(0),
            samples_accepted: AtomicU64::new(0),
            malformed_records: AtomicU64::new(0),
            poll_failures: AtomicU64::new(0),
            peaks_detected: AtomicU64::new(0),
            strikes: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            triggers_queued: AtomicU64::new(0),
            triggers_dropped: AtomicU64::new(0),
            missing_assets: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
            started: Utc::now(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_samples(&self, accepted: u64, malformed: u64) {
        self.samples_accepted.fetch_add(accepted, Ordering::Relaxed);
        self.malformed_records
            .fetch_add(malformed, Ordering::Relaxed);
    }

    pub fn record_poll_failure(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a newly detected peak and whether it resolved to a zone.
    pub fn record_peak(&self, is_strike: bool) {
        self.peaks_detected.fetch_add(1, Ordering::Relaxed);
        if is_strike {
            self.strikes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_trigger_queued(&self) {
        self.triggers_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trigger_dropped(&self) {
        self.triggers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missing_asset(&self) {
        self.missing_assets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ticks_skipped(&self, count: u64) {
        self.ticks_skipped.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            device: self.device.clone(),
            cycles: self.cycles.load(Ordering::Relaxed),
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            malformed_records: self.malformed_records.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            peaks_detected: self.peaks_detected.load(Ordering::Relaxed),
            strikes: self.strikes.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            triggers_queued: self.triggers_queued.load(Ordering::Relaxed),
            triggers_dropped: self.triggers_dropped.load(Ordering::Relaxed),
            missing_assets: self.missing_assets.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            started: self.started,
            running_secs: (Utc::now() - self.started).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Device {}:\n\
             - Cycles run: {} ({} ticks skipped)\n\
             - Samples accepted: {}\n\
             - Malformed records dropped: {}\n\
             - Poll failures: {}\n\
             - Peaks detected: {} ({} strikes, {} outside every zone)\n\
             - Triggers queued: {}\n\
             - Triggers dropped (queue full): {}\n\
             - Missing assets: {}\n\
             - Running for: {} seconds",
            stats.device,
            stats.cycles,
            stats.ticks_skipped,
            stats.samples_accepted,
            stats.malformed_records,
            stats.poll_failures,
            stats.peaks_detected,
            stats.strikes,
            stats.misses,
            stats.triggers_queued,
            stats.triggers_dropped,
            stats.missing_assets,
            stats.running_secs
        )
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub device: String,
    pub cycles: u64,
    pub samples_accepted: u64,
    pub malformed_records: u64,
    pub poll_failures: u64,
    pub peaks_detected: u64,
    pub strikes: u64,
    pub misses: u64,
    pub triggers_queued: u64,
    pub triggers_dropped: u64,
    pub missing_assets: u64,
    pub ticks_skipped: u64,
    pub started: DateTime<Utc>,
    pub running_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedStats = Arc<PipelineStats>;

/// Create new shared counters for a device.
pub fn create_shared_stats(device: impl Into<String>) -> SharedStats {
    Arc::new(PipelineStats::new(device))
}

//! Shared synchronization counters between the manager and its observers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Thread-safe manager counters.
///
/// Written only by the manager loop; read from any thread through
/// [`SharedSyncMetrics`].
#[derive(Debug, Default)]
pub struct SyncMetrics {
    /// Task requests answered
    requests_served: AtomicUsize,
    /// Task responses lost on a full or closed channel
    responses_dropped: AtomicUsize,
    /// Task requests refused during shutdown or after a sampling failure
    requests_refused: AtomicUsize,
    /// Step batches received
    step_batches_received: AtomicUsize,
    /// Step batches forwarded to the curriculum
    step_batches_applied: AtomicUsize,
    /// Step batches discarded because step updates are off
    step_batches_ignored: AtomicUsize,
    /// Step records forwarded to the curriculum
    step_records_applied: AtomicUsize,
    /// Episode summaries applied
    episodes_applied: AtomicUsize,
    /// Completion updates applied
    completions_applied: AtomicUsize,
    /// Learner on-demand updates applied
    on_demand_applied: AtomicUsize,
    /// Updates rejected by validation
    validation_errors: AtomicUsize,
    /// Messages skipped for a stale or duplicate sequence number
    stale_messages: AtomicUsize,
    /// Environments attached
    envs_attached: AtomicUsize,
    /// Environments that left with a Shutdown message or closed their channel
    envs_detached: AtomicUsize,
    /// Environments removed by the liveness timeout
    envs_reaped: AtomicUsize,
}

macro_rules! counter {
    ($inc:ident, $get:ident) => {
        #[inline]
        pub(crate) fn $inc(&self) {
            self.$get.fetch_add(1, Ordering::Relaxed);
        }

        #[doc = concat!("Get `", stringify!($get), "`.")]
        #[inline]
        pub fn $get(&self) -> usize {
            self.$get.load(Ordering::Relaxed)
        }
    };
}

impl SyncMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    counter!(inc_requests_served, requests_served);
    counter!(inc_responses_dropped, responses_dropped);
    counter!(inc_requests_refused, requests_refused);
    counter!(inc_step_batches_received, step_batches_received);
    counter!(inc_step_batches_applied, step_batches_applied);
    counter!(inc_step_batches_ignored, step_batches_ignored);
    counter!(inc_episodes_applied, episodes_applied);
    counter!(inc_completions_applied, completions_applied);
    counter!(inc_on_demand_applied, on_demand_applied);
    counter!(inc_validation_errors, validation_errors);
    counter!(inc_stale_messages, stale_messages);
    counter!(inc_envs_attached, envs_attached);
    counter!(inc_envs_detached, envs_detached);
    counter!(inc_envs_reaped, envs_reaped);

    /// Add forwarded step records.
    pub(crate) fn add_step_records(&self, n: usize) {
        self.step_records_applied.fetch_add(n, Ordering::Relaxed);
    }

    /// Get forwarded step records.
    pub fn step_records_applied(&self) -> usize {
        self.step_records_applied.load(Ordering::Relaxed)
    }

    /// Environments currently registered.
    pub fn active_envs(&self) -> usize {
        self.envs_attached()
            .saturating_sub(self.envs_detached() + self.envs_reaped())
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            requests_served: self.requests_served(),
            responses_dropped: self.responses_dropped(),
            requests_refused: self.requests_refused(),
            step_batches_received: self.step_batches_received(),
            step_batches_applied: self.step_batches_applied(),
            step_batches_ignored: self.step_batches_ignored(),
            step_records_applied: self.step_records_applied(),
            episodes_applied: self.episodes_applied(),
            completions_applied: self.completions_applied(),
            on_demand_applied: self.on_demand_applied(),
            validation_errors: self.validation_errors(),
            stale_messages: self.stale_messages(),
            envs_attached: self.envs_attached(),
            envs_detached: self.envs_detached(),
            envs_reaped: self.envs_reaped(),
        }
    }

    /// Emit a snapshot at info level.
    pub fn log(&self) {
        self.snapshot().log();
    }
}

/// Serializable copy of [`SyncMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub requests_served: usize,
    pub responses_dropped: usize,
    pub requests_refused: usize,
    pub step_batches_received: usize,
    pub step_batches_applied: usize,
    pub step_batches_ignored: usize,
    pub step_records_applied: usize,
    pub episodes_applied: usize,
    pub completions_applied: usize,
    pub on_demand_applied: usize,
    pub validation_errors: usize,
    pub stale_messages: usize,
    pub envs_attached: usize,
    pub envs_detached: usize,
    pub envs_reaped: usize,
}

impl SyncSnapshot {
    /// Total curriculum updates applied.
    pub fn updates_applied(&self) -> usize {
        self.step_batches_applied
            + self.episodes_applied
            + self.completions_applied
            + self.on_demand_applied
    }

    /// Emit at info level.
    pub fn log(&self) {
        log::info!(
            "sync: served={} dropped_replies={} refused={} | updates={} | \
             steps {}/{} batches ({} records) | episodes={} completions={} on_demand={} | \
             invalid={} stale={} | envs +{} -{} reaped={}",
            self.requests_served,
            self.responses_dropped,
            self.requests_refused,
            self.updates_applied(),
            self.step_batches_applied,
            self.step_batches_received,
            self.step_records_applied,
            self.episodes_applied,
            self.completions_applied,
            self.on_demand_applied,
            self.validation_errors,
            self.stale_messages,
            self.envs_attached,
            self.envs_detached,
            self.envs_reaped,
        );
    }
}

/// Shared sync metrics.
pub type SharedSyncMetrics = Arc<SyncMetrics>;

/// Create new shared sync metrics.
pub fn sync_metrics() -> SharedSyncMetrics {
    Arc::new(SyncMetrics::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_metrics_new() {
        let metrics = SyncMetrics::new();
        assert_eq!(metrics.snapshot(), SyncSnapshot::default());
        assert_eq!(metrics.active_envs(), 0);
    }

    #[test]
    fn test_sync_metrics_counters() {
        let metrics = SyncMetrics::new();
        metrics.inc_requests_served();
        metrics.inc_requests_served();
        metrics.inc_completions_applied();
        metrics.add_step_records(25);

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_served, 2);
        assert_eq!(snap.completions_applied, 1);
        assert_eq!(snap.step_records_applied, 25);
    }

    #[test]
    fn test_active_envs() {
        let metrics = SyncMetrics::new();
        for _ in 0..4 {
            metrics.inc_envs_attached();
        }
        metrics.inc_envs_detached();
        metrics.inc_envs_reaped();
        assert_eq!(metrics.active_envs(), 2);
    }

    #[test]
    fn test_updates_applied_sums_curriculum_calls() {
        let snap = SyncSnapshot {
            step_batches_applied: 3,
            episodes_applied: 1,
            completions_applied: 5,
            on_demand_applied: 2,
            requests_served: 100,
            ..SyncSnapshot::default()
        };
        assert_eq!(snap.updates_applied(), 11);
    }

    #[test]
    fn test_shared_sync_metrics() {
        let metrics = sync_metrics();
        let metrics2 = Arc::clone(&metrics);

        metrics.inc_stale_messages();
        metrics2.inc_validation_errors();

        assert_eq!(metrics.validation_errors(), 1);
        assert_eq!(metrics2.stale_messages(), 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = SyncMetrics::new();
        metrics.inc_envs_attached();
        let snap = metrics.snapshot();
        let bytes = rmp_serde::to_vec_named(&snap).unwrap();
        let back: SyncSnapshot = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back, snap);
    }
}

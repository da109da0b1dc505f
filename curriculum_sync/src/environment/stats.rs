//! Per-wrapper statistics.

use crate::messages::EnvId;
use serde::{Deserialize, Serialize};

/// Counters kept by one [`EnvSyncWrapper`](super::EnvSyncWrapper).
///
/// Uses numerically stable running means so averages stay accurate over
/// long runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvSyncStats {
    /// Environment identifier.
    pub env_id: EnvId,

    /// Resets performed.
    pub resets: u64,
    /// Steps taken.
    pub steps: u64,
    /// Episodes finished.
    pub episodes: u64,

    /// Tasks received from the manager.
    pub tasks_received: u64,
    /// Resets with a caller-supplied task.
    pub explicit_tasks: u64,
    /// Resets where no response arrived in time.
    pub request_timeouts: u64,
    /// Resets after the manager shut down or the channel closed.
    pub disconnected_resets: u64,
    /// Assignments rejected because the task was not in the space.
    pub invalid_assignments: u64,
    /// Late responses to earlier requests that were discarded.
    pub stale_responses: u64,
    /// Degraded resets that reused the previous task.
    pub reused_tasks: u64,
    /// Degraded resets that sampled locally.
    pub local_samples: u64,

    /// Completion updates enqueued.
    pub completions_sent: u64,
    /// Completion updates lost on a full channel.
    pub completions_dropped: u64,
    /// Episode summaries enqueued.
    pub episode_updates_sent: u64,
    /// Episode summaries lost on a full channel.
    pub episode_updates_dropped: u64,
    /// Heartbeats enqueued.
    pub heartbeats_sent: u64,
    /// Step batches enqueued.
    pub batches_flushed: u64,
    /// Step batches lost on a full channel.
    pub batches_dropped: u64,
    /// Step records lost with dropped batches.
    pub records_dropped: u64,

    /// Episodes with a finite return used in the average.
    pub valid_episodes: u64,
    /// Episodes with a non-finite return that were filtered.
    pub filtered_episodes: u64,
    /// Average episode return over valid episodes.
    pub avg_episode_return: f32,
    /// Average episode length over all episodes.
    pub avg_episode_length: f32,
    /// Most recent episode return (may be non-finite).
    pub recent_episode_return: f32,
}

impl EnvSyncStats {
    /// Create stats for one environment.
    pub fn new(env_id: EnvId) -> Self {
        Self {
            env_id,
            ..Default::default()
        }
    }

    /// Update after an episode ends.
    ///
    /// Non-finite returns are excluded from the average but counted in
    /// `filtered_episodes`.
    pub fn record_episode(&mut self, episode_return: f32, length: u64) {
        self.episodes += 1;
        self.recent_episode_return = episode_return;

        // avg_new = avg_old + (x - avg_old) / n
        let delta_len = length as f32 - self.avg_episode_length;
        self.avg_episode_length += delta_len / self.episodes as f32;

        if !episode_return.is_finite() {
            self.filtered_episodes += 1;
            return;
        }
        self.valid_episodes += 1;
        let delta = episode_return - self.avg_episode_return;
        self.avg_episode_return += delta / self.valid_episodes as f32;
    }

    /// Resets served without a manager-chosen task.
    pub fn degraded_resets(&self) -> u64 {
        self.request_timeouts + self.disconnected_resets + self.invalid_assignments
    }

    /// Fraction of non-explicit resets that fell back to local selection.
    pub fn degraded_fraction(&self) -> f32 {
        let requested = self.resets.saturating_sub(self.explicit_tasks);
        if requested == 0 {
            0.0
        } else {
            self.degraded_resets() as f32 / requested as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_episode_running_means() {
        let mut stats = EnvSyncStats::new(3);
        stats.record_episode(10.0, 4);
        stats.record_episode(20.0, 8);
        assert_eq!(stats.env_id, 3);
        assert_eq!(stats.episodes, 2);
        assert!((stats.avg_episode_return - 15.0).abs() < 1e-5);
        assert!((stats.avg_episode_length - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_non_finite_return_filtered() {
        let mut stats = EnvSyncStats::new(0);
        stats.record_episode(5.0, 1);
        stats.record_episode(f32::NAN, 1);
        stats.record_episode(f32::INFINITY, 1);
        assert_eq!(stats.episodes, 3);
        assert_eq!(stats.valid_episodes, 1);
        assert_eq!(stats.filtered_episodes, 2);
        assert!((stats.avg_episode_return - 5.0).abs() < 1e-6);
        assert!(stats.recent_episode_return.is_infinite());
    }

    #[test]
    fn test_degraded_fraction() {
        let mut stats = EnvSyncStats::new(0);
        assert_eq!(stats.degraded_fraction(), 0.0);
        stats.resets = 6;
        stats.explicit_tasks = 2;
        stats.request_timeouts = 1;
        stats.disconnected_resets = 1;
        assert_eq!(stats.degraded_resets(), 2);
        assert!((stats.degraded_fraction() - 0.5).abs() < 1e-6);
    }
}

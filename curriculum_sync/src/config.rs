//! Synchronization configuration.

use crate::channel::ChannelBackend;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What an environment does when no task response arrives in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FallbackPolicy {
    /// Reuse the last task; sample locally if there is none yet.
    #[default]
    ReuseLast,
    /// Always sample locally from the task space.
    SampleLocal,
}

/// Configuration shared by the manager and environment wrappers.
///
/// ```rust,ignore
/// let config = SyncConfig::new()
///     .with_batch_size(32)
///     .with_batch_interval(Duration::from_millis(200))
///     .with_update_on_step(false);
/// config.validate()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Send per-step records to the curriculum.
    pub update_on_step: bool,
    /// Fail instead of warn when `update_on_step` is set but the curriculum
    /// does not consume step updates.
    pub strict_step_updates: bool,
    /// Send an episode summary at the end of each episode.
    pub update_on_episode: bool,
    /// Records per step batch
    pub batch_size: usize,
    /// Maximum age of a non-empty batch before it is flushed
    pub batch_interval: Duration,
    /// Bound on waiting for a task response during reset
    pub task_request_timeout: Duration,
    /// Messages per direction per environment channel
    pub channel_capacity: usize,
    /// Channel implementation
    pub backend: ChannelBackend,
    /// Manager idle wait between polling passes
    pub poll_interval: Duration,
    /// Messages drained from one environment per pass
    pub max_messages_per_poll: usize,
    /// Silence after which an environment is reaped (None = only on close)
    pub liveness_timeout: Option<Duration>,
    /// Idle time after which a wrapper sends a heartbeat
    pub heartbeat_interval: Duration,
    /// Degraded-mode task selection
    pub fallback: FallbackPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            update_on_step: true,
            strict_step_updates: false,
            update_on_episode: false,
            batch_size: 100,
            batch_interval: Duration::from_millis(500),
            task_request_timeout: Duration::from_secs(5),
            channel_capacity: 256,
            backend: ChannelBackend::SharedQueue,
            poll_interval: Duration::from_millis(2),
            max_messages_per_poll: 64,
            liveness_timeout: Some(Duration::from_secs(60)),
            heartbeat_interval: Duration::from_secs(10),
            fallback: FallbackPolicy::ReuseLast,
        }
    }
}

impl SyncConfig {
    /// Create config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable per-step updates.
    pub fn with_update_on_step(mut self, enabled: bool) -> Self {
        self.update_on_step = enabled;
        self
    }

    /// Turn the step-update warning into an error.
    pub fn with_strict_step_updates(mut self, strict: bool) -> Self {
        self.strict_step_updates = strict;
        self
    }

    /// Enable or disable episode summaries.
    pub fn with_update_on_episode(mut self, enabled: bool) -> Self {
        self.update_on_episode = enabled;
        self
    }

    /// Set batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set batch interval.
    pub fn with_batch_interval(mut self, interval: Duration) -> Self {
        self.batch_interval = interval;
        self
    }

    /// Set task request timeout.
    pub fn with_task_request_timeout(mut self, timeout: Duration) -> Self {
        self.task_request_timeout = timeout;
        self
    }

    /// Set channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set channel backend.
    pub fn with_backend(mut self, backend: ChannelBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Set manager poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set per-environment drain limit.
    pub fn with_max_messages_per_poll(mut self, n: usize) -> Self {
        self.max_messages_per_poll = n;
        self
    }

    /// Set liveness timeout.
    pub fn with_liveness_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Set heartbeat interval.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set fallback policy.
    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SyncError::invalid_config("batch_size", "must be > 0"));
        }
        if self.batch_interval.is_zero() {
            return Err(SyncError::invalid_config("batch_interval", "must be > 0"));
        }
        if self.task_request_timeout.is_zero() {
            return Err(SyncError::invalid_config(
                "task_request_timeout",
                "must be > 0",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(SyncError::invalid_config("channel_capacity", "must be > 0"));
        }
        if self.max_messages_per_poll == 0 {
            return Err(SyncError::invalid_config(
                "max_messages_per_poll",
                "must be > 0",
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(SyncError::invalid_config("poll_interval", "must be > 0"));
        }
        if let Some(timeout) = self.liveness_timeout {
            if timeout <= self.heartbeat_interval {
                return Err(SyncError::invalid_config(
                    "liveness_timeout",
                    format!(
                        "{:?} must exceed heartbeat_interval {:?}",
                        timeout, self.heartbeat_interval
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.update_on_step);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.fallback, FallbackPolicy::ReuseLast);
    }

    #[test]
    fn test_builder_chain() {
        let config = SyncConfig::new()
            .with_batch_size(8)
            .with_update_on_step(false)
            .with_backend(ChannelBackend::Actor)
            .with_liveness_timeout(None)
            .with_fallback(FallbackPolicy::SampleLocal);

        assert_eq!(config.batch_size, 8);
        assert!(!config.update_on_step);
        assert_eq!(config.backend, ChannelBackend::Actor);
        assert_eq!(config.liveness_timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(SyncConfig::new().with_batch_size(0).validate().is_err());
        assert!(SyncConfig::new().with_channel_capacity(0).validate().is_err());
        assert!(SyncConfig::new()
            .with_task_request_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(SyncConfig::new()
            .with_max_messages_per_poll(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_liveness_must_exceed_heartbeat() {
        let config = SyncConfig::new()
            .with_heartbeat_interval(Duration::from_secs(5))
            .with_liveness_timeout(Some(Duration::from_secs(5)));
        match config.validate() {
            Err(SyncError::InvalidConfig { param, .. }) => assert_eq!(param, "liveness_timeout"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }
}

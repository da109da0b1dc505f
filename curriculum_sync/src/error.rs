//! Error types for curriculum synchronization.

use thiserror::Error;

/// Result type for curriculum synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while coordinating a curriculum with environments.
///
/// Channel and timeout errors are normally recovered where they happen
/// (deregister, degrade, continue). Only errors raised while building a
/// manager are fatal to the system as a whole.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Malformed task space bounds or cardinalities.
    #[error("invalid task space: {0}")]
    InvalidTaskSpace(String),

    /// A curriculum was asked to sample before a task space was bound.
    #[error("curriculum has no task space bound")]
    UninitializedCurriculum,

    /// A task is not a member of the space it is sent or applied in.
    #[error("task {task} is not a member of {space}")]
    TaskValidation { task: String, space: String },

    /// Send or receive on a torn-down channel.
    #[error("channel closed")]
    ChannelClosed,

    /// No task response arrived within the configured bound.
    #[error("no task response within {millis}ms")]
    TaskRequestTimeout { millis: u128 },

    /// The wrapped environment lacks a capability that was requested.
    #[error("environment does not implement `{0}`")]
    UnimplementedCapability(&'static str),

    /// Invalid configuration value.
    #[error("invalid configuration for '{param}': {message}")]
    InvalidConfig { param: &'static str, message: String },

    /// Encoding or decoding failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// The manager thread could not be started or panicked.
    #[error("sync manager failed: {0}")]
    ManagerPanicked(String),
}

impl SyncError {
    /// Shorthand for an [`SyncError::InvalidConfig`].
    pub fn invalid_config(param: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            param,
            message: message.into(),
        }
    }

    /// True for errors that callers are expected to recover from locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ChannelClosed | Self::TaskRequestTimeout { .. }
        )
    }
}

impl From<rmp_serde::encode::Error> for SyncError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for SyncError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

//! # Curriculum Sync: Curriculum–Environment Synchronization
//!
//! Keeps one curriculum (a task-selection policy) in sync with many
//! environment workers running on their own threads.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Curriculum Synchronization                     │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  Thread 1           Thread 2           Thread N                     │
//! │  ┌────────────┐     ┌────────────┐     ┌────────────┐               │
//! │  │EnvSync     │     │EnvSync     │     │EnvSync     │               │
//! │  │Wrapper 0   │     │Wrapper 1   │     │Wrapper N   │               │
//! │  │ TaskEnv    │     │ TaskEnv    │     │ TaskEnv    │               │
//! │  │ Batcher    │     │ Batcher    │     │ Batcher    │               │
//! │  └─────┬──────┘     └─────┬──────┘     └─────┬──────┘               │
//! │        │ Channel          │ Channel          │ Channel              │
//! │        └──────────────────┼──────────────────┘                      │
//! │                           ▼                                         │
//! │                 ┌───────────────────┐      OnDemandUpdate           │
//! │                 │ SyncManager       │◄──── (SyncManagerHandle)      │
//! │                 │ (single writer)   │                               │
//! │                 │  owns Curriculum  │                               │
//! │                 └───────────────────┘                               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! Only the manager thread touches the curriculum, so updates never race
//! with each other or with sampling. Updates from one environment apply in
//! the order it sent them; across environments there is no ordering.
//! Feedback is best effort: a full channel drops step batches rather than
//! stalling the environment.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use curriculum_sync::{
//!     EnvSyncWrapper, ResetRequest, SequentialCurriculum, SyncConfig, SyncManager, TaskSpace,
//! };
//!
//! let curriculum = SequentialCurriculum::new(TaskSpace::discrete(3)?)?;
//! let handle = SyncManager::new(curriculum, SyncConfig::new().with_batch_size(32))?.spawn()?;
//!
//! let mut env = EnvSyncWrapper::attach(MyEnv::new(), &handle)?;
//! let obs = env.reset(ResetRequest::new())?;
//! // ... step until done, reset again ...
//! env.close();
//!
//! let curriculum = handle.shutdown()?;
//! ```

pub mod batcher;
pub mod channel;
pub mod config;
pub mod core;
pub mod curriculum;
pub mod environment;
pub mod error;
pub mod manager;
pub mod messages;
pub mod metrics;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use crate::core::{BoxSpace, DiscreteSpace, MultiDiscreteSpace, Task, TaskSpace};

// Message protocol
pub use messages::{
    CompletionSignal, CompletionUpdate, EnvId, EpisodeUpdate, Message, MessageKind,
    OnDemandUpdate, Payload, StepBatch, StepRecord, TaskAssignment,
};

// Transport
pub use batcher::Batcher;
pub use channel::{
    Channel, ChannelBackend, EnvLink, MailboxEndpoint, SendOutcome, SharedQueueEndpoint,
};

// Curriculum side
pub use curriculum::{Curriculum, SequentialCurriculum, UniformCurriculum};
pub use manager::{SyncManager, SyncManagerHandle};

// Environment side
pub use environment::{EnvStep, EnvSyncStats, EnvSyncWrapper, ResetRequest, TaskEnv};

pub use config::{FallbackPolicy, SyncConfig};
pub use error::{Result, SyncError};
pub use metrics::{sync_metrics, SharedSyncMetrics, SyncMetrics, SyncSnapshot};

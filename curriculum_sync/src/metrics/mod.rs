//! Synchronization metrics.
//!
//! - [`SyncMetrics`]: thread-safe counters owned by the manager
//! - [`SharedSyncMetrics`]: Arc wrapper for multi-threaded access
//! - [`SyncSnapshot`]: serializable point-in-time copy
//!
//! Per-environment counters live with the wrapper, see
//! [`EnvSyncStats`](crate::EnvSyncStats).

pub mod sync_metrics;

pub use sync_metrics::{sync_metrics, SharedSyncMetrics, SyncMetrics, SyncSnapshot};

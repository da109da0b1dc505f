//! Message protocol between the curriculum and environment workers.
//!
//! Every message travels in a [`Message`] envelope carrying the sending
//! environment's id and a per-environment sequence number. Ordering is only
//! guaranteed within one environment's channel.
//!
//! # Architecture
//!
//! ```text
//!   +-----------+   TaskRequest / StepBatch /        +-------------+
//!   | EnvSync   |   EpisodeUpdate / Completion /     |             |
//!   | Wrapper 0 | ---------------------------------> |             |
//!   +-----------+   Heartbeat / Shutdown             |             |
//!         ^                                          | SyncManager |
//!         |          TaskResponse / Shutdown         |  (single    |
//!         +----------------------------------------- |   writer)   |
//!                                                    |             |
//!   +-----------+                                    |             |
//!   | Wrapper N | <--------------------------------> |             |
//!   +-----------+                                    +-------------+
//!                                                           ^
//!   Training process ---- OnDemandUpdate (handle) ----------+
//! ```

mod envelope;
mod updates;

#[cfg(test)]
mod tests;

pub use envelope::{EnvId, Message, MessageKind, Payload};
pub use updates::{
    CompletionSignal, CompletionUpdate, EpisodeUpdate, OnDemandUpdate, StepBatch, StepRecord,
    TaskAssignment,
};

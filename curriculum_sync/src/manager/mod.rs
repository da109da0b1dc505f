//! Curriculum synchronization manager.
//!
//! # Architecture
//!
//! ```text
//!   env thread 0 ──EnvLink──┐
//!   env thread 1 ──EnvLink──┤      ┌──────────────────────────────┐
//!        ...                ├────> │ SyncManager (one thread)     │
//!   env thread N ──EnvLink──┘      │  registry: env_id -> link    │
//!                                  │  curriculum: C (owned)       │
//!   SyncManagerHandle ──control──> │  poll(): round-robin drain   │
//!     attach / on_demand /         └──────────────────────────────┘
//!     shutdown
//! ```
//!
//! The manager is the only code that ever calls into the curriculum. Each
//! polling pass visits every environment once, reading a bounded number of
//! messages from each, so a chatty environment cannot starve the others.
//! Task requests are answered inside the pass that reads them.
//!
//! A task may be sampled for an environment before that environment's own
//! earlier updates are read; curricula see slightly stale feedback.

mod registry;
mod sync_manager;


pub use sync_manager::{SyncManager, SyncManagerHandle};

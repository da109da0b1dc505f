//! Crate-level tests driving a spawned manager with real environment threads.
//!
//! # Test Organization
//!
//! - `integration_tests`: end-to-end task flow, single-writer accounting,
//!   liveness and shutdown behavior over both channel backends

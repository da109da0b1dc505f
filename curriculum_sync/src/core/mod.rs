//! Core types for curriculum synchronization.

pub mod task_space;

#[cfg(test)]
mod tests;

pub use task_space::{BoxSpace, DiscreteSpace, MultiDiscreteSpace, Task, TaskSpace};

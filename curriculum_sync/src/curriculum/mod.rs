//! Curriculum trait and built-in sampling policies.
//!
//! A curriculum decides which task each environment plays next and learns
//! from the feedback environments send back. It is owned by exactly one
//! [`SyncManager`](crate::SyncManager), which serializes every call, so
//! implementations hold plain mutable state and no locks.
//!
//! Built-in policies:
//! - [`UniformCurriculum`]: uniform random over the bound space
//! - [`SequentialCurriculum`]: cycles through an enumerable space in order

mod sequential;
mod uniform;

#[cfg(test)]
mod tests;

pub use sequential::SequentialCurriculum;
pub use uniform::UniformCurriculum;

use crate::core::{Task, TaskSpace};
use crate::error::{Result, SyncError};
use crate::messages::{CompletionSignal, EnvId, EpisodeUpdate, OnDemandUpdate, StepBatch};

// ============================================================================
// Curriculum Trait
// ============================================================================

/// Task selection policy fed by environment feedback.
///
/// Only [`task_space`](Curriculum::task_space) and
/// [`sample`](Curriculum::sample) are required. Every update hook defaults to
/// a no-op so a policy only overrides the signals it learns from.
///
/// # Threading
///
/// `Send + 'static` so it can move onto the manager thread. Methods take
/// `&mut self`: the manager is the single writer.
pub trait Curriculum: Send + 'static {
    /// Policy name for logging.
    fn name(&self) -> &str {
        "curriculum"
    }

    /// Space this curriculum samples from, or `None` before one is bound.
    fn task_space(&self) -> Option<&TaskSpace>;

    /// Bound space, or [`SyncError::UninitializedCurriculum`].
    fn bound_space(&self) -> Result<&TaskSpace> {
        self.task_space().ok_or(SyncError::UninitializedCurriculum)
    }

    /// Choose the next task for `env_id`.
    fn sample(&mut self, env_id: EnvId) -> Result<Task>;

    /// Choose `k` tasks for `env_id`.
    fn sample_many(&mut self, env_id: EnvId, k: usize) -> Result<Vec<Task>> {
        (0..k).map(|_| self.sample(env_id)).collect()
    }

    /// Whether [`on_step`](Curriculum::on_step) does anything.
    ///
    /// The manager warns (or fails, in strict mode) when step updates are
    /// enabled for a curriculum that returns false here.
    fn wants_step_updates(&self) -> bool {
        false
    }

    /// Batched per-step feedback.
    fn on_step(&mut self, _env_id: EnvId, _batch: &StepBatch) {}

    /// Whole-episode summary.
    fn on_episode(&mut self, _env_id: EnvId, _update: &EpisodeUpdate) {}

    /// Episode outcome for `task`.
    fn complete_task(&mut self, _env_id: EnvId, _task: &Task, _signal: CompletionSignal) {}

    /// Learner-side statistics.
    fn on_demand(&mut self, _update: &OnDemandUpdate) {}
}

impl<C: Curriculum + ?Sized> Curriculum for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn task_space(&self) -> Option<&TaskSpace> {
        (**self).task_space()
    }

    fn sample(&mut self, env_id: EnvId) -> Result<Task> {
        (**self).sample(env_id)
    }

    fn sample_many(&mut self, env_id: EnvId, k: usize) -> Result<Vec<Task>> {
        (**self).sample_many(env_id, k)
    }

    fn wants_step_updates(&self) -> bool {
        (**self).wants_step_updates()
    }

    fn on_step(&mut self, env_id: EnvId, batch: &StepBatch) {
        (**self).on_step(env_id, batch)
    }

    fn on_episode(&mut self, env_id: EnvId, update: &EpisodeUpdate) {
        (**self).on_episode(env_id, update)
    }

    fn complete_task(&mut self, env_id: EnvId, task: &Task, signal: CompletionSignal) {
        (**self).complete_task(env_id, task, signal)
    }

    fn on_demand(&mut self, update: &OnDemandUpdate) {
        (**self).on_demand(update)
    }
}

//! Environment abstraction and the curriculum-syncing wrapper.
//!
//! [`TaskEnv`] is the minimal interface an environment needs to be driven by
//! a curriculum. [`EnvSyncWrapper`] sits around one `TaskEnv`, fetches a task
//! from the manager on every reset and reports steps and outcomes back.

mod stats;
mod sync_wrapper;


pub use stats::EnvSyncStats;
pub use sync_wrapper::EnvSyncWrapper;

use crate::core::Task;
use crate::error::{Result, SyncError};
use crate::messages::CompletionSignal;

/// Result of one environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvStep<O> {
    /// Observation after the step
    pub observation: O,
    /// Reward received
    pub reward: f32,
    /// Episode ended due to goal/failure
    pub terminated: bool,
    /// Episode ended due to time limit
    pub truncated: bool,
}

impl<O> EnvStep<O> {
    /// Create a new step result.
    pub fn new(observation: O, reward: f32, terminated: bool, truncated: bool) -> Self {
        Self {
            observation,
            reward,
            terminated,
            truncated,
        }
    }

    /// Terminal OR truncated.
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Arguments to [`EnvSyncWrapper::reset`].
///
/// Leave `task` empty to ask the curriculum; set it to bypass the manager for
/// this episode (the task is still validated against the space).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResetRequest {
    pub task: Option<Task>,
    pub seed: Option<u64>,
}

impl ResetRequest {
    /// Reset with a curriculum-chosen task and no seed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a specific task.
    pub fn with_task(mut self, task: Task) -> Self {
        self.task = Some(task);
        self
    }

    /// Seed the inner reset.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// An environment whose task can be switched between episodes.
pub trait TaskEnv: Send {
    /// Action accepted by [`step`](TaskEnv::step).
    type Action;
    /// Observation returned by reset and step.
    type Observation;

    /// Switch to `task` before the next reset.
    ///
    /// Environments that cannot switch tasks keep the default, which fails
    /// with [`SyncError::UnimplementedCapability`].
    fn change_task(&mut self, _task: &Task) -> Result<()> {
        Err(SyncError::UnimplementedCapability("change_task"))
    }

    /// Start a new episode.
    fn reset(&mut self, seed: Option<u64>) -> Self::Observation;

    /// Advance one step.
    fn step(&mut self, action: Self::Action) -> EnvStep<Self::Observation>;

    /// Outcome reported to the curriculum when an episode ends.
    ///
    /// Default: success when the episode terminated rather than timed out.
    fn task_completion(&self, step: &EnvStep<Self::Observation>) -> CompletionSignal {
        CompletionSignal::Success(step.terminated && !step.truncated)
    }
}

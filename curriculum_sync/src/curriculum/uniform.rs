//! Uniform random curriculum.

use super::Curriculum;
use crate::core::{Task, TaskSpace};
use crate::error::{Result, SyncError};
use crate::messages::{CompletionSignal, EnvId, OnDemandUpdate};
use std::collections::HashMap;

/// Samples uniformly from its task space.
///
/// May be created without a space and bound later, which mirrors how a
/// training script often learns the space from the environment only after
/// constructing the curriculum. Sampling before [`bind`](Self::bind) fails
/// with [`SyncError::UninitializedCurriculum`](crate::SyncError::UninitializedCurriculum).
#[derive(Debug)]
pub struct UniformCurriculum {
    space: Option<TaskSpace>,
    rng: fastrand::Rng,
    samples_served: u64,
    completions: u64,
    successes: f64,
    per_task: HashMap<u64, u64>,
    on_demand_updates: u64,
}

impl UniformCurriculum {
    /// Curriculum over `space`.
    pub fn new(space: TaskSpace) -> Self {
        let mut curriculum = Self::unbound();
        curriculum.space = Some(space);
        curriculum
    }

    /// Curriculum with no space yet.
    pub fn unbound() -> Self {
        Self {
            space: None,
            rng: fastrand::Rng::new(),
            samples_served: 0,
            completions: 0,
            successes: 0.0,
            per_task: HashMap::new(),
            on_demand_updates: 0,
        }
    }

    /// Reseed the internal RNG for reproducible sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Bind (or rebind) the task space. Per-task counters are reset.
    pub fn bind(&mut self, space: TaskSpace) {
        log::debug!("uniform curriculum bound to {}", space);
        self.space = Some(space);
        self.per_task.clear();
    }

    /// Tasks handed out so far.
    pub fn samples_served(&self) -> u64 {
        self.samples_served
    }

    /// Completion updates received.
    pub fn completions(&self) -> u64 {
        self.completions
    }

    /// Mean completion signal over all received completions.
    pub fn mean_completion(&self) -> f64 {
        if self.completions == 0 {
            0.0
        } else {
            self.successes / self.completions as f64
        }
    }

    /// Completions received for the task at `index`.
    pub fn completions_for(&self, index: u64) -> u64 {
        self.per_task.get(&index).copied().unwrap_or(0)
    }

    /// On-demand updates received.
    pub fn on_demand_updates(&self) -> u64 {
        self.on_demand_updates
    }
}

impl Curriculum for UniformCurriculum {
    fn name(&self) -> &str {
        "uniform"
    }

    fn task_space(&self) -> Option<&TaskSpace> {
        self.space.as_ref()
    }

    fn sample(&mut self, _env_id: EnvId) -> Result<Task> {
        let space = self.space.as_ref().ok_or(SyncError::UninitializedCurriculum)?;
        let task = space.sample_with(&mut self.rng);
        self.samples_served += 1;
        Ok(task)
    }

    fn complete_task(&mut self, _env_id: EnvId, task: &Task, signal: CompletionSignal) {
        self.completions += 1;
        self.successes += f64::from(signal.value());
        if let Some(index) = self.space.as_ref().and_then(|s| s.task_index(task)) {
            *self.per_task.entry(index).or_insert(0) += 1;
        }
    }

    fn on_demand(&mut self, _update: &OnDemandUpdate) {
        self.on_demand_updates += 1;
    }
}

//! Round-robin curriculum over an enumerable space.

use super::Curriculum;
use crate::core::{Task, TaskSpace};
use crate::error::{Result, SyncError};
use crate::messages::{CompletionSignal, EnvId, EpisodeUpdate, OnDemandUpdate, StepBatch};
use std::collections::HashMap;

/// Hands out tasks in index order `0, 1, ..., n-1, 0, ...`.
///
/// The cursor is global, not per environment: with several environments
/// each one sees a subsequence of the cycle. Listens to every update hook so
/// it doubles as a recording curriculum.
#[derive(Debug)]
pub struct SequentialCurriculum {
    space: TaskSpace,
    num_tasks: u64,
    cursor: u64,
    samples_served: u64,
    completions: u64,
    per_task: HashMap<u64, u64>,
    step_records: u64,
    episodes: u64,
    on_demand_updates: u64,
}

impl SequentialCurriculum {
    /// Curriculum over `space`.
    ///
    /// Fails with [`SyncError::InvalidTaskSpace`] for continuous spaces or
    /// multi-discrete spaces whose task count overflows `u64`. Per-task
    /// counters are kept sparsely, so huge discrete spaces are fine.
    pub fn new(space: TaskSpace) -> Result<Self> {
        let num_tasks = space.num_tasks().ok_or_else(|| {
            SyncError::InvalidTaskSpace(format!("{} cannot be enumerated", space))
        })?;
        Ok(Self {
            space,
            num_tasks,
            cursor: 0,
            samples_served: 0,
            completions: 0,
            per_task: HashMap::new(),
            step_records: 0,
            episodes: 0,
            on_demand_updates: 0,
        })
    }

    /// Number of tasks in the cycle.
    pub fn num_tasks(&self) -> u64 {
        self.num_tasks
    }

    /// Tasks handed out so far.
    pub fn samples_served(&self) -> u64 {
        self.samples_served
    }

    /// Completion updates received.
    pub fn completions(&self) -> u64 {
        self.completions
    }

    /// Completions received for the task at `index`.
    pub fn completions_for(&self, index: u64) -> u64 {
        self.per_task.get(&index).copied().unwrap_or(0)
    }

    /// Step records received across all batches.
    pub fn step_records(&self) -> u64 {
        self.step_records
    }

    /// Episode summaries received.
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    /// On-demand updates received.
    pub fn on_demand_updates(&self) -> u64 {
        self.on_demand_updates
    }
}

impl Curriculum for SequentialCurriculum {
    fn name(&self) -> &str {
        "sequential"
    }

    fn task_space(&self) -> Option<&TaskSpace> {
        Some(&self.space)
    }

    fn sample(&mut self, _env_id: EnvId) -> Result<Task> {
        let task = self.space.task_at(self.cursor).ok_or_else(|| {
            SyncError::InvalidTaskSpace(format!("index {} out of range", self.cursor))
        })?;
        self.cursor = (self.cursor + 1) % self.num_tasks;
        self.samples_served += 1;
        Ok(task)
    }

    fn wants_step_updates(&self) -> bool {
        true
    }

    fn on_step(&mut self, _env_id: EnvId, batch: &StepBatch) {
        self.step_records += batch.len() as u64;
    }

    fn on_episode(&mut self, _env_id: EnvId, _update: &EpisodeUpdate) {
        self.episodes += 1;
    }

    fn complete_task(&mut self, _env_id: EnvId, task: &Task, _signal: CompletionSignal) {
        self.completions += 1;
        if let Some(index) = self.space.task_index(task) {
            *self.per_task.entry(index).or_insert(0) += 1;
        }
    }

    fn on_demand(&mut self, _update: &OnDemandUpdate) {
        self.on_demand_updates += 1;
    }
}

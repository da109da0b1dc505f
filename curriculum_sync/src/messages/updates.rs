//! Payloads carried by protocol messages.
//!
//! # Data Integrity
//!
//! Aggregates over rewards skip non-finite values so a single corrupted
//! step cannot poison what a curriculum sees.

use crate::core::Task;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Task handed out by the manager in reply to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    /// The sampled task.
    pub task: Task,
    /// Manager-wide count of tasks assigned before this one.
    pub sample_id: u64,
    /// Sequence number of the request this answers.
    pub request_seq: u64,
}

/// One environment step as seen by the curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Task active during the step.
    pub task: Task,
    /// Step index within the episode (0-based).
    pub step: u64,
    /// Reward received.
    pub reward: f32,
    /// Episode ended due to goal or failure.
    pub terminated: bool,
    /// Episode ended due to a time limit.
    pub truncated: bool,
}

impl StepRecord {
    /// Whether this step ended the episode.
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Ordered group of step records flushed together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepBatch {
    /// Records in step order.
    pub records: Vec<StepRecord>,
}

impl StepBatch {
    /// Wrap records into a batch.
    pub fn new(records: Vec<StepRecord>) -> Self {
        Self { records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of finite rewards in the batch.
    pub fn total_reward(&self) -> f32 {
        self.records
            .iter()
            .map(|r| r.reward)
            .filter(|r| r.is_finite())
            .sum()
    }

    /// Number of records that ended an episode.
    pub fn episodes_ended(&self) -> usize {
        self.records.iter().filter(|r| r.is_done()).count()
    }
}

/// How well an environment did on its task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CompletionSignal {
    /// Binary outcome.
    Success(bool),
    /// Fractional progress in `[0, 1]`.
    Progress(f32),
}

impl CompletionSignal {
    /// Signal as a number in `[0, 1]`.
    pub fn value(&self) -> f32 {
        match *self {
            CompletionSignal::Success(true) => 1.0,
            CompletionSignal::Success(false) => 0.0,
            CompletionSignal::Progress(p) => p,
        }
    }

    /// False for progress values outside `[0, 1]` or non-finite.
    pub fn is_valid(&self) -> bool {
        match *self {
            CompletionSignal::Success(_) => true,
            CompletionSignal::Progress(p) => p.is_finite() && (0.0..=1.0).contains(&p),
        }
    }
}

/// Sent once per finished episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionUpdate {
    pub task: Task,
    pub signal: CompletionSignal,
}

/// Full-episode statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeUpdate {
    pub task: Task,
    pub episode_return: f32,
    pub episode_length: u64,
}

/// Named scalar statistics pushed by the training process.
///
/// ```rust,ignore
/// let update = OnDemandUpdate::new()
///     .with_metric("grad_norm", 0.42)
///     .with_metric("value_loss", 1.3);
/// handle.on_demand(update)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnDemandUpdate {
    pub metrics: BTreeMap<String, f64>,
}

impl OnDemandUpdate {
    /// Empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a metric.
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    /// Look up a metric.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

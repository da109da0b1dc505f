//! Environment-side half of curriculum synchronization.
//!
//! # Reset flow
//!
//! ```text
//!   reset(request)
//!     ├─ explicit task ──> validate ─────────────────────────┐
//!     └─ TaskRequest ──> await TaskResponse(request_seq)      │
//!          ├─ matching response ─────────────────────────────┤
//!          └─ timeout / Shutdown / closed ──> fallback policy ┤
//!                                                             ▼
//!                                          change_task ──> inner reset
//! ```
//!
//! Every wait is bounded by `task_request_timeout`. Once the manager is gone
//! the wrapper stops talking to it and keeps the environment running on
//! locally chosen tasks.

use super::{EnvStep, EnvSyncStats, ResetRequest, TaskEnv};
use crate::batcher::Batcher;
use crate::channel::{deadline_after, EnvLink, SendOutcome};
use crate::config::{FallbackPolicy, SyncConfig};
use crate::core::{Task, TaskSpace};
use crate::curriculum::Curriculum;
use crate::error::{Result, SyncError};
use crate::manager::SyncManagerHandle;
use crate::messages::{CompletionUpdate, EnvId, EpisodeUpdate, Payload, StepRecord, TaskAssignment};
use std::sync::Arc;
use std::time::Instant;

/// Wraps a [`TaskEnv`] and keeps it in sync with a curriculum manager.
///
/// ```rust,ignore
/// let handle = SyncManager::new(curriculum, config)?.spawn()?;
/// let mut env = EnvSyncWrapper::attach(MyEnv::new(), &handle)?;
/// let mut obs = env.reset(ResetRequest::new())?;
/// loop {
///     let out = env.step(policy(&obs));
///     obs = if out.is_done() { env.reset(ResetRequest::new())? } else { out.observation };
/// }
/// ```
pub struct EnvSyncWrapper<E: TaskEnv> {
    env: E,
    link: EnvLink,
    space: Arc<TaskSpace>,
    config: SyncConfig,
    /// Present only when step updates are enabled
    batcher: Option<Batcher>,
    rng: fastrand::Rng,
    current_task: Option<Task>,
    last_sample_id: Option<u64>,
    episode_step: u64,
    episode_return: f32,
    connected: bool,
    closed: bool,
    stats: EnvSyncStats,
}

impl<E: TaskEnv> EnvSyncWrapper<E> {
    /// Wrap `env` around an already attached link.
    ///
    /// `space` may be an owned [`TaskSpace`] or an `Arc` shared with the
    /// manager and other wrappers.
    pub fn new(
        env: E,
        link: EnvLink,
        space: impl Into<Arc<TaskSpace>>,
        config: SyncConfig,
    ) -> Result<Self> {
        config.validate()?;
        let batcher = config
            .update_on_step
            .then(|| Batcher::new(config.batch_size, config.batch_interval));
        let env_id = link.env_id();
        Ok(Self {
            env,
            link,
            space: space.into(),
            config,
            batcher,
            rng: fastrand::Rng::new(),
            current_task: None,
            last_sample_id: None,
            episode_step: 0,
            episode_return: 0.0,
            connected: true,
            closed: false,
            stats: EnvSyncStats::new(env_id),
        })
    }

    /// Attach to a running manager and wrap `env`.
    pub fn attach<C: Curriculum>(env: E, handle: &SyncManagerHandle<C>) -> Result<Self> {
        let link = handle.attach()?;
        Self::new(env, link, handle.shared_space(), handle.config().clone())
    }

    /// Seed the RNG used for locally sampled fallback tasks.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Environment id assigned by the manager.
    pub fn env_id(&self) -> EnvId {
        self.link.env_id()
    }

    /// Task of the current episode.
    pub fn current_task(&self) -> Option<&Task> {
        self.current_task.as_ref()
    }

    /// `sample_id` of the most recent manager assignment.
    pub fn last_sample_id(&self) -> Option<u64> {
        self.last_sample_id
    }

    /// Whether the manager is still reachable.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Wrapped environment.
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Mutable access to the wrapped environment.
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Snapshot of this wrapper's counters.
    pub fn stats(&self) -> EnvSyncStats {
        let mut stats = self.stats.clone();
        if let Some(batcher) = &self.batcher {
            stats.batches_flushed = batcher.flushed_batches();
            stats.batches_dropped = batcher.dropped_batches();
            stats.records_dropped = batcher.dropped_records();
        }
        stats
    }

    // ------------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------------

    /// Start a new episode.
    ///
    /// Without an explicit task the curriculum is asked for one. If it does
    /// not answer within `task_request_timeout`, or has shut down, the task
    /// comes from the fallback policy instead; that path never fails. Errors
    /// come only from an invalid explicit task or from `change_task`.
    pub fn reset(&mut self, request: ResetRequest) -> Result<E::Observation> {
        self.flush_steps();

        let task = match request.task {
            Some(task) => {
                self.space.validate(&task)?;
                self.stats.explicit_tasks += 1;
                task
            }
            None => match self.fetch_task() {
                Ok(assignment) => {
                    self.stats.tasks_received += 1;
                    self.last_sample_id = Some(assignment.sample_id);
                    assignment.task
                }
                Err(e) => {
                    self.note_degraded(&e);
                    self.fallback_task()
                }
            },
        };

        self.env.change_task(&task)?;
        self.current_task = Some(task);
        self.episode_step = 0;
        self.episode_return = 0.0;
        self.stats.resets += 1;
        self.maybe_heartbeat();
        Ok(self.env.reset(request.seed))
    }

    /// Ask the manager for a task and wait for the matching response.
    ///
    /// Responses to earlier, abandoned requests are discarded. Fails with
    /// [`SyncError::TaskRequestTimeout`] when nothing matching arrives in
    /// time, [`SyncError::ChannelClosed`] once the manager is gone and
    /// [`SyncError::TaskValidation`] for a task outside the space.
    pub fn fetch_task(&mut self) -> Result<TaskAssignment> {
        if !self.connected {
            return Err(SyncError::ChannelClosed);
        }
        let timeout = self.config.task_request_timeout;
        let deadline = deadline_after(timeout);
        let timed_out = SyncError::TaskRequestTimeout {
            millis: timeout.as_millis(),
        };

        let request_seq = match self.link.post_timeout(Payload::TaskRequest, timeout) {
            Ok((seq, SendOutcome::Sent)) => seq,
            Ok((_, SendOutcome::Dropped)) => return Err(timed_out),
            Err(e) => {
                self.disconnect("channel closed while requesting a task");
                return Err(e);
            }
        };

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(timed_out);
            }
            let msg = match self.link.receive(remaining) {
                Ok(Some(msg)) => msg,
                Ok(None) => return Err(timed_out),
                Err(e) => {
                    self.disconnect("channel closed while awaiting a task");
                    return Err(e);
                }
            };
            match msg.payload {
                Payload::TaskResponse(assignment) if assignment.request_seq == request_seq => {
                    self.space.validate(&assignment.task)?;
                    return Ok(assignment);
                }
                Payload::TaskResponse(assignment) => {
                    log::debug!(
                        "env {}: discarding response to request seq={} (waiting for {})",
                        self.env_id(),
                        assignment.request_seq,
                        request_seq
                    );
                    self.stats.stale_responses += 1;
                }
                Payload::Shutdown => {
                    self.disconnect("manager shut down");
                    return Err(SyncError::ChannelClosed);
                }
                other => {
                    log::debug!(
                        "env {}: ignoring unexpected {} from manager",
                        self.env_id(),
                        other.kind()
                    );
                }
            }
        }
    }

    fn note_degraded(&mut self, error: &SyncError) {
        match error {
            SyncError::TaskRequestTimeout { .. } => {
                self.stats.request_timeouts += 1;
                log::warn!(
                    "env {}: {}, using fallback {:?}",
                    self.env_id(),
                    error,
                    self.config.fallback
                );
            }
            SyncError::TaskValidation { .. } => {
                self.stats.invalid_assignments += 1;
                log::warn!("env {}: rejected assignment: {}", self.env_id(), error);
            }
            _ if error.is_recoverable() => {
                self.stats.disconnected_resets += 1;
                log::debug!(
                    "env {}: manager unavailable, using fallback {:?}",
                    self.env_id(),
                    self.config.fallback
                );
            }
            _ => {
                self.stats.disconnected_resets += 1;
                log::warn!(
                    "env {}: task request failed: {}, using fallback {:?}",
                    self.env_id(),
                    error,
                    self.config.fallback
                );
            }
        }
    }

    fn fallback_task(&mut self) -> Task {
        match (self.config.fallback, &self.current_task) {
            (FallbackPolicy::ReuseLast, Some(task)) => {
                self.stats.reused_tasks += 1;
                task.clone()
            }
            _ => {
                self.stats.local_samples += 1;
                self.space.sample_with(&mut self.rng)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Step
    // ------------------------------------------------------------------------

    /// Advance the wrapped environment one step.
    ///
    /// The result is passed through untouched. Feedback to the manager is
    /// best effort and never blocks beyond the configured bounds.
    pub fn step(&mut self, action: E::Action) -> EnvStep<E::Observation> {
        let out = self.env.step(action);
        let step_index = self.episode_step;
        self.episode_step += 1;
        self.episode_return += out.reward;
        self.stats.steps += 1;

        let mut send_failed = false;
        if self.connected {
            if let (Some(batcher), Some(task)) = (self.batcher.as_mut(), &self.current_task) {
                let record = StepRecord {
                    task: task.clone(),
                    step: step_index,
                    reward: out.reward,
                    terminated: out.terminated,
                    truncated: out.truncated,
                };
                send_failed = batcher.push(record, &mut self.link).is_err();
            }
        }
        if send_failed {
            self.disconnect("channel closed while sending steps");
        }

        if out.is_done() {
            self.end_episode(&out);
        }
        self.maybe_heartbeat();
        out
    }

    fn end_episode(&mut self, out: &EnvStep<E::Observation>) {
        let length = self.episode_step;
        let episode_return = self.episode_return;
        self.stats.record_episode(episode_return, length);
        self.episode_step = 0;
        self.episode_return = 0.0;

        let Some(task) = self.current_task.clone() else {
            return;
        };
        self.flush_steps();
        if !self.connected {
            return;
        }

        let timeout = self.config.task_request_timeout;
        if self.config.update_on_episode {
            let update = Payload::EpisodeUpdate(EpisodeUpdate {
                task: task.clone(),
                episode_return,
                episode_length: length,
            });
            match self.link.post_timeout(update, timeout) {
                Ok((_, SendOutcome::Sent)) => self.stats.episode_updates_sent += 1,
                Ok((_, SendOutcome::Dropped)) => self.stats.episode_updates_dropped += 1,
                Err(_) => {
                    self.disconnect("channel closed while sending episode update");
                    return;
                }
            }
        }

        let signal = self.env.task_completion(out);
        let update = Payload::CompletionUpdate(CompletionUpdate { task, signal });
        match self.link.post_timeout(update, timeout) {
            Ok((_, SendOutcome::Sent)) => self.stats.completions_sent += 1,
            Ok((seq, SendOutcome::Dropped)) => {
                log::warn!(
                    "env {}: completion seq={} dropped after {:?}",
                    self.env_id(),
                    seq,
                    timeout
                );
                self.stats.completions_dropped += 1;
            }
            Err(_) => self.disconnect("channel closed while sending completion"),
        }
    }

    // ------------------------------------------------------------------------
    // Link housekeeping
    // ------------------------------------------------------------------------

    fn flush_steps(&mut self) {
        if !self.connected {
            if let Some(batcher) = self.batcher.as_mut() {
                batcher.clear();
            }
            return;
        }
        if let Some(batcher) = self.batcher.as_mut() {
            if batcher.flush(&mut self.link).is_err() {
                self.disconnect("channel closed while flushing steps");
            }
        }
    }

    fn maybe_heartbeat(&mut self) {
        if !self.connected || self.link.idle_for() < self.config.heartbeat_interval {
            return;
        }
        match self.link.post(Payload::Heartbeat) {
            Ok((_, SendOutcome::Sent)) => self.stats.heartbeats_sent += 1,
            Ok((_, SendOutcome::Dropped)) => {}
            Err(_) => self.disconnect("channel closed while sending heartbeat"),
        }
    }

    fn disconnect(&mut self, reason: &str) {
        if self.connected {
            log::info!(
                "env {}: {}; continuing with fallback {:?}",
                self.env_id(),
                reason,
                self.config.fallback
            );
            self.connected = false;
        }
    }

    /// Flush pending steps, tell the manager this environment is leaving and
    /// close the channel. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.flush_steps();
        if self.connected {
            let timeout = self.config.task_request_timeout;
            if let Err(e) = self.link.post_timeout(Payload::Shutdown, timeout) {
                log::debug!("env {}: shutdown notice not sent: {}", self.env_id(), e);
            }
        }
        self.connected = false;
        self.link.close();
        log::debug!(
            "env {}: closed after {} resets ({:.1}% degraded)",
            self.env_id(),
            self.stats.resets,
            self.stats.degraded_fraction() * 100.0
        );
    }
}

impl<E: TaskEnv> Drop for EnvSyncWrapper<E> {
    fn drop(&mut self) {
        self.close();
    }
}

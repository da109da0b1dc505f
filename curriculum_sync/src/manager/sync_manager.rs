//! The single writer: owns the curriculum and serves every environment.

use super::registry::{Departure, Registry};
use crate::channel::{Channel, EnvLink, SendOutcome};
use crate::config::SyncConfig;
use crate::core::{Task, TaskSpace};
use crate::curriculum::Curriculum;
use crate::error::{Result, SyncError};
use crate::messages::{EnvId, Message, OnDemandUpdate, Payload, TaskAssignment};
use crate::metrics::{sync_metrics, SharedSyncMetrics};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Upper bound on drain passes during shutdown.
const MAX_DRAIN_PASSES: usize = 1024;

/// Whether to keep reading from an environment after a message.
enum Flow {
    Continue,
    Leave(Departure),
}

// ============================================================================
// SyncManager
// ============================================================================

/// Owns a curriculum and applies all updates to it serially.
///
/// Environments never touch the curriculum. They talk to the manager over
/// their own [`EnvLink`], and the manager drains every link in a fair
/// round-robin pass, answering task requests immediately and forwarding
/// updates to the curriculum in arrival order per environment.
///
/// Drive it by calling [`poll`](Self::poll) from your own loop, or move it
/// onto a dedicated thread with [`spawn`](Self::spawn).
pub struct SyncManager<C: Curriculum> {
    curriculum: C,
    config: SyncConfig,
    space: Arc<TaskSpace>,
    registry: Registry,
    next_env_id: Arc<AtomicU64>,
    num_assigned: u64,
    accepting_requests: bool,
    metrics: SharedSyncMetrics,
}

impl<C: Curriculum> SyncManager<C> {
    /// Create a manager for `curriculum`.
    ///
    /// Fails with [`SyncError::InvalidConfig`] for an invalid config and with
    /// [`SyncError::UninitializedCurriculum`] when the curriculum has no task
    /// space. With `update_on_step` set and a curriculum that ignores step
    /// updates this logs a warning, or fails when `strict_step_updates` is set.
    pub fn new(curriculum: C, config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let space = Arc::new(curriculum.bound_space()?.clone());

        if config.update_on_step && !curriculum.wants_step_updates() {
            if config.strict_step_updates {
                return Err(SyncError::invalid_config(
                    "update_on_step",
                    format!(
                        "curriculum '{}' does not consume step updates",
                        curriculum.name()
                    ),
                ));
            }
            log::warn!(
                "update_on_step is enabled but curriculum '{}' ignores step updates; \
                 disable it to save bandwidth",
                curriculum.name()
            );
        }

        log::info!(
            "sync manager ready: curriculum='{}' space={} backend={:?}",
            curriculum.name(),
            space,
            config.backend
        );

        Ok(Self {
            curriculum,
            config,
            space,
            registry: Registry::default(),
            next_env_id: Arc::new(AtomicU64::new(0)),
            num_assigned: 0,
            accepting_requests: true,
            metrics: sync_metrics(),
        })
    }

    /// Open a channel for a new environment and return its side.
    pub fn attach(&mut self) -> EnvLink {
        let env_id = self.next_env_id.fetch_add(1, Ordering::Relaxed);
        let (env_side, manager_side) = self.config.backend.pair(self.config.channel_capacity);
        self.register(env_id, manager_side);
        EnvLink::new(env_id, env_side)
    }

    pub(crate) fn register(&mut self, env_id: EnvId, channel: Box<dyn Channel>) {
        self.registry.insert(EnvLink::new(env_id, channel));
        self.metrics.inc_envs_attached();
        log::debug!("env {} attached", env_id);
    }

    /// Task space served to environments.
    pub fn space(&self) -> &TaskSpace {
        &self.space
    }

    /// Configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Read access to the curriculum.
    pub fn curriculum(&self) -> &C {
        &self.curriculum
    }

    /// Ids of registered environments in attach order.
    pub fn registered(&self) -> Vec<EnvId> {
        self.registry.ids()
    }

    /// Number of registered environments.
    pub fn num_registered(&self) -> usize {
        self.registry.len()
    }

    /// Tasks sampled so far. Also the `sample_id` of the next assignment.
    pub fn num_assigned(&self) -> u64 {
        self.num_assigned
    }

    /// Shared counters.
    pub fn metrics(&self) -> SharedSyncMetrics {
        Arc::clone(&self.metrics)
    }

    /// Apply a learner-side update.
    pub fn apply_on_demand(&mut self, update: &OnDemandUpdate) {
        self.curriculum.on_demand(update);
        self.metrics.inc_on_demand_applied();
    }

    // ------------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------------

    /// One polling pass over every registered environment.
    ///
    /// Reads at most `max_messages_per_poll` messages from each, then removes
    /// environments that left or went silent. Never blocks. Returns the number
    /// of messages handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        let mut departed = Vec::new();

        for env_id in self.registry.rotation() {
            for _ in 0..self.config.max_messages_per_poll {
                let received = match self.registry.get_mut(env_id) {
                    Some(entry) => entry.link.try_receive(),
                    None => break,
                };
                let msg = match received {
                    Ok(Some(msg)) => msg,
                    Ok(None) => break,
                    Err(_) => {
                        departed.push((env_id, Departure::Closed));
                        break;
                    }
                };
                handled += 1;
                if let Flow::Leave(reason) = self.dispatch(env_id, msg) {
                    departed.push((env_id, reason));
                    break;
                }
            }
        }

        for (env_id, reason) in departed {
            self.deregister(env_id, reason);
        }
        self.reap_silent();
        handled
    }

    fn dispatch(&mut self, env_id: EnvId, msg: Message) -> Flow {
        let Some(entry) = self.registry.get_mut(env_id) else {
            return Flow::Continue;
        };
        if msg.env_id != env_id {
            log::warn!(
                "env {}: message {} carries foreign env id {}",
                env_id,
                msg.kind(),
                msg.env_id
            );
            self.metrics.inc_validation_errors();
            return Flow::Continue;
        }
        if !entry.accept(msg.seq) {
            log::debug!(
                "env {}: skipping stale {} seq={} (last={:?})",
                env_id,
                msg.kind(),
                msg.seq,
                entry.last_seq
            );
            self.metrics.inc_stale_messages();
            return Flow::Continue;
        }

        match msg.payload {
            Payload::TaskRequest => self.serve_task(env_id, msg.seq),
            Payload::StepBatch(batch) => {
                self.metrics.inc_step_batches_received();
                if !self.config.update_on_step {
                    self.metrics.inc_step_batches_ignored();
                    return Flow::Continue;
                }
                if let Some(bad) = batch.records.iter().find(|r| !self.space.contains(&r.task)) {
                    self.reject(env_id, msg.seq, &bad.task);
                    return Flow::Continue;
                }
                log::trace!(
                    "env {}: {} step records, reward {:.3}, {} episodes ended",
                    env_id,
                    batch.len(),
                    batch.total_reward(),
                    batch.episodes_ended()
                );
                self.curriculum.on_step(env_id, &batch);
                self.metrics.inc_step_batches_applied();
                self.metrics.add_step_records(batch.len());
                Flow::Continue
            }
            Payload::EpisodeUpdate(update) => {
                if !self.space.contains(&update.task) {
                    self.reject(env_id, msg.seq, &update.task);
                    return Flow::Continue;
                }
                self.curriculum.on_episode(env_id, &update);
                self.metrics.inc_episodes_applied();
                Flow::Continue
            }
            Payload::CompletionUpdate(update) => {
                if !self.space.contains(&update.task) {
                    self.reject(env_id, msg.seq, &update.task);
                    return Flow::Continue;
                }
                if !update.signal.is_valid() {
                    log::warn!(
                        "env {}: completion seq={} has invalid signal {:?}",
                        env_id,
                        msg.seq,
                        update.signal
                    );
                    self.metrics.inc_validation_errors();
                    return Flow::Continue;
                }
                self.curriculum
                    .complete_task(env_id, &update.task, update.signal);
                self.metrics.inc_completions_applied();
                Flow::Continue
            }
            Payload::OnDemandUpdate(_) => {
                log::warn!(
                    "env {}: on-demand update seq={} rejected, only the learner may send them",
                    env_id,
                    msg.seq
                );
                self.metrics.inc_validation_errors();
                Flow::Continue
            }
            Payload::TaskResponse(_) => {
                log::debug!("env {}: ignoring task response seq={}", env_id, msg.seq);
                Flow::Continue
            }
            Payload::Heartbeat => Flow::Continue,
            Payload::Shutdown => Flow::Leave(Departure::Shutdown),
        }
    }

    fn reject(&self, env_id: EnvId, seq: u64, task: &Task) {
        log::warn!(
            "env {}: update seq={} rejected, task {} is not in {}",
            env_id,
            seq,
            task,
            self.space
        );
        self.metrics.inc_validation_errors();
    }

    fn serve_task(&mut self, env_id: EnvId, request_seq: u64) -> Flow {
        if !self.accepting_requests {
            self.metrics.inc_requests_refused();
            return Flow::Continue;
        }

        let task = match self.curriculum.sample(env_id) {
            Ok(task) => task,
            Err(e) => {
                log::warn!("env {}: curriculum failed to sample: {}", env_id, e);
                self.metrics.inc_requests_refused();
                return Flow::Continue;
            }
        };
        let sample_id = self.num_assigned;
        self.num_assigned += 1;

        if let Err(e) = self.space.validate(&task) {
            log::error!(
                "env {}: curriculum '{}' sampled an invalid task: {}",
                env_id,
                self.curriculum.name(),
                e
            );
            self.metrics.inc_validation_errors();
            self.metrics.inc_requests_refused();
            return Flow::Continue;
        }

        let Some(entry) = self.registry.get_mut(env_id) else {
            return Flow::Continue;
        };
        let reply = Payload::TaskResponse(TaskAssignment {
            task,
            sample_id,
            request_seq,
        });
        match entry.link.post(reply) {
            Ok((_, SendOutcome::Sent)) => {
                self.metrics.inc_requests_served();
                Flow::Continue
            }
            Ok((_, SendOutcome::Dropped)) => {
                log::debug!(
                    "env {}: task response for request seq={} dropped on full channel",
                    env_id,
                    request_seq
                );
                self.metrics.inc_responses_dropped();
                Flow::Continue
            }
            Err(_) => {
                self.metrics.inc_responses_dropped();
                Flow::Leave(Departure::Closed)
            }
        }
    }

    fn deregister(&mut self, env_id: EnvId, reason: Departure) {
        let Some(entry) = self.registry.remove(env_id) else {
            return;
        };
        entry.link.close();
        match reason {
            Departure::Shutdown | Departure::Closed => {
                self.metrics.inc_envs_detached();
                log::debug!("env {} detached ({:?})", env_id, reason);
            }
            Departure::Reaped => {
                self.metrics.inc_envs_reaped();
                log::warn!(
                    "env {} reaped after {:?} of silence",
                    env_id,
                    entry.last_seen.elapsed()
                );
            }
        }
    }

    fn reap_silent(&mut self) {
        let Some(timeout) = self.config.liveness_timeout else {
            return;
        };
        for env_id in self.registry.silent_for(timeout) {
            self.deregister(env_id, Departure::Reaped);
        }
    }

    // ------------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------------

    /// Stop serving tasks, apply what is still queued, tell every environment
    /// to stop and hand the curriculum back.
    pub fn shutdown(mut self) -> C {
        self.accepting_requests = false;
        for _ in 0..MAX_DRAIN_PASSES {
            if self.poll() == 0 {
                break;
            }
        }

        let remaining = self.registry.drain();
        for mut entry in remaining {
            let env_id = entry.link.env_id();
            if let Ok((_, SendOutcome::Dropped)) = entry.link.post(Payload::Shutdown) {
                log::debug!("env {}: shutdown notice dropped on full channel", env_id);
            }
            entry.link.close();
            self.metrics.inc_envs_detached();
        }

        log::info!("sync manager stopped after {} assignments", self.num_assigned);
        self.metrics.log();
        self.curriculum
    }

    /// Run the manager on its own thread.
    ///
    /// Returns [`SyncError::ManagerPanicked`] if the thread cannot be started.
    pub fn spawn(self) -> Result<SyncManagerHandle<C>> {
        let (control_tx, control_rx) = crossbeam_channel::bounded(self.config.channel_capacity);
        let next_env_id = Arc::clone(&self.next_env_id);
        let config = self.config.clone();
        let space = Arc::clone(&self.space);
        let metrics = self.metrics();

        let thread = std::thread::Builder::new()
            .name("curriculum-sync".to_string())
            .spawn(move || run(self, control_rx))
            .map_err(|e| SyncError::ManagerPanicked(e.to_string()))?;

        Ok(SyncManagerHandle {
            thread,
            control_tx,
            next_env_id,
            config,
            space,
            metrics,
        })
    }
}

// ============================================================================
// Background Loop
// ============================================================================

/// Commands from the handle to the manager thread.
enum Control {
    Attach {
        env_id: EnvId,
        channel: Box<dyn Channel>,
    },
    OnDemand(OnDemandUpdate),
    Shutdown,
}

/// Manager thread body.
fn run<C: Curriculum>(mut manager: SyncManager<C>, control_rx: Receiver<Control>) -> C {
    let poll_interval = manager.config.poll_interval;

    'outer: loop {
        // Commands first so attachments and learner updates are never starved
        loop {
            match control_rx.try_recv() {
                Ok(cmd) => {
                    if !apply(&mut manager, cmd) {
                        break 'outer;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("sync manager handle dropped, stopping");
                    break 'outer;
                }
            }
        }

        if manager.poll() > 0 {
            continue;
        }

        match control_rx.recv_timeout(poll_interval) {
            Ok(cmd) => {
                if !apply(&mut manager, cmd) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    manager.shutdown()
}

/// Apply one command. Returns false on `Shutdown`.
fn apply<C: Curriculum>(manager: &mut SyncManager<C>, cmd: Control) -> bool {
    match cmd {
        Control::Attach { env_id, channel } => {
            manager.register(env_id, channel);
            true
        }
        Control::OnDemand(update) => {
            manager.apply_on_demand(&update);
            true
        }
        Control::Shutdown => false,
    }
}

// ============================================================================
// SyncManagerHandle
// ============================================================================

/// Handle to a manager running on its own thread.
///
/// The manager thread owns the curriculum until [`shutdown`](Self::shutdown)
/// returns it. Dropping the handle without calling `shutdown` also stops the
/// thread, but the curriculum is lost.
pub struct SyncManagerHandle<C: Curriculum> {
    thread: JoinHandle<C>,
    control_tx: Sender<Control>,
    next_env_id: Arc<AtomicU64>,
    config: SyncConfig,
    space: Arc<TaskSpace>,
    metrics: SharedSyncMetrics,
}

impl<C: Curriculum> SyncManagerHandle<C> {
    /// Open a channel for a new environment and return its side.
    ///
    /// Callable from any thread that holds the handle. Messages sent before
    /// the manager registers the channel wait in the queue.
    pub fn attach(&self) -> Result<EnvLink> {
        let env_id = self.next_env_id.fetch_add(1, Ordering::Relaxed);
        let (env_side, manager_side) = self.config.backend.pair(self.config.channel_capacity);
        self.control_tx
            .send(Control::Attach {
                env_id,
                channel: manager_side,
            })
            .map_err(|_| SyncError::ChannelClosed)?;
        Ok(EnvLink::new(env_id, env_side))
    }

    /// Queue a learner-side update. Dropped when the control queue is full.
    pub fn on_demand(&self, update: OnDemandUpdate) -> Result<SendOutcome> {
        match self.control_tx.try_send(Control::OnDemand(update)) {
            Ok(()) => Ok(SendOutcome::Sent),
            Err(TrySendError::Full(_)) => Ok(SendOutcome::Dropped),
            Err(TrySendError::Disconnected(_)) => Err(SyncError::ChannelClosed),
        }
    }

    /// Task space served by the manager.
    pub fn space(&self) -> &TaskSpace {
        &self.space
    }

    /// Shared handle to the task space, for wrappers.
    pub fn shared_space(&self) -> Arc<TaskSpace> {
        Arc::clone(&self.space)
    }

    /// Configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Shared counters.
    pub fn metrics(&self) -> SharedSyncMetrics {
        Arc::clone(&self.metrics)
    }

    /// Check if the manager thread is still running.
    pub fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Stop the manager and take the curriculum back.
    ///
    /// Queued updates are applied first; task requests still in flight are
    /// refused and every environment receives `Shutdown`.
    pub fn shutdown(self) -> Result<C> {
        // a disconnected control channel means the loop already exited
        let _ = self.control_tx.send(Control::Shutdown);
        self.thread.join().map_err(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            SyncError::ManagerPanicked(reason)
        })
    }
}

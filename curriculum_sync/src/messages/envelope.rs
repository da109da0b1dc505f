//! Message envelope.

use super::updates::{CompletionUpdate, EpisodeUpdate, OnDemandUpdate, StepBatch, TaskAssignment};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to an environment when it attaches.
pub type EnvId = u64;

/// Discriminant of a [`Payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    TaskRequest,
    TaskResponse,
    StepBatch,
    EpisodeUpdate,
    CompletionUpdate,
    OnDemandUpdate,
    Heartbeat,
    Shutdown,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Environment asks for its next task.
    TaskRequest,
    /// Manager answers a task request.
    TaskResponse(TaskAssignment),
    /// Batched per-step records.
    StepBatch(StepBatch),
    /// Full-episode statistics.
    EpisodeUpdate(EpisodeUpdate),
    /// Episode outcome.
    CompletionUpdate(CompletionUpdate),
    /// Learner-side statistics. Never valid from an environment.
    OnDemandUpdate(OnDemandUpdate),
    /// Liveness signal from an otherwise quiet environment.
    Heartbeat,
    /// Stop: no new task requests, flush, exit.
    Shutdown,
}

impl Payload {
    /// Kind of this payload.
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::TaskRequest => MessageKind::TaskRequest,
            Payload::TaskResponse(_) => MessageKind::TaskResponse,
            Payload::StepBatch(_) => MessageKind::StepBatch,
            Payload::EpisodeUpdate(_) => MessageKind::EpisodeUpdate,
            Payload::CompletionUpdate(_) => MessageKind::CompletionUpdate,
            Payload::OnDemandUpdate(_) => MessageKind::OnDemandUpdate,
            Payload::Heartbeat => MessageKind::Heartbeat,
            Payload::Shutdown => MessageKind::Shutdown,
        }
    }
}

/// Envelope for everything crossing a channel.
///
/// `seq` strictly increases per sender on one environment's channel. It is
/// used for liveness and debug ordering; there is no ordering across
/// environments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub env_id: EnvId,
    pub seq: u64,
    pub payload: Payload,
}

impl Message {
    /// Create a new message.
    pub fn new(env_id: EnvId, seq: u64, payload: Payload) -> Self {
        Self {
            env_id,
            seq,
            payload,
        }
    }

    /// Kind derived from the payload.
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    /// MessagePack wire form for transports that cross process boundaries.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Parse the wire form produced by [`to_bytes`](Self::to_bytes).
    ///
    /// Tasks inside the payload are not validated here; the receiver checks
    /// them against its own space.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

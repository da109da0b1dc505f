//! Sequence-stamping channel endpoint.

use super::{Channel, SendOutcome};
use crate::error::Result;
use crate::messages::{EnvId, Message, Payload};
use std::time::{Duration, Instant};

/// One side of an environment's channel, bound to its environment id.
///
/// Every outgoing message is stamped with the environment id and the next
/// sequence number of this side, so sequence numbers strictly increase per
/// direction even when some sends are dropped.
pub struct EnvLink {
    env_id: EnvId,
    channel: Box<dyn Channel>,
    next_seq: u64,
    last_sent: Instant,
}

impl EnvLink {
    /// Bind a channel endpoint to an environment id.
    pub fn new(env_id: EnvId, channel: Box<dyn Channel>) -> Self {
        Self {
            env_id,
            channel,
            next_seq: 0,
            last_sent: Instant::now(),
        }
    }

    /// Environment id.
    pub fn env_id(&self) -> EnvId {
        self.env_id
    }

    /// Sequence number of the most recently stamped message.
    pub fn last_seq(&self) -> Option<u64> {
        self.next_seq.checked_sub(1)
    }

    fn stamp(&mut self, payload: Payload) -> Message {
        let seq = self.next_seq;
        self.next_seq += 1;
        Message::new(self.env_id, seq, payload)
    }

    fn note(&mut self, outcome: SendOutcome) -> SendOutcome {
        if outcome.is_sent() {
            self.last_sent = Instant::now();
        }
        outcome
    }

    /// Send without blocking. Returns the stamped sequence number too.
    pub fn post(&mut self, payload: Payload) -> Result<(u64, SendOutcome)> {
        let msg = self.stamp(payload);
        let seq = msg.seq;
        let outcome = self.channel.send(msg)?;
        Ok((seq, self.note(outcome)))
    }

    /// Send, waiting up to `timeout` for space.
    pub fn post_timeout(
        &mut self,
        payload: Payload,
        timeout: Duration,
    ) -> Result<(u64, SendOutcome)> {
        let msg = self.stamp(payload);
        let seq = msg.seq;
        let outcome = self.channel.send_timeout(msg, timeout)?;
        Ok((seq, self.note(outcome)))
    }

    /// Wait up to `timeout` for an incoming message.
    pub fn receive(&self, timeout: Duration) -> Result<Option<Message>> {
        self.channel.receive(timeout)
    }

    /// Non-blocking receive.
    pub fn try_receive(&self) -> Result<Option<Message>> {
        self.channel.try_receive()
    }

    /// Time since the last message was enqueued.
    pub fn idle_for(&self) -> Duration {
        self.last_sent.elapsed()
    }

    /// Close the underlying channel.
    pub fn close(&self) {
        self.channel.close();
    }

    /// Whether the underlying channel is closed.
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    /// Messages waiting on this side.
    pub fn pending(&self) -> usize {
        self.channel.pending()
    }

    /// Channel capacity per direction.
    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }
}

impl std::fmt::Debug for EnvLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvLink")
            .field("env_id", &self.env_id)
            .field("next_seq", &self.next_seq)
            .field("closed", &self.is_closed())
            .finish()
    }
}

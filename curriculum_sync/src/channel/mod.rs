//! Bounded bidirectional transport between one environment and the manager.
//!
//! Two interchangeable backends sit behind the [`Channel`] trait:
//!
//! - [`SharedQueueEndpoint`]: a pair of lock-free `ArrayQueue`s with condvar
//!   wake-ups, the shared-memory style of transport
//! - [`MailboxEndpoint`]: bounded `crossbeam_channel` mailboxes, the
//!   actor-message style of transport
//!
//! [`ChannelBackend::pair`] is the only place that knows which one is in
//! use. Everything else talks to `Box<dyn Channel>`.
//!
//! # Backpressure
//!
//! [`Channel::send`] never blocks: on a full queue the message is dropped and
//! [`SendOutcome::Dropped`] is returned, preferring freshness over
//! completeness. [`Channel::send_timeout`] waits for space up to a bound and
//! is reserved for rare messages (task requests, completions).
//!
//! # Closing
//!
//! Either side may close. After that, sends fail with
//! [`SyncError::ChannelClosed`](crate::SyncError::ChannelClosed) and receives
//! drain whatever is still queued before failing the same way. Dropping an
//! endpoint closes the channel.

mod link;
mod mailbox;
mod shared_queue;


pub use link::EnvLink;
pub use mailbox::MailboxEndpoint;
pub use shared_queue::SharedQueueEndpoint;

use crate::error::Result;
use crate::messages::Message;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Deadline `timeout` from now, saturating far in the future on overflow.
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365))
}

/// Result of a successful send call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Message was enqueued.
    Sent,
    /// Queue was full; the message was discarded.
    Dropped,
}

impl SendOutcome {
    /// Whether the message was enqueued.
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent)
    }
}

/// One endpoint of a bounded bidirectional message channel.
pub trait Channel: Send {
    /// Enqueue without blocking.
    fn send(&self, msg: Message) -> Result<SendOutcome>;

    /// Enqueue, waiting up to `timeout` for space.
    fn send_timeout(&self, msg: Message, timeout: Duration) -> Result<SendOutcome>;

    /// Wait up to `timeout` for a message. `Ok(None)` means nothing arrived.
    fn receive(&self, timeout: Duration) -> Result<Option<Message>>;

    /// Non-blocking receive.
    fn try_receive(&self) -> Result<Option<Message>> {
        self.receive(Duration::ZERO)
    }

    /// Close both directions.
    fn close(&self);

    /// Whether either side has closed.
    fn is_closed(&self) -> bool;

    /// Messages waiting to be received on this side.
    fn pending(&self) -> usize;

    /// Capacity of each direction.
    fn capacity(&self) -> usize;
}

/// Transport implementation chosen at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelBackend {
    /// Lock-free shared queues.
    #[default]
    SharedQueue,
    /// Actor-style mailboxes.
    Actor,
}

impl ChannelBackend {
    /// Create a connected `(environment side, manager side)` endpoint pair.
    ///
    /// A capacity of zero is bumped to one.
    pub fn pair(self, capacity: usize) -> (Box<dyn Channel>, Box<dyn Channel>) {
        let capacity = capacity.max(1);
        match self {
            ChannelBackend::SharedQueue => {
                let (a, b) = shared_queue::pair(capacity);
                (Box::new(a), Box::new(b))
            }
            ChannelBackend::Actor => {
                let (a, b) = mailbox::pair(capacity);
                (Box::new(a), Box::new(b))
            }
        }
    }
}

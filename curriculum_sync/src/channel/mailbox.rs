//! Actor-message channel backend.
//!
//! Each endpoint owns the receiving half of its own mailbox and a sender
//! into the peer's mailbox, the same bounded `crossbeam_channel` pairing the
//! actor threads use for commands and stats. Closing drops the sender so a
//! peer blocked in `receive` wakes up with a disconnect as soon as the
//! mailbox is drained.

use super::{Channel, SendOutcome};
use crate::error::{Result, SyncError};
use crate::messages::Message;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Endpoint of an actor-style mailbox channel.
pub struct MailboxEndpoint {
    tx: Mutex<Option<Sender<Message>>>,
    rx: Receiver<Message>,
    closed: Arc<AtomicBool>,
    capacity: usize,
}

/// Create a connected endpoint pair.
pub(super) fn pair(capacity: usize) -> (MailboxEndpoint, MailboxEndpoint) {
    let (tx_a, rx_b) = crossbeam_channel::bounded(capacity);
    let (tx_b, rx_a) = crossbeam_channel::bounded(capacity);
    let closed = Arc::new(AtomicBool::new(false));
    (
        MailboxEndpoint {
            tx: Mutex::new(Some(tx_a)),
            rx: rx_a,
            closed: Arc::clone(&closed),
            capacity,
        },
        MailboxEndpoint {
            tx: Mutex::new(Some(tx_b)),
            rx: rx_b,
            closed,
            capacity,
        },
    )
}

impl MailboxEndpoint {
    fn sender(&self) -> Result<Sender<Message>> {
        if self.is_closed() {
            return Err(SyncError::ChannelClosed);
        }
        self.tx.lock().clone().ok_or(SyncError::ChannelClosed)
    }

    fn mark_closed(&self) -> SyncError {
        self.closed.store(true, Ordering::Release);
        SyncError::ChannelClosed
    }
}

impl Channel for MailboxEndpoint {
    fn send(&self, msg: Message) -> Result<SendOutcome> {
        match self.sender()?.try_send(msg) {
            Ok(()) => Ok(SendOutcome::Sent),
            Err(TrySendError::Full(_)) => Ok(SendOutcome::Dropped),
            Err(TrySendError::Disconnected(_)) => Err(self.mark_closed()),
        }
    }

    fn send_timeout(&self, msg: Message, timeout: Duration) -> Result<SendOutcome> {
        match self.sender()?.send_timeout(msg, timeout) {
            Ok(()) => Ok(SendOutcome::Sent),
            Err(SendTimeoutError::Timeout(_)) => Ok(SendOutcome::Dropped),
            Err(SendTimeoutError::Disconnected(_)) => Err(self.mark_closed()),
        }
    }

    fn receive(&self, timeout: Duration) -> Result<Option<Message>> {
        if self.is_closed() {
            return match self.rx.try_recv() {
                Ok(msg) => Ok(Some(msg)),
                Err(_) => Err(SyncError::ChannelClosed),
            };
        }
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(self.mark_closed()),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.tx.lock().take();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn pending(&self) -> usize {
        self.rx.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for MailboxEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}

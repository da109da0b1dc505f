//! Shared-queue channel backend.
//!
//! # Design
//!
//! ```text
//!  env endpoint                          manager endpoint
//!  send ──> ArrayQueue lane 0 (bounded) ──> receive
//!  receive <── ArrayQueue lane 1 (bounded) <── send
//! ```
//!
//! Push and pop are lock-free. The mutex/condvar pair on each lane is only
//! used to park a receiver on an empty lane or a `send_timeout` caller on a
//! full one; every state change that can unblock a waiter notifies under the
//! lane mutex, so wake-ups cannot be lost.

use super::{deadline_after, Channel, SendOutcome};
use crate::error::{Result, SyncError};
use crate::messages::Message;
use crossbeam_queue::ArrayQueue;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One direction of the channel.
struct Lane {
    queue: ArrayQueue<Message>,
    lock: Mutex<()>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl Lane {
    fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            lock: Mutex::new(()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn signal(&self, cond: &Condvar) {
        let _guard = self.lock.lock();
        cond.notify_one();
    }

    fn wake_all(&self) {
        let _guard = self.lock.lock();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

struct Shared {
    lanes: [Lane; 2],
    closed: AtomicBool,
}

/// Endpoint of a shared-queue channel.
pub struct SharedQueueEndpoint {
    shared: Arc<Shared>,
    outbound: usize,
}

/// Create a connected endpoint pair.
pub(super) fn pair(capacity: usize) -> (SharedQueueEndpoint, SharedQueueEndpoint) {
    let shared = Arc::new(Shared {
        lanes: [Lane::new(capacity), Lane::new(capacity)],
        closed: AtomicBool::new(false),
    });
    (
        SharedQueueEndpoint {
            shared: Arc::clone(&shared),
            outbound: 0,
        },
        SharedQueueEndpoint {
            shared,
            outbound: 1,
        },
    )
}

impl SharedQueueEndpoint {
    fn out_lane(&self) -> &Lane {
        &self.shared.lanes[self.outbound]
    }

    fn in_lane(&self) -> &Lane {
        &self.shared.lanes[1 - self.outbound]
    }
}

impl Channel for SharedQueueEndpoint {
    fn send(&self, msg: Message) -> Result<SendOutcome> {
        if self.is_closed() {
            return Err(SyncError::ChannelClosed);
        }
        let lane = self.out_lane();
        match lane.queue.push(msg) {
            Ok(()) => {
                lane.signal(&lane.not_empty);
                Ok(SendOutcome::Sent)
            }
            Err(_) => Ok(SendOutcome::Dropped),
        }
    }

    fn send_timeout(&self, msg: Message, timeout: Duration) -> Result<SendOutcome> {
        let deadline = deadline_after(timeout);
        let lane = self.out_lane();
        let mut msg = msg;
        loop {
            if self.is_closed() {
                return Err(SyncError::ChannelClosed);
            }
            match lane.queue.push(msg) {
                Ok(()) => {
                    lane.signal(&lane.not_empty);
                    return Ok(SendOutcome::Sent);
                }
                Err(rejected) => msg = rejected,
            }

            let mut guard = lane.lock.lock();
            if self.is_closed() {
                return Err(SyncError::ChannelClosed);
            }
            if lane.queue.is_full() {
                if Instant::now() >= deadline {
                    return Ok(SendOutcome::Dropped);
                }
                lane.not_full.wait_until(&mut guard, deadline);
            }
        }
    }

    fn receive(&self, timeout: Duration) -> Result<Option<Message>> {
        let deadline = deadline_after(timeout);
        let lane = self.in_lane();
        loop {
            if let Some(msg) = lane.queue.pop() {
                lane.signal(&lane.not_full);
                return Ok(Some(msg));
            }
            if self.is_closed() {
                return Err(SyncError::ChannelClosed);
            }

            let mut guard = lane.lock.lock();
            if lane.queue.is_empty() && !self.is_closed() {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                lane.not_empty.wait_until(&mut guard, deadline);
            }
        }
    }

    fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            for lane in &self.shared.lanes {
                lane.wake_all();
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    fn pending(&self) -> usize {
        self.in_lane().queue.len()
    }

    fn capacity(&self) -> usize {
        self.in_lane().queue.capacity()
    }
}

impl Drop for SharedQueueEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}

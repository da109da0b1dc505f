//! Per-environment bookkeeping owned by the manager.

use crate::channel::EnvLink;
use crate::messages::EnvId;
use std::time::{Duration, Instant};

/// Why an environment left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Departure {
    /// Sent `Shutdown`.
    Shutdown,
    /// Channel closed without `Shutdown`.
    Closed,
    /// Silent past the liveness timeout.
    Reaped,
}

/// Manager-side state for one environment.
#[derive(Debug)]
pub(crate) struct EnvEntry {
    pub link: EnvLink,
    /// Highest inbound sequence number accepted
    pub last_seq: Option<u64>,
    pub last_seen: Instant,
}

impl EnvEntry {
    fn new(link: EnvLink) -> Self {
        Self {
            link,
            last_seq: None,
            last_seen: Instant::now(),
        }
    }

    /// Record an inbound sequence number. Returns false for stale or
    /// duplicate numbers.
    pub fn accept(&mut self, seq: u64) -> bool {
        if self.last_seq.is_some_and(|last| seq <= last) {
            return false;
        }
        self.last_seq = Some(seq);
        self.last_seen = Instant::now();
        true
    }
}

/// Registered environments in attach order, polled round-robin.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: Vec<EnvEntry>,
    cursor: usize,
}

impl Registry {
    pub fn insert(&mut self, link: EnvLink) {
        self.entries.push(EnvEntry::new(link));
    }

    pub fn remove(&mut self, env_id: EnvId) -> Option<EnvEntry> {
        let pos = self.entries.iter().position(|e| e.link.env_id() == env_id)?;
        Some(self.entries.remove(pos))
    }

    pub fn get_mut(&mut self, env_id: EnvId) -> Option<&mut EnvEntry> {
        self.entries.iter_mut().find(|e| e.link.env_id() == env_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn ids(&self) -> Vec<EnvId> {
        self.entries.iter().map(|e| e.link.env_id()).collect()
    }

    /// Ids for one polling pass. The starting environment advances by one
    /// each pass so no environment is always served first.
    pub fn rotation(&mut self) -> Vec<EnvId> {
        let n = self.entries.len();
        if n == 0 {
            return Vec::new();
        }
        let start = self.cursor % n;
        self.cursor = self.cursor.wrapping_add(1);
        (0..n)
            .map(|i| self.entries[(start + i) % n].link.env_id())
            .collect()
    }

    /// Ids silent for longer than `timeout`.
    pub fn silent_for(&self, timeout: Duration) -> Vec<EnvId> {
        self.entries
            .iter()
            .filter(|e| e.last_seen.elapsed() > timeout)
            .map(|e| e.link.env_id())
            .collect()
    }

    pub fn drain(&mut self) -> Vec<EnvEntry> {
        std::mem::take(&mut self.entries)
    }
}

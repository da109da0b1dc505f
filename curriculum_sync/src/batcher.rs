//! Step-record accumulator.
//!
//! Amortizes per-step channel traffic: records are collected locally and
//! shipped as one [`StepBatch`] when either the size or the age threshold is
//! reached.
//!
//! ```text
//!   step ──> push ──> [r0 r1 r2 ...]  ── len >= batch_size ──┐
//!                                      ── age >= interval ───┤
//!                                                            ▼
//!                                          flush: post(StepBatch), never blocks
//! ```
//!
//! A flush that meets a full channel drops the whole batch. Training is never
//! stalled on curriculum feedback.

use crate::channel::{EnvLink, SendOutcome};
use crate::error::Result;
use crate::messages::{Payload, StepBatch, StepRecord};
use std::time::{Duration, Instant};

/// Accumulates step records and flushes them as batches.
#[derive(Debug)]
pub struct Batcher {
    records: Vec<StepRecord>,
    batch_size: usize,
    batch_interval: Duration,
    window_start: Instant,
    flushed_batches: u64,
    dropped_batches: u64,
    dropped_records: u64,
}

impl Batcher {
    /// Create a batcher. A `batch_size` of zero is treated as one.
    pub fn new(batch_size: usize, batch_interval: Duration) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            records: Vec::with_capacity(batch_size),
            batch_size,
            batch_interval,
            window_start: Instant::now(),
            flushed_batches: 0,
            dropped_batches: 0,
            dropped_records: 0,
        }
    }

    /// Records waiting to be flushed.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Configured batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Batches successfully enqueued.
    pub fn flushed_batches(&self) -> u64 {
        self.flushed_batches
    }

    /// Batches discarded on a full channel.
    pub fn dropped_batches(&self) -> u64 {
        self.dropped_batches
    }

    /// Records lost with dropped batches.
    pub fn dropped_records(&self) -> u64 {
        self.dropped_records
    }

    /// Whether a flush is due: size reached, or non-empty and the window has
    /// aged past the interval.
    pub fn is_due(&self) -> bool {
        self.records.len() >= self.batch_size
            || (!self.records.is_empty() && self.window_start.elapsed() >= self.batch_interval)
    }

    /// Buffer a record and flush if due.
    ///
    /// Returns the send outcome when a flush happened.
    pub fn push(&mut self, record: StepRecord, link: &mut EnvLink) -> Result<Option<SendOutcome>> {
        if self.records.is_empty() {
            self.window_start = Instant::now();
        }
        self.records.push(record);
        if self.is_due() {
            self.flush(link)
        } else {
            Ok(None)
        }
    }

    /// Flush buffered records regardless of thresholds.
    ///
    /// Returns `Ok(None)` when there was nothing to send. The buffer is
    /// cleared even when the send fails.
    pub fn flush(&mut self, link: &mut EnvLink) -> Result<Option<SendOutcome>> {
        if self.records.is_empty() {
            return Ok(None);
        }
        let records = std::mem::replace(&mut self.records, Vec::with_capacity(self.batch_size));
        self.window_start = Instant::now();
        let n = records.len() as u64;

        let (seq, outcome) = link.post(Payload::StepBatch(StepBatch::new(records)))?;
        match outcome {
            SendOutcome::Sent => self.flushed_batches += 1,
            SendOutcome::Dropped => {
                self.dropped_batches += 1;
                self.dropped_records += n;
                log::debug!(
                    "env {}: step batch seq={} dropped on full channel ({} records)",
                    link.env_id(),
                    seq,
                    n
                );
            }
        }
        Ok(Some(outcome))
    }

    /// Discard buffered records without sending.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

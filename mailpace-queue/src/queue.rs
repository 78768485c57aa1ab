//! Time-ordered dispatch queue
//!
//! Batches leave the queue in ascending `eligible_at` order, and only once
//! that time has passed. Batches with equal timestamps leave in the order they
//! were put, so the total order is `(eligible_at, insertion sequence)`.
//! Comparing two `i64` timestamps cannot overflow, so no saturation is needed.
//!
//! The queue is unbounded: [`DispatchQueue::put`] never waits. Once
//! [`DispatchQueue::close`] has been called every further `put` fails, which is
//! how an interrupted insert surfaces to producers.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, binary_heap::PeekMut},
};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::{batch::Batch, clock::Clock, error::QueueError};

#[derive(Debug)]
struct Entry {
    batch: Batch,
    sequence: u64,
}

impl Entry {
    const fn key(&self) -> (i64, u64) {
        (self.batch.eligible_at(), self.sequence)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed, so the max-heap yields the earliest batch first
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

#[derive(Debug, Default)]
struct State {
    heap: BinaryHeap<Entry>,
    sequence: u64,
    closed: bool,
}

/// Unbounded queue releasing batches once they become eligible
#[derive(Debug)]
pub struct DispatchQueue {
    clock: Clock,
    state: Mutex<State>,
    available: Notify,
}

impl DispatchQueue {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            state: Mutex::new(State::default()),
            available: Notify::new(),
        }
    }

    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Insert a batch
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the queue has been closed; the batch
    /// is dropped and was not enqueued.
    pub fn put(&self, batch: Batch) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }

        let sequence = state.sequence;
        state.sequence = sequence.wrapping_add(1);
        state.heap.push(Entry { batch, sequence });
        drop(state);

        self.available.notify_one();
        Ok(())
    }

    /// Wait for the earliest batch to become eligible and remove it
    ///
    /// Sleeps until the head batch's time instead of polling, and wakes early
    /// when a new batch is put in case it sorts before the current head.
    ///
    /// Cancel safe: if the returned future is dropped, no batch is lost. This
    /// is what lets a consumer race `take` against a shutdown signal.
    pub async fn take(&self) -> Batch {
        loop {
            let deadline = {
                let mut state = self.state.lock();
                match state.heap.peek_mut() {
                    Some(head) if head.batch.eligible_at() <= self.clock.now_millis() => {
                        return PeekMut::pop(head).batch;
                    }
                    Some(head) => Some(self.clock.instant_at(head.batch.eligible_at())),
                    None => None,
                }
            };

            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        () = self.available.notified() => {}
                        () = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => self.available.notified().await,
            }
        }
    }

    /// Stop accepting batches and report how many are still waiting
    ///
    /// Closing and counting happen under one lock, so no `put` can slip in
    /// between them.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        state.heap.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().heap.is_empty()
    }
}

//! Rate-limited sending facade
//!
//! [`RateLimitedSender`] wraps a [`Transport`] and turns every submission into
//! batches of at most `batch_size` messages. Each batch is stamped with the
//! next slot of a shared schedule that advances by `cooldown` per batch, and
//! a single background consumer hands batches to the wrapped transport once
//! their slot has come.
//!
//! # Example
//!
//! ```text
//! batch_size: 2, cooldown: 500ms
//! submit([a, b, c]) at t=0
//! - [a, b] eligible at t=0
//! - [c]    eligible at t=500ms
//! submit([d]) at t=10ms
//! - [d]    eligible at t=1000ms
//! ```

use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use mailpace_common::{
    MimeMessage, Preparator, Signal, SimpleMessage, Transport, TransportError, internal, schedule,
};
use parking_lot::Mutex;
use tokio::{sync::broadcast, task::JoinHandle};

use crate::{
    batch::{Batch, Messages},
    clock::{Clock, saturating_millis},
    config::ThrottleConfig,
    consumer::BatchConsumer,
    error::QueueError,
    queue::DispatchQueue,
};

/// Throttling front for a [`Transport`]
///
/// Dropping the sender stops the consumer; anything still queued is
/// abandoned.
pub struct RateLimitedSender<T: ?Sized> {
    delegate: Arc<T>,
    queue: Arc<DispatchQueue>,
    batch_size: AtomicUsize,
    cooldown_millis: AtomicI64,
    /// Eligibility timestamp handed to the next batch created
    next_eligible: AtomicI64,
    interrupt: broadcast::Sender<Signal>,
    consumer: Mutex<Option<JoinHandle<Result<(), QueueError>>>>,
}

impl<T: Transport + ?Sized + 'static> RateLimitedSender<T> {
    /// Wrap `delegate` and start the batch consumer
    ///
    /// The consumer lives until [`interrupt`](Self::interrupt) or
    /// [`shutdown`](Self::shutdown) is called, or this sender is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(delegate: Arc<T>, config: &ThrottleConfig) -> Self {
        let clock = Clock::new();
        let queue = Arc::new(DispatchQueue::new(clock));
        let (interrupt, shutdown) = broadcast::channel(1);

        let consumer = tokio::spawn(
            BatchConsumer::new(Arc::clone(&queue), Arc::clone(&delegate), shutdown).run(),
        );

        internal!(
            "Rate limited sender started with batch_size={}, cooldown={}ms",
            config.batch_size,
            config.cooldown_millis
        );

        Self {
            delegate,
            queue,
            batch_size: AtomicUsize::new(config.batch_size.get()),
            cooldown_millis: AtomicI64::new(saturating_millis(config.cooldown())),
            next_eligible: AtomicI64::new(clock.now_millis()),
            interrupt,
            consumer: Mutex::new(Some(consumer)),
        }
    }
}

impl<T: Transport + ?Sized> RateLimitedSender<T> {
    pub fn batch_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.batch_size.load(Ordering::Relaxed)).unwrap_or(NonZeroUsize::MIN)
    }

    /// Applies to batches created from now on
    pub fn set_batch_size(&self, batch_size: NonZeroUsize) {
        self.batch_size.store(batch_size.get(), Ordering::Relaxed);
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.cooldown_millis.load(Ordering::Relaxed)).unwrap_or(0))
    }

    /// Applies to batches created from now on; queued batches keep their slot
    pub fn set_cooldown(&self, cooldown: Duration) {
        self.cooldown_millis
            .store(saturating_millis(cooldown), Ordering::Relaxed);
    }

    pub const fn delegate(&self) -> &Arc<T> {
        &self.delegate
    }

    /// Number of batches waiting to be dispatched
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Split `messages` into batches, schedule them and queue them
    ///
    /// Returns once the batches are queued; delivery happens later on the
    /// consumer.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Empty`] if there is nothing to send; nothing is queued
    /// - [`QueueError::Enqueue`] if the queue closed part way through. Batches
    ///   before the failing one stay queued and will still be delivered
    pub fn submit(&self, messages: impl Into<Messages>) -> Result<(), QueueError> {
        let messages = messages.into();
        if messages.is_empty() {
            return Err(QueueError::Empty);
        }

        self.reset_if_idle();

        let batches = self.create_batches(messages)?;
        self.enqueue(batches)
    }

    /// Pull the schedule forward to now after an idle period
    ///
    /// When nothing is queued and the schedule lapsed more than one cooldown
    /// ago, the next batch may go out immediately. The counter is only reset
    /// if no other submitter advanced it since it was read; the queue length
    /// is still a snapshot, so a concurrent submission can make it stale.
    fn reset_if_idle(&self) {
        let now = self.queue.clock().now_millis();
        let queued = self.queue.len();
        let cooldown = self.cooldown_millis.load(Ordering::Relaxed);

        schedule!(
            queued,
            next_eligible = self.next_eligible.load(Ordering::SeqCst),
            cooldown,
            now,
            "Checking schedule"
        );

        if queued != 0 {
            return;
        }

        let reset = self
            .next_eligible
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                (next.saturating_add(cooldown) < now).then_some(now)
            });

        if reset.is_ok() {
            schedule!("Resetting delay");
        }
    }

    fn create_batches(&self, messages: Messages) -> Result<Vec<Batch>, QueueError> {
        let cooldown = self.cooldown_millis.load(Ordering::Relaxed);

        messages
            .partition(self.batch_size())
            .into_iter()
            .map(|chunk| Batch::new(self.advance(cooldown), chunk))
            .collect()
    }

    /// Take the next slot and move the schedule on by `cooldown`
    fn advance(&self, cooldown: i64) -> i64 {
        self.next_eligible
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                Some(next.saturating_add(cooldown))
            })
            .unwrap_or_else(|next| next)
    }

    fn enqueue(&self, batches: Vec<Batch>) -> Result<(), QueueError> {
        let total = batches.len();

        for (enqueued, batch) in batches.into_iter().enumerate() {
            schedule!(level = DEBUG, "Enqueueing {batch}");

            if let Err(error) = self.queue.put(batch) {
                schedule!(
                    level = ERROR,
                    %error,
                    enqueued,
                    total,
                    "An error occurred while enqueueing batch"
                );
                return Err(QueueError::Enqueue { enqueued, total });
            }
        }

        Ok(())
    }

    /// Ask the consumer to stop
    ///
    /// Safe to call more than once. The consumer treats this as a clean
    /// shutdown only if nothing is queued when it sees the signal.
    pub fn interrupt(&self) {
        if self.interrupt.send(Signal::Shutdown).is_err() {
            internal!("Batch consumer already stopped");
        }
    }

    /// Interrupt the consumer and wait for it to finish
    ///
    /// Any dispatch already in progress completes first.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Abandoned`] if batches were still queued
    /// - [`QueueError::Consumer`] if the consumer task panicked or was
    ///   cancelled
    pub async fn shutdown(&self) -> Result<(), QueueError> {
        self.interrupt();

        let consumer = self.consumer.lock().take();
        match consumer {
            Some(consumer) => consumer.await?,
            None => Ok(()),
        }
    }
}

/// Lets a throttled sender stand in for the transport it wraps
///
/// The `send_*` operations queue instead of sending, and succeed as soon as
/// the messages are queued.
#[async_trait]
impl<T: Transport + ?Sized> Transport for RateLimitedSender<T> {
    fn create_mime_message(&self) -> MimeMessage {
        self.delegate.create_mime_message()
    }

    async fn send_simple(&self, messages: &[SimpleMessage]) -> Result<(), TransportError> {
        self.submit(messages.to_vec()).map_err(unavailable)
    }

    async fn send_mime(&self, messages: &[MimeMessage]) -> Result<(), TransportError> {
        self.submit(messages.to_vec()).map_err(unavailable)
    }

    async fn send_prepared(&self, preparators: &[Preparator]) -> Result<(), TransportError> {
        self.submit(preparators.to_vec()).map_err(unavailable)
    }
}

fn unavailable(error: QueueError) -> TransportError {
    TransportError::Unavailable(error.to_string())
}

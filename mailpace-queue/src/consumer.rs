//! The single worker draining the dispatch queue

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures_util::FutureExt;
use mailpace_common::{Signal, Transport, delivery, internal};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{batch::Batch, error::QueueError, queue::DispatchQueue};

/// Takes eligible batches off the queue and hands them to the transport
///
/// The consumer runs until it receives a [`Signal`] (or the signal channel
/// closes). A failed or panicking dispatch is logged and the loop moves on to
/// the next batch; nothing is retried.
pub struct BatchConsumer<T: ?Sized> {
    queue: Arc<DispatchQueue>,
    transport: Arc<T>,
    shutdown: broadcast::Receiver<Signal>,
}

impl<T: Transport + ?Sized> BatchConsumer<T> {
    pub const fn new(
        queue: Arc<DispatchQueue>,
        transport: Arc<T>,
        shutdown: broadcast::Receiver<Signal>,
    ) -> Self {
        Self {
            queue,
            transport,
            shutdown,
        }
    }

    /// Drain the queue until interrupted
    ///
    /// Interruption closes the queue. If nothing was waiting at that moment
    /// this is a clean shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Abandoned`] if batches were still queued when
    /// the consumer was interrupted.
    pub async fn run(mut self) -> Result<(), QueueError> {
        internal!(level = INFO, "Batch consumer starting");

        loop {
            tokio::select! {
                biased;

                signal = self.shutdown.recv() => {
                    return self.stop(signal);
                }
                batch = self.queue.take() => {
                    deliver(self.transport.as_ref(), batch).await;
                }
            }
        }
    }

    fn stop(&self, signal: Result<Signal, RecvError>) -> Result<(), QueueError> {
        match signal {
            Ok(signal) => internal!("Batch consumer received {signal:?}"),
            Err(error) => internal!("Batch consumer shutdown channel: {error}"),
        }

        let pending = self.queue.close();
        if pending == 0 {
            internal!(level = INFO, "Batch consumer stopped");
            return Ok(());
        }

        delivery!(
            level = ERROR,
            pending,
            "Mail sender was interrupted but queue was not empty. Some emails were not sent."
        );
        Err(QueueError::Abandoned { pending })
    }
}

async fn deliver<T: Transport + ?Sized>(transport: &T, batch: Batch) {
    delivery!(level = DEBUG, "Dequeued {batch}");

    let kind = batch.kind();
    let size = batch.len();

    match AssertUnwindSafe(batch.dispatch(transport))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => {
            delivery!(level = DEBUG, %kind, size, "Dispatched batch");
        }
        Ok(Err(error)) => {
            delivery!(level = ERROR, %kind, size, %error, "Failed to dispatch batch");
        }
        Err(_) => {
            delivery!(
                level = ERROR,
                %kind,
                size,
                "Transport panicked while dispatching batch"
            );
        }
    }
}

//! Typed errors for submitting, queueing and draining batches.
//!
//! Validation problems ([`QueueError::Empty`],
//! [`QueueError::UnsupportedRepresentation`]) are raised before anything is
//! enqueued. Everything else means batches were stranded or could not be
//! queued, and is treated as fatal rather than retried.

use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum QueueError {
    /// A submission or batch contained no messages.
    #[error("Submission contains no messages")]
    Empty,

    /// A submission mixed message representations.
    #[error("Unsupported representation: {0}")]
    UnsupportedRepresentation(String),

    /// The dispatch queue no longer accepts batches.
    #[error("Dispatch queue is closed")]
    Closed,

    /// A submission could only be partially queued.
    #[error("Could not enqueue email batch: {enqueued} of {total} batches were queued")]
    Enqueue { enqueued: usize, total: usize },

    /// The consumer was interrupted while batches were still waiting.
    #[error("Could not dequeue email batch: {pending} batches were abandoned")]
    Abandoned { pending: usize },

    /// The consumer task panicked or was cancelled.
    #[error("Batch consumer failed: {0}")]
    Consumer(#[from] JoinError),
}

impl QueueError {
    /// Returns `true` if nothing was queued because the input was invalid.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Empty | Self::UnsupportedRepresentation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors() {
        assert!(QueueError::Empty.is_validation());
        assert!(QueueError::UnsupportedRepresentation("mime".to_string()).is_validation());
        assert!(!QueueError::Closed.is_validation());
        assert!(!QueueError::Abandoned { pending: 1 }.is_validation());
    }

    #[test]
    fn test_error_display() {
        let err = QueueError::Enqueue {
            enqueued: 1,
            total: 3,
        };
        assert_eq!(
            err.to_string(),
            "Could not enqueue email batch: 1 of 3 batches were queued"
        );
        assert_eq!(
            QueueError::Abandoned { pending: 2 }.to_string(),
            "Could not dequeue email batch: 2 batches were abandoned"
        );
    }
}

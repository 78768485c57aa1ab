//! Scheduled batches of homogeneous messages

use std::{fmt, num::NonZeroUsize};

use chrono::{DateTime, SecondsFormat};
use mailpace_common::{
    MimeMessage, Outgoing, Preparator, RepresentationKind, SimpleMessage, Transport,
    TransportError,
};

use crate::{clock::Clock, error::QueueError};

/// A homogeneous, ordered list of messages
///
/// Each variant maps onto exactly one [`Transport`] operation.
#[derive(Debug, Clone)]
pub enum Messages {
    Simple(Vec<SimpleMessage>),
    Mime(Vec<MimeMessage>),
    Prepared(Vec<Preparator>),
}

impl Messages {
    pub const fn kind(&self) -> RepresentationKind {
        match self {
            Self::Simple(_) => RepresentationKind::Simple,
            Self::Mime(_) => RepresentationKind::Mime,
            Self::Prepared(_) => RepresentationKind::Preparator,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Simple(messages) => messages.len(),
            Self::Mime(messages) => messages.len(),
            Self::Prepared(preparators) => preparators.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send everything in one call to the matching transport operation
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn send<T: Transport + ?Sized>(&self, transport: &T) -> Result<(), TransportError> {
        match self {
            Self::Simple(messages) => transport.send_simple(messages).await,
            Self::Mime(messages) => transport.send_mime(messages).await,
            Self::Prepared(preparators) => transport.send_prepared(preparators).await,
        }
    }

    /// Split into consecutive chunks of at most `size` items, keeping order
    pub(crate) fn partition(self, size: NonZeroUsize) -> Vec<Self> {
        match self {
            Self::Simple(messages) => chunk(messages, size).map(Self::Simple).collect(),
            Self::Mime(messages) => chunk(messages, size).map(Self::Mime).collect(),
            Self::Prepared(preparators) => {
                chunk(preparators, size).map(Self::Prepared).collect()
            }
        }
    }
}

fn chunk<T>(items: Vec<T>, size: NonZeroUsize) -> impl Iterator<Item = Vec<T>> {
    let mut items = items.into_iter().peekable();
    std::iter::from_fn(move || {
        items.peek()?;
        Some(items.by_ref().take(size.get()).collect())
    })
}

impl From<SimpleMessage> for Messages {
    fn from(message: SimpleMessage) -> Self {
        Self::Simple(vec![message])
    }
}

impl From<Vec<SimpleMessage>> for Messages {
    fn from(messages: Vec<SimpleMessage>) -> Self {
        Self::Simple(messages)
    }
}

impl From<MimeMessage> for Messages {
    fn from(message: MimeMessage) -> Self {
        Self::Mime(vec![message])
    }
}

impl From<Vec<MimeMessage>> for Messages {
    fn from(messages: Vec<MimeMessage>) -> Self {
        Self::Mime(messages)
    }
}

impl From<Preparator> for Messages {
    fn from(preparator: Preparator) -> Self {
        Self::Prepared(vec![preparator])
    }
}

impl From<Vec<Preparator>> for Messages {
    fn from(preparators: Vec<Preparator>) -> Self {
        Self::Prepared(preparators)
    }
}

impl TryFrom<Vec<Outgoing>> for Messages {
    type Error = QueueError;

    /// Collect a mixed list into one representation
    ///
    /// Fails if the list is empty or holds more than one kind.
    fn try_from(items: Vec<Outgoing>) -> Result<Self, Self::Error> {
        let Some(first) = items.first() else {
            return Err(QueueError::Empty);
        };

        let mut messages = match first.kind() {
            RepresentationKind::Simple => Self::Simple(Vec::with_capacity(items.len())),
            RepresentationKind::Mime => Self::Mime(Vec::with_capacity(items.len())),
            RepresentationKind::Preparator => Self::Prepared(Vec::with_capacity(items.len())),
        };

        for item in items {
            match (&mut messages, item) {
                (Self::Simple(list), Outgoing::Simple(message)) => list.push(message),
                (Self::Mime(list), Outgoing::Mime(message)) => list.push(message),
                (Self::Prepared(list), Outgoing::Prepared(preparator)) => list.push(preparator),
                (messages, item) => {
                    return Err(QueueError::UnsupportedRepresentation(format!(
                        "{} in a {} submission",
                        item.kind(),
                        messages.kind()
                    )));
                }
            }
        }

        Ok(messages)
    }
}

/// An immutable group of messages that must not leave the queue before
/// `eligible_at`
#[derive(Debug)]
pub struct Batch {
    eligible_at: i64,
    messages: Messages,
}

impl Batch {
    /// Create a batch eligible at `eligible_at` milliseconds since the epoch
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Empty`] if there are no messages.
    pub fn new(eligible_at: i64, messages: Messages) -> Result<Self, QueueError> {
        if messages.is_empty() {
            return Err(QueueError::Empty);
        }

        Ok(Self {
            eligible_at,
            messages,
        })
    }

    pub const fn eligible_at(&self) -> i64 {
        self.eligible_at
    }

    pub const fn kind(&self) -> RepresentationKind {
        self.messages.kind()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always `false`; batches are never empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub const fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Milliseconds until this batch becomes eligible; negative once it is
    pub fn delay(&self, clock: &Clock) -> i64 {
        self.eligible_at.saturating_sub(clock.now_millis())
    }

    /// Hand the messages to the matching transport operation
    ///
    /// Consumes the batch, so it can be dispatched at most once.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn dispatch<T: Transport + ?Sized>(self, transport: &T) -> Result<(), TransportError> {
        self.messages.send(transport).await
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Batch[time=")?;
        match DateTime::from_timestamp_millis(self.eligible_at) {
            Some(time) => write!(f, "{}", time.to_rfc3339_opts(SecondsFormat::Millis, true))?,
            None => write!(f, "{}ms", self.eligible_at)?,
        }
        write!(f, ", kind={}, messages={}]", self.kind(), self.len())
    }
}

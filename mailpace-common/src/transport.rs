//! The downstream sending capability
//!
//! Anything that can actually put messages on the wire implements
//! [`Transport`]. There is one operation per [`RepresentationKind`], each
//! receiving a non-empty slice in caller order.
//!
//! [`RepresentationKind`]: crate::RepresentationKind

use std::sync::Arc;

use async_trait::async_trait;

use crate::{MimeMessage, Preparator, SimpleMessage, TransportError};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a blank message for preparators to fill in
    fn create_mime_message(&self) -> MimeMessage {
        MimeMessage::new()
    }

    /// Send plain messages
    ///
    /// # Errors
    ///
    /// Returns an error if any of the messages could not be handed over.
    async fn send_simple(&self, messages: &[SimpleMessage]) -> Result<(), TransportError>;

    /// Send pre-built messages
    ///
    /// # Errors
    ///
    /// Returns an error if any of the messages could not be handed over.
    async fn send_mime(&self, messages: &[MimeMessage]) -> Result<(), TransportError>;

    /// Build one message per preparator and send them
    ///
    /// # Errors
    ///
    /// Returns an error if a preparator fails or a message could not be
    /// handed over.
    async fn send_prepared(&self, preparators: &[Preparator]) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn create_mime_message(&self) -> MimeMessage {
        (**self).create_mime_message()
    }

    async fn send_simple(&self, messages: &[SimpleMessage]) -> Result<(), TransportError> {
        (**self).send_simple(messages).await
    }

    async fn send_mime(&self, messages: &[MimeMessage]) -> Result<(), TransportError> {
        (**self).send_mime(messages).await
    }

    async fn send_prepared(&self, preparators: &[Preparator]) -> Result<(), TransportError> {
        (**self).send_prepared(preparators).await
    }
}

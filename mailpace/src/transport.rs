//! A transport that writes every message to the log instead of a mail server

use async_trait::async_trait;
use mailpace_common::{
    MimeMessage, Preparator, SimpleMessage, Transport, TransportError, delivery,
};

/// Logs each message it is handed at `INFO`
///
/// Blank MIME messages carry an `X-Mailer` header so prepared messages can be
/// told apart in the output.
#[derive(Debug, Clone)]
pub struct LogTransport {
    mailer: String,
}

impl Default for LogTransport {
    fn default() -> Self {
        Self::new(concat!("mailpace/", env!("CARGO_PKG_VERSION")))
    }
}

impl LogTransport {
    pub fn new(mailer: impl Into<String>) -> Self {
        Self {
            mailer: mailer.into(),
        }
    }

    fn log_mime(message: &MimeMessage) {
        let subject = message.header("Subject").unwrap_or_default();
        let to = message.header("To").unwrap_or_default();
        delivery!(
            level = INFO,
            to,
            subject,
            headers = message.headers().len(),
            bytes = message.body().len(),
            "Sent MIME message"
        );
    }
}

#[async_trait]
impl Transport for LogTransport {
    fn create_mime_message(&self) -> MimeMessage {
        let mut message = MimeMessage::new();
        message.set_header("X-Mailer", self.mailer.as_str());
        message
    }

    async fn send_simple(&self, messages: &[SimpleMessage]) -> Result<(), TransportError> {
        for message in messages {
            if message.to.is_empty() && message.cc.is_empty() && message.bcc.is_empty() {
                return Err(TransportError::Rejected(
                    "message has no recipients".to_string(),
                ));
            }

            delivery!(
                level = INFO,
                from = message.from.as_deref().unwrap_or_default(),
                to = ?message.to,
                subject = message.subject.as_deref().unwrap_or_default(),
                "Sent simple message"
            );
        }

        Ok(())
    }

    async fn send_mime(&self, messages: &[MimeMessage]) -> Result<(), TransportError> {
        messages.iter().for_each(Self::log_mime);
        Ok(())
    }

    async fn send_prepared(&self, preparators: &[Preparator]) -> Result<(), TransportError> {
        let mut prepared = Vec::with_capacity(preparators.len());
        for preparator in preparators {
            let mut message = self.create_mime_message();
            preparator.prepare(&mut message)?;
            prepared.push(message);
        }

        self.send_mime(&prepared).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_blank_message_names_mailer() {
        let transport = LogTransport::new("test-mailer");
        assert_eq!(
            transport.create_mime_message().header("x-mailer"),
            Some("test-mailer")
        );
    }

    #[tokio::test]
    async fn test_simple_message_needs_recipient() {
        let transport = LogTransport::default();
        let message = SimpleMessage {
            subject: Some("Nobody".to_string()),
            ..Default::default()
        };

        let err = transport.send_simple(&[message]).await.unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_preparator_failure_is_returned() {
        let transport = LogTransport::default();
        let ok = Preparator::new(|message| {
            message.set_header("Subject", "fine");
            Ok(())
        });
        let failing =
            Preparator::new(|_| Err(TransportError::Preparation("template missing".to_string())));

        assert!(transport.send_prepared(&[ok.clone()]).await.is_ok());
        let err = transport.send_prepared(&[ok, failing]).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Message preparation failed: template missing"
        );
    }
}

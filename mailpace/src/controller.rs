use std::{path::Path, sync::Arc, time::Duration};

use mailpace_common::{Transport, internal};
use mailpace_queue::{Messages, RateLimitedSender, ThrottleConfig};
use serde::Deserialize;
use tokio::signal::unix::{SignalKind, signal};

use crate::{outbox, transport::LogTransport};

/// How often to check whether the throttle has drained
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Top-level configuration, read from `mailpace.config.ron`
///
/// # Examples
///
/// ```ron
/// Mailpace(
///     throttle: (
///         enabled: true,
///         batch_size: 20,
///         cooldown_millis: 20000,
///     ),
/// )
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Mailpace {
    #[serde(alias = "throttling", default)]
    throttle: ThrottleConfig,
}

async fn shutdown_signal() -> anyhow::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            internal!(level = INFO, "CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    }

    Ok(())
}

async fn drained<T: Transport + ?Sized>(sender: &RateLimitedSender<T>) {
    while sender.queued() > 0 {
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}

impl Mailpace {
    pub const fn throttle(&self) -> &ThrottleConfig {
        &self.throttle
    }

    /// Send every outbox through a [`LogTransport`]
    ///
    /// # Errors
    ///
    /// Fails if an outbox cannot be loaded, or for any error described in
    /// [`deliver`](Self::deliver).
    pub async fn run<P: AsRef<Path>>(self, outboxes: &[P]) -> anyhow::Result<()> {
        internal!("Controller running");

        let submissions = outbox::load_all(outboxes).await?;
        self.deliver(Arc::new(LogTransport::default()), submissions)
            .await
    }

    /// Hand `submissions` to `transport`, throttled if configured
    ///
    /// With throttling enabled this returns once every batch has been
    /// dispatched, or early on CTRL+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// - Without throttling, the first transport error
    /// - With throttling, a submission that could not be queued, or batches
    ///   still pending when a shutdown signal arrived
    pub async fn deliver<T: Transport + 'static>(
        &self,
        transport: Arc<T>,
        submissions: Vec<Messages>,
    ) -> anyhow::Result<()> {
        if !self.throttle.enabled {
            internal!(
                level = INFO,
                "Throttling disabled, sending {} submissions directly",
                submissions.len()
            );

            for messages in &submissions {
                messages.send(transport.as_ref()).await?;
            }
            return Ok(());
        }

        let sender = RateLimitedSender::new(transport, &self.throttle);
        for messages in submissions {
            sender.submit(messages)?;
        }

        tokio::select! {
            () = drained(&sender) => {
                internal!(level = INFO, "All batches dispatched");
            }
            result = shutdown_signal() => {
                result?;
            }
        }

        internal!("Shutting down...");
        sender.shutdown().await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use async_trait::async_trait;
    use mailpace_common::{
        MimeMessage, Preparator, RepresentationKind, SimpleMessage, TransportError,
    };
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    use super::*;

    struct Recorder {
        start: Instant,
        calls: Mutex<Vec<(u128, RepresentationKind, usize)>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                start: Instant::now(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn record(&self, kind: RepresentationKind, size: usize) {
            self.calls
                .lock()
                .push((self.start.elapsed().as_millis(), kind, size));
        }
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send_simple(&self, messages: &[SimpleMessage]) -> Result<(), TransportError> {
            self.record(RepresentationKind::Simple, messages.len());
            Ok(())
        }

        async fn send_mime(&self, messages: &[MimeMessage]) -> Result<(), TransportError> {
            self.record(RepresentationKind::Mime, messages.len());
            Ok(())
        }

        async fn send_prepared(&self, preparators: &[Preparator]) -> Result<(), TransportError> {
            self.record(RepresentationKind::Preparator, preparators.len());
            Ok(())
        }
    }

    fn submissions() -> Vec<Messages> {
        vec![
            Messages::from(vec![SimpleMessage::default(); 3]),
            Messages::from(MimeMessage::new()),
        ]
    }

    #[test]
    fn test_config_parses() {
        let config: Mailpace =
            ron::from_str("Mailpace(throttle: (enabled: true, cooldown_millis: 500))").unwrap();

        assert!(config.throttle().enabled);
        assert_eq!(config.throttle().batch_size.get(), 20);
        assert_eq!(config.throttle().cooldown(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_throttle_uses_defaults() {
        let config: Mailpace = ron::from_str("()").unwrap();
        assert_eq!(config.throttle(), &ThrottleConfig::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_throttle_sends_directly() {
        let recorder = Recorder::new();
        let config = Mailpace::default();

        config
            .deliver(recorder.clone(), submissions())
            .await
            .unwrap();

        assert_eq!(
            *recorder.calls.lock(),
            vec![
                (0, RepresentationKind::Simple, 3),
                (0, RepresentationKind::Mime, 1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabled_throttle_paces_batches() {
        let recorder = Recorder::new();
        let config: Mailpace =
            ron::from_str("(throttle: (enabled: true, batch_size: 2, cooldown_millis: 500))")
                .unwrap();

        config
            .deliver(recorder.clone(), submissions())
            .await
            .unwrap();

        assert_eq!(
            *recorder.calls.lock(),
            vec![
                (0, RepresentationKind::Simple, 2),
                (500, RepresentationKind::Simple, 1),
                (1_000, RepresentationKind::Mime, 1),
            ]
        );
    }
}

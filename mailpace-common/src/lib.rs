pub mod error;
pub mod logging;
pub mod message;
pub mod transport;

pub use error::TransportError;
pub use message::{MimeMessage, Outgoing, Preparator, RepresentationKind, SimpleMessage};
pub use tracing;
pub use transport::Transport;

/// Broadcast to long-running workers when they should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}

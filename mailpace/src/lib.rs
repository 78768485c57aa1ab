pub mod controller;
pub mod outbox;
pub mod transport;

pub use controller::Mailpace;
pub use transport::LogTransport;

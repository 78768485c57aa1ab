//! Rate-limited batch dispatch for outbound mail
//!
//! Submissions are split into batches of at most `batch_size` messages, each
//! batch is given an eligibility time spaced `cooldown` after the previous
//! one, and a single consumer hands batches to the wrapped [`Transport`] in
//! time order once they become eligible.
//!
//! [`Transport`]: mailpace_common::Transport

pub mod batch;
pub mod clock;
pub mod config;
pub mod consumer;
pub mod error;
pub mod queue;
pub mod sender;

pub use batch::{Batch, Messages};
pub use clock::Clock;
pub use config::ThrottleConfig;
pub use consumer::BatchConsumer;
pub use error::QueueError;
pub use queue::DispatchQueue;
pub use sender::RateLimitedSender;

use std::{num::NonZeroUsize, time::Duration};

use serde::Deserialize;

const fn default_batch_size() -> NonZeroUsize {
    match NonZeroUsize::new(20) {
        Some(size) => size,
        None => NonZeroUsize::MIN,
    }
}

const fn default_cooldown_millis() -> u64 {
    20 * 1000
}

/// Throttling configuration
///
/// # Examples
///
/// ```ron
/// (
///     enabled: true,
///     batch_size: 5,
///     cooldown_millis: 60000,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThrottleConfig {
    /// Whether outbound mail goes through the throttle at all
    ///
    /// Default: `false`
    #[serde(default)]
    pub enabled: bool,

    /// Maximum number of messages handed to the transport at once
    ///
    /// Default: 20
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,

    /// Spacing between the scheduled times of consecutive batches
    ///
    /// Default: 20000 (20 seconds)
    #[serde(default = "default_cooldown_millis")]
    pub cooldown_millis: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: default_batch_size(),
            cooldown_millis: default_cooldown_millis(),
        }
    }
}

impl ThrottleConfig {
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_millis)
    }
}

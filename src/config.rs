//! Public broker configuration.
//!
//! Only transport-agnostic settings live here. The URL scheme decides which
//! transport [`create_transport`](crate::create_transport) builds.

use std::time::Duration;

/// Delay before retrying after the transport failed to open.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(15);

/// Delay before reconnecting after an established connection closed.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::ZERO;

/// Connection parameters for one [`ServiceBroker`](crate::ServiceBroker).
///
/// # Example
///
/// ```
/// use service_broker::BrokerConfig;
/// use std::time::Duration;
///
/// let config = BrokerConfig::new("ws://localhost:8080")
///     .with_retry_delay(Duration::from_secs(5));
/// assert_eq!(config.reconnect_delay, Duration::ZERO);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    // ---
    /// Broker server URL, e.g. `ws://localhost:8080`.
    pub url: String,

    /// Wait after a failed open before trying again.
    ///
    /// Default: 15 seconds
    pub retry_delay: Duration,

    /// Wait after an established connection drops before reopening.
    ///
    /// Default: immediately
    pub reconnect_delay: Duration,
}

impl BrokerConfig {
    /// Create a config for `url` with the default reconnect schedule.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_defaults() {
        // ---
        let config = BrokerConfig::new("ws://broker:1234");
        assert_eq!(config.url, "ws://broker:1234");
        assert_eq!(config.retry_delay, Duration::from_secs(15));
        assert_eq!(config.reconnect_delay, Duration::ZERO);
    }

    #[test]
    fn test_setters() {
        // ---
        let config = BrokerConfig::new("ws://broker")
            .with_retry_delay(Duration::from_millis(250))
            .with_reconnect_delay(Duration::from_secs(1));
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
    }
}

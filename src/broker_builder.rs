//! Service broker builder.
//!
//! Fluent construction of a [`ServiceBroker`] over an already-built
//! transport, with the reconnect schedule as the only tunable.

use crate::config::{DEFAULT_RECONNECT_DELAY, DEFAULT_RETRY_DELAY};
use crate::connection::ReconnectPolicy;
use crate::{BrokerConfig, Result, ServiceBroker, TransportPtr};
use std::time::Duration;

/// Builder for [`ServiceBroker`] instances.
///
/// # Examples
///
/// ## Over the in-memory transport
/// ```
/// use service_broker::{create_memory_transport, ServiceBrokerBuilder};
/// use std::time::Duration;
///
/// # async fn example() -> service_broker::Result<()> {
/// let (transport, _server) = create_memory_transport();
///
/// let broker = ServiceBrokerBuilder::new(transport)
///     .retry_delay(Duration::from_secs(1))
///     .build()?;
/// # broker.shutdown().await;
/// # Ok(())
/// # }
/// ```
///
/// ## From a config
/// ```no_run
/// use service_broker::{create_transport, BrokerConfig, ServiceBrokerBuilder};
///
/// # async fn example() -> service_broker::Result<()> {
/// let config = BrokerConfig::new("ws://localhost:8080");
/// let broker = ServiceBrokerBuilder::new(create_transport(&config)?)
///     .config(&config)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ServiceBrokerBuilder {
    // ---
    transport: TransportPtr,

    retry_delay: Option<Duration>,
    reconnect_delay: Option<Duration>,
}

impl ServiceBrokerBuilder {
    /// Create a new broker builder over `transport`.
    pub fn new(transport: TransportPtr) -> Self {
        // ---
        Self {
            transport,
            retry_delay: None,
            reconnect_delay: None,
        }
    }

    /// Take the reconnect schedule from `config`. The URL is ignored; it
    /// was already consumed when the transport was built.
    pub fn config(mut self, config: &BrokerConfig) -> Self {
        self.retry_delay = Some(config.retry_delay);
        self.reconnect_delay = Some(config.reconnect_delay);
        self
    }

    /// Set the wait after a failed open.
    ///
    /// Default: 15s.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Set the wait after an established connection drops.
    ///
    /// Default: 0.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = Some(delay);
        self
    }

    /// Build the broker and start connecting (consumes self).
    ///
    /// Must be called from within a tokio runtime; the connection task is
    /// spawned immediately.
    pub fn build(self) -> Result<ServiceBroker> {
        // ---
        let policy = ReconnectPolicy {
            retry_delay: self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY),
            reconnect_delay: self.reconnect_delay.unwrap_or(DEFAULT_RECONNECT_DELAY),
        };

        Ok(ServiceBroker::start(self.transport, policy))
    }
}

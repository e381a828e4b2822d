//! Transport implementations.
//!
//! This module provides concrete implementations of the domain-level
//! `Transport` trait. Network transports are hidden behind feature flags
//! and exposed only through constructor functions.
//!
//! Domain code must not depend on transport-specific types.

mod memory;

#[cfg(feature = "transport_websocket")]
mod websocket;

pub use memory::create_transport as create_memory_transport;
pub use memory::{MemoryBroker, MemoryPeer};

use crate::{BrokerConfig, BrokerError, Result, TransportPtr};

/// Build the transport selected by the scheme of `config.url`.
///
/// | scheme     | transport                                          |
/// |------------|----------------------------------------------------|
/// | `ws://`    | WebSocket (feature `transport_websocket`)          |
/// | `wss://`   | WebSocket over TLS (feature `transport_websocket_tls`) |
///
/// # Errors
///
/// [`BrokerError::InvalidConfig`] for any other scheme, or when the
/// transport for the scheme was not compiled in.
pub fn create_transport(config: &BrokerConfig) -> Result<TransportPtr> {
    // ---
    let url = config.url.as_str();

    if url.starts_with("ws://") {
        #[cfg(feature = "transport_websocket")]
        {
            return Ok(websocket::create_transport(url));
        }
    }

    if url.starts_with("wss://") {
        #[cfg(feature = "transport_websocket_tls")]
        {
            return Ok(websocket::create_transport(url));
        }
    }

    Err(BrokerError::InvalidConfig(format!(
        "no transport available for url {url:?}"
    )))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_unknown_scheme_is_rejected() {
        // ---
        let Err(err) = create_transport(&BrokerConfig::new("mqtt://localhost:1883")) else {
            panic!("expected InvalidConfig");
        };
        assert!(matches!(err, BrokerError::InvalidConfig(_)));
    }

    #[test]
    fn test_wss_needs_tls_feature() {
        // ---
        let res = create_transport(&BrokerConfig::new("wss://localhost:8443"));
        if cfg!(feature = "transport_websocket_tls") {
            assert!(res.is_ok());
        } else {
            assert!(matches!(res, Err(BrokerError::InvalidConfig(_))));
        }
    }

    #[cfg(feature = "transport_websocket")]
    #[test]
    fn test_ws_scheme_selects_websocket() {
        // ---
        use crate::Transport;

        let transport = create_transport(&BrokerConfig::new("ws://localhost:8080")).unwrap();
        assert_eq!(transport.describe(), "ws://localhost:8080");
    }
}

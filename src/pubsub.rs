//! Topic publish/subscribe on top of the service request channel.
//!
//! A topic `t` is the service `#t`. Publishing sends an id-less
//! `ServiceRequest` (no response solicited, delivery unacknowledged);
//! subscribing advertises `#t` with a handler that forwards the payload.
//! Nothing distinguishes a topic from a service whose name starts with `#`
//! on the wire, so real services must not use that prefix.

use crate::protocol::{Header, Message, MessageType, ServiceSelector, SERVICE, TYPE};
use crate::{Result, ServiceBroker};

const TOPIC_PREFIX: char = '#';

/// Service name carrying `topic`.
pub fn topic_service_name(topic: &str) -> String {
    format!("{TOPIC_PREFIX}{topic}")
}

impl ServiceBroker {
    /// Fire-and-forget `text` to every subscriber of `topic`.
    pub fn publish(&self, topic: &str, text: impl Into<String>) {
        // ---
        let mut header = Header::new();
        header.insert(TYPE.into(), MessageType::ServiceRequest.into());
        header.insert(
            SERVICE.into(),
            ServiceSelector::new(topic_service_name(topic)).to_value(),
        );
        let text: String = text.into();
        self.send_raw(Message::from_parts(header, Some(text)));
    }

    /// Receive the payload of every message published to `topic`.
    ///
    /// Headers are discarded; a message without payload arrives as `""`.
    ///
    /// # Errors
    ///
    /// [`BrokerError::DuplicateService`](crate::BrokerError::DuplicateService)
    /// if this endpoint already subscribes to `topic`.
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Result<()>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        // ---
        let handler = std::sync::Arc::new(handler);
        self.advertise(
            ServiceSelector::new(topic_service_name(topic)),
            move |message: Message| {
                let handler = handler.clone();
                async move { handler(message.payload.unwrap_or_default()) }
            },
        )
    }

    /// Stop receiving `topic`.
    ///
    /// # Errors
    ///
    /// [`BrokerError::UnknownService`](crate::BrokerError::UnknownService) if
    /// this endpoint does not subscribe to `topic`.
    pub fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.unadvertise(&topic_service_name(topic))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_topic_service_name() {
        // ---
        assert_eq!(topic_service_name("chat"), "#chat");
        assert_eq!(topic_service_name(""), "#");
    }
}

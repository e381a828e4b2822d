//! Service registry and inbound request dispatch.
//!
//! The registry owns the local providers, at most one per service name, in
//! registration order. Advertised providers are announced to the broker with
//! a full-state `SbAdvertiseRequest` every time the set changes; shadow
//! providers (registered with a handler only) answer requests addressed to
//! this endpoint directly and are never announced.
//!
//! Dispatch turns an inbound `ServiceRequest` into a handler invocation on
//! its own task and turns the [`HandlerOutcome`] back into a response frame
//! when the requester supplied an id.
mod handler;

pub use handler::HandlerOutcome;
pub(crate) use handler::{wrap_handler, BoxedHandler};

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

use crate::connection::ConnectionManager;
use crate::protocol::{codec, Header, Message, MessageType, ServiceSelector};
use crate::protocol::{ERROR, ID, SERVICES, TO, TYPE};
use crate::{BrokerError, Result};

/// Local registration: optional advertised selector plus handler.
struct Provider {
    advertised: Option<ServiceSelector>,
    handler: BoxedHandler,
}

/// Providers keyed by service name, in registration order.
pub(crate) struct ServiceRegistry {
    providers: IndexMap<String, Provider>,
}

impl ServiceRegistry {
    pub(crate) fn new() -> Self {
        Self {
            providers: IndexMap::new(),
        }
    }

    /// Register an advertised provider.
    ///
    /// # Errors
    ///
    /// [`BrokerError::DuplicateService`] if `selector.name` is taken; the
    /// existing provider is left untouched.
    pub(crate) fn advertise(&mut self, selector: ServiceSelector, handler: BoxedHandler) -> Result<()> {
        self.insert(
            selector.name.clone(),
            Provider {
                advertised: Some(selector),
                handler,
            },
        )
    }

    /// Register a shadow provider (local dispatch only, never announced).
    pub(crate) fn set_handler(&mut self, name: &str, handler: BoxedHandler) -> Result<()> {
        self.insert(
            name.to_string(),
            Provider {
                advertised: None,
                handler,
            },
        )
    }

    /// Remove a provider of either kind.
    ///
    /// Returns whether the removed provider was advertised.
    pub(crate) fn remove(&mut self, name: &str) -> Result<bool> {
        self.providers
            .shift_remove(name)
            .map(|provider| provider.advertised.is_some())
            .ok_or_else(|| BrokerError::UnknownService(name.to_string()))
    }

    pub(crate) fn handler(&self, name: &str) -> Option<BoxedHandler> {
        self.providers.get(name).map(|p| p.handler.clone())
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Selectors of every advertised provider, in registration order.
    pub(crate) fn advertised(&self) -> Vec<ServiceSelector> {
        self.providers
            .values()
            .filter_map(|p| p.advertised.clone())
            .collect()
    }

    /// Full-state `SbAdvertiseRequest` for the current provider set.
    pub(crate) fn advertise_request(&self) -> Message {
        let services: Vec<Value> = self
            .providers
            .values()
            .filter_map(|p| p.advertised.as_ref())
            .map(ServiceSelector::to_value)
            .collect();

        let mut header = Header::new();
        header.insert(TYPE.into(), MessageType::SbAdvertiseRequest.into());
        header.insert(SERVICES.into(), Value::Array(services));
        codec::header_only(header)
    }

    fn insert(&mut self, name: String, provider: Provider) -> Result<()> {
        if self.providers.contains_key(&name) {
            return Err(BrokerError::DuplicateService(name));
        }
        self.providers.insert(name, provider);
        Ok(())
    }
}

/// Routing fields of a response to `request`: `to` (from the request's
/// `from`, omitted when absent), `id` (echoed verbatim) and `type`.
fn routing_header(request: &Message, mut header: Header) -> Header {
    match request.from_endpoint() {
        Some(from) => {
            header.insert(TO.into(), from.clone());
        }
        None => {
            header.remove(TO);
        }
    }
    if let Some(id) = request.header.get(ID) {
        header.insert(ID.into(), id.clone());
    }
    header.insert(TYPE.into(), MessageType::ServiceResponse.into());
    header
}

/// Build the response frame for `outcome`, or `None` when the requester
/// supplied no id and therefore expects nothing on the wire.
pub(crate) fn build_response(request: &Message, outcome: HandlerOutcome) -> Option<Message> {
    if !request.expects_reply() {
        if let HandlerOutcome::Failure(err) = outcome {
            let service = request.service_name().unwrap_or_default();
            crate::log_error!("handler for {service} failed: {err}");
        }
        return None;
    }

    let response = match outcome {
        HandlerOutcome::Reply(result) => {
            Message::from_parts(routing_header(request, result.header), result.payload)
        }
        HandlerOutcome::NoReply => codec::header_only(routing_header(request, Header::new())),
        HandlerOutcome::Failure(err) => {
            let mut header = routing_header(request, Header::new());
            header.insert(ERROR.into(), Value::String(err));
            codec::header_only(header)
        }
    };
    Some(response)
}

/// Run `handler` for `request` on its own task and send the response, if any.
pub(crate) fn dispatch(connection: Arc<ConnectionManager>, handler: BoxedHandler, request: Message) {
    tokio::spawn(async move {
        let outcome = handler.call(request.clone()).await;
        if let Some(response) = build_response(&request, outcome) {
            connection.send(response);
        }
    });
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    fn noop() -> BoxedHandler {
        wrap_handler(|_msg: Message| async {})
    }

    fn request(id: Option<u64>) -> Message {
        let mut msg = Message::new()
            .with_header("type", "ServiceRequest")
            .with_header("service", json!({"name": "math"}))
            .with_header("from", "caller-1");
        if let Some(id) = id {
            msg = msg.with_header("id", id);
        }
        msg
    }

    fn services(registry: &ServiceRegistry) -> Value {
        registry.advertise_request().header["services"].clone()
    }

    #[test]
    fn test_advertise_request_lists_advertised_only() {
        // ---
        let mut registry = ServiceRegistry::new();
        registry.advertise(ServiceSelector::new("math"), noop()).unwrap();
        registry.set_handler("direct", noop()).unwrap();
        registry
            .advertise(ServiceSelector::new("tts").with_capabilities(["v2"]), noop())
            .unwrap();

        let msg = registry.advertise_request();
        assert_eq!(msg.message_type(), Some(MessageType::SbAdvertiseRequest));
        assert_eq!(
            services(&registry),
            json!([{"name": "math"}, {"name": "tts", "capabilities": ["v2"]}])
        );
        assert!(registry.contains("direct"));
    }

    #[test]
    fn test_duplicate_keeps_original() {
        // ---
        let mut registry = ServiceRegistry::new();
        registry.advertise(ServiceSelector::new("math"), noop()).unwrap();

        let err = registry
            .advertise(ServiceSelector::new("math").with_capabilities(["x"]), noop())
            .unwrap_err();
        assert!(matches!(err, BrokerError::DuplicateService(name) if name == "math"));

        let err = registry.set_handler("math", noop()).unwrap_err();
        assert!(matches!(err, BrokerError::DuplicateService(_)));

        assert_eq!(registry.advertised(), vec![ServiceSelector::new("math")]);
    }

    #[test]
    fn test_remove_keeps_order_of_the_rest() {
        // ---
        let mut registry = ServiceRegistry::new();
        for name in ["a", "b", "c"] {
            registry.advertise(ServiceSelector::new(name), noop()).unwrap();
        }
        assert!(registry.remove("b").unwrap());
        assert_eq!(services(&registry), json!([{"name": "a"}, {"name": "c"}]));

        let err = registry.remove("b").unwrap_err();
        assert!(matches!(err, BrokerError::UnknownService(name) if name == "b"));
    }

    #[test]
    fn test_reply_merges_result_header_under_routing_fields() {
        // ---
        let result = Message::text("4")
            .with_header("type", "Bogus")
            .with_header("id", 999)
            .with_header("contentType", "text/plain");

        let response = build_response(&request(Some(7)), HandlerOutcome::Reply(result)).unwrap();
        assert_eq!(response.header["contentType"], json!("text/plain"));
        assert_eq!(response.header["type"], json!("ServiceResponse"));
        assert_eq!(response.header["id"], json!(7));
        assert_eq!(response.header["to"], json!("caller-1"));
        assert_eq!(response.payload.as_deref(), Some("4"));
    }

    #[test]
    fn test_no_reply_with_id_sends_routing_only() {
        // ---
        let response = build_response(&request(Some(3)), HandlerOutcome::NoReply).unwrap();
        assert_eq!(
            Value::Object(response.header),
            json!({"to": "caller-1", "id": 3, "type": "ServiceResponse"})
        );
        assert_eq!(response.payload, None);
    }

    #[test]
    fn test_failure_with_id_sends_error() {
        // ---
        let response =
            build_response(&request(Some(3)), HandlerOutcome::Failure("boom".into())).unwrap();
        assert_eq!(response.header["error"], json!("boom"));
        assert_eq!(response.header["id"], json!(3));
    }

    #[test]
    fn test_without_id_nothing_is_sent() {
        // ---
        assert!(build_response(&request(None), HandlerOutcome::Reply(Message::text("x"))).is_none());
        assert!(build_response(&request(None), HandlerOutcome::Failure("boom".into())).is_none());
        assert!(build_response(&request(None), HandlerOutcome::NoReply).is_none());
    }

    #[test]
    fn test_missing_from_omits_to() {
        // ---
        let mut req = request(Some(1));
        req.header.remove("from");
        let result = Message::new().with_header("to", "stale");

        let response = build_response(&req, HandlerOutcome::Reply(result)).unwrap();
        assert!(!response.header.contains_key("to"));
    }
}

//! Request/response correlation.
//!
//! Every request expecting a reply gets the next [`CorrelationId`] and a
//! pending entry; the matching `ServiceResponse` / `SbStatusResponse` frame
//! resolves that entry, either with the response message or, when the frame
//! carries `error`, with [`BrokerError::Remote`].
//!
//! No timeout is applied here. A request nobody answers stays pending until
//! the broker shuts down; wrap the future in `tokio::time::timeout` if you
//! need a bound.

mod pending;

use pending::PendingRequests;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::correlation::IdGenerator;
use crate::protocol::Message;
use crate::sync::lock_ignore_poison;
use crate::{BrokerError, CorrelationId, Result};

/// Future resolving to the response of one request.
///
/// Returned synchronously by [`ServiceBroker::request`](crate::ServiceBroker::request);
/// the request frame has already been written (or buffered) by then. Dropping
/// the future does not cancel the request, the eventual response is simply
/// discarded.
#[derive(Debug)]
#[must_use = "the response is lost unless the future is awaited"]
pub struct ResponseFuture {
    id: CorrelationId,
    rx: oneshot::Receiver<Result<Message>>,
}

impl ResponseFuture {
    /// Correlation id carried by the request frame.
    pub fn id(&self) -> CorrelationId {
        self.id
    }
}

impl Future for ResponseFuture {
    type Output = Result<Message>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_closed)) => Poll::Ready(Err(BrokerError::Shutdown)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Owns id allocation and the pending-request table of one broker.
pub(crate) struct Correlator {
    ids: IdGenerator,
    pending: Mutex<PendingRequests>,
}

impl Correlator {
    pub(crate) fn new() -> Self {
        Self {
            ids: IdGenerator::new(),
            pending: Mutex::new(PendingRequests::new()),
        }
    }

    /// Allocate an id and register its pending entry.
    pub(crate) fn register(&self) -> ResponseFuture {
        let id = self.ids.next_id();
        let rx = lock_ignore_poison(&self.pending).register(id);
        ResponseFuture { id, rx }
    }

    /// Route a response frame to its pending entry.
    ///
    /// # Errors
    ///
    /// [`BrokerError::UnroutableResponse`] when the frame has no usable id or
    /// nothing is pending under it.
    pub(crate) fn resolve(&self, response: Message) -> Result<()> {
        let Some(id) = response.id() else {
            let raw = response
                .header
                .get(crate::protocol::ID)
                .map(|value| value.to_string())
                .unwrap_or_else(|| "<none>".to_string());
            return Err(BrokerError::UnroutableResponse(raw));
        };

        let outcome = match response.error() {
            Some(text) => Err(BrokerError::Remote(text)),
            None => Ok(response),
        };

        if lock_ignore_poison(&self.pending).complete(id, outcome) {
            Ok(())
        } else {
            Err(BrokerError::UnroutableResponse(id.to_string()))
        }
    }

    pub(crate) fn pending(&self) -> usize {
        lock_ignore_poison(&self.pending).len()
    }

    /// Abandon every pending request.
    pub(crate) fn close(&self) -> usize {
        lock_ignore_poison(&self.pending).close()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn response(id: u64) -> Message {
        Message::new()
            .with_header("type", "ServiceResponse")
            .with_header("id", id)
    }

    #[tokio::test]
    async fn test_out_of_order_resolution() {
        // ---
        let correlator = Correlator::new();
        let futures: Vec<_> = (0..5).map(|_| correlator.register()).collect();
        let ids: Vec<u64> = futures.iter().map(|f| f.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        for id in [4, 1, 5, 3, 2] {
            correlator
                .resolve(response(id).with_payload(format!("reply-{id}")))
                .unwrap();
        }

        for (fut, id) in futures.into_iter().zip(ids) {
            let msg = fut.await.unwrap();
            assert_eq!(msg.payload.as_deref(), Some(format!("reply-{id}").as_str()));
        }
        assert_eq!(correlator.pending(), 0);
    }

    #[tokio::test]
    async fn test_error_field_rejects() {
        // ---
        let correlator = Correlator::new();
        let fut = correlator.register();
        correlator
            .resolve(response(fut.id().get()).with_header("error", "boom"))
            .unwrap();

        let err = fut.await.unwrap_err();
        assert!(matches!(err, BrokerError::Remote(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_unknown_id_is_unroutable() {
        // ---
        let correlator = Correlator::new();
        let _fut = correlator.register();

        let err = correlator.resolve(response(99)).unwrap_err();
        assert!(matches!(err, BrokerError::UnroutableResponse(id) if id == "99"));
        assert_eq!(correlator.pending(), 1);
    }

    #[test]
    fn test_missing_id_is_unroutable() {
        // ---
        let correlator = Correlator::new();
        let err = correlator
            .resolve(Message::new().with_header("type", "ServiceResponse"))
            .unwrap_err();
        assert!(matches!(err, BrokerError::UnroutableResponse(_)));
    }

    #[tokio::test]
    async fn test_close_resolves_to_shutdown() {
        // ---
        let correlator = Correlator::new();
        let fut = correlator.register();
        assert_eq!(correlator.close(), 1);
        assert!(matches!(fut.await, Err(BrokerError::Shutdown)));
    }
}

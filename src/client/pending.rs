use crate::protocol::Message;
use crate::{CorrelationId, Result};
use std::collections::HashMap;
use tokio::sync::oneshot;

pub(crate) type ResponseSender = oneshot::Sender<Result<Message>>;

/// Tracks pending requests waiting for responses
///
/// Maps correlation ids to oneshot channels. When a response arrives the
/// entry is removed and the outcome is delivered to the waiting
/// [`ResponseFuture`](super::ResponseFuture). Entries never expire on their
/// own.
pub(super) struct PendingRequests {
    // ---
    requests: HashMap<CorrelationId, ResponseSender>,
    closed: bool,
}

impl PendingRequests {
    // ---

    /// Create a new empty pending requests tracker
    pub fn new() -> Self {
        // ---
        Self {
            requests: HashMap::new(),
            closed: false,
        }
    }

    /// Register a new pending request
    ///
    /// Returns a receiver that will be notified when the response arrives.
    /// Once closed, the receiver is already disconnected.
    pub fn register(&mut self, correlation_id: CorrelationId) -> oneshot::Receiver<Result<Message>> {
        // ---
        let (tx, rx) = oneshot::channel();
        if !self.closed {
            self.requests.insert(correlation_id, tx);
        }
        rx
    }

    /// Complete a pending request with its outcome
    ///
    /// Returns false if no request is pending under `correlation_id`.
    pub fn complete(&mut self, correlation_id: CorrelationId, outcome: Result<Message>) -> bool {
        // ---
        match self.requests.remove(&correlation_id) {
            Some(tx) => {
                // receiver may be gone if the caller dropped the future
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Drop every pending request and refuse new ones; their futures
    /// resolve to `Shutdown`.
    pub fn close(&mut self) -> usize {
        // ---
        self.closed = true;
        let count = self.requests.len();
        self.requests.clear();
        count
    }

    /// Get the number of pending requests
    pub fn len(&self) -> usize {
        // ---
        self.requests.len()
    }
}

// src/transport/memory/transport.rs

//! In-memory transport implementation.
//!
//! The client half implements [`Transport`]; the server half is handed to
//! the caller as a [`MemoryBroker`], which accepts each connection as a
//! [`MemoryPeer`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{Connection, TransportEvent};
use crate::protocol::{codec, Message};
use crate::{BrokerError, Result, Transport, TransportPtr};

struct Shared {
    accepting: AtomicBool,
    attempts: AtomicUsize,
}

/// In-memory transport.
///
/// ## Semantics
///
/// - Every `connect()` counts as an attempt, refused or not.
/// - A refused attempt, or one made after the [`MemoryBroker`] was dropped,
///   is an open failure.
/// - `connect()` completes without yielding, so by the time the test side
///   can observe a new [`MemoryPeer`] the connection is already in use.
struct MemoryTransport {
    // ---
    shared: Arc<Shared>,
    accept_tx: mpsc::UnboundedSender<MemoryPeer>,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    // ---
    fn describe(&self) -> &str {
        "memory"
    }

    async fn connect(&self) -> Result<Connection> {
        // ---
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);

        if !self.shared.accepting.load(Ordering::SeqCst) {
            return Err(BrokerError::Transport("connection refused".into()));
        }

        let (conn, frames, events) = Connection::pair();
        self.accept_tx
            .send(MemoryPeer { frames, events })
            .map_err(|_| BrokerError::Transport("memory broker is gone".into()))?;

        Ok(conn)
    }
}

/// Server side of an in-memory transport.
pub struct MemoryBroker {
    // ---
    shared: Arc<Shared>,
    accept_rx: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryBroker {
    /// Refuse (`false`) or accept (`true`, the default) future connections.
    /// Open connections are not affected.
    pub fn set_accepting(&self, accepting: bool) {
        self.shared.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Number of `connect()` calls so far, including refused ones.
    pub fn connect_attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Wait for the next accepted connection.
    ///
    /// Returns `None` once the client transport has been dropped.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }
}

/// Server end of one in-memory connection.
///
/// Dropping the peer (or calling [`close`](Self::close)) closes the
/// connection.
pub struct MemoryPeer {
    // ---
    frames: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MemoryPeer {
    /// Next raw frame written by the client, or `None` once it closed.
    pub async fn recv_frame(&mut self) -> Option<String> {
        self.frames.recv().await
    }

    /// Next frame written by the client, decoded.
    ///
    /// Frames that fail to decode are reported as `None`, like a close.
    pub async fn recv_message(&mut self) -> Option<Message> {
        let frame = self.recv_frame().await?;
        codec::decode(&frame).ok()
    }

    /// Deliver a raw frame to the client. Ignored if the client is gone.
    pub fn send_frame(&self, frame: &str) {
        let _ = self.events.send(TransportEvent::Message(frame.to_string()));
    }

    /// Encode and deliver `message` to the client.
    pub fn send_message(&self, message: &Message) -> Result<()> {
        self.send_frame(&codec::encode(message)?);
        Ok(())
    }

    /// Report a non-fatal transport error to the client.
    pub fn send_error(&self, error: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Error(error.into()));
    }

    /// Close the connection from the server side.
    pub fn close(self) {}
}

/// Create a new in-memory transport and the server side that drives it.
///
/// This transport is always available and requires no external resources.
pub fn create_transport() -> (TransportPtr, MemoryBroker) {
    // ---
    let shared = Arc::new(Shared {
        accepting: AtomicBool::new(true),
        attempts: AtomicUsize::new(0),
    });
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();

    let transport = MemoryTransport {
        shared: shared.clone(),
        accept_tx,
    };
    let broker = MemoryBroker { shared, accept_rx };

    (Arc::new(transport), broker)
}

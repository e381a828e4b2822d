// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! The broker core sees its transport as an opaque duplex channel of text
//! frames. It intentionally avoids any reference to concrete protocols or
//! client libraries; those live under `src/transport/`.
//!
//! Event mapping:
//!
//! | transport event | domain representation                         |
//! |-----------------|-----------------------------------------------|
//! | open            | [`Transport::connect`] returns `Ok`           |
//! | open failure    | [`Transport::connect`] returns `Err`          |
//! | message(text)   | [`TransportEvent::Message`]                   |
//! | error           | [`TransportEvent::Error`]                     |
//! | close           | the [`EventStream`] ends                      |
//!
//! Outbound `send(text)` is [`FrameSink::send`], which is synchronous and
//! preserves call order.
use crate::Result;
use std::sync::Arc;

use tokio::sync::mpsc;

/// Inbound transport event on an established connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One text frame.
    Message(String),

    /// Non-fatal transport error report. A fatal error is followed by the
    /// end of the event stream.
    Error(String),
}

/// Ordered, non-blocking outbound half of a connection.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: mpsc::UnboundedSender<String>,
}

impl FrameSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Hand one frame to the transport.
    ///
    /// Returns the frame back when the transport side has gone away.
    pub fn send(&self, frame: String) -> std::result::Result<(), String> {
        self.tx.send(frame).map_err(|err| err.0)
    }

    /// Whether the transport side has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Inbound half of a connection. The stream ending is the close event.
pub type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

/// An open connection handed out by [`Transport::connect`].
#[derive(Debug)]
pub struct Connection {
    pub sink: FrameSink,
    pub events: EventStream,
}

impl Connection {
    /// Build a connection plus the transport-side ends of both channels.
    ///
    /// Transports keep the returned receiver (outbound frames) and sender
    /// (inbound events); dropping the sender closes the connection.
    pub fn pair() -> (
        Self,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedSender<TransportEvent>,
    ) {
        // ---
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let conn = Self {
            sink: FrameSink::new(frame_tx),
            events: event_rx,
        };
        (conn, frame_rx, event_tx)
    }
}

/// Transport abstraction.
///
/// A `Transport` knows how to open one duplex connection to the broker. It
/// performs no handshake beyond what its underlying protocol requires and
/// applies no retry policy; reconnection is owned by the connection manager,
/// which calls [`connect`](Transport::connect) again after every failure or
/// close.
///
/// The in-memory transport serves as the reference implementation of these
/// semantics.
///
/// # Notes
///
/// This trait uses `async_trait`; the expanded documentation may show explicit
/// lifetimes and a boxed `Future`. Treat methods as normal `async fn`s.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    // ---
    /// Human readable target, used in log lines.
    fn describe(&self) -> &str;

    /// Open a new connection.
    async fn connect(&self) -> Result<Connection>;
}

/// Shared transport pointer.
///
/// `.clone()` is cheap; the connection task and the broker share one.
pub type TransportPtr = Arc<dyn Transport>;

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_sink_returns_frame_after_close() {
        // ---
        let (conn, frames, _events) = Connection::pair();
        drop(frames);

        assert!(conn.sink.is_closed());
        assert_eq!(conn.sink.send("late".into()), Err("late".to_string()));
    }

    #[tokio::test]
    async fn test_dropping_event_sender_ends_stream() {
        // ---
        let (mut conn, _frames, events) = Connection::pair();
        events.send(TransportEvent::Message("a".into())).unwrap();
        drop(events);

        assert_eq!(conn.events.recv().await, Some(TransportEvent::Message("a".into())));
        assert_eq!(conn.events.recv().await, None);
    }
}

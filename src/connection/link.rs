//! Connection state machine.
//!
//! `Link` holds everything the connection manager mutates: the lifecycle
//! state, the sink of the open connection and the outbound backlog. It does no
//! I/O waiting and owns no timers, so tests drive it transition by transition.
//!
//! ```text
//!              begin_connect            on_open
//! Disconnected ─────────────▶ Connecting ───────▶ Connected
//!      ▲                         │                   │
//!      └──── on_connect_failed ──┘                   │
//!      └──────────────── on_close / dead sink ───────┘
//! ```

use std::collections::VecDeque;

use crate::domain::FrameSink;
use crate::protocol::{codec, Message};

/// Lifecycle state of the broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport. Outbound messages are buffered.
    Disconnected,

    /// A connect attempt is in flight. Outbound messages are buffered.
    Connecting,

    /// Transport open. Outbound messages are written immediately.
    Connected,
}

/// What `Link::send` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Written,
    Buffered,
}

#[derive(Debug)]
pub(crate) struct Link {
    state: ConnectionState,
    sink: Option<FrameSink>,
    outbox: VecDeque<Message>,
}

impl Link {
    pub(crate) fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            sink: None,
            outbox: VecDeque::new(),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub(crate) fn buffered(&self) -> usize {
        self.outbox.len()
    }

    /// Disconnected → Connecting.
    pub(crate) fn begin_connect(&mut self) {
        if self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Connecting;
        }
    }

    /// Connecting → Disconnected after an open failure.
    pub(crate) fn on_connect_failed(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Disconnected;
        }
    }

    /// Install a freshly opened sink and replay the backlog in FIFO order.
    ///
    /// The transition and the replay happen in one step, so nothing sent
    /// afterwards can overtake a buffered message. Returns how many buffered
    /// messages were written.
    pub(crate) fn on_open(&mut self, sink: FrameSink) -> usize {
        self.state = ConnectionState::Connected;
        self.sink = Some(sink);

        let mut flushed = 0;
        while let Some(message) = self.outbox.pop_front() {
            match self.write(message) {
                Ok(()) => flushed += 1,
                Err(message) => {
                    // sink died mid-flush; keep the rest for the next open
                    self.outbox.push_front(message);
                    self.drop_sink();
                    break;
                }
            }
        }
        flushed
    }

    /// Any state → Disconnected. The backlog is kept.
    pub(crate) fn on_close(&mut self) {
        self.drop_sink();
    }

    /// Write when connected, buffer otherwise.
    pub(crate) fn send(&mut self, message: Message) -> Delivery {
        if self.state != ConnectionState::Connected {
            self.outbox.push_back(message);
            return Delivery::Buffered;
        }

        match self.write(message) {
            Ok(()) => Delivery::Written,
            Err(message) => {
                crate::log_warn!("transport went away while sending, buffering for replay");
                self.drop_sink();
                self.outbox.push_back(message);
                Delivery::Buffered
            }
        }
    }

    fn drop_sink(&mut self) {
        self.sink = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Encode and hand to the sink. A message that cannot be encoded is
    /// logged and dropped; one the sink refuses is handed back.
    fn write(&self, message: Message) -> Result<(), Message> {
        let Some(sink) = self.sink.as_ref() else {
            return Err(message);
        };

        let frame = match codec::encode(&message) {
            Ok(frame) => frame,
            Err(err) => {
                crate::log_error!("dropping unencodable message: {err}");
                return Ok(());
            }
        };

        crate::log_frame!(">>", message.header, message.payload.as_deref());

        match sink.send(frame) {
            Ok(()) => Ok(()),
            Err(_frame) => Err(message),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::domain::Connection;

    fn numbered(n: u64) -> Message {
        Message::new().with_header("n", n)
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_lifecycle_transitions() {
        // ---
        let mut link = Link::new();
        assert_eq!(link.state(), ConnectionState::Disconnected);

        link.begin_connect();
        assert_eq!(link.state(), ConnectionState::Connecting);

        link.on_connect_failed();
        assert_eq!(link.state(), ConnectionState::Disconnected);

        link.begin_connect();
        let (conn, _frames, _events) = Connection::pair();
        link.on_open(conn.sink);
        assert!(link.is_connected());

        link.on_close();
        assert_eq!(link.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_buffers_while_disconnected_and_flushes_fifo() {
        // ---
        let mut link = Link::new();
        assert_eq!(link.send(numbered(1)), Delivery::Buffered);
        assert_eq!(link.send(numbered(2)), Delivery::Buffered);
        link.begin_connect();
        assert_eq!(link.send(numbered(3)), Delivery::Buffered);
        assert_eq!(link.buffered(), 3);

        let (conn, mut frames, _events) = Connection::pair();
        assert_eq!(link.on_open(conn.sink), 3);
        assert_eq!(link.buffered(), 0);

        assert_eq!(link.send(numbered(4)), Delivery::Written);

        assert_eq!(
            drain(&mut frames),
            vec![r#"{"n":1}"#, r#"{"n":2}"#, r#"{"n":3}"#, r#"{"n":4}"#]
        );
    }

    #[test]
    fn test_dead_sink_buffers_for_next_open() {
        // ---
        let mut link = Link::new();
        let (conn, frames, _events) = Connection::pair();
        link.on_open(conn.sink);
        drop(frames);

        assert_eq!(link.send(numbered(1)), Delivery::Buffered);
        assert_eq!(link.state(), ConnectionState::Disconnected);
        assert_eq!(link.buffered(), 1);

        let (conn, mut frames, _events) = Connection::pair();
        link.begin_connect();
        assert_eq!(link.on_open(conn.sink), 1);
        assert_eq!(drain(&mut frames), vec![r#"{"n":1}"#]);
    }

    #[test]
    fn test_flush_into_dead_sink_keeps_backlog() {
        // ---
        let mut link = Link::new();
        link.send(numbered(1));
        link.send(numbered(2));

        let (conn, frames, _events) = Connection::pair();
        drop(frames);
        assert_eq!(link.on_open(conn.sink), 0);
        assert_eq!(link.buffered(), 2);
        assert_eq!(link.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_close_keeps_backlog() {
        // ---
        let mut link = Link::new();
        link.send(numbered(1));
        link.on_close();
        assert_eq!(link.buffered(), 1);
    }
}

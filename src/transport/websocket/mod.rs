//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! One `connect()` opens one WebSocket. Frames travel as text messages, one
//! protocol frame per WebSocket message.
//!
//! ## Concurrency model
//!
//! The socket is split in two and each half is owned by its own task:
//!
//! - the **writer** drains the connection's [`FrameSink`](crate::FrameSink)
//!   and writes each frame as a text message, in order;
//! - the **reader** forwards text messages and socket errors to the
//!   connection's event stream.
//!
//! Either task ending tears the connection down: a dead writer drops the sink
//! receiver (so the next send is buffered for replay), a dead reader drops
//! the event sender (the close event). Binary messages are ignored; pings are
//! answered by tungstenite.
//!
//! No reconnection happens here; that is the connection manager's job.

mod transport;

pub use transport::create_transport;

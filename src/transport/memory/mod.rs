// src/transport/memory/mod.rs

//! In-process transport with a scriptable server side.
//!
//! Nothing leaves the process: the client half is a regular [`Transport`],
//! the server half is a [`MemoryBroker`] handing out one [`MemoryPeer`] per
//! accepted connection. Tests use it to play the broker server frame by
//! frame.
//!
//! ## Reference behavior
//!
//! Network transports should behave like this one as far as their socket
//! allows:
//!
//! - `connect()` either fails (open failure) or returns a connection that is
//!   already open; there is no intermediate handshake.
//! - Frames arrive in send order in both directions, and none is lost while
//!   the connection is open.
//! - Closing either side ends the other side's stream.
//!
//! It does not route anything between endpoints. Whoever drives the
//! [`MemoryPeer`] decides what the "broker" answers.
//!
//! [`Transport`]: crate::Transport

mod transport;

pub use transport::{create_transport, MemoryBroker, MemoryPeer};

//! Client endpoint for a broker-mediated service protocol
//!
//! A [`ServiceBroker`] keeps one logical connection to a broker server and
//! multiplexes three things over it: calling named services (with automatic
//! request/response correlation), providing named services, and fire-and-forget
//! topic publish/subscribe. The connection is reopened forever on a fixed
//! schedule and outbound traffic is buffered while it is down.
//!
//! Frames are a single-line JSON header, optionally followed by `\n` and an
//! opaque text payload (see [`codec`]).
//!
//! ```no_run
//! use service_broker::{BrokerConfig, Message, ServiceBroker};
//!
//! # async fn example() -> service_broker::Result<()> {
//! let broker = ServiceBroker::connect(&BrokerConfig::new("ws://localhost:8080"))?;
//!
//! broker.subscribe("news", |text| println!("news: {text}"))?;
//! broker.publish("news", "hello");
//!
//! let reply = broker.request("uppercase", Message::text("hi")).await?;
//! println!("{:?}", reply.payload);
//! # Ok(())
//! # }
//! ```

mod macros;
pub(crate) use macros::{log_debug, log_error, log_frame, log_info, log_warn};

// Import all sub modules once...
mod broker;
mod broker_builder;
mod client;
mod config;
mod connection;
mod correlation;
mod domain;
mod error;
mod protocol;
mod pubsub;
mod server;
mod sync;
mod transport;

// Re-export main types
pub use broker::ServiceBroker;
pub use broker_builder::ServiceBrokerBuilder;
pub use client::ResponseFuture;
pub use config::BrokerConfig;
pub use connection::{ConnectListener, ConnectionState};
pub use server::HandlerOutcome;

pub use correlation::CorrelationId;
pub use error::{BrokerError, Result};

pub use protocol::{codec, Header, Message, MessageType, ServiceSelector};
pub use pubsub::topic_service_name;

pub use transport::{create_memory_transport, create_transport, MemoryBroker, MemoryPeer};

// --- public re-exports
pub use domain::{
    //
    Connection,
    EventStream,
    FrameSink,
    Transport,
    TransportEvent,
    TransportPtr,
};

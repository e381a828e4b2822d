use thiserror::Error;

/// Errors produced by a [`ServiceBroker`](crate::ServiceBroker).
///
/// Only a subset ever reaches API callers: `DuplicateService` and
/// `UnknownService` are returned synchronously by registration calls, and
/// `Remote` / `Shutdown` resolve a pending [`ResponseFuture`](crate::ResponseFuture).
/// The remaining variants describe inbound anomalies that the connection task
/// logs and drops.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// A provider is already registered under this service name.
    #[error("{0} provider already exists")]
    DuplicateService(String),

    /// No provider is registered under this service name.
    #[error("{0} provider does not exist")]
    UnknownService(String),

    /// The remote side answered with an `error` field.
    ///
    /// The display form is the remote message verbatim.
    #[error("{0}")]
    Remote(String),

    /// The header segment of an inbound frame is not a JSON object.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A response carried an id with no pending request.
    #[error("response received but no pending request for id {0}")]
    UnroutableResponse(String),

    /// An inbound request named a service with no local provider.
    #[error("no handler for service {0}")]
    NoProvider(String),

    /// An inbound frame with a discriminant this endpoint does not consume.
    #[error("unhandled frame type: {0}")]
    UnhandledFrame(String),

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport-level failure (connect, write).
    #[error("transport error: {0}")]
    Transport(String),

    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The broker was shut down before a response arrived.
    #[error("service broker shut down")]
    Shutdown,
}

/// Result type alias for broker operations
pub type Result<T> = std::result::Result<T, BrokerError>;

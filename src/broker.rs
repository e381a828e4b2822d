//! Service broker endpoint.
//!
//! One [`ServiceBroker`] is one logical connection to the broker server over
//! which the endpoint can call named services, provide named services, and
//! publish / subscribe to topics. Cloning is cheap; clones share the
//! connection, the pending-request table and the provider registry.

use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::{Correlator, ResponseFuture};
use crate::connection::{
    ConnectListener, ConnectionManager, ConnectionState, Delivery, FrameConsumer, ReconnectPolicy,
};
use crate::protocol::{codec, Message, MessageType, ServiceSelector};
use crate::protocol::{ID, SERVICE, TO, TYPE};
use crate::server::{self, wrap_handler, HandlerOutcome, ServiceRegistry};
use crate::sync::lock_ignore_poison;
use crate::{BrokerConfig, BrokerError, Result, ServiceBrokerBuilder, TransportPtr};

/// Client endpoint of the service broker protocol.
///
/// # Example
///
/// ```no_run
/// use service_broker::{BrokerConfig, Message, ServiceBroker, ServiceSelector};
///
/// # async fn example() -> service_broker::Result<()> {
/// let broker = ServiceBroker::connect(&BrokerConfig::new("ws://localhost:8080"))?;
///
/// broker.advertise(ServiceSelector::new("echo"), |req: Message| async move { req })?;
///
/// let reply = broker
///     .request(ServiceSelector::new("echo"), Message::text("hello"))
///     .await?;
/// assert_eq!(reply.payload.as_deref(), Some("hello"));
/// # Ok(())
/// # }
/// ```
///
/// Dropping the last handle stops the connection task, like
/// [`shutdown`](Self::shutdown) without waiting for it. Handlers and connect
/// listeners that capture a handle keep the broker alive until they are
/// removed.
#[derive(Clone)]
pub struct ServiceBroker {
    inner: Arc<Inner>,
}

struct Inner {
    connection: Arc<ConnectionManager>,
    correlator: Correlator,
    registry: Mutex<ServiceRegistry>,

    task: Mutex<Option<JoinHandle<()>>>,
    // dropping the last handle drops this sender, which also ends the task
    shutdown_tx: watch::Sender<bool>,
}

/// Inbound side handed to the connection task.
///
/// Holds the broker weakly so the task never keeps a dropped broker alive.
struct InboundRouter {
    inner: Weak<Inner>,
}

impl ServiceBroker {
    /// Create a broker over `transport` and start connecting (internal use by
    /// [`ServiceBrokerBuilder`]). Must be called within a tokio runtime.
    pub(crate) fn start(transport: TransportPtr, policy: ReconnectPolicy) -> Self {
        // ---
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connection = Arc::new(ConnectionManager::new(transport, policy));

        let inner = Arc::new(Inner {
            connection: connection.clone(),
            correlator: Correlator::new(),
            registry: Mutex::new(ServiceRegistry::new()),
            task: Mutex::new(None),
            shutdown_tx,
        });

        let router = InboundRouter {
            inner: Arc::downgrade(&inner),
        };
        let task = tokio::spawn(connection.run(router, shutdown_rx));
        *lock_ignore_poison(&inner.task) = Some(task);

        Self { inner }
    }

    /// Connect to the broker at `config.url` with the transport the URL
    /// scheme selects.
    ///
    /// # Errors
    ///
    /// [`BrokerError::InvalidConfig`] for an unsupported URL. Connection
    /// failures are not errors; they are retried in the background.
    pub fn connect(config: &BrokerConfig) -> Result<Self> {
        let transport = crate::create_transport(config)?;
        ServiceBrokerBuilder::new(transport).config(config).build()
    }

    /// Call `selector` on whichever provider the broker picks.
    pub fn request(&self, selector: impl Into<ServiceSelector>, message: Message) -> ResponseFuture {
        self.request_to(None, selector, message)
    }

    /// Call `selector` on the endpoint `endpoint_id`, or on any provider when
    /// `None` or empty.
    ///
    /// The frame is written (or buffered while disconnected) before this
    /// returns, so call order is wire order. The future resolves with the
    /// response message, or fails with [`BrokerError::Remote`] when the
    /// response carries `error`. There is no timeout.
    pub fn request_to(
        &self,
        endpoint_id: Option<&str>,
        selector: impl Into<ServiceSelector>,
        message: Message,
    ) -> ResponseFuture {
        // ---
        let selector = selector.into();
        let response = self.inner.correlator.register();

        let Message {
            mut header,
            payload,
        } = message;
        header.insert(ID.into(), Value::from(response.id().get()));
        header.insert(TYPE.into(), MessageType::ServiceRequest.into());
        header.insert(SERVICE.into(), selector.to_value());
        if let Some(endpoint_id) = endpoint_id.filter(|id| !id.is_empty()) {
            header.insert(TO.into(), Value::String(endpoint_id.to_string()));
        }

        let delivery = self.inner.connection.send(Message::from_parts(header, payload));
        if delivery == Delivery::Buffered {
            crate::log_debug!("request {} buffered until the broker is reachable", response.id());
        }
        response
    }

    /// Provide `selector.name` and announce it to the broker.
    ///
    /// The handler receives the full inbound request; its output converts into
    /// a [`HandlerOutcome`].
    ///
    /// # Errors
    ///
    /// [`BrokerError::DuplicateService`] if a provider already exists under
    /// the name; the existing provider stays in place.
    pub fn advertise<F, Fut, O>(&self, selector: ServiceSelector, handler: F) -> Result<()>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: Into<HandlerOutcome>,
    {
        // ---
        let mut registry = lock_ignore_poison(&self.inner.registry);
        registry.advertise(selector, wrap_handler(handler))?;
        self.inner.connection.send(registry.advertise_request());
        Ok(())
    }

    /// Stop providing `name` and resync the advertised set with the broker.
    ///
    /// # Errors
    ///
    /// [`BrokerError::UnknownService`] if nothing is registered under `name`.
    pub fn unadvertise(&self, name: &str) -> Result<()> {
        // ---
        let mut registry = lock_ignore_poison(&self.inner.registry);
        registry.remove(name)?;
        self.inner.connection.send(registry.advertise_request());
        Ok(())
    }

    /// Answer requests for `name` without announcing it.
    ///
    /// Useful for requests addressed to this endpoint by id.
    ///
    /// # Errors
    ///
    /// [`BrokerError::DuplicateService`] if a provider already exists under
    /// the name.
    pub fn set_service_handler<F, Fut, O>(&self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: Into<HandlerOutcome>,
    {
        lock_ignore_poison(&self.inner.registry).set_handler(name, wrap_handler(handler))
    }

    /// Send a frame as-is, without correlation.
    pub(crate) fn send_raw(&self, message: Message) {
        self.inner.connection.send(message);
    }

    /// Whether a transport is currently open.
    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Run `listener` after every successful (re)connection, and right away
    /// if the broker is connected now.
    pub fn add_connect_listener<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let listener: ConnectListener = Arc::new(listener);
        self.inner.connection.add_connect_listener(listener);
    }

    /// Number of requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.correlator.pending()
    }

    /// Number of outbound messages waiting for a connection.
    pub fn buffered_messages(&self) -> usize {
        self.inner.connection.buffered()
    }

    /// Whether a provider (advertised or not) is registered under `name`.
    pub fn has_provider(&self, name: &str) -> bool {
        lock_ignore_poison(&self.inner.registry).contains(name)
    }

    /// Selectors currently announced to the broker, in registration order.
    pub fn advertised_services(&self) -> Vec<ServiceSelector> {
        lock_ignore_poison(&self.inner.registry).advertised()
    }

    /// Stop the connection task and fail every pending request with
    /// [`BrokerError::Shutdown`]. Buffered messages are discarded with the
    /// broker.
    pub async fn shutdown(&self) {
        // ---
        let _ = self.inner.shutdown_tx.send(true);

        let task = lock_ignore_poison(&self.inner.task).take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                crate::log_error!("connection task failed: {err}");
            }
        }

        let abandoned = self.inner.correlator.close();
        if abandoned > 0 {
            crate::log_debug!("abandoned {abandoned} pending request(s) on shutdown");
        }
    }
}

impl FrameConsumer for InboundRouter {
    fn handle_frame(&self, frame: &str) -> Result<()> {
        match self.inner.upgrade() {
            Some(inner) => inner.route(frame),
            None => Err(BrokerError::Shutdown),
        }
    }
}

impl Inner {
    /// Route one inbound frame by its header discriminant.
    fn route(&self, frame: &str) -> Result<()> {
        // ---
        let message = codec::decode(frame)?;
        crate::log_frame!("<<", message.header, message.payload.as_deref());

        match message.message_type() {
            Some(MessageType::ServiceResponse) | Some(MessageType::SbStatusResponse) => {
                self.correlator.resolve(message)
            }
            Some(MessageType::ServiceRequest) => self.on_service_request(message),
            _ if message.error().is_some() => self.correlator.resolve(message),
            _ => {
                let ty = message
                    .header
                    .get(TYPE)
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "<none>".to_string());
                Err(BrokerError::UnhandledFrame(ty))
            }
        }
    }

    fn on_service_request(&self, request: Message) -> Result<()> {
        // ---
        let name = request.service_name().unwrap_or_default().to_string();

        // snapshot; the handler may mutate the registry while running
        let handler = lock_ignore_poison(&self.registry).handler(&name);

        match handler {
            Some(handler) => {
                server::dispatch(self.connection.clone(), handler, request);
                Ok(())
            }
            None => Err(BrokerError::NoProvider(name)),
        }
    }
}

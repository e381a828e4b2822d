//! Connection manager.
//!
//! Owns the one logical connection to the broker: opens it, pumps inbound
//! frames to a [`FrameConsumer`], notices failure, reconnects forever on a
//! fixed schedule and buffers outbound traffic while no transport is open.
//!
//! ## Reconnect policy
//!
//! - open failure → wait `retry_delay` (15 s by default), then retry
//! - established connection closes → wait `reconnect_delay` (0 by default)
//!
//! There is no backoff growth and no attempt limit. Transport failures never
//! surface to API callers; sends issued meanwhile are replayed on reopen.
//!
//! ## Ordering
//!
//! The backlog is flushed inside the same critical section that installs the
//! new sink, so frames sent after the open can never overtake buffered ones.
//! Connect listeners run after that flush.

mod link;

pub use link::ConnectionState;
pub(crate) use link::{Delivery, Link};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::{Connection, EventStream, TransportEvent, TransportPtr};
use crate::protocol::Message;
use crate::sync::lock_ignore_poison;
use crate::Result;

/// Callback fired on every successful (re)connection.
pub type ConnectListener = Arc<dyn Fn() + Send + Sync>;

/// Receiver of inbound frames.
///
/// Returning an error marks the frame as an anomaly; it is logged and
/// processing continues with the next frame.
pub(crate) trait FrameConsumer: Send + Sync {
    fn handle_frame(&self, frame: &str) -> Result<()>;
}

/// Fixed-interval reconnect schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReconnectPolicy {
    pub retry_delay: Duration,
    pub reconnect_delay: Duration,
}

pub(crate) struct ConnectionManager {
    transport: TransportPtr,
    policy: ReconnectPolicy,
    link: Mutex<Link>,
    listeners: Mutex<Vec<ConnectListener>>,
}

impl ConnectionManager {
    pub(crate) fn new(transport: TransportPtr, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            policy,
            link: Mutex::new(Link::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Write now if connected, otherwise queue for replay.
    pub(crate) fn send(&self, message: Message) -> Delivery {
        lock_ignore_poison(&self.link).send(message)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        lock_ignore_poison(&self.link).state()
    }

    pub(crate) fn is_connected(&self) -> bool {
        lock_ignore_poison(&self.link).is_connected()
    }

    pub(crate) fn buffered(&self) -> usize {
        lock_ignore_poison(&self.link).buffered()
    }

    /// Register a listener; fires immediately when already connected.
    pub(crate) fn add_connect_listener(&self, listener: ConnectListener) {
        let fire_now = {
            // lock order: listeners, then link (same as `open`)
            let mut listeners = lock_ignore_poison(&self.listeners);
            listeners.push(listener.clone());
            lock_ignore_poison(&self.link).is_connected()
        };

        if fire_now {
            listener();
        }
    }

    /// Connect / pump / reconnect until `shutdown` flips to `true` or its
    /// sender is dropped.
    pub(crate) async fn run<C>(
        self: Arc<Self>,
        consumer: C,
        mut shutdown: watch::Receiver<bool>,
    ) where
        C: FrameConsumer + 'static,
    {
        // ---
        let target = self.transport.describe().to_string();
        crate::log_debug!("connection task started for {target}");

        while !stop_requested(&shutdown) {
            lock_ignore_poison(&self.link).begin_connect();

            let attempt = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                res = self.transport.connect() => res,
            };

            let delay = match attempt {
                Ok(conn) => {
                    let Connection { sink, events } = conn;
                    self.open(sink);
                    crate::log_info!("connected to service broker at {target}");

                    let stopped = self.pump(events, &consumer, &mut shutdown).await;
                    lock_ignore_poison(&self.link).on_close();
                    if stopped {
                        break;
                    }

                    crate::log_error!("lost connection to service broker, reconnecting");
                    self.policy.reconnect_delay
                }
                Err(err) => {
                    lock_ignore_poison(&self.link).on_connect_failed();
                    crate::log_error!(
                        "failed to connect to service broker at {target}: {err}, retrying in {:?}",
                        self.policy.retry_delay
                    );
                    self.policy.retry_delay
                }
            };

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        lock_ignore_poison(&self.link).on_close();
        crate::log_debug!("connection task stopped for {target}");
    }

    /// Transition to Connected, replay the backlog, then notify listeners.
    fn open(&self, sink: crate::domain::FrameSink) {
        let snapshot: Vec<ConnectListener> = {
            let listeners = lock_ignore_poison(&self.listeners);
            let flushed = lock_ignore_poison(&self.link).on_open(sink);
            if flushed > 0 {
                crate::log_debug!("replayed {flushed} buffered message(s)");
            }
            listeners.clone()
        };

        for listener in snapshot {
            listener();
        }
    }

    /// Feed inbound frames to the consumer until the transport closes.
    ///
    /// Returns `true` when stopped by shutdown rather than by the transport.
    async fn pump<C>(
        &self,
        mut events: EventStream,
        consumer: &C,
        shutdown: &mut watch::Receiver<bool>,
    ) -> bool
    where
        C: FrameConsumer + ?Sized,
    {
        // ---
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.changed() => return true,
                event = events.recv() => event,
            };

            match event {
                Some(TransportEvent::Message(frame)) => {
                    if let Err(err) = consumer.handle_frame(&frame) {
                        crate::log_warn!("{err}");
                    }
                }
                Some(TransportEvent::Error(err)) => {
                    crate::log_error!("transport error: {err}");
                }
                None => return false,
            }
        }
    }
}

/// Stop flag set, or the owning broker is gone.
fn stop_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

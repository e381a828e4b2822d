use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::domain::{Connection, TransportEvent};
use crate::{BrokerError, Result, Transport, TransportPtr};

struct WebSocketTransport {
    // ---
    url: String,
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    // ---
    fn describe(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<Connection> {
        // ---
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|err| BrokerError::Transport(format!("websocket connect failed: {err}")))?;

        let (mut write, mut read) = ws_stream.split();
        let (conn, mut frames, events) = Connection::pair();

        tokio::spawn(async move {
            // ---
            while let Some(frame) = frames.recv().await {
                if let Err(err) = write.send(WsMessage::Text(frame.into())).await {
                    crate::log_debug!("websocket write failed: {err}");
                    return;
                }
            }
            // sink dropped: the link gave up on this connection
            let _ = write.close().await;
        });

        tokio::spawn(async move {
            // ---
            forward_inbound(&mut read, &events).await;
        });

        Ok(conn)
    }
}

async fn forward_inbound<S>(read: &mut S, events: &mpsc::UnboundedSender<TransportEvent>)
where
    S: futures_util::Stream<Item = std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    // ---
    while let Some(item) = read.next().await {
        let event = match item {
            Ok(WsMessage::Text(text)) => TransportEvent::Message(text.as_str().to_owned()),
            Ok(WsMessage::Close(_)) => return,
            Ok(WsMessage::Binary(_)) => {
                crate::log_debug!("ignoring binary websocket message");
                continue;
            }
            Ok(_) => continue,
            Err(err) => {
                let _ = events.send(TransportEvent::Error(err.to_string()));
                return;
            }
        };

        if events.send(event).is_err() {
            // connection already abandoned
            return;
        }
    }
}

/// Create a WebSocket transport for `url`.
pub fn create_transport(url: &str) -> TransportPtr {
    // ---
    Arc::new(WebSocketTransport {
        url: url.to_string(),
    })
}

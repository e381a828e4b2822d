//! Echo service and a topic, served by the same endpoint over the in-memory
//! transport. A small loopback task stands in for the broker server: every
//! request is routed back to this endpoint, every response back to the
//! caller.

use service_broker::{
    create_memory_transport, BrokerError, Message, MessageType, MemoryPeer, Result,
    ServiceBrokerBuilder, ServiceSelector,
};
use tokio::sync::mpsc;

async fn loopback(mut peer: MemoryPeer) -> Result<()> {
    // ---
    while let Some(message) = peer.recv_message().await {
        match message.message_type() {
            Some(MessageType::ServiceRequest) => {
                peer.send_message(&message.with_header("from", "loopback"))?;
            }
            Some(MessageType::ServiceResponse) => peer.send_message(&message)?,
            Some(MessageType::SbAdvertiseRequest) => {
                println!("advertised: {}", message.header["services"]);
            }
            _ => {}
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let (transport, mut server) = create_memory_transport();
    let broker = ServiceBrokerBuilder::new(transport).build()?;

    let peer = server
        .accept()
        .await
        .ok_or_else(|| BrokerError::Transport("memory server closed".into()))?;
    let router = tokio::spawn(loopback(peer));

    broker.advertise(ServiceSelector::new("echo"), |req: Message| async move {
        Message::text(req.payload.unwrap_or_default().to_uppercase())
    })?;

    let reply = broker.request("echo", Message::text("hello")).await?;
    println!("echo replied {:?}", reply.payload_str());

    let (tx, mut rx) = mpsc::unbounded_channel();
    broker.subscribe("news", move |text| {
        let _ = tx.send(text);
    })?;
    broker.publish("news", "it works");
    println!("news: {:?}", rx.recv().await);

    broker.shutdown().await;
    router.abort();
    Ok(())
}

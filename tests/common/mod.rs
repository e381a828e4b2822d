// tests/common/mod.rs

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Once;
use tokio::time::{timeout, Duration};

use service_broker::{
    //
    create_memory_transport,
    Message,
    MemoryBroker,
    MemoryPeer,
    ServiceBroker,
    ServiceBrokerBuilder,
};

static INIT: Once = Once::new();

/// Opt-in test logging: `RUST_LOG=service_broker=debug cargo test`.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A broker already connected to the in-memory server.
pub async fn connected() -> (ServiceBroker, MemoryBroker, MemoryPeer) {
    // ---
    init_logging();

    let (transport, mut server) = create_memory_transport();
    let broker = ServiceBrokerBuilder::new(transport)
        .build()
        .expect("build broker");
    let peer = server.accept().await.expect("first connection");

    assert!(broker.is_connected());
    (broker, server, peer)
}

/// Next decoded frame the broker wrote, failing the test after a second.
pub async fn next_message(peer: &mut MemoryPeer) -> Message {
    timeout(Duration::from_secs(1), peer.recv_message())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection closed")
}

/// Assert the broker writes nothing for a while.
pub async fn assert_silent(peer: &mut MemoryPeer) {
    let res = timeout(Duration::from_millis(50), peer.recv_frame()).await;
    assert!(res.is_err(), "unexpected frame: {res:?}");
}

/// Route a request the broker sent back to it, as the broker server would
/// when this endpoint is the chosen provider.
pub fn deliver_from(peer: &MemoryPeer, request: &Message, from: &str) {
    let delivered = request.clone().with_header("from", from);
    peer.send_message(&delivered).expect("encode");
}

/// The `services` list of an `SbAdvertiseRequest`.
pub fn services(message: &Message) -> Value {
    assert_eq!(message.header["type"], json!("SbAdvertiseRequest"));
    message.header["services"].clone()
}

/// Names of every `{"name": ..}` in `names`, as the JSON the broker sees.
pub fn named(names: &[&str]) -> Value {
    Value::Array(names.iter().map(|name| json!({ "name": name })).collect())
}

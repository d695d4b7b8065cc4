//! End-to-end relay tests over real WebSocket connections

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use relay_hub::{RelayHub, RelayServer, ServerConfig};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    hub: Arc<RelayHub>,
    _shutdown: oneshot::Sender<()>,
}

async fn start(config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = RelayServer::new(config);
    let hub = Arc::clone(server.hub());
    let (shutdown, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let _ = server
            .serve(listener, async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    TestServer {
        addr,
        hub,
        _shutdown: shutdown,
    }
}

async fn connect(server: &TestServer) -> Client {
    let (ws, _) = connect_async(format!("ws://{}", server.addr)).await.unwrap();
    ws
}

async fn send_json(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string())).await.unwrap();
}

async fn next_message(client: &mut Client) -> Message {
    timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for message")
        .expect("connection ended")
        .expect("websocket error")
}

async fn next_json(client: &mut Client) -> Value {
    match next_message(client).await {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected text frame, got {:?}", other),
    }
}

async fn expect_silence(client: &mut Client) {
    assert_err!(timeout(Duration::from_millis(200), client.next()).await);
}

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

async fn register_producer(server: &TestServer, client: &mut Client) {
    let replaced = server.hub.stats().await.producers_replaced;
    let had_producer = server.hub.stats().await.producer_active;
    send_json(client, json!({"type": "streamer"})).await;

    let hub = Arc::clone(&server.hub);
    eventually(|| {
        let hub = Arc::clone(&hub);
        async move {
            let stats = hub.stats().await;
            stats.producer_active
                && (!had_producer || stats.producers_replaced > replaced)
        }
    })
    .await;
}

async fn register_consumer(server: &TestServer, client: &mut Client) {
    let before = server.hub.stats().await.consumer_count;
    send_json(client, json!({"type": "viewer"})).await;

    let hub = Arc::clone(&server.hub);
    eventually(|| {
        let hub = Arc::clone(&hub);
        async move { hub.stats().await.consumer_count > before }
    })
    .await;
}

#[tokio::test]
async fn test_stream_lifecycle() {
    let server = start(ServerConfig::default()).await;

    let mut a = connect(&server).await;
    register_producer(&server, &mut a).await;

    let mut b = connect(&server).await;
    register_consumer(&server, &mut b).await;

    a.send(Message::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF]))
        .await
        .unwrap();

    // Nothing precedes the frame: no no-stream while a producer exists
    assert_eq!(
        next_message(&mut b).await,
        Message::Binary(vec![0xDE, 0xAD, 0xBE, 0xEF])
    );

    a.close(None).await.unwrap();
    assert_eq!(next_json(&mut b).await, json!({"type": "end-stream"}));
    expect_silence(&mut b).await;

    let stats = server.hub.stats().await;
    assert!(!stats.producer_active);
    assert_eq!(stats.consumer_count, 1);
}

#[tokio::test]
async fn test_viewer_without_stream() {
    let server = start(ServerConfig::default()).await;

    let mut c = connect(&server).await;
    send_json(&mut c, json!({"type": "viewer"})).await;

    assert_eq!(next_json(&mut c).await, json!({"type": "no-stream"}));
    expect_silence(&mut c).await;

    // Frames from a later producer arrive without a repeated no-stream
    let mut a = connect(&server).await;
    register_producer(&server, &mut a).await;
    a.send(Message::Binary(vec![1, 2, 3])).await.unwrap();

    assert_eq!(next_message(&mut c).await, Message::Binary(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_producer_replaced() {
    let server = start(ServerConfig::default()).await;

    let mut a = connect(&server).await;
    register_producer(&server, &mut a).await;

    let mut viewer = connect(&server).await;
    register_consumer(&server, &mut viewer).await;

    let mut d = connect(&server).await;
    register_producer(&server, &mut d).await;

    assert_eq!(
        next_json(&mut a).await,
        json!({"type": "disconnect", "reason": "replaced"})
    );
    match timeout(Duration::from_secs(2), a.next()).await.unwrap() {
        Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {}
        other => panic!("expected close, got {:?}", other),
    }

    // The evicted producer's close does not end the stream
    expect_silence(&mut viewer).await;

    d.send(Message::Binary(vec![0x42])).await.unwrap();
    assert_eq!(next_message(&mut viewer).await, Message::Binary(vec![0x42]));

    let stats = server.hub.stats().await;
    assert!(stats.producer_active);
    assert_eq!(stats.producers_replaced, 1);
}

#[tokio::test]
async fn test_broadcast_to_every_consumer() {
    let server = start(ServerConfig::default()).await;

    let mut producer = connect(&server).await;
    register_producer(&server, &mut producer).await;

    let mut viewers = Vec::new();
    for _ in 0..3 {
        let mut viewer = connect(&server).await;
        register_consumer(&server, &mut viewer).await;
        viewers.push(viewer);
    }
    let mut bystander = connect(&server).await;

    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    producer
        .send(Message::Binary(payload.clone()))
        .await
        .unwrap();

    for viewer in &mut viewers {
        assert_eq!(next_message(viewer).await, Message::Binary(payload.clone()));
    }
    expect_silence(&mut bystander).await;
    expect_silence(&mut producer).await;
}

#[tokio::test]
async fn test_departed_consumer_does_not_block_others() {
    let server = start(ServerConfig::default()).await;

    let mut producer = connect(&server).await;
    register_producer(&server, &mut producer).await;

    let mut leaving = connect(&server).await;
    register_consumer(&server, &mut leaving).await;
    let mut staying = connect(&server).await;
    register_consumer(&server, &mut staying).await;

    drop(leaving);

    for i in 0..5u8 {
        producer.send(Message::Binary(vec![i])).await.unwrap();
    }
    for i in 0..5u8 {
        assert_eq!(next_message(&mut staying).await, Message::Binary(vec![i]));
    }

    let hub = Arc::clone(&server.hub);
    eventually(|| {
        let hub = Arc::clone(&hub);
        async move { hub.stats().await.consumer_count == 1 }
    })
    .await;
}

#[tokio::test]
async fn test_protocol_errors_keep_connection_open() {
    let server = start(ServerConfig::default()).await;

    let mut client = connect(&server).await;

    send_json(&mut client, json!({"type": "moderator"})).await;
    assert_eq!(
        next_json(&mut client).await,
        json!({"type": "error", "message": "Unknown client type"})
    );

    client
        .send(Message::Text("definitely not json".to_string()))
        .await
        .unwrap();
    assert_eq!(
        next_json(&mut client).await,
        json!({"type": "error", "message": "Invalid data format"})
    );

    client.send(Message::Binary(vec![0, 1])).await.unwrap();
    assert_eq!(
        next_json(&mut client).await,
        json!({"type": "error", "message": "Invalid data format"})
    );

    // Still usable afterwards
    send_json(&mut client, json!({"type": "viewer"})).await;
    assert_eq!(next_json(&mut client).await, json!({"type": "no-stream"}));

    send_json(&mut client, json!({"type": "streamer"})).await;
    assert_eq!(
        next_json(&mut client).await,
        json!({"type": "error", "message": "Already registered as consumer"})
    );
    assert!(!server.hub.stats().await.producer_active);
}

#[tokio::test]
async fn test_connection_limit() {
    let server = start(ServerConfig::default().max_connections(1)).await;

    let first = connect(&server).await;
    let hub = Arc::clone(&server.hub);
    eventually(|| {
        let hub = Arc::clone(&hub);
        async move { hub.stats().await.connection_count == 1 }
    })
    .await;

    assert!(connect_async(format!("ws://{}", server.addr)).await.is_err());

    drop(first);
    eventually(|| {
        let hub = Arc::clone(&hub);
        async move { hub.stats().await.connection_count == 0 }
    })
    .await;

    // Permit released once the first connection is gone
    let mut retry = None;
    for _ in 0..50 {
        if let Ok((ws, _)) = connect_async(format!("ws://{}", server.addr)).await {
            retry = Some(ws);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_ok!(retry.ok_or("no connection accepted"));
}

#[tokio::test]
async fn test_client_close_is_acknowledged() {
    let server = start(ServerConfig::default()).await;

    let mut viewer = connect(&server).await;
    send_json(&mut viewer, json!({"type": "viewer"})).await;
    assert_eq!(next_json(&mut viewer).await, json!({"type": "no-stream"}));

    viewer.close(None).await.unwrap();
    assert!(matches!(next_message(&mut viewer).await, Message::Close(_)));

    let mut producer = connect(&server).await;
    register_producer(&server, &mut producer).await;
    producer.close(None).await.unwrap();
    assert!(matches!(next_message(&mut producer).await, Message::Close(_)));
}

#[tokio::test]
async fn test_producer_transport_loss_ends_stream() {
    let server = start(ServerConfig::default()).await;

    let mut producer = connect(&server).await;
    register_producer(&server, &mut producer).await;

    let mut viewers = Vec::new();
    for _ in 0..2 {
        let mut viewer = connect(&server).await;
        register_consumer(&server, &mut viewer).await;
        viewers.push(viewer);
    }

    // Socket goes away without a Close frame
    drop(producer);

    for viewer in &mut viewers {
        assert_eq!(next_json(viewer).await, json!({"type": "end-stream"}));
    }
    for viewer in &mut viewers {
        expect_silence(viewer).await;
    }

    let stats = server.hub.stats().await;
    assert!(!stats.producer_active);
    assert_eq!(stats.consumer_count, 2);
}

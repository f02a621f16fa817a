//! End-to-end: a lobby surface over the real WebSocket and HTTP adapters
//!
//! A local tungstenite server plays the queue service's push channel and
//! wiremock plays its HTTP API.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use waitline_core::application::{
    lookup_spoken_number, DisplaySurface, LinkFreshness, SurfacePorts, SurfaceProfile, SurfaceView,
};
use waitline_core::domain::ServiceDate;
use waitline_core::port::speech_engine::mocks::MockSpeechEngine;
use waitline_core::port::time_provider::mocks::FixedTimeProvider;
use waitline_infra_feed::http_api::{DONE_TODAY_PATH, QUEUE_PATH};
use waitline_infra_feed::{BackoffConfig, HttpQueueApi, WsFeedChannel, WsFeedConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);
const SUBSCRIBE_FRAME: &str = r#"{"event":"GET_QUEUE_BY_DATE","data":"2024-03-02"}"#;

async fn start_push_server() -> (String, mpsc::UnboundedReceiver<WebSocketStream<TcpStream>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = accept_async(stream).await {
                if tx.send(ws).is_err() {
                    break;
                }
            }
        }
    });

    (url, rx)
}

async fn start_http_api() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUEUE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "t1", "tokenNumber": 1, "name": "Lakshmi", "type": "BOOKED",
             "status": "WAITING", "createdAt": "2024-03-01T19:00:00.000Z"},
            {"_id": "old", "tokenNumber": 40, "name": "Yesterday", "type": "WALK_IN",
             "status": "DONE", "createdAt": "2024-02-28T06:00:00.000Z"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DONE_TODAY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 3})))
        .mount(&server)
        .await;
    server
}

async fn accept(
    connections: &mut mpsc::UnboundedReceiver<WebSocketStream<TcpStream>>,
) -> WebSocketStream<TcpStream> {
    tokio::time::timeout(WAIT, connections.recv())
        .await
        .expect("surface never connected")
        .unwrap()
}

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let message = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("no frame from surface")
            .expect("surface hung up")
            .unwrap();
        if let Message::Text(text) = message {
            return text.to_string();
        }
    }
}

async fn wait_for<F>(views: &mut watch::Receiver<SurfaceView>, f: F) -> SurfaceView
where
    F: Fn(&SurfaceView) -> bool,
{
    tokio::time::timeout(WAIT, views.wait_for(|v| f(v)))
        .await
        .expect("timed out waiting for view")
        .expect("surface stopped")
        .clone()
}

#[tokio::test]
async fn test_lobby_over_real_adapters() {
    let (feed_url, mut connections) = start_push_server().await;
    let http = start_http_api().await;
    let speech = MockSpeechEngine::new_auto_complete();

    let date: ServiceDate = "2024-03-02".parse().unwrap();
    let feed = WsFeedChannel::connect(WsFeedConfig::new(feed_url).with_backoff(BackoffConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        multiplier: 2.0,
    }));
    let ports = SurfacePorts {
        channel: Box::new(feed),
        speech: Arc::new(speech.clone()),
        api: Arc::new(HttpQueueApi::new(http.uri(), Duration::from_secs(2)).unwrap()),
        time: Arc::new(FixedTimeProvider::at("2024-03-01T20:00:00Z".parse().unwrap())),
    };
    let handle = DisplaySurface::spawn("lobby-e2e", SurfaceProfile::lobby_on(date), ports);
    let mut views = handle.watch();

    // Initial HTTP render only keeps entries from the lobby's service date
    let view = wait_for(&mut views, |v| v.served_today == Some(3)).await;
    assert_eq!(view.queue.total_count, 1);

    let mut ws = accept(&mut connections).await;
    assert_eq!(next_text(&mut ws).await, SUBSCRIBE_FRAME);
    wait_for(&mut views, |v| v.link == LinkFreshness::Live).await;

    ws.send(Message::Text(
        json!({"event": "QUEUE_UPDATE", "data": [
            {"_id": "t1", "tokenNumber": 1, "name": "Lakshmi", "type": "BOOKED",
             "status": "DONE", "createdAt": "2024-03-01T19:00:00.000Z"},
            {"_id": "t2", "tokenNumber": 7, "name": "Ravi", "type": "WALK_IN",
             "status": "IN_PROGRESS", "createdAt": "2024-03-01T19:30:00.000Z"}
        ]})
        .to_string()
        .into(),
    ))
    .await
    .unwrap();

    let live = wait_for(&mut views, |v| {
        v.queue.current.as_ref().map(|e| e.token_number) == Some(7)
    })
    .await;
    assert_eq!(live.queue.served_count, 1);
    let texts = speech.spoken_texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains(&lookup_spoken_number(7)));
    assert!(texts[0].contains("Ravi"));

    // Server goes away: last view stays up, marked stale
    drop(ws);
    let stale = wait_for(&mut views, |v| v.link == LinkFreshness::Stale).await;
    assert_eq!(stale.queue, live.queue);

    // Reconnect reissues the same scoped subscribe
    let mut ws = accept(&mut connections).await;
    assert_eq!(next_text(&mut ws).await, SUBSCRIBE_FRAME);
    let back = wait_for(&mut views, |v| v.link == LinkFreshness::Live).await;
    assert_eq!(back.queue, live.queue);
    assert_eq!(speech.spoken().len(), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reset_over_the_wire_reannounces() {
    let (feed_url, mut connections) = start_push_server().await;
    let http = start_http_api().await;
    let speech = MockSpeechEngine::new_auto_complete();

    let ports = SurfacePorts {
        channel: Box::new(WsFeedChannel::connect(WsFeedConfig::new(feed_url))),
        speech: Arc::new(speech.clone()),
        api: Arc::new(HttpQueueApi::new(http.uri(), Duration::from_secs(2)).unwrap()),
        time: Arc::new(FixedTimeProvider::at("2024-03-01T20:00:00Z".parse().unwrap())),
    };
    let handle = DisplaySurface::spawn("assistant-e2e", SurfaceProfile::assistant(), ports);
    let mut views = handle.watch();

    let mut ws = accept(&mut connections).await;
    assert_eq!(next_text(&mut ws).await, r#"{"event":"GET_QUEUE"}"#);

    let queue = json!([
        {"_id": "t5", "tokenNumber": 5, "name": "Anil", "type": "WALK_IN",
         "status": "IN_PROGRESS"}
    ]);
    for frame in [
        json!({"event": "QUEUE_UPDATE", "data": queue}),
        json!({"event": "RESET_SUCCESS", "data": {"message": "Queue reset", "queue": queue}}),
        json!({"event": "QUEUE_UPDATE", "data": []}),
    ] {
        ws.send(Message::Text(frame.to_string().into())).await.unwrap();
    }

    wait_for(&mut views, |v| {
        v.link == LinkFreshness::Live && v.queue.total_count == 0 && v.updated_at.is_some()
    })
    .await;
    assert_eq!(speech.spoken().len(), 2);

    handle.shutdown().await.unwrap();
}

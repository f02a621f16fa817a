// WebSocket feed channel
// A background task owns the socket, reconnects with backoff and forwards
// lifecycle events; the channel handle only talks to it over mpsc.
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::backoff::{BackoffConfig, ReconnectBackoff};
use crate::codec::{decode_server_frame, encode_subscribe};
use waitline_core::domain::SubscriptionScope;
use waitline_core::port::{FeedChannel, FeedError, FeedEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Time allowed for the close handshake before the task is aborted (1s)
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WsFeedConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub backoff: BackoffConfig,
}

impl WsFeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            backoff: BackoffConfig::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

/// `http://host:5000` -> `ws://host:5000/ws` (`https` -> `wss`)
pub fn derive_feed_url(server_url: &str) -> String {
    let base = server_url.trim_end_matches('/');
    let ws = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/ws", ws)
}

enum Command {
    Send(String),
    Close,
}

enum PumpEnd {
    /// Close requested or the handle went away
    Closed,
    Lost(String),
}

pub struct WsFeedChannel {
    events: mpsc::UnboundedReceiver<FeedEvent>,
    commands: mpsc::UnboundedSender<Command>,
    connected: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    closed: bool,
}

impl WsFeedChannel {
    /// Start connecting in the background; events arrive via `next_event`
    pub fn connect(config: WsFeedConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(connection_loop(
            config,
            event_tx,
            command_rx,
            Arc::clone(&connected),
        ));

        Self {
            events: event_rx,
            commands: command_tx,
            connected,
            task: Some(task),
            closed: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedChannel for WsFeedChannel {
    async fn subscribe(&mut self, scope: SubscriptionScope) -> Result<(), FeedError> {
        if self.closed {
            return Err(FeedError::Closed);
        }
        if !self.is_connected() {
            return Err(FeedError::NotConnected);
        }
        let frame = encode_subscribe(scope)?;
        self.commands
            .send(Command::Send(frame))
            .map_err(|_| FeedError::Closed)
    }

    async fn next_event(&mut self) -> Option<FeedEvent> {
        if self.closed {
            return None;
        }
        self.events.recv().await
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.commands.send(Command::Close);

        if let Some(mut task) = self.task.take() {
            if timeout(CLOSE_TIMEOUT, &mut task).await.is_err() {
                debug!("Feed task did not stop in time, aborting");
                task.abort();
            }
        }
        self.events.close();
    }
}

impl Drop for WsFeedChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn connection_loop(
    config: WsFeedConfig,
    events: mpsc::UnboundedSender<FeedEvent>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    connected: Arc<AtomicBool>,
) {
    let mut backoff =
        ReconnectBackoff::new(config.backoff.clone(), ReconnectBackoff::seed_from(&config.url));

    loop {
        match timeout(config.connect_timeout, connect_async(config.url.as_str())).await {
            Ok(Ok((ws, _))) => {
                info!(url = %config.url, "Feed connected");
                backoff.reset();
                connected.store(true, Ordering::SeqCst);
                if events.send(FeedEvent::Connected).is_err() {
                    return;
                }

                let end = pump(ws, &events, &mut commands).await;
                connected.store(false, Ordering::SeqCst);
                match end {
                    PumpEnd::Closed => return,
                    PumpEnd::Lost(reason) => {
                        warn!(url = %config.url, reason = %reason, "Feed connection lost");
                        if events.send(FeedEvent::Disconnected { reason }).is_err() {
                            return;
                        }
                    }
                }
            }
            Ok(Err(e)) => debug!(url = %config.url, error = %e, "Feed connect failed"),
            Err(_) => debug!(url = %config.url, "Feed connect timed out"),
        }

        let delay = backoff.next_delay();
        debug!(
            delay_ms = delay.as_millis() as u64,
            attempt = backoff.attempt(),
            "Reconnecting after delay"
        );
        if !wait_or_close(delay, &mut commands).await {
            return;
        }
    }
}

/// Sleep for `delay`; false if a close was requested meanwhile
async fn wait_or_close(delay: Duration, commands: &mut mpsc::UnboundedReceiver<Command>) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return true,
            command = commands.recv() => match command {
                // Subscribe requests are reissued on the next Connected
                Some(Command::Send(_)) => debug!("Dropping frame while disconnected"),
                Some(Command::Close) | None => return false,
            },
        }
    }
}

async fn pump(
    ws: WsStream,
    events: &mpsc::UnboundedSender<FeedEvent>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> PumpEnd {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => match decode_server_frame(&text) {
                    Ok(Some(push)) => {
                        if events.send(FeedEvent::Push(push)).is_err() {
                            let _ = sink.send(Message::Close(None)).await;
                            return PumpEnd::Closed;
                        }
                    }
                    Ok(None) => debug!("Ignoring unhandled feed event"),
                    Err(e) => warn!(error = %e, "Dropping undecodable frame"),
                },
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = sink.send(Message::Pong(payload)).await {
                        return PumpEnd::Lost(e.to_string());
                    }
                }
                Some(Ok(Message::Close(_))) => return PumpEnd::Lost("closed by server".to_string()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return PumpEnd::Lost(e.to_string()),
                None => return PumpEnd::Lost("stream ended".to_string()),
            },
            command = commands.recv() => match command {
                Some(Command::Send(frame)) => {
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        return PumpEnd::Lost(e.to_string());
                    }
                }
                Some(Command::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return PumpEnd::Closed;
                }
            },
        }
    }
}

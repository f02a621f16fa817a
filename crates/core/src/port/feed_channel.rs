// Feed Channel Port
// Push channel to the backend queue service. Implementations own the
// transport and its reconnect/backoff timing; callers only see lifecycle
// events.

use crate::domain::{QueueSnapshot, SubscriptionScope};
use async_trait::async_trait;
use thiserror::Error;

/// Messages pushed by the queue service
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    /// Complete queue for the active scope
    FullSnapshot(QueueSnapshot),
    /// Queue was reset to service-day start; spoken history must be cleared
    Reset {
        message: Option<String>,
        snapshot: QueueSnapshot,
    },
}

/// Lifecycle and data events surfaced by a channel
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected,
    Disconnected { reason: String },
    Push(PushMessage),
}

/// Feed channel errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Channel is not connected")]
    NotConnected,

    #[error("Channel is closed")]
    Closed,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Feed Channel trait
///
/// Implementations:
/// - WsFeedChannel: WebSocket transport with built-in reconnect backoff
/// - MockFeedChannel: test double driven by a controller
#[async_trait]
pub trait FeedChannel: Send {
    /// Issue a subscribe request on the current connection
    ///
    /// # Errors
    /// - FeedError::NotConnected if the transport is down (the request is
    ///   not queued; callers reissue on the next `Connected`)
    async fn subscribe(&mut self, scope: SubscriptionScope) -> Result<(), FeedError>;

    /// Wait for the next event. Returns None once the channel is closed.
    async fn next_event(&mut self) -> Option<FeedEvent>;

    /// Close the channel. No events are delivered afterwards.
    async fn close(&mut self);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Shared {
        connected: AtomicBool,
        closed: AtomicBool,
        subscriptions: Mutex<Vec<SubscriptionScope>>,
    }

    /// Mock channel handed to the code under test
    pub struct MockFeedChannel {
        events: mpsc::UnboundedReceiver<FeedEvent>,
        shared: Arc<Shared>,
    }

    /// Test-side handle that plays the backend
    #[derive(Clone)]
    pub struct MockFeedController {
        events: mpsc::UnboundedSender<FeedEvent>,
        shared: Arc<Shared>,
    }

    impl MockFeedChannel {
        pub fn new() -> (Self, MockFeedController) {
            let (tx, rx) = mpsc::unbounded_channel();
            let shared = Arc::new(Shared::default());
            (
                Self {
                    events: rx,
                    shared: Arc::clone(&shared),
                },
                MockFeedController { events: tx, shared },
            )
        }
    }

    impl MockFeedController {
        pub fn connect(&self) {
            self.shared.connected.store(true, Ordering::SeqCst);
            let _ = self.events.send(FeedEvent::Connected);
        }

        pub fn disconnect(&self, reason: impl Into<String>) {
            self.shared.connected.store(false, Ordering::SeqCst);
            let _ = self.events.send(FeedEvent::Disconnected {
                reason: reason.into(),
            });
        }

        pub fn push_snapshot(&self, snapshot: QueueSnapshot) {
            let _ = self
                .events
                .send(FeedEvent::Push(PushMessage::FullSnapshot(snapshot)));
        }

        pub fn push_reset(&self, snapshot: QueueSnapshot) {
            let _ = self.events.send(FeedEvent::Push(PushMessage::Reset {
                message: Some("Queue reset".to_string()),
                snapshot,
            }));
        }

        /// Subscribe requests received so far, in order
        pub fn subscriptions(&self) -> Vec<SubscriptionScope> {
            self.shared.subscriptions.lock().unwrap().clone()
        }

        pub fn is_closed(&self) -> bool {
            self.shared.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FeedChannel for MockFeedChannel {
        async fn subscribe(&mut self, scope: SubscriptionScope) -> Result<(), FeedError> {
            if self.shared.closed.load(Ordering::SeqCst) {
                return Err(FeedError::Closed);
            }
            if !self.shared.connected.load(Ordering::SeqCst) {
                return Err(FeedError::NotConnected);
            }
            self.shared.subscriptions.lock().unwrap().push(scope);
            Ok(())
        }

        async fn next_event(&mut self) -> Option<FeedEvent> {
            if self.shared.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.events.recv().await
        }

        async fn close(&mut self) {
            self.shared.closed.store(true, Ordering::SeqCst);
            self.shared.connected.store(false, Ordering::SeqCst);
            self.events.close();
        }
    }
}

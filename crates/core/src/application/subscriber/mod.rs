// Live Feed Subscriber - push-channel lifecycle for one surface

mod link_state;

pub use link_state::{LinkEvent, LinkState};

use crate::domain::{QueueSnapshot, SubscriptionScope};
use crate::port::{FeedChannel, FeedError, FeedEvent, PushMessage};
use tracing::{debug, info, warn};

/// What the owning surface has to react to
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    /// Transport is up and the current scope has been (re)requested
    Connected,
    Snapshot(QueueSnapshot),
    /// Queue was reset; the caller clears announcement history before projecting
    Reset {
        message: Option<String>,
        snapshot: QueueSnapshot,
    },
    /// Transport lost; the last snapshot stays valid but stale
    Disconnected { reason: String },
}

pub struct LiveFeedSubscriber {
    channel: Box<dyn FeedChannel>,
    scope: SubscriptionScope,
    state: LinkState,
    last_snapshot: Option<QueueSnapshot>,
}

impl LiveFeedSubscriber {
    pub fn new(channel: Box<dyn FeedChannel>, scope: SubscriptionScope) -> Self {
        Self {
            channel,
            scope,
            state: LinkState::Connecting,
            last_snapshot: None,
        }
    }

    fn apply(&mut self, event: LinkEvent) {
        let old = self.state;
        self.state = old.transition(event);
        if old != self.state {
            debug!(
                from = ?old,
                to = ?self.state,
                event = ?event,
                scope = %self.scope,
                "Link state transition"
            );
        }
    }

    /// Wait for the next update. Returns None once the channel is closed.
    pub async fn next(&mut self) -> Option<FeedUpdate> {
        if self.state.is_terminal() {
            return None;
        }

        let event = match self.channel.next_event().await {
            Some(event) => event,
            None => {
                self.apply(LinkEvent::CloseRequested);
                return None;
            }
        };

        let update = match event {
            FeedEvent::Connected => {
                self.apply(LinkEvent::ChannelUp);
                self.issue_subscribe().await;
                FeedUpdate::Connected
            }
            FeedEvent::Disconnected { reason } => {
                self.apply(LinkEvent::ChannelDown);
                warn!(scope = %self.scope, reason = %reason, "Feed disconnected");
                FeedUpdate::Disconnected { reason }
            }
            FeedEvent::Push(PushMessage::FullSnapshot(snapshot)) => {
                self.accept(&snapshot);
                FeedUpdate::Snapshot(snapshot)
            }
            FeedEvent::Push(PushMessage::Reset { message, snapshot }) => {
                info!(
                    scope = %self.scope,
                    message = message.as_deref().unwrap_or(""),
                    "Queue reset received"
                );
                self.accept(&snapshot);
                FeedUpdate::Reset { message, snapshot }
            }
        };
        Some(update)
    }

    fn accept(&mut self, snapshot: &QueueSnapshot) {
        self.apply(LinkEvent::SnapshotReceived);

        let issues = snapshot.validate();
        if !issues.is_clean() {
            warn!(
                scope = %self.scope,
                duplicate_ids = issues.duplicate_ids.len(),
                in_progress = issues.in_progress_count,
                "Snapshot violates queue invariants, using first IN_PROGRESS"
            );
        }
        self.last_snapshot = Some(snapshot.clone());
    }

    async fn issue_subscribe(&mut self) {
        match self.channel.subscribe(self.scope).await {
            Ok(()) => info!(scope = %self.scope, "Subscribed to queue feed"),
            Err(FeedError::NotConnected) => {
                debug!(scope = %self.scope, "Subscribe deferred until connected")
            }
            Err(e) => warn!(scope = %self.scope, error = %e, "Subscribe failed"),
        }
    }

    /// Switch to a new scope; reissued immediately if connected, otherwise on connect
    ///
    /// # Errors
    /// - FeedError::Closed if the subscriber has been closed
    pub async fn change_scope(&mut self, scope: SubscriptionScope) -> Result<(), FeedError> {
        if self.state.is_terminal() {
            return Err(FeedError::Closed);
        }
        if scope == self.scope {
            return Ok(());
        }

        info!(from = %self.scope, to = %scope, "Changing feed scope");
        self.scope = scope;
        self.apply(LinkEvent::ScopeChangeRequested);
        if self.state.is_connected() {
            self.issue_subscribe().await;
        }
        Ok(())
    }

    /// Close the channel; `next` returns None afterwards
    pub async fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.apply(LinkEvent::CloseRequested);
        self.channel.close().await;
    }

    pub fn scope(&self) -> SubscriptionScope {
        self.scope
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state.is_connected()
    }

    /// Most recent pushed snapshot, kept across disconnects
    pub fn last_snapshot(&self) -> Option<&QueueSnapshot> {
        self.last_snapshot.as_ref()
    }
}

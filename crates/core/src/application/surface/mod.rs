// Display Surface - one reactive unit per audience
//
// A surface task exclusively owns its subscriber, coordinator and current
// snapshot; nothing here is shared with other surfaces. Views are published
// through a watch channel and commands arrive on an mpsc channel, so no
// locks guard surface state.

pub mod constants;
mod panic_guard;
pub mod profile;
pub mod registry;
mod shutdown;

pub use panic_guard::{execute_guarded, PanicGuardResult};
pub use profile::{ScopeRule, SurfaceKind, SurfaceProfile};
pub use registry::{SurfaceId, SurfaceRegistry};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::announcement::AnnouncementCoordinator;
use crate::application::projector::{by_service_date, project, track, QueueView, TrackingLookup};
use crate::application::subscriber::{FeedUpdate, LiveFeedSubscriber};
use crate::domain::{QueueSnapshot, SubscriptionScope};
use crate::error::{AppError, Result};
use crate::port::{ApiError, FeedChannel, QueueApi, SpeechEngine, TimeProvider};
use chrono::{DateTime, Utc};
use constants::{INITIAL_FETCH_TIMEOUT, SERVED_TODAY_POLL_TIMEOUT};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::error::Elapsed;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Outcome of one served-today poll task
type ServedPoll = std::result::Result<std::result::Result<u64, ApiError>, Elapsed>;

/// Called with every snapshot a surface renders
pub type SnapshotListener = Box<dyn Fn(&QueueSnapshot) + Send + 'static>;

/// Whether the displayed data is backed by a live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFreshness {
    Live,
    /// Last known data, shown while the channel reconnects
    Stale,
}

/// Everything a display renders
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceView {
    pub surface: SurfaceId,
    pub kind: SurfaceKind,
    pub scope: SubscriptionScope,
    pub queue: QueueView,
    /// Last successful served-today count, None until the first poll succeeds
    pub served_today: Option<u64>,
    pub link: LinkFreshness,
    pub tracking: Option<TrackingLookup>,
    pub announcements_enabled: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Port bundle handed to each surface
///
/// Every surface gets its own channel and speech engine instance; cancelling
/// speech on one surface never silences another.
pub struct SurfacePorts {
    pub channel: Box<dyn FeedChannel>,
    pub speech: Arc<dyn SpeechEngine>,
    pub api: Arc<dyn QueueApi>,
    pub time: Arc<dyn TimeProvider>,
}

pub enum SurfaceCommand {
    SetAnnouncementsEnabled(bool),
    ChangeScope(SubscriptionScope),
    Announce(QueueSnapshot),
    AddListener(SnapshotListener),
}

impl std::fmt::Debug for SurfaceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceCommand::SetAnnouncementsEnabled(b) => {
                f.debug_tuple("SetAnnouncementsEnabled").field(b).finish()
            }
            SurfaceCommand::ChangeScope(s) => f.debug_tuple("ChangeScope").field(s).finish(),
            SurfaceCommand::Announce(s) => f.debug_tuple("Announce").field(&s.len()).finish(),
            SurfaceCommand::AddListener(_) => f.write_str("AddListener"),
        }
    }
}

pub struct DisplaySurface {
    id: SurfaceId,
    profile: SurfaceProfile,
    subscriber: LiveFeedSubscriber,
    coordinator: AnnouncementCoordinator,
    api: Arc<dyn QueueApi>,
    time: Arc<dyn TimeProvider>,
    snapshot: QueueSnapshot,
    served_today: Option<u64>,
    /// In-flight served-today poll; at most one at a time
    served_poll: Option<JoinHandle<ServedPoll>>,
    /// A snapshot arrived while a poll was in flight
    repoll: bool,
    updated_at: Option<DateTime<Utc>>,
    listeners: Vec<SnapshotListener>,
    commands: mpsc::UnboundedReceiver<SurfaceCommand>,
    view_tx: watch::Sender<SurfaceView>,
}

/// Caller side of a running surface
pub struct SurfaceHandle {
    id: SurfaceId,
    commands: mpsc::UnboundedSender<SurfaceCommand>,
    view: watch::Receiver<SurfaceView>,
    shutdown: ShutdownSender,
    task: JoinHandle<Result<()>>,
}

impl DisplaySurface {
    /// Build a surface; the scope is resolved against the injected clock now
    pub fn new(
        id: impl Into<SurfaceId>,
        profile: SurfaceProfile,
        ports: SurfacePorts,
    ) -> (Self, mpsc::UnboundedSender<SurfaceCommand>, watch::Receiver<SurfaceView>) {
        let id = id.into();
        let scope = profile.resolve_scope(ports.time.now_utc());
        let coordinator =
            AnnouncementCoordinator::new(ports.speech, profile.locale, profile.announcements);

        let initial = SurfaceView {
            surface: id.clone(),
            kind: profile.kind,
            scope,
            queue: QueueView::default(),
            served_today: None,
            link: LinkFreshness::Stale,
            tracking: None,
            announcements_enabled: coordinator.is_enabled(),
            updated_at: None,
        };
        let (view_tx, view_rx) = watch::channel(initial);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let surface = Self {
            id,
            subscriber: LiveFeedSubscriber::new(ports.channel, scope),
            coordinator,
            api: ports.api,
            time: ports.time,
            snapshot: QueueSnapshot::empty(),
            served_today: None,
            served_poll: None,
            repoll: false,
            updated_at: None,
            listeners: Vec::new(),
            commands: command_rx,
            view_tx,
            profile,
        };
        (surface, command_tx, view_rx)
    }

    /// Spawn the surface on the current runtime
    pub fn spawn(
        id: impl Into<SurfaceId>,
        profile: SurfaceProfile,
        ports: SurfacePorts,
    ) -> SurfaceHandle {
        let (surface, commands, view) = Self::new(id, profile, ports);
        let (shutdown, token) = shutdown_channel();
        let id = surface.id.clone();
        let task = tokio::spawn(surface.run(token));
        SurfaceHandle {
            id,
            commands,
            view,
            shutdown,
            task,
        }
    }

    /// Run until shutdown, until the feed closes, or until every handle is dropped
    pub async fn run(mut self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(
            surface = %self.id,
            kind = %self.profile.kind,
            scope = %self.subscriber.scope(),
            "Surface mounted"
        );
        self.mount().await;

        loop {
            if shutdown.is_shutdown() {
                break;
            }
            tokio::select! {
                update = self.subscriber.next() => match update {
                    Some(update) => self.handle_update(update).await,
                    None => {
                        info!(surface = %self.id, "Feed closed");
                        break;
                    }
                },
                Some(completion) = self.coordinator.next_completion() => {
                    self.coordinator.on_completion(completion);
                }
                outcome = join_poll(&mut self.served_poll) => {
                    self.served_poll = None;
                    self.on_served_today(outcome);
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!(surface = %self.id, "All handles dropped");
                        break;
                    }
                },
                _ = shutdown.wait() => break,
            }
        }

        self.teardown().await;
        Ok(())
    }

    async fn mount(&mut self) {
        match timeout(INITIAL_FETCH_TIMEOUT, self.api.fetch_queue()).await {
            Ok(Ok(snapshot)) => {
                let snapshot = match self.subscriber.scope().date() {
                    Some(date) => by_service_date(&snapshot, date, self.profile.utc_offset),
                    None => snapshot,
                };
                debug!(surface = %self.id, entries = snapshot.len(), "Initial snapshot fetched");
                self.on_snapshot(snapshot).await;
            }
            Ok(Err(e)) => {
                warn!(surface = %self.id, error = %e, "Initial queue fetch failed");
                self.request_served_today();
                self.publish();
            }
            Err(_) => {
                warn!(
                    surface = %self.id,
                    timeout_ms = INITIAL_FETCH_TIMEOUT.as_millis() as u64,
                    "Initial queue fetch timed out"
                );
                self.request_served_today();
                self.publish();
            }
        }
    }

    async fn handle_update(&mut self, update: FeedUpdate) {
        match update {
            FeedUpdate::Connected => self.publish(),
            FeedUpdate::Snapshot(snapshot) => self.on_snapshot(snapshot).await,
            FeedUpdate::Reset { snapshot, .. } => {
                self.coordinator.reset();
                self.on_snapshot(snapshot).await;
            }
            FeedUpdate::Disconnected { .. } => {
                self.coordinator.stop();
                self.publish();
            }
        }
    }

    async fn on_snapshot(&mut self, snapshot: QueueSnapshot) {
        self.snapshot = snapshot;
        self.updated_at = Some(self.time.now_utc());

        self.coordinator.announce_if_needed(&self.snapshot);
        self.notify_listeners();
        self.publish();
        self.request_served_today();
    }

    fn notify_listeners(&self) {
        for listener in &self.listeners {
            let snapshot = &self.snapshot;
            execute_guarded(&self.id, || listener(snapshot));
        }
    }

    /// Start a served-today poll in the background; coalesces while one is in flight
    fn request_served_today(&mut self) {
        if !self.profile.poll_served_today {
            return;
        }
        if self.served_poll.is_some() {
            self.repoll = true;
            return;
        }

        let api = Arc::clone(&self.api);
        self.served_poll = Some(tokio::spawn(async move {
            timeout(SERVED_TODAY_POLL_TIMEOUT, api.served_today()).await
        }));
    }

    fn on_served_today(&mut self, outcome: Option<ServedPoll>) {
        match outcome {
            Some(Ok(Ok(count))) => {
                if self.served_today != Some(count) {
                    self.served_today = Some(count);
                    self.publish();
                }
            }
            Some(Ok(Err(e))) => {
                warn!(surface = %self.id, error = %e, "Served-today poll failed, keeping last value");
            }
            Some(Err(_)) => {
                warn!(
                    surface = %self.id,
                    timeout_ms = SERVED_TODAY_POLL_TIMEOUT.as_millis() as u64,
                    "Served-today poll timed out, keeping last value"
                );
            }
            None => warn!(surface = %self.id, "Served-today poll task failed"),
        }

        if std::mem::take(&mut self.repoll) {
            self.request_served_today();
        }
    }

    async fn handle_command(&mut self, command: SurfaceCommand) {
        debug!(surface = %self.id, command = ?command, "Surface command");
        match command {
            SurfaceCommand::SetAnnouncementsEnabled(enabled) => {
                self.coordinator.set_enabled(enabled);
                self.publish();
            }
            SurfaceCommand::ChangeScope(scope) => {
                if let Err(e) = self.subscriber.change_scope(scope).await {
                    warn!(surface = %self.id, error = %e, "Scope change rejected");
                }
                self.publish();
            }
            SurfaceCommand::Announce(snapshot) => {
                self.coordinator.announce_if_needed(&snapshot);
            }
            SurfaceCommand::AddListener(listener) => self.listeners.push(listener),
        }
    }

    fn publish(&self) {
        let view = SurfaceView {
            surface: self.id.clone(),
            kind: self.profile.kind,
            scope: self.subscriber.scope(),
            queue: project(&self.snapshot, self.profile.upcoming_limit),
            served_today: self.served_today,
            link: if self.subscriber.is_live() {
                LinkFreshness::Live
            } else {
                LinkFreshness::Stale
            },
            tracking: self
                .profile
                .tracking_token
                .map(|token| track(&self.snapshot, token)),
            announcements_enabled: self.coordinator.is_enabled(),
            updated_at: self.updated_at,
        };
        self.view_tx.send_replace(view);
    }

    async fn teardown(&mut self) {
        if let Some(poll) = self.served_poll.take() {
            poll.abort();
        }
        self.subscriber.close().await;
        self.coordinator.stop();
        self.publish();
        info!(surface = %self.id, "Surface torn down");
    }
}

/// Resolve when the in-flight poll finishes; pending forever when none is running
async fn join_poll(poll: &mut Option<JoinHandle<ServedPoll>>) -> Option<ServedPoll> {
    match poll {
        Some(handle) => handle.await.ok(),
        None => std::future::pending().await,
    }
}

impl SurfaceHandle {
    pub fn id(&self) -> &SurfaceId {
        &self.id
    }

    fn send(&self, command: SurfaceCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| AppError::Internal(format!("Surface {} is no longer running", self.id)))
    }

    pub fn set_announcements_enabled(&self, enabled: bool) -> Result<()> {
        self.send(SurfaceCommand::SetAnnouncementsEnabled(enabled))
    }

    pub fn change_scope(&self, scope: SubscriptionScope) -> Result<()> {
        self.send(SurfaceCommand::ChangeScope(scope))
    }

    pub fn announce_if_needed(&self, snapshot: QueueSnapshot) -> Result<()> {
        self.send(SurfaceCommand::Announce(snapshot))
    }

    pub fn on_snapshot(&self, listener: SnapshotListener) -> Result<()> {
        self.send(SurfaceCommand::AddListener(listener))
    }

    /// Latest published view
    pub fn view(&self) -> SurfaceView {
        self.view.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SurfaceView> {
        self.view.clone()
    }

    /// Tear the surface down and wait for its task to finish
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.shutdown();
        self.task
            .await
            .map_err(|e| AppError::Internal(format!("Surface {} task failed: {}", self.id, e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntryId, EntryStatus, EntryType, QueueEntry, ServiceDate};
    use crate::port::feed_channel::mocks::{MockFeedChannel, MockFeedController};
    use crate::port::queue_api::mocks::MockQueueApi;
    use crate::port::speech_engine::mocks::MockSpeechEngine;
    use crate::port::time_provider::mocks::FixedTimeProvider;
    use crate::port::ApiError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn entry(id: &str, token: u32, status: EntryStatus) -> QueueEntry {
        QueueEntry::new(id, token, format!("Patient {}", token), EntryType::WalkIn)
            .with_status(status)
            .with_created_at("2024-03-01T19:00:00Z".parse().unwrap())
    }

    fn serving(id: &str, token: u32) -> QueueSnapshot {
        QueueSnapshot::new(vec![
            entry("w1", 10, EntryStatus::Waiting),
            entry(id, token, EntryStatus::InProgress),
        ])
    }

    struct Harness {
        feed: MockFeedController,
        speech: MockSpeechEngine,
        api: MockQueueApi,
        handle: SurfaceHandle,
    }

    fn spawn(profile: SurfaceProfile, api: MockQueueApi) -> Harness {
        let (channel, feed) = MockFeedChannel::new();
        let speech = MockSpeechEngine::new_manual();
        let ports = SurfacePorts {
            channel: Box::new(channel),
            speech: Arc::new(speech.clone()),
            api: Arc::new(api.clone()),
            time: Arc::new(FixedTimeProvider::at(
                "2024-03-01T20:00:00Z".parse().unwrap(),
            )),
        };
        let handle = DisplaySurface::spawn("surface-1", profile, ports);
        Harness {
            feed,
            speech,
            api,
            handle,
        }
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<SurfaceView>, f: F) -> SurfaceView
    where
        F: Fn(&SurfaceView) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|v| f(v)))
            .await
            .expect("timed out waiting for view")
            .expect("surface dropped")
            .clone()
    }

    #[tokio::test]
    async fn test_initial_fetch_renders_before_connect() {
        let api = MockQueueApi::new(serving("a", 3), 0);
        let h = spawn(SurfaceProfile::assistant(), api);
        let mut rx = h.handle.watch();

        let view = wait_for(&mut rx, |v| v.queue.total_count == 2).await;
        assert_eq!(view.link, LinkFreshness::Stale);
        assert_eq!(view.queue.current.unwrap().id, EntryId::new("a"));
        assert_eq!(h.speech.spoken().len(), 1);
        assert_eq!(h.api.fetch_calls(), 1);

        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_push_snapshot_announces_once() {
        let h = spawn(SurfaceProfile::assistant(), MockQueueApi::new(QueueSnapshot::empty(), 0));
        let mut rx = h.handle.watch();

        h.feed.connect();
        wait_for(&mut rx, |v| v.link == LinkFreshness::Live).await;
        assert_eq!(h.feed.subscriptions(), vec![SubscriptionScope::All]);

        h.feed.push_snapshot(serving("a", 3));
        h.feed.push_snapshot(serving("a", 3));
        h.feed.push_snapshot(serving("b", 4));
        wait_for(&mut rx, |v| {
            v.queue.current.as_ref().map(|e| e.token_number) == Some(4)
        })
        .await;

        assert_eq!(h.speech.spoken().len(), 2);
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_clears_spoken_history() {
        let h = spawn(SurfaceProfile::assistant(), MockQueueApi::new(QueueSnapshot::empty(), 0));
        let mut rx = h.handle.watch();

        h.feed.connect();
        h.feed.push_snapshot(serving("a", 3));
        h.feed.push_reset(serving("a", 3));
        h.feed.push_snapshot(QueueSnapshot::new(vec![entry("z", 99, EntryStatus::Done)]));
        wait_for(&mut rx, |v| v.queue.served_count == 1).await;

        assert_eq!(h.speech.spoken().len(), 2);
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_keeps_view_and_stops_speech() {
        let h = spawn(SurfaceProfile::assistant(), MockQueueApi::new(QueueSnapshot::empty(), 0));
        let mut rx = h.handle.watch();

        h.feed.connect();
        h.feed.push_snapshot(serving("a", 3));
        wait_for(&mut rx, |v| v.queue.total_count == 2).await;
        assert_eq!(h.speech.pending_count(), 1);

        h.feed.disconnect("network down");
        let view = wait_for(&mut rx, |v| v.link == LinkFreshness::Stale).await;
        assert_eq!(view.queue.total_count, 2);
        assert_eq!(h.speech.pending_count(), 0);

        h.feed.connect();
        wait_for(&mut rx, |v| v.link == LinkFreshness::Live).await;
        assert_eq!(h.feed.subscriptions().len(), 2);
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_lobby_filters_fetch_and_polls_served_today() {
        let api = MockQueueApi::new(
            QueueSnapshot::new(vec![
                entry("today", 1, EntryStatus::Waiting),
                QueueEntry::new("yesterday", 2, "Old", EntryType::Booked)
                    .with_created_at("2024-02-29T10:00:00Z".parse().unwrap()),
            ]),
            17,
        );
        let h = spawn(SurfaceProfile::lobby(), api);
        let mut rx = h.handle.watch();

        let view = wait_for(&mut rx, |v| v.served_today == Some(17)).await;
        assert_eq!(view.scope, SubscriptionScope::Date("2024-03-02".parse().unwrap()));
        assert_eq!(view.queue.total_count, 1);

        h.feed.connect();
        wait_for(&mut rx, |v| v.link == LinkFreshness::Live).await;
        assert_eq!(
            h.feed.subscriptions(),
            vec![SubscriptionScope::Date("2024-03-02".parse().unwrap())]
        );

        // Failed poll keeps the last good value
        h.api.set_served_today(Err(ApiError::Timeout(5000)));
        h.feed.push_snapshot(serving("a", 3));
        let view = wait_for(&mut rx, |v| v.queue.current.is_some()).await;
        assert_eq!(view.served_today, Some(17));

        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_served_today_does_not_stall_surface() {
        let api = MockQueueApi::new(serving("a", 3), 17);
        api.set_served_delay(Duration::from_secs(3600));
        let h = spawn(SurfaceProfile::lobby(), api);
        let mut rx = h.handle.watch();

        let view = wait_for(&mut rx, |v| v.queue.current.is_some()).await;
        assert_eq!(view.served_today, None);

        h.feed.connect();
        h.feed.push_snapshot(serving("b", 4));
        wait_for(&mut rx, |v| {
            v.link == LinkFreshness::Live
                && v.queue.current.as_ref().is_some_and(|e| e.token_number == 4)
        })
        .await;

        h.handle.set_announcements_enabled(false).unwrap();
        let view = wait_for(&mut rx, |v| !v.announcements_enabled).await;
        assert_eq!(view.served_today, None);
        // Polls coalesce while the first one is still outstanding
        assert!(h.api.served_calls() <= 1);

        tokio::time::timeout(Duration::from_secs(2), h.handle.shutdown())
            .await
            .expect("shutdown waited on the slow poll")
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_initial_fetch_still_mounts() {
        let h = spawn(SurfaceProfile::reception(), MockQueueApi::new_failing());
        let mut rx = h.handle.watch();

        h.feed.connect();
        h.feed.push_snapshot(serving("a", 3));
        let view = wait_for(&mut rx, |v| v.queue.total_count == 2).await;
        assert_eq!(view.queue.upcoming.len(), 1);
        assert!(h.speech.spoken().is_empty());
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_tracking_view() {
        let mut entries = vec![entry("a", 3, EntryStatus::InProgress)];
        for token in 20..27 {
            entries.push(
                entry(&format!("w{}", token), token, EntryStatus::Waiting)
                    .with_position(token - 19),
            );
        }
        let h = spawn(
            SurfaceProfile::tracking(3),
            MockQueueApi::new(QueueSnapshot::new(entries), 0),
        );
        let mut rx = h.handle.watch();

        let view = wait_for(&mut rx, |v| v.tracking.is_some()).await;
        assert!(matches!(view.tracking, Some(TrackingLookup::Found(e)) if e.token_number == 3));
        let preview: Vec<u32> = view.queue.upcoming.iter().map(|e| e.token_number).collect();
        assert_eq!(preview, vec![20, 21, 22, 23, 24]);
        assert_eq!(view.queue.waiting_count, 7);
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_toggle_and_scope_change_commands() {
        let h = spawn(SurfaceProfile::assistant(), MockQueueApi::new(QueueSnapshot::empty(), 0));
        let mut rx = h.handle.watch();
        h.feed.connect();
        wait_for(&mut rx, |v| v.link == LinkFreshness::Live).await;

        h.handle.set_announcements_enabled(false).unwrap();
        wait_for(&mut rx, |v| !v.announcements_enabled).await;
        h.feed.push_snapshot(serving("a", 3));
        wait_for(&mut rx, |v| v.queue.current.is_some()).await;
        assert!(h.speech.spoken().is_empty());

        let date: ServiceDate = "2024-03-05".parse().unwrap();
        h.handle.change_scope(SubscriptionScope::Date(date)).unwrap();
        wait_for(&mut rx, |v| v.scope == SubscriptionScope::Date(date)).await;
        assert_eq!(
            h.feed.subscriptions(),
            vec![SubscriptionScope::All, SubscriptionScope::Date(date)]
        );

        h.handle.set_announcements_enabled(true).unwrap();
        h.handle.announce_if_needed(serving("b", 4)).unwrap();
        wait_for(&mut rx, |v| v.announcements_enabled).await;
        tokio::time::timeout(Duration::from_secs(2), async {
            while h.speech.spoken().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(h.speech.spoken_texts(), vec!["టోకెన్ నంబర్ నాలుగు. Patient 4 గారు."]);

        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_listener_panic_is_isolated() {
        let h = spawn(SurfaceProfile::reception(), MockQueueApi::new(QueueSnapshot::empty(), 0));
        let mut rx = h.handle.watch();
        let calls = Arc::new(AtomicUsize::new(0));

        h.handle
            .on_snapshot(Box::new(|_| panic!("listener bug")))
            .unwrap();
        let counter = Arc::clone(&calls);
        h.handle
            .on_snapshot(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        // Commands are applied in order; once the toggle shows, both listeners are in
        h.handle.set_announcements_enabled(true).unwrap();
        wait_for(&mut rx, |v| v.announcements_enabled).await;

        h.feed.connect();
        h.feed.push_snapshot(serving("a", 3));
        h.feed.push_snapshot(serving("b", 4));
        wait_for(&mut rx, |v| {
            v.queue.current.as_ref().map(|e| e.token_number) == Some(4)
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_feed_and_silences() {
        let h = spawn(SurfaceProfile::assistant(), MockQueueApi::new(serving("a", 3), 0));
        let mut rx = h.handle.watch();
        wait_for(&mut rx, |v| v.queue.current.is_some()).await;

        let feed = h.feed.clone();
        let speech = h.speech.clone();
        h.handle.shutdown().await.unwrap();

        assert!(feed.is_closed());
        assert_eq!(speech.pending_count(), 0);
        feed.push_snapshot(serving("b", 4));
        assert_eq!(speech.spoken().len(), 1);
    }
}

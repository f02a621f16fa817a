// Link state machine for one push-channel subscription

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkState {
    /// Waiting for the first connection
    Connecting,
    Connected,
    /// Lost the connection; the channel is retrying
    Reconnecting,
    /// Connected, new scope requested, first snapshot for it not yet seen
    ScopeChanging,
    Closed,
}

// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    ChannelUp,
    ChannelDown,
    ScopeChangeRequested,
    SnapshotReceived,
    CloseRequested,
}

impl LinkState {
    // Pure function for state transitions
    pub fn transition(self, event: LinkEvent) -> LinkState {
        use LinkEvent::*;
        use LinkState::*;

        match (self, event) {
            (Closed, _) => Closed,
            (_, CloseRequested) => Closed,
            (Connecting, ChannelUp) | (Reconnecting, ChannelUp) => Connected,
            (Connected, ChannelDown) | (ScopeChanging, ChannelDown) => Reconnecting,
            (Connecting, ChannelDown) => Reconnecting,
            (Connected, ScopeChangeRequested) => ScopeChanging,
            (ScopeChanging, SnapshotReceived) => Connected,
            (s, _) => s, // no-op if event invalid in current state
        }
    }

    /// Whether a transport is currently up
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected | LinkState::ScopeChanging)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LinkState::Closed)
    }
}

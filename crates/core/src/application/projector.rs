//! View Projector - derives per-surface views from a raw snapshot
//!
//! Every function here is a pure O(n) pass over the snapshot: no hidden
//! state, no mutation. Surfaces call them on every snapshot they receive.

use crate::domain::{EntryStatus, QueueEntry, QueueSnapshot, ServiceDate, TokenNumber};
use chrono::FixedOffset;
use serde::Serialize;

/// First IN_PROGRESS entry in snapshot order
///
/// If the single-current-patient invariant is violated upstream, the first
/// match wins.
pub fn current_patient(snapshot: &QueueSnapshot) -> Option<&QueueEntry> {
    snapshot.iter().find(|e| e.status == EntryStatus::InProgress)
}

/// First `n` WAITING entries, in snapshot order
pub fn upcoming(snapshot: &QueueSnapshot, n: usize) -> Vec<QueueEntry> {
    snapshot
        .iter()
        .filter(|e| e.status == EntryStatus::Waiting)
        .take(n)
        .cloned()
        .collect()
}

/// Number of DONE entries
pub fn served_count(snapshot: &QueueSnapshot) -> usize {
    snapshot
        .iter()
        .filter(|e| e.status == EntryStatus::Done)
        .count()
}

/// Number of WAITING entries
pub fn waiting_count(snapshot: &QueueSnapshot) -> usize {
    snapshot
        .iter()
        .filter(|e| e.status == EntryStatus::Waiting)
        .count()
}

pub fn total_count(snapshot: &QueueSnapshot) -> usize {
    snapshot.len()
}

/// Entries whose creation instant, shifted by `offset`, falls on `date`
///
/// Entries without a creation timestamp cannot be bucketed and are left out.
pub fn by_service_date(
    snapshot: &QueueSnapshot,
    date: ServiceDate,
    offset: FixedOffset,
) -> QueueSnapshot {
    snapshot
        .iter()
        .filter(|e| {
            e.created_at
                .map(|at| ServiceDate::from_instant(at, offset) == date)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Derived view shared by every display surface
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueView {
    pub current: Option<QueueEntry>,
    pub upcoming: Vec<QueueEntry>,
    pub waiting_count: usize,
    pub served_count: usize,
    pub total_count: usize,
}

/// Bundle all projections for one snapshot
pub fn project(snapshot: &QueueSnapshot, upcoming_limit: usize) -> QueueView {
    QueueView {
        current: current_patient(snapshot).cloned(),
        upcoming: upcoming(snapshot, upcoming_limit),
        waiting_count: waiting_count(snapshot),
        served_count: served_count(snapshot),
        total_count: total_count(snapshot),
    }
}

/// Result of looking up a patient's token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TrackingLookup {
    Found(QueueEntry),
    /// The token does not exist in the full snapshot (user-facing)
    NotFound(TokenNumber),
}

/// Find the entry holding `token`
pub fn track(snapshot: &QueueSnapshot, token: TokenNumber) -> TrackingLookup {
    snapshot
        .iter()
        .find(|e| e.token_number == token)
        .cloned()
        .map(TrackingLookup::Found)
        .unwrap_or(TrackingLookup::NotFound(token))
}

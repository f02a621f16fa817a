// Queue Snapshot Domain Model
//
// A snapshot is authoritative and complete for its requested scope. It is
// never mutated after receipt; updates replace the whole value.

use crate::domain::entry::{EntryId, EntryStatus, QueueEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered sequence of entries (insertion order = service order)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<QueueEntry>", into = "Vec<QueueEntry>")]
pub struct QueueSnapshot {
    entries: Arc<[QueueEntry]>,
}

impl QueueSnapshot {
    pub fn new(entries: Vec<QueueEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueueEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the single-current-patient and unique-id invariants
    ///
    /// Violations are reported, never enforced: the upstream service is the
    /// system of record.
    pub fn validate(&self) -> SnapshotIssues {
        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut duplicate_ids = Vec::new();
        let mut in_progress = 0;

        for entry in self.entries.iter() {
            if !seen.insert(&entry.id) && !duplicate_ids.contains(&entry.id) {
                duplicate_ids.push(entry.id.clone());
            }
            if entry.status == EntryStatus::InProgress {
                in_progress += 1;
            }
        }

        SnapshotIssues {
            duplicate_ids,
            in_progress_count: in_progress,
        }
    }
}

impl Default for QueueSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<QueueEntry>> for QueueSnapshot {
    fn from(entries: Vec<QueueEntry>) -> Self {
        Self::new(entries)
    }
}

impl From<QueueSnapshot> for Vec<QueueEntry> {
    fn from(snapshot: QueueSnapshot) -> Self {
        snapshot.entries.to_vec()
    }
}

impl FromIterator<QueueEntry> for QueueSnapshot {
    fn from_iter<I: IntoIterator<Item = QueueEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a QueueSnapshot {
    type Item = &'a QueueEntry;
    type IntoIter = std::slice::Iter<'a, QueueEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Invariant violations found in a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotIssues {
    pub duplicate_ids: Vec<EntryId>,
    pub in_progress_count: usize,
}

impl SnapshotIssues {
    pub fn is_clean(&self) -> bool {
        self.duplicate_ids.is_empty() && self.in_progress_count <= 1
    }
}

// Queue Entry Domain Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token number (unique within a service day, assigned at registration)
pub type TokenNumber = u32;

/// Opaque visit identifier, stable across snapshots
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entry Status (WAITING -> IN_PROGRESS -> DONE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Waiting,
    InProgress,
    Done,
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Waiting => write!(f, "WAITING"),
            EntryStatus::InProgress => write!(f, "IN_PROGRESS"),
            EntryStatus::Done => write!(f, "DONE"),
        }
    }
}

/// How the patient joined the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    WalkIn,
    Booked,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::WalkIn => write!(f, "WALK_IN"),
            EntryType::Booked => write!(f, "BOOKED"),
        }
    }
}

/// One patient's queue record, as pushed by the queue service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntryId,
    pub token_number: TokenNumber,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub status: EntryStatus,

    // Server-computed, advisory
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub estimated_wait_time: u32, // minutes

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    /// Create a new WAITING entry
    ///
    /// # Arguments
    ///
    /// * `id` - Visit ID (injected, not generated)
    /// * `token_number` - Token issued at registration
    /// * `name` - Patient display name
    /// * `entry_type` - Walk-in or booked
    pub fn new(
        id: impl Into<String>,
        token_number: TokenNumber,
        name: impl Into<String>,
        entry_type: EntryType,
    ) -> Self {
        Self {
            id: EntryId::new(id),
            token_number,
            name: name.into(),
            phone: String::new(),
            entry_type,
            status: EntryStatus::Waiting,
            position: 0,
            estimated_wait_time: 0,
            created_at: None,
        }
    }

    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }

    pub fn is_waiting(&self) -> bool {
        self.status == EntryStatus::Waiting
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == EntryStatus::InProgress
    }

    pub fn is_done(&self) -> bool {
        self.status == EntryStatus::Done
    }

    /// Transition WAITING -> IN_PROGRESS
    pub fn start(&mut self) -> crate::domain::error::Result<()> {
        if self.status != EntryStatus::Waiting {
            return Err(crate::domain::error::DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: "IN_PROGRESS".to_string(),
            });
        }
        self.status = EntryStatus::InProgress;
        Ok(())
    }

    /// Transition IN_PROGRESS -> DONE
    pub fn complete(&mut self) -> crate::domain::error::Result<()> {
        if self.status != EntryStatus::InProgress {
            return Err(crate::domain::error::DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: "DONE".to_string(),
            });
        }
        self.status = EntryStatus::Done;
        Ok(())
    }
}

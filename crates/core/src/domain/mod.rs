// Domain Layer - Pure queue model and invariants

pub mod entry;
pub mod error;
pub mod service_date;
pub mod snapshot;

// Re-exports
pub use entry::{EntryId, EntryStatus, EntryType, QueueEntry, TokenNumber};
pub use error::DomainError;
pub use service_date::{
    civil_offset, default_offset, ServiceDate, SubscriptionScope, DEFAULT_UTC_OFFSET_MINUTES,
};
pub use snapshot::{QueueSnapshot, SnapshotIssues};

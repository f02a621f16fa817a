// Service Date Domain Model
//
// Service days are civil dates at the clinic's fixed UTC offset. The host
// time zone is never consulted.

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// India Standard Time (+05:30), in minutes east of UTC
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 5 * 60 + 30;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Build a fixed civil offset from minutes east of UTC
pub fn civil_offset(minutes_east: i32) -> Result<FixedOffset> {
    minutes_east
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            DomainError::ValidationError(format!(
                "UTC offset out of range: {} minutes",
                minutes_east
            ))
        })
}

/// Default civil offset (+05:30)
pub fn default_offset() -> FixedOffset {
    civil_offset(DEFAULT_UTC_OFFSET_MINUTES).unwrap_or_else(|_| Utc.fix())
}

/// Calendar date key in `YYYY-MM-DD` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceDate(NaiveDate);

impl ServiceDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Civil date of `instant` after shifting it by `offset`
    pub fn from_instant(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self(instant.with_timezone(&offset).date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn key(&self) -> String {
        self.0.format(DATE_KEY_FORMAT).to_string()
    }
}

impl std::fmt::Display for ServiceDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for ServiceDate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        NaiveDate::parse_from_str(s.trim(), DATE_KEY_FORMAT)
            .map(Self)
            .map_err(|e| DomainError::ValidationError(format!("Invalid date key '{}': {}", s, e)))
    }
}

impl TryFrom<String> for ServiceDate {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ServiceDate> for String {
    fn from(date: ServiceDate) -> Self {
        date.key()
    }
}

/// Subscription scope: the whole queue or one service date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionScope {
    All,
    Date(ServiceDate),
}

impl SubscriptionScope {
    pub fn date(&self) -> Option<ServiceDate> {
        match self {
            SubscriptionScope::All => None,
            SubscriptionScope::Date(d) => Some(*d),
        }
    }
}

impl std::fmt::Display for SubscriptionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionScope::All => write!(f, "all"),
            SubscriptionScope::Date(d) => write!(f, "{}", d),
        }
    }
}

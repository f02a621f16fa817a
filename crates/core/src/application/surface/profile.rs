// Display Surface profiles: one per audience

use super::constants::{
    ASSISTANT_UPCOMING_LIMIT, LOBBY_UPCOMING_LIMIT, TRACKING_PREVIEW_LIMIT, UNLIMITED_UPCOMING,
};
use crate::application::localization::Locale;
use crate::domain::{default_offset, ServiceDate, SubscriptionScope, TokenNumber};
use crate::error::AppError;
use chrono::{DateTime, FixedOffset, Utc};
use std::str::FromStr;

/// Audience a surface serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Reception,
    Assistant,
    Lobby,
    Tracking,
}

impl std::fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceKind::Reception => write!(f, "reception"),
            SurfaceKind::Assistant => write!(f, "assistant"),
            SurfaceKind::Lobby => write!(f, "lobby"),
            SurfaceKind::Tracking => write!(f, "tracking"),
        }
    }
}

/// How the subscription scope is chosen at mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRule {
    All,
    /// Service date of the mount instant at the profile's offset
    Today,
    Fixed(ServiceDate),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceProfile {
    pub kind: SurfaceKind,
    pub scope: ScopeRule,
    pub upcoming_limit: usize,
    pub announcements: bool,
    pub poll_served_today: bool,
    pub tracking_token: Option<TokenNumber>,
    pub locale: Locale,
    pub utc_offset: FixedOffset,
}

impl SurfaceProfile {
    fn base(kind: SurfaceKind) -> Self {
        Self {
            kind,
            scope: ScopeRule::All,
            upcoming_limit: 0,
            announcements: false,
            poll_served_today: false,
            tracking_token: None,
            locale: Locale::default(),
            utc_offset: default_offset(),
        }
    }

    /// Front desk: whole queue, every waiting patient, silent
    pub fn reception() -> Self {
        Self {
            upcoming_limit: UNLIMITED_UPCOMING,
            ..Self::base(SurfaceKind::Reception)
        }
    }

    /// Consultation room: next five, spoken announcements
    pub fn assistant() -> Self {
        Self {
            upcoming_limit: ASSISTANT_UPCOMING_LIMIT,
            announcements: true,
            ..Self::base(SurfaceKind::Assistant)
        }
    }

    /// Public TV: today's queue only, next three, spoken, served-today counter
    pub fn lobby() -> Self {
        Self {
            scope: ScopeRule::Today,
            upcoming_limit: LOBBY_UPCOMING_LIMIT,
            announcements: true,
            poll_served_today: true,
            ..Self::base(SurfaceKind::Lobby)
        }
    }

    pub fn lobby_on(date: ServiceDate) -> Self {
        Self {
            scope: ScopeRule::Fixed(date),
            ..Self::lobby()
        }
    }

    /// Patient-facing lookup of a single token, with a short queue preview
    pub fn tracking(token: TokenNumber) -> Self {
        Self {
            tracking_token: Some(token),
            upcoming_limit: TRACKING_PREVIEW_LIMIT,
            ..Self::base(SurfaceKind::Tracking)
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_announcements(mut self, enabled: bool) -> Self {
        self.announcements = enabled;
        self
    }

    /// Concrete scope for a surface mounted at `now`
    pub fn resolve_scope(&self, now: DateTime<Utc>) -> SubscriptionScope {
        match self.scope {
            ScopeRule::All => SubscriptionScope::All,
            ScopeRule::Today => {
                SubscriptionScope::Date(ServiceDate::from_instant(now, self.utc_offset))
            }
            ScopeRule::Fixed(date) => SubscriptionScope::Date(date),
        }
    }
}

/// Parses `reception`, `assistant`, `lobby`, `lobby@YYYY-MM-DD`, `tracking:<token>`
impl FromStr for SurfaceProfile {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(date) = s.strip_prefix("lobby@") {
            let date: ServiceDate = date
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid lobby date '{}': {}", date, e)))?;
            return Ok(Self::lobby_on(date));
        }
        if let Some(token) = s.strip_prefix("tracking:") {
            let token: TokenNumber = token
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid tracking token '{}'", token)))?;
            return Ok(Self::tracking(token));
        }
        match s.to_ascii_lowercase().as_str() {
            "reception" => Ok(Self::reception()),
            "assistant" => Ok(Self::assistant()),
            "lobby" => Ok(Self::lobby()),
            other => Err(AppError::Config(format!("Unknown surface: {}", other))),
        }
    }
}

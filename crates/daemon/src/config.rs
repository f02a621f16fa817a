//! Daemon configuration, read from `WAITLINE_*` environment variables

use anyhow::{Context, Result};
use chrono::FixedOffset;
use waitline_core::application::{Locale, SurfaceProfile};
use waitline_core::domain::{civil_offset, DEFAULT_UTC_OFFSET_MINUTES};
use waitline_infra_feed::derive_feed_url;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_SURFACES: &str = "assistant,lobby";

pub const ENV_SERVER_URL: &str = "WAITLINE_SERVER_URL";
pub const ENV_FEED_URL: &str = "WAITLINE_FEED_URL";
pub const ENV_SURFACES: &str = "WAITLINE_SURFACES";
pub const ENV_LOCALE: &str = "WAITLINE_LOCALE";
pub const ENV_UTC_OFFSET_MINUTES: &str = "WAITLINE_UTC_OFFSET_MINUTES";
pub const ENV_TTS_BINARY: &str = "WAITLINE_TTS_BINARY";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub server_url: String,
    pub feed_url: String,
    /// Profiles with locale and offset already applied
    pub surfaces: Vec<SurfaceProfile>,
    pub locale: Locale,
    pub utc_offset: FixedOffset,
    /// None means probe the default TTS binaries
    pub tts_binary: Option<String>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_url = get(ENV_SERVER_URL).unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let feed_url = get(ENV_FEED_URL).unwrap_or_else(|| derive_feed_url(&server_url));

        let locale = match get(ENV_LOCALE) {
            Some(raw) => raw
                .parse::<Locale>()
                .with_context(|| format!("{} is invalid", ENV_LOCALE))?,
            None => Locale::default(),
        };

        let offset_minutes = match get(ENV_UTC_OFFSET_MINUTES) {
            Some(raw) => raw.trim().parse::<i32>().with_context(|| {
                format!("{} must be an integer, got '{}'", ENV_UTC_OFFSET_MINUTES, raw)
            })?,
            None => DEFAULT_UTC_OFFSET_MINUTES,
        };
        let utc_offset = civil_offset(offset_minutes)
            .with_context(|| format!("{} is out of range", ENV_UTC_OFFSET_MINUTES))?;

        let surfaces = parse_surfaces(
            &get(ENV_SURFACES).unwrap_or_else(|| DEFAULT_SURFACES.to_string()),
            locale,
            utc_offset,
        )?;

        Ok(Self {
            server_url,
            feed_url,
            surfaces,
            locale,
            utc_offset,
            tts_binary: get(ENV_TTS_BINARY),
        })
    }
}

fn parse_surfaces(raw: &str, locale: Locale, offset: FixedOffset) -> Result<Vec<SurfaceProfile>> {
    let surfaces = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<SurfaceProfile>()
                .map(|p| p.with_locale(locale).with_offset(offset))
                .with_context(|| format!("{} has an invalid entry", ENV_SURFACES))
        })
        .collect::<Result<Vec<_>>>()?;

    if surfaces.is_empty() {
        anyhow::bail!("{} names no surfaces", ENV_SURFACES);
    }
    Ok(surfaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use waitline_core::application::SurfaceKind;

    fn config_from(pairs: &[(&str, &str)]) -> Result<DaemonConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_url, "http://localhost:5000");
        assert_eq!(config.feed_url, "ws://localhost:5000/ws");
        assert_eq!(config.locale, Locale::TeluguIndia);
        assert_eq!(config.utc_offset.local_minus_utc(), 330 * 60);
        assert_eq!(config.tts_binary, None);

        let kinds: Vec<SurfaceKind> = config.surfaces.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![SurfaceKind::Assistant, SurfaceKind::Lobby]);
    }

    #[test]
    fn test_feed_url_derived_from_server_url() {
        let config = config_from(&[("WAITLINE_SERVER_URL", "https://clinic.example/")]).unwrap();
        assert_eq!(config.feed_url, "wss://clinic.example/ws");

        let config = config_from(&[
            ("WAITLINE_SERVER_URL", "https://clinic.example"),
            ("WAITLINE_FEED_URL", "ws://10.0.0.5:9000/live"),
        ])
        .unwrap();
        assert_eq!(config.feed_url, "ws://10.0.0.5:9000/live");
    }

    #[test]
    fn test_surfaces_carry_locale_and_offset() {
        let config = config_from(&[
            ("WAITLINE_SURFACES", "reception, lobby@2024-03-02 ,tracking:12"),
            ("WAITLINE_LOCALE", "en-IN"),
            ("WAITLINE_UTC_OFFSET_MINUTES", "0"),
        ])
        .unwrap();

        assert_eq!(config.surfaces.len(), 3);
        assert_eq!(config.surfaces[2].tracking_token, Some(12));
        for profile in &config.surfaces {
            assert_eq!(profile.locale, Locale::EnglishIndia);
            assert_eq!(profile.utc_offset.local_minus_utc(), 0);
        }
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config =
            config_from(&[("WAITLINE_TTS_BINARY", "  "), ("WAITLINE_LOCALE", "")]).unwrap();
        assert_eq!(config.tts_binary, None);
        assert_eq!(config.locale, Locale::TeluguIndia);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("WAITLINE_SURFACES", "kiosk")]).is_err());
        assert!(config_from(&[("WAITLINE_SURFACES", " , ")]).is_err());
        assert!(config_from(&[("WAITLINE_LOCALE", "fr-FR")]).is_err());
        assert!(config_from(&[("WAITLINE_UTC_OFFSET_MINUTES", "abc")]).is_err());
        assert!(config_from(&[("WAITLINE_UTC_OFFSET_MINUTES", "100000")]).is_err());
        assert!(config_from(&[("WAITLINE_UTC_OFFSET_MINUTES", "40000000")]).is_err());
    }
}

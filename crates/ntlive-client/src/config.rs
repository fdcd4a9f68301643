//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client starts with zero
//! configuration against a local development server.

use std::time::Duration;

use ntlive_shared::constants::{
    DEFAULT_API_BASE, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_JOIN_DELAY_MS, DEFAULT_LOCALE,
    DEFAULT_ROOM_POLL_MS,
};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin of the rooms/users/link API, without trailing slash.
    /// Env: `NTLIVE_API_BASE`
    /// Default: `http://localhost:3000`
    pub api_base: String,

    /// Room list polling interval.
    /// Env: `NTLIVE_ROOM_POLL_MS`
    /// Default: 5000 ms
    pub room_poll_interval: Duration,

    /// Delay before the automatic join announcement.
    /// Env: `NTLIVE_JOIN_DELAY_MS`
    /// Default: 3000 ms
    pub join_delay: Duration,

    /// BCP 47 tag used for time formatting.
    /// Env: `NTLIVE_LOCALE`, then `LANG`
    /// Default: `en-US`
    pub locale: String,

    /// Per-request HTTP timeout.
    /// Env: `NTLIVE_HTTP_TIMEOUT_MS`
    /// Default: 10000 ms
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            room_poll_interval: Duration::from_millis(DEFAULT_ROOM_POLL_MS),
            join_delay: Duration::from_millis(DEFAULT_JOIN_DELAY_MS),
            locale: DEFAULT_LOCALE.to_string(),
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(base) = lookup("NTLIVE_API_BASE") {
            let base = base.trim().trim_end_matches('/');
            if base.starts_with("http://") || base.starts_with("https://") {
                config.api_base = base.to_string();
            } else {
                tracing::warn!(value = %base, "Invalid NTLIVE_API_BASE, using default");
            }
        }

        if let Some(val) = lookup("NTLIVE_ROOM_POLL_MS") {
            if let Some(d) = parse_millis("NTLIVE_ROOM_POLL_MS", &val) {
                config.room_poll_interval = d;
            }
        }

        if let Some(val) = lookup("NTLIVE_JOIN_DELAY_MS") {
            if let Some(d) = parse_millis("NTLIVE_JOIN_DELAY_MS", &val) {
                config.join_delay = d;
            }
        }

        if let Some(val) = lookup("NTLIVE_HTTP_TIMEOUT_MS") {
            if let Some(d) = parse_millis("NTLIVE_HTTP_TIMEOUT_MS", &val) {
                config.http_timeout = d;
            }
        }

        if let Some(tag) = lookup("NTLIVE_LOCALE").or_else(|| lookup("LANG").and_then(|l| locale_from_lang(&l))) {
            config.locale = tag;
        }

        config
    }
}

fn parse_millis(key: &str, value: &str) -> Option<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) => {
            tracing::warn!(key, "Zero duration not allowed, using default");
            None
        }
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            tracing::warn!(key, value, error = %e, "Invalid duration, using default");
            None
        }
    }
}

/// `zh_TW.UTF-8` -> `zh-TW`. `C` and `POSIX` map to nothing.
fn locale_from_lang(lang: &str) -> Option<String> {
    let base = lang.split('.').next().unwrap_or_default().trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

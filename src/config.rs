//! Editor configuration parsed from environment variables.

use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_STORE_DIR: &str = "documents";
pub const DEFAULT_EMOJI_SIZE: f64 = 40.0;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_FETCH_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Directory holding one JSON snapshot per document.
    pub store_dir: PathBuf,
    /// Persist steady pan/zoom alongside the document.
    pub persist_view: bool,
    /// On-screen size of newly dropped glyphs, in pixels.
    pub default_emoji_size: f64,
    pub timeouts: FetchTimeouts,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            persist_view: false,
            default_emoji_size: DEFAULT_EMOJI_SIZE,
            timeouts: FetchTimeouts::default(),
        }
    }
}

impl EditorConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `EMOJI_ART_STORE_DIR`: default `documents`
    /// - `EMOJI_ART_PERSIST_VIEW`: `true`/`false` (also `1`/`0`, `yes`/`no`), default `false`
    /// - `EMOJI_ART_DEFAULT_EMOJI_SIZE`: default 40, must be positive
    /// - `EMOJI_ART_FETCH_TIMEOUT_SECS`: default 30
    /// - `EMOJI_ART_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if `EMOJI_ART_PERSIST_VIEW` or
    /// `EMOJI_ART_DEFAULT_EMOJI_SIZE` is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_dir = std::env::var("EMOJI_ART_STORE_DIR").map_or_else(|_| PathBuf::from(DEFAULT_STORE_DIR), PathBuf::from);
        let persist_view = match std::env::var("EMOJI_ART_PERSIST_VIEW") {
            Ok(raw) => parse_bool(&raw)?,
            Err(_) => false,
        };
        let default_emoji_size = match std::env::var("EMOJI_ART_DEFAULT_EMOJI_SIZE") {
            Ok(raw) => parse_size(&raw)?,
            Err(_) => DEFAULT_EMOJI_SIZE,
        };
        let timeouts = FetchTimeouts {
            request_secs: env_parse("EMOJI_ART_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS),
            connect_secs: env_parse("EMOJI_ART_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { store_dir, persist_view, default_emoji_size, timeouts })
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key).map_or(default, |v| v.trim().parse::<T>().unwrap_or(default))
}

fn parse_bool(raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ConfigError::Parse(format!("unknown EMOJI_ART_PERSIST_VIEW: {other}"))),
    }
}

fn parse_size(raw: &str) -> Result<f64, ConfigError> {
    match raw.trim().parse::<f64>() {
        Ok(size) if size.is_finite() && size > 0.0 => Ok(size),
        _ => Err(ConfigError::Parse(format!("EMOJI_ART_DEFAULT_EMOJI_SIZE must be a positive number, got '{raw}'"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::compare::session::{DEFAULT_IDLE_TTL, DEFAULT_MAX_SESSIONS};
use crate::why_client::MAX_ATTEMPTS;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub why_service_url: String,
    pub why_service_token: Option<String>,
    pub why_service_timeout_secs: u64,
    pub why_service_max_attempts: u32,
    /// When set, why_opened events are appended to this JSON-lines file.
    pub why_log_path: Option<PathBuf>,
    /// Compare sessions idle for longer than this are evicted.
    pub compare_idle_secs: u64,
    pub compare_max_sessions: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            why_service_url: require_env("WHY_SERVICE_URL")?,
            why_service_token: optional_env("WHY_SERVICE_TOKEN"),
            why_service_timeout_secs: parse_env("WHY_SERVICE_TIMEOUT_SECS", 10)?,
            why_service_max_attempts: parse_env::<u32>("WHY_SERVICE_MAX_ATTEMPTS", 2)?
                .clamp(1, MAX_ATTEMPTS),
            why_log_path: optional_env("WHY_LOG_PATH").map(PathBuf::from),
            compare_idle_secs: parse_env("COMPARE_SESSION_IDLE_SECS", DEFAULT_IDLE_TTL.as_secs())?,
            compare_max_sessions: parse_env("COMPARE_MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

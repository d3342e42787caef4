//! services/client/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// What the notes directory does with a failed fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FetchFailurePolicy {
    /// Log the failure and keep showing the previous notes.
    #[default]
    Silent,
    /// Also keep the error message around for a non-blocking banner.
    Notify,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub log_level: Level,
    pub notes_table: String,
    pub notes_bucket: String,
    pub backend_timeout: Duration,
    pub fetch_failure_policy: FetchFailurePolicy,
    pub session_file: PathBuf,
}

impl Config {
    /// Builds a configuration for the given backend with every other setting at its default.
    pub fn new(supabase_url: impl Into<String>, supabase_anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into().trim_end_matches('/').to_string(),
            supabase_anon_key: supabase_anon_key.into(),
            log_level: Level::INFO,
            notes_table: "notes".to_string(),
            notes_bucket: "notes-pdfs".to_string(),
            backend_timeout: Duration::from_secs(15),
            fetch_failure_policy: FetchFailurePolicy::Silent,
            session_file: PathBuf::from(".notecycle/session.json"),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- The two backend values the client cannot run without ---
        let supabase_url = std::env::var("SUPABASE_URL")
            .map_err(|_| ConfigError::MissingVar("SUPABASE_URL".to_string()))?;
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "SUPABASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", supabase_url),
            ));
        }
        let supabase_anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| ConfigError::MissingVar("SUPABASE_ANON_KEY".to_string()))?;

        let mut config = Self::new(supabase_url, supabase_anon_key);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        config.log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Backend Names ---
        if let Ok(table) = std::env::var("NOTES_TABLE") {
            config.notes_table = table;
        }
        if let Ok(bucket) = std::env::var("NOTES_BUCKET") {
            config.notes_bucket = bucket;
        }

        // --- Client Behavior ---
        if let Ok(secs) = std::env::var("BACKEND_TIMEOUT_SECS") {
            let secs = secs
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "BACKEND_TIMEOUT_SECS".to_string(),
                        format!("'{}' is not a positive number of seconds", secs),
                    )
                })?;
            config.backend_timeout = Duration::from_secs(secs);
        }

        if let Ok(policy) = std::env::var("FETCH_FAILURE_POLICY") {
            config.fetch_failure_policy = parse_policy(&policy)?;
        }

        if let Ok(path) = std::env::var("SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }

        Ok(config)
    }
}

fn parse_policy(value: &str) -> Result<FetchFailurePolicy, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "silent" => Ok(FetchFailurePolicy::Silent),
        "notify" => Ok(FetchFailurePolicy::Notify),
        _ => Err(ConfigError::InvalidValue(
            "FETCH_FAILURE_POLICY".to_string(),
            format!("'{}' is neither 'silent' nor 'notify'", value),
        )),
    }
}

//! Triage configuration, built once from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default maximum number of messages classified per scan.
pub const DEFAULT_BATCH_LIMIT: usize = 20;

/// Default retention cap for the triage store.
pub const DEFAULT_RETENTION_CAP: usize = 200;

/// Per-message classification timeout.
pub const CLASSIFICATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable triage configuration.
///
/// Built once at process start and passed by reference into the
/// orchestrators — no process-wide mutable state.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub imap_user: String,
    pub imap_pass: String,
    pub state_file: PathBuf,
    pub ollama_url: String,
    pub ollama_model: String,
    pub retention_cap: usize,
    pub batch_limit: usize,
}

impl TriageConfig {
    /// Build config from environment variables.
    ///
    /// `IMAP_HOST`, `IMAP_USER`, and `IMAP_PASS` are required; everything
    /// else has a default. All missing required variables are reported in
    /// one error so the user fixes them in a single pass.
    pub fn from_env() -> Result<Self, ConfigError> {
        let imap_host = std::env::var("IMAP_HOST").unwrap_or_default();
        let imap_user = std::env::var("IMAP_USER").unwrap_or_default();
        let imap_pass = std::env::var("IMAP_PASS").unwrap_or_default();

        let mut missing = Vec::new();
        if imap_host.is_empty() {
            missing.push("IMAP_HOST".to_string());
        }
        if imap_user.is_empty() {
            missing.push("IMAP_USER".to_string());
        }
        if imap_pass.is_empty() {
            missing.push("IMAP_PASS".to_string());
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnvVars(missing));
        }

        let imap_port: u16 = parse_env("IMAP_PORT", 993)?;

        let state_file = std::env::var("TRIAGE_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/email-triage.json"));

        let ollama_url = std::env::var("OLLAMA_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());
        let ollama_model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "qwen2.5:7b".to_string());

        let retention_cap: usize = parse_env("TRIAGE_RETENTION_CAP", DEFAULT_RETENTION_CAP)?;
        let batch_limit: usize = parse_env("TRIAGE_BATCH_LIMIT", DEFAULT_BATCH_LIMIT)?;

        Ok(Self {
            imap_host,
            imap_port,
            imap_user,
            imap_pass,
            state_file,
            ollama_url,
            ollama_model,
            retention_cap,
            batch_limit,
        })
    }

    /// State-file-only config, for commands that never touch the network
    /// (`report`, `mark-surfaced`, `stats` read and write local state only).
    pub fn local_only() -> Self {
        let state_file = std::env::var("TRIAGE_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/email-triage.json"));
        Self {
            imap_host: String::new(),
            imap_port: 993,
            imap_user: String::new(),
            imap_pass: String::new(),
            state_file,
            ollama_url: String::new(),
            ollama_model: String::new(),
            retention_cap: DEFAULT_RETENTION_CAP,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}' is not a valid value"),
        }),
        Err(_) => Ok(default),
    }
}

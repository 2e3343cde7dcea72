//! Error types for inbox-triage.

use std::path::PathBuf;

/// Top-level error type for the triage CLI.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),
}

/// Configuration-related errors. Fatal — reported before any network activity.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable(s): {}", .0.join(", "))]
    MissingEnvVars(Vec<String>),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mail transport errors. Propagated — a failed fetch aborts the scan.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Connection to {host}:{port} failed: {reason}")]
    ConnectFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("IMAP login failed for {user}")]
    LoginFailed { user: String },

    #[error("IMAP protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classification-strategy errors. Consumed by the strategy chain —
/// a failing tier falls through to the next, never to the user.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Oracle request failed: {0}")]
    Request(String),

    #[error("Oracle returned unparseable output: {0}")]
    InvalidResponse(String),
}

/// Triage store errors. Load corruption is recovered as empty state and
/// never reaches this type; write failures do.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for the triage CLI.
pub type Result<T> = std::result::Result<T, Error>;

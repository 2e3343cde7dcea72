//! Two-tier message classification.
//!
//! A `Classifier` holds ranked strategies and tries each in order,
//! stopping at the first success. The default chain is the Ollama tier
//! followed by the heuristic tier; the heuristic tier is total, so
//! `classify` always produces a result.

pub mod heuristic;
pub mod ollama;

pub use heuristic::HeuristicClassifier;
pub use ollama::OllamaClassifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TriageConfig;
use crate::error::ClassifyError;

/// Priority category assigned to a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Needs immediate attention (outages, security, legal, time-sensitive).
    Urgent,
    /// Requires a reply (inquiries, questions, action items).
    NeedsResponse,
    /// FYI only (billing, receipts, confirmations, newsletters).
    Informational,
    /// Junk, marketing, irrelevant.
    Spam,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Urgent,
        Category::NeedsResponse,
        Category::Informational,
        Category::Spam,
    ];

    /// The two categories surfaced to downstream consumers.
    pub const IMPORTANT: [Category; 2] = [Category::Urgent, Category::NeedsResponse];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::NeedsResponse => "needs-response",
            Self::Informational => "informational",
            Self::Spam => "spam",
        }
    }

    /// Parse the wire form; anything unrecognized is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "urgent" => Some(Self::Urgent),
            "needs-response" => Some(Self::NeedsResponse),
            "informational" => Some(Self::Informational),
            "spam" => Some(Self::Spam),
            _ => None,
        }
    }

    /// Report ordering rank — urgent sorts before needs-response.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Urgent => 0,
            Self::NeedsResponse => 1,
            Self::Informational => 2,
            Self::Spam => 3,
        }
    }

    /// Display icon, matching the scan/report output legend.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Urgent => "🔴",
            Self::NeedsResponse => "🟡",
            Self::Informational => "🔵",
            Self::Spam => "⚫",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classification outcome: category plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub reason: String,
}

/// One tier in the classification chain.
#[async_trait]
pub trait ClassifyStrategy: Send + Sync {
    /// Tier name for logging.
    fn name(&self) -> &'static str;

    /// Attempt to classify. A returned error means "fall through to the
    /// next tier", never a user-visible failure.
    async fn classify(
        &self,
        sender: &str,
        subject: &str,
        preview: &str,
    ) -> Result<Classification, ClassifyError>;
}

/// Ranked chain of classification strategies.
pub struct Classifier {
    strategies: Vec<Box<dyn ClassifyStrategy>>,
}

impl Classifier {
    pub fn new(strategies: Vec<Box<dyn ClassifyStrategy>>) -> Self {
        Self { strategies }
    }

    /// The production chain: Ollama first, heuristics as fallback.
    pub fn from_config(config: &TriageConfig) -> Self {
        Self::new(vec![
            Box::new(OllamaClassifier::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
            )),
            Box::new(HeuristicClassifier::new()),
        ])
    }

    /// Heuristics only — no network. Used by tests and dry deployments.
    pub fn heuristic_only() -> Self {
        Self::new(vec![Box::new(HeuristicClassifier::new())])
    }

    /// Classify a message. Tries each tier in order; the first success
    /// wins. Always returns a valid category and non-empty reason.
    pub async fn classify(&self, sender: &str, subject: &str, preview: &str) -> Classification {
        for strategy in &self.strategies {
            match strategy.classify(sender, subject, preview).await {
                Ok(result) => return result,
                Err(e) => {
                    debug!(tier = strategy.name(), error = %e, "Tier failed, falling through");
                }
            }
        }
        // Unreachable with the default chain — the heuristic tier is total.
        Classification {
            category: Category::Informational,
            reason: "No classifier tier produced a result".to_string(),
        }
    }
}

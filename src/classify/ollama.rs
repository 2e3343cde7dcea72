//! Ollama classification tier.
//!
//! Posts a fixed instruction prompt to an Ollama `/api/generate`
//! endpoint and parses the single JSON object the model is asked to
//! produce. Every failure mode — unreachable endpoint, timeout,
//! non-JSON output, missing fields — surfaces as a `ClassifyError` so
//! the chain falls through to the heuristic tier.

use async_trait::async_trait;
use serde::Deserialize;

use crate::classify::{Category, Classification, ClassifyStrategy};
use crate::config::CLASSIFICATION_TIMEOUT;
use crate::error::ClassifyError;

/// Preview length embedded in the prompt.
const PROMPT_PREVIEW_CHARS: usize = 300;

/// Ollama-backed classification strategy.
pub struct OllamaClassifier {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClassifier {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
        }
    }
}

#[async_trait]
impl ClassifyStrategy for OllamaClassifier {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn classify(
        &self,
        sender: &str,
        subject: &str,
        preview: &str,
    ) -> Result<Classification, ClassifyError> {
        let prompt = build_prompt(sender, subject, preview);
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.1,
                "num_predict": 100,
            },
        });

        let resp = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(CLASSIFICATION_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClassifyError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ClassifyError::Request(format!(
                "endpoint returned {}",
                resp.status()
            )));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ClassifyError::InvalidResponse(e.to_string()))?;

        parse_verdict(&body.response)
    }
}

/// Wire shape of an Ollama generate response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// The JSON object the model is instructed to emit.
#[derive(Debug, Deserialize)]
struct Verdict {
    category: String,
    #[serde(default)]
    reason: String,
}

fn build_prompt(sender: &str, subject: &str, preview: &str) -> String {
    let preview: String = preview.chars().take(PROMPT_PREVIEW_CHARS).collect();
    format!(
        "Classify this email into exactly one category. Reply with ONLY a JSON object, no other text.\n\
         \n\
         Categories:\n\
         - \"urgent\": Server outages, security alerts, legal notices, payment failures, time-critical action needed\n\
         - \"needs-response\": Business inquiries, questions requiring answers, partnership proposals, support requests\n\
         - \"informational\": Billing statements, receipts, confirmations, newsletters, status updates, automated notifications\n\
         - \"spam\": Marketing, promotions, unsolicited sales, irrelevant\n\
         \n\
         Email:\n\
         From: {sender}\n\
         Subject: {subject}\n\
         Preview: {preview}\n\
         \n\
         Reply format: {{\"category\": \"<category>\", \"reason\": \"<brief reason>\"}}"
    )
}

/// Parse the model's output into a classification.
///
/// The output may be wrapped in markdown fences or surrounded by prose;
/// an unknown category coerces to `informational` rather than failing.
fn parse_verdict(raw: &str) -> Result<Classification, ClassifyError> {
    let json_str = extract_json_object(raw);
    let verdict: Verdict = serde_json::from_str(&json_str)
        .map_err(|e| ClassifyError::InvalidResponse(format!("JSON parse error: {e}")))?;

    let category = Category::parse(&verdict.category).unwrap_or(Category::Informational);
    let reason = if verdict.reason.is_empty() {
        "LLM classification".to_string()
    } else {
        verdict.reason
    };

    Ok(Classification {
        category,
        reason: format!("[ollama] {reason}"),
    })
}

/// Extract a JSON object from model output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

//! Message normalization — provider bytes to a canonical record.

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use sha2::{Digest, Sha256};

/// Maximum preview length produced by normalization.
const PREVIEW_MAX_CHARS: usize = 500;

/// Placeholder body for messages without a plain-text part.
const NO_BODY_SENTINEL: &str = "(no plain-text body)";

/// Canonical form of one message, independent of the mail provider.
///
/// Produced fresh on every scan; never persisted itself.
#[derive(Debug, Clone)]
pub struct CanonicalMessage {
    /// Provider message identifier (Message-ID). May be empty.
    pub provider_id: String,
    pub subject: String,
    pub sender: String,
    /// Plain-text body preview, whitespace-collapsed, at most 500 chars.
    pub preview: String,
    pub timestamp: DateTime<Utc>,
    pub source_account: Option<String>,
}

/// Parse raw message bytes into a `CanonicalMessage`.
///
/// Header text is MIME-decoded by mail-parser, substituting replacement
/// characters for undecodable bytes. Malformed or missing Date headers
/// fall back to now (UTC). Never fails — unparseable input degrades to
/// placeholder fields.
pub fn normalize(raw: &[u8], account: Option<&str>) -> CanonicalMessage {
    let source_account = account.map(str::to_string);

    let Some(parsed) = MessageParser::default().parse(raw) else {
        return CanonicalMessage {
            provider_id: String::new(),
            subject: "(no subject)".to_string(),
            sender: "unknown".to_string(),
            preview: NO_BODY_SENTINEL.to_string(),
            timestamp: Utc::now(),
            source_account,
        };
    };

    let provider_id = parsed.message_id().unwrap_or_default().to_string();
    let subject = parsed.subject().unwrap_or("(no subject)").to_string();
    let sender = extract_sender(&parsed);
    let preview = extract_preview(&parsed);

    let timestamp = parsed
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0))
        .unwrap_or_else(Utc::now);

    CanonicalMessage {
        provider_id,
        subject,
        sender,
        preview,
        timestamp,
        source_account,
    }
}

/// Derive the stable deduplication key for a canonical message.
///
/// Prefers the provider id with any enclosing angle brackets stripped;
/// messages without one hash to 16 hex chars of SHA-256 over
/// `subject|sender`. Two id-less messages sharing subject and sender
/// collide to the same key regardless of body.
pub fn dedup_key(msg: &CanonicalMessage) -> String {
    let id = msg.provider_id.trim();
    if !id.is_empty() {
        return id.trim_matches(|c| c == '<' || c == '>').to_string();
    }
    let combo = format!("{}|{}", msg.subject, msg.sender);
    let digest = format!("{:x}", Sha256::digest(combo.as_bytes()));
    digest[..16].to_string()
}

/// Render the sender as `Name <address>`, or whichever half is present.
fn extract_sender(parsed: &mail_parser::Message) -> String {
    let Some(addr) = parsed.from().and_then(|a| a.first()) else {
        return "unknown".to_string();
    };
    match (addr.name(), addr.address()) {
        (Some(name), Some(address)) => format!("{name} <{address}>"),
        (None, Some(address)) => address.to_string(),
        (Some(name), None) => name.to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Extract a plain-text preview from the first text/plain body part.
///
/// Whitespace runs collapse to single spaces; HTML-only messages get the
/// sentinel rather than a lossy conversion. Truncated with an ellipsis
/// when longer than `PREVIEW_MAX_CHARS`.
fn extract_preview(parsed: &mail_parser::Message) -> String {
    let plain = parsed
        .text_body
        .first()
        .and_then(|id| parsed.parts.get(*id as usize))
        .filter(|part| !part.is_text_html())
        .and_then(|part| part.text_contents());

    let Some(body) = plain else {
        return NO_BODY_SENTINEL.to_string();
    };

    let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_with_ellipsis(&collapsed, PREVIEW_MAX_CHARS)
}

/// Truncate to `max` chars, trimming trailing space and appending `…`.
pub(crate) fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push('…');
    truncated
}

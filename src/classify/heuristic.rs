//! Heuristic classification tier — deterministic keyword and sender
//! pattern matching, evaluated in fixed priority order.
//!
//! Tiers, first match wins: urgent keywords, then spam (marketing
//! phrase plus promotional sender), then informational (automated
//! notification phrase or no-reply-style sender), then needs-response
//! phrases. Total — always classifies, never errors.

use async_trait::async_trait;
use regex::Regex;

use crate::classify::{Category, Classification, ClassifyStrategy};
use crate::error::ClassifyError;

/// Phrases that demand immediate attention.
const URGENT_KEYWORDS: &[&str] = &[
    "outage",
    "down",
    "critical",
    "security alert",
    "breach",
    "suspended",
    "terminated",
    "legal notice",
    "court",
    "payment failed",
    "overdue",
    "final notice",
];

/// Marketing phrases. Spam requires one of these plus a promotional sender.
const SPAM_PHRASES: &[&str] = &[
    "unsubscribe",
    "opt out",
    "special offer",
    "limited time",
    "click here",
    "act now",
    "congratulations",
    "you've won",
    "free trial",
    "exclusive deal",
];

/// Automated-notification phrases.
const INFO_PHRASES: &[&str] = &[
    "billing statement",
    "invoice",
    "receipt",
    "confirmation",
    "your order",
    "shipping",
    "newsletter",
    "weekly digest",
    "monthly report",
    "notification",
    "automated",
    "no-reply",
    "noreply",
    "do not reply",
];

/// Phrases suggesting a human expects an answer.
const RESPONSE_PHRASES: &[&str] = &[
    "question",
    "inquiry",
    "proposal",
    "partnership",
    "following up",
    "request",
    "can you",
    "would you",
    "please review",
    "feedback",
    "meeting",
];

/// Rule-based classification strategy.
pub struct HeuristicClassifier {
    promo_sender: Regex,
    info_sender: Regex,
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self {
            // Promotional mailbox names, matched anywhere in the decoded
            // From header ("Deals <promo@shop.example>").
            promo_sender: Regex::new(r"(?i)(noreply|marketing|promo|newsletter)@").unwrap(),
            info_sender: Regex::new(r"(?i)(no[-_]?reply|notifications@|alerts@|billing@)").unwrap(),
        }
    }

    fn evaluate(&self, sender: &str, subject: &str, preview: &str) -> Classification {
        let combined = format!("{} {}", subject.to_lowercase(), preview.to_lowercase());

        if URGENT_KEYWORDS.iter().any(|kw| combined.contains(kw)) {
            return classified(Category::Urgent, "Matched urgent keywords");
        }

        if SPAM_PHRASES.iter().any(|p| combined.contains(p)) && self.promo_sender.is_match(sender)
        {
            return classified(Category::Spam, "Marketing/promotional pattern");
        }

        if INFO_PHRASES.iter().any(|p| combined.contains(p)) || self.info_sender.is_match(sender) {
            return classified(Category::Informational, "Automated notification pattern");
        }

        if RESPONSE_PHRASES.iter().any(|p| combined.contains(p)) {
            return classified(Category::NeedsResponse, "Appears to need a reply");
        }

        classified(
            Category::Informational,
            "Default classification (no strong signals)",
        )
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn classified(category: Category, reason: &str) -> Classification {
    Classification {
        category,
        reason: format!("[heuristic] {reason}"),
    }
}

#[async_trait]
impl ClassifyStrategy for HeuristicClassifier {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn classify(
        &self,
        sender: &str,
        subject: &str,
        preview: &str,
    ) -> Result<Classification, ClassifyError> {
        Ok(self.evaluate(sender, subject, preview))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(sender: &str, subject: &str, preview: &str) -> Classification {
        HeuristicClassifier::new().evaluate(sender, subject, preview)
    }

    #[test]
    fn urgent_keyword_in_subject() {
        let c = classify("ops@host.example", "Security alert: unusual login", "");
        assert_eq!(c.category, Category::Urgent);
        assert!(!c.reason.is_empty());
    }

    #[test]
    fn urgent_keyword_in_preview() {
        let c = classify(
            "billing@vendor.example",
            "Account notice",
            "Your payment failed and service will pause.",
        );
        assert_eq!(c.category, Category::Urgent);
    }

    #[test]
    fn urgent_wins_over_spam_signals() {
        // Both a spam phrase and an urgent keyword: urgent tier runs first.
        let c = classify(
            "promo@shop.example",
            "Security alert",
            "Click unsubscribe to stop these warnings",
        );
        assert_eq!(c.category, Category::Urgent);
    }

    #[test]
    fn spam_needs_phrase_and_promo_sender() {
        let c = classify(
            "Deals <promo@shop.example>",
            "Exclusive deal inside",
            "Limited time only, act now",
        );
        assert_eq!(c.category, Category::Spam);
    }

    #[test]
    fn spam_phrase_without_promo_sender_is_not_spam() {
        // "unsubscribe" alone from a personal address falls to the
        // informational tier (no-reply style is absent too).
        let c = classify(
            "alice@example.com",
            "Mailing list",
            "reply unsubscribe to leave",
        );
        assert_ne!(c.category, Category::Spam);
    }

    #[test]
    fn receipt_is_informational() {
        let c = classify(
            "store@shop.example",
            "Your order has shipped",
            "Tracking inside",
        );
        assert_eq!(c.category, Category::Informational);
    }

    #[test]
    fn noreply_sender_is_informational() {
        let c = classify("no-reply@service.example", "Account update", "Things changed");
        assert_eq!(c.category, Category::Informational);
    }

    #[test]
    fn question_needs_response() {
        let c = classify(
            "bob@partner.example",
            "Quick question about the contract",
            "Can you confirm the renewal date?",
        );
        assert_eq!(c.category, Category::NeedsResponse);
    }

    #[test]
    fn follow_up_needs_response() {
        let c = classify(
            "carol@client.example",
            "Following up on our call",
            "Wanted to circle back on the timeline.",
        );
        assert_eq!(c.category, Category::NeedsResponse);
    }

    #[test]
    fn no_signal_defaults_to_informational() {
        let c = classify("dave@example.com", "Hello", "Just saying hi.");
        assert_eq!(c.category, Category::Informational);
        assert!(c.reason.contains("no strong signals"));
    }

    #[test]
    fn always_returns_nonempty_reason() {
        for (sender, subject, preview) in [
            ("", "", ""),
            ("x@y.z", "anything", "at all"),
            ("promo@a.b", "unsubscribe", "act now"),
        ] {
            let c = classify(sender, subject, preview);
            assert!(Category::ALL.contains(&c.category));
            assert!(!c.reason.is_empty());
        }
    }
}

//! Scan orchestrator — fetch, normalize, dedup, classify, persist.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::classify::Classifier;
use crate::error::Result;
use crate::mail::{MailSource, dedup_key, normalize};
use crate::mail::normalize::truncate_with_ellipsis;
use crate::store::{TriageRecord, TriageStore};

/// Stored preview length on a triage record.
const RECORD_PREVIEW_CHARS: usize = 200;

/// Options for one scan invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Maximum messages classified per scan.
    pub batch_limit: usize,
    /// Retention cap applied after the write batch.
    pub retention_cap: usize,
    /// Classify and report, but never mutate or persist state.
    pub dry_run: bool,
    /// Account label recorded on new triage records.
    pub account: Option<String>,
}

/// Result of one scan invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    /// Messages newly classified this scan.
    pub new: usize,
    /// Messages skipped because their key was already triaged.
    pub skipped: usize,
    /// Total unseen messages in the mailbox, independent of the batch cap.
    pub total_unseen: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Records created this scan (also populated on dry runs, for preview).
    #[serde(skip)]
    pub triaged: Vec<TriageRecord>,
}

/// Scan the inbox: pull a bounded batch of unseen messages, classify the
/// ones not seen before, and persist the results.
///
/// Messages whose dedup key is already in the store are skipped —
/// neither new nor an error. A dry run performs classification so the
/// caller can preview results, but leaves the store untouched.
pub async fn scan(
    source: &dyn MailSource,
    classifier: &Classifier,
    store: &TriageStore,
    opts: &ScanOptions,
) -> Result<ScanOutcome> {
    let mut state = store.load().await;
    let batch = source.fetch_unseen(opts.batch_limit).await?;

    info!(
        fetched = batch.messages.len(),
        total_unseen = batch.total_unseen,
        dry_run = opts.dry_run,
        "Scanning unseen messages"
    );

    let mut new = 0;
    let mut skipped = 0;
    let mut triaged = Vec::new();

    for raw in &batch.messages {
        let msg = normalize(&raw.bytes, opts.account.as_deref());
        let key = dedup_key(&msg);

        if state.contains(&key) {
            skipped += 1;
            debug!(key = %key, subject = %msg.subject, "Already triaged, skipping");
            continue;
        }

        let classification = classifier
            .classify(&msg.sender, &msg.subject, &msg.preview)
            .await;
        new += 1;

        let record = TriageRecord {
            subject: msg.subject,
            from: msg.sender,
            date: msg.timestamp,
            preview: truncate_with_ellipsis(&msg.preview, RECORD_PREVIEW_CHARS),
            category: classification.category,
            reason: classification.reason,
            account: msg.source_account,
            surfaced: false,
            triaged_at: Utc::now(),
            extra: serde_json::Map::new(),
        };

        info!(
            key = %key,
            category = %record.category,
            subject = %record.subject,
            "Classified message"
        );

        triaged.push(record.clone());
        if !opts.dry_run {
            state.insert_new(key, record);
        }
    }

    if !opts.dry_run {
        state.evict_to_cap(opts.retention_cap);
        store.save(&mut state).await?;
    }

    Ok(ScanOutcome {
        new,
        skipped,
        total_unseen: batch.total_unseen,
        account: opts.account.clone(),
        triaged,
    })
}

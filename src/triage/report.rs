//! Report and surface orchestration, plus read-only stats.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::classify::Category;
use crate::error::Result;
use crate::store::{StoreState, TriageRecord, TriageStore};

/// One unsurfaced important record, keyed for downstream consumers.
#[derive(Debug, Clone, Serialize)]
pub struct ReportedEmail {
    pub key: String,
    #[serde(flatten)]
    pub record: TriageRecord,
}

/// Unsurfaced records in the important categories, ordered urgent first
/// and oldest first within a category.
pub fn report(state: &StoreState, account: Option<&str>) -> Vec<ReportedEmail> {
    let mut important: Vec<ReportedEmail> = state
        .emails
        .iter()
        .filter(|(_, r)| !r.surfaced)
        .filter(|(_, r)| Category::IMPORTANT.contains(&r.category))
        .filter(|(_, r)| account.is_none_or(|a| r.account.as_deref() == Some(a)))
        .map(|(key, r)| ReportedEmail {
            key: key.clone(),
            record: r.clone(),
        })
        .collect();

    important.sort_by(|a, b| {
        (a.record.category.rank(), a.record.date, &a.key)
            .cmp(&(b.record.category.rank(), b.record.date, &b.key))
    });
    important
}

/// Flip every unsurfaced important record to surfaced and persist.
/// Returns the number of records marked.
pub async fn mark_surfaced(store: &TriageStore) -> Result<usize> {
    let mut state = store.load().await;
    let count = state.mark_all_surfaced(&Category::IMPORTANT);
    store.save(&mut state).await?;
    info!(count, "Marked important records as surfaced");
    Ok(count)
}

/// Aggregated triage statistics.
#[derive(Debug, Clone, Serialize)]
pub struct TriageStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
    pub total: usize,
    pub categories: BTreeMap<Category, usize>,
    pub by_account: BTreeMap<String, usize>,
    pub unsurfaced_urgent: usize,
    pub unsurfaced_needs_response: usize,
}

/// Pure read-only aggregation over the store state.
pub fn stats(state: &StoreState) -> TriageStats {
    let mut categories: BTreeMap<Category, usize> =
        Category::ALL.iter().map(|c| (*c, 0)).collect();
    let mut by_account = BTreeMap::new();
    let mut unsurfaced_urgent = 0;
    let mut unsurfaced_needs_response = 0;

    for record in state.emails.values() {
        *categories.entry(record.category).or_insert(0) += 1;
        if let Some(account) = &record.account {
            *by_account.entry(account.clone()).or_insert(0) += 1;
        }
        if !record.surfaced {
            match record.category {
                Category::Urgent => unsurfaced_urgent += 1,
                Category::NeedsResponse => unsurfaced_needs_response += 1,
                _ => {}
            }
        }
    }

    TriageStats {
        last_check: state.last_check,
        total: state.emails.len(),
        categories,
        by_account,
        unsurfaced_urgent,
        unsurfaced_needs_response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(
        category: Category,
        date: DateTime<Utc>,
        surfaced: bool,
        account: Option<&str>,
    ) -> TriageRecord {
        TriageRecord {
            subject: "s".into(),
            from: "f@x.com".into(),
            date,
            preview: "p".into(),
            category,
            reason: "r".into(),
            account: account.map(String::from),
            surfaced,
            triaged_at: date,
            extra: serde_json::Map::new(),
        }
    }

    fn state_with(records: Vec<(&str, TriageRecord)>) -> StoreState {
        let mut state = StoreState::default();
        for (key, rec) in records {
            state.insert_new(key.into(), rec);
        }
        state
    }

    #[test]
    fn report_orders_urgent_before_needs_response() {
        let now = Utc::now();
        let state = state_with(vec![
            ("n", record(Category::NeedsResponse, now - Duration::hours(2), false, None)),
            ("u", record(Category::Urgent, now, false, None)),
        ]);
        let out = report(&state, None);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key, "u");
        assert_eq!(out[1].key, "n");
    }

    #[test]
    fn report_orders_by_date_within_category() {
        let now = Utc::now();
        let state = state_with(vec![
            ("newer", record(Category::Urgent, now, false, None)),
            ("older", record(Category::Urgent, now - Duration::hours(1), false, None)),
        ]);
        let out = report(&state, None);
        assert_eq!(out[0].key, "older");
        assert_eq!(out[1].key, "newer");
    }

    #[test]
    fn report_excludes_surfaced_and_unimportant() {
        let now = Utc::now();
        let state = state_with(vec![
            ("surfaced", record(Category::Urgent, now, true, None)),
            ("info", record(Category::Informational, now, false, None)),
            ("spam", record(Category::Spam, now, false, None)),
            ("live", record(Category::Urgent, now, false, None)),
        ]);
        let out = report(&state, None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "live");
    }

    #[test]
    fn report_filters_by_account() {
        let now = Utc::now();
        let state = state_with(vec![
            ("work", record(Category::Urgent, now, false, Some("work@x.com"))),
            ("home", record(Category::Urgent, now, false, Some("home@x.com"))),
            ("none", record(Category::Urgent, now, false, None)),
        ]);
        let out = report(&state, Some("work@x.com"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "work");
        assert_eq!(report(&state, None).len(), 3);
    }

    #[test]
    fn reported_email_serializes_flat() {
        let now = Utc::now();
        let state = state_with(vec![("u", record(Category::Urgent, now, false, None))]);
        let out = report(&state, None);
        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["key"], "u");
        assert_eq!(json["category"], "urgent");
        assert_eq!(json["from"], "f@x.com");
    }

    #[tokio::test]
    async fn mark_surfaced_empties_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = TriageStore::new(dir.path().join("triage.json"));
        let now = Utc::now();
        let mut state = state_with(vec![
            ("u", record(Category::Urgent, now, false, None)),
            ("n", record(Category::NeedsResponse, now, false, None)),
        ]);
        store.save(&mut state).await.unwrap();

        let before = stats(&store.load().await);
        assert_eq!(before.unsurfaced_urgent, 1);

        let count = mark_surfaced(&store).await.unwrap();
        assert_eq!(count, 2);

        let after_state = store.load().await;
        assert!(report(&after_state, None).is_empty());
        let after = stats(&after_state);
        assert_eq!(after.unsurfaced_urgent, before.unsurfaced_urgent - 1);
        assert_eq!(after.unsurfaced_needs_response, 0);
    }

    #[test]
    fn stats_counts_all_categories_even_when_zero() {
        let stats = stats(&StoreState::default());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.categories.len(), 4);
        assert!(stats.categories.values().all(|&c| c == 0));
    }

    #[test]
    fn stats_aggregates_categories_accounts_and_unsurfaced() {
        let now = Utc::now();
        let state = state_with(vec![
            ("u1", record(Category::Urgent, now, false, Some("work@x.com"))),
            ("u2", record(Category::Urgent, now, true, Some("work@x.com"))),
            ("n1", record(Category::NeedsResponse, now, false, Some("home@x.com"))),
            ("i1", record(Category::Informational, now, false, None)),
        ]);
        let s = stats(&state);
        assert_eq!(s.total, 4);
        assert_eq!(s.categories[&Category::Urgent], 2);
        assert_eq!(s.categories[&Category::NeedsResponse], 1);
        assert_eq!(s.categories[&Category::Spam], 0);
        assert_eq!(s.by_account["work@x.com"], 2);
        assert_eq!(s.by_account["home@x.com"], 1);
        assert_eq!(s.unsurfaced_urgent, 1);
        assert_eq!(s.unsurfaced_needs_response, 1);
    }
}

//! Durable triage store — a flat JSON file mapping dedup keys to
//! triage records.
//!
//! The file is the sole durable owner of triage state: orchestrators
//! reload it at the start of an invocation and persist at the end.
//! Loads are lenient (missing or corrupt files become empty state);
//! writes are strict and atomic (temp file + rename), since silently
//! losing triage state is unacceptable.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::classify::Category;
use crate::error::StoreError;

/// One persisted classification result.
///
/// Created once at classification time. The only field that ever
/// mutates afterwards is `surfaced` (false → true). Unknown fields from
/// newer writers are carried in `extra` and survive a load/save cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRecord {
    pub subject: String,
    pub from: String,
    pub date: DateTime<Utc>,
    pub preview: String,
    pub category: Category,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default)]
    pub surfaced: bool,
    pub triaged_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// In-memory form of the persisted state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub emails: HashMap<String, TriageRecord>,
}

impl StoreState {
    pub fn contains(&self, key: &str) -> bool {
        self.emails.contains_key(key)
    }

    /// Insert only if the key is absent — a key, once present, is never
    /// reclassified. Returns whether the record was inserted.
    pub fn insert_new(&mut self, key: String, record: TriageRecord) -> bool {
        if self.emails.contains_key(&key) {
            return false;
        }
        self.emails.insert(key, record);
        true
    }

    /// Enforce the retention bound: keep the `cap` records with the most
    /// recent `triaged_at`, drop the rest.
    pub fn evict_to_cap(&mut self, cap: usize) {
        if self.emails.len() <= cap {
            return;
        }
        let mut by_age: Vec<(String, DateTime<Utc>)> = self
            .emails
            .iter()
            .map(|(k, r)| (k.clone(), r.triaged_at))
            .collect();
        by_age.sort_by(|a, b| b.1.cmp(&a.1));
        let evicted = by_age.split_off(cap);
        for (key, _) in &evicted {
            self.emails.remove(key);
        }
        debug!(evicted = evicted.len(), cap, "Evicted old triage records");
    }

    /// Mark every unsurfaced record in the given categories as surfaced.
    /// Returns the number of records flipped.
    pub fn mark_all_surfaced(&mut self, categories: &[Category]) -> usize {
        let mut count = 0;
        for record in self.emails.values_mut() {
            if !record.surfaced && categories.contains(&record.category) {
                record.surfaced = true;
                count += 1;
            }
        }
        count
    }
}

/// File-backed triage store.
pub struct TriageStore {
    path: PathBuf,
}

impl TriageStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Load persisted state. A missing file or corrupt content yields
    /// empty state rather than an error.
    pub async fn load(&self) -> StoreState {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No readable state file, starting empty");
                return StoreState::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt state file, starting empty");
                StoreState::default()
            }
        }
    }

    /// Persist state, stamping `last_check` with the current UTC time.
    ///
    /// Writes to a temp file in the target directory and renames it over
    /// the state file, so a concurrent reader never observes a torn
    /// write. Parent directories are created as needed.
    pub async fn save(&self, state: &mut StoreState) -> Result<(), StoreError> {
        state.last_check = Some(Utc::now());

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(state)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).await.map_err(|e| StoreError::Write {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })?;

        debug!(path = %self.path.display(), records = state.emails.len(), "State saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(category: Category, triaged_at: DateTime<Utc>) -> TriageRecord {
        TriageRecord {
            subject: "subject".into(),
            from: "sender@example.com".into(),
            date: triaged_at,
            preview: "preview".into(),
            category,
            reason: "[heuristic] test".into(),
            account: None,
            surfaced: false,
            triaged_at,
            extra: serde_json::Map::new(),
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> TriageStore {
        TriageStore::new(dir.path().join("state/email-triage.json"))
    }

    #[tokio::test]
    async fn load_missing_file_yields_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = store_in(&dir).load().await;
        assert!(state.last_check.is_none());
        assert!(state.emails.is_empty());
    }

    #[tokio::test]
    async fn load_corrupt_file_yields_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.json");
        std::fs::write(&path, "{not json").unwrap();
        let state = TriageStore::new(path).load().await;
        assert!(state.emails.is_empty());
    }

    #[tokio::test]
    async fn save_creates_parent_dirs_and_stamps_last_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut state = StoreState::default();
        store.save(&mut state).await.unwrap();
        assert!(state.last_check.is_some());
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn round_trip_preserves_record_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let triaged_at = Utc::now();
        let mut rec = record(Category::Urgent, triaged_at);
        rec.account = Some("work".into());
        let mut state = StoreState::default();
        state.insert_new("k1".into(), rec);
        store.save(&mut state).await.unwrap();

        let loaded = store.load().await;
        let got = &loaded.emails["k1"];
        assert_eq!(got.subject, "subject");
        assert_eq!(got.from, "sender@example.com");
        assert_eq!(got.category, Category::Urgent);
        assert_eq!(got.reason, "[heuristic] test");
        assert_eq!(got.account.as_deref(), Some("work"));
        assert!(!got.surfaced);
        assert_eq!(got.triaged_at, state.emails["k1"].triaged_at);
    }

    #[tokio::test]
    async fn unknown_record_fields_survive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.json");
        let raw = serde_json::json!({
            "last_check": null,
            "emails": {
                "k1": {
                    "subject": "s",
                    "from": "f@x.com",
                    "date": "2025-01-06T10:30:00Z",
                    "preview": "p",
                    "category": "spam",
                    "reason": "r",
                    "surfaced": false,
                    "triaged_at": "2025-01-06T10:31:00Z",
                    "label": "added-by-newer-tool"
                }
            }
        });
        std::fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

        let store = TriageStore::new(path);
        let mut state = store.load().await;
        assert_eq!(state.emails["k1"].extra["label"], "added-by-newer-tool");

        store.save(&mut state).await.unwrap();
        let reloaded = store.load().await;
        assert_eq!(reloaded.emails["k1"].extra["label"], "added-by-newer-tool");
    }

    #[test]
    fn insert_new_refuses_existing_key() {
        let mut state = StoreState::default();
        assert!(state.insert_new("k".into(), record(Category::Spam, Utc::now())));
        assert!(!state.insert_new("k".into(), record(Category::Urgent, Utc::now())));
        assert_eq!(state.emails["k"].category, Category::Spam);
    }

    #[test]
    fn evict_keeps_most_recent_records() {
        let mut state = StoreState::default();
        let base = Utc::now();
        for i in 0..5 {
            state.insert_new(
                format!("k{i}"),
                record(Category::Informational, base + Duration::seconds(i)),
            );
        }
        state.evict_to_cap(3);
        assert_eq!(state.emails.len(), 3);
        assert!(state.contains("k2"));
        assert!(state.contains("k3"));
        assert!(state.contains("k4"));
    }

    #[test]
    fn evict_noop_under_cap() {
        let mut state = StoreState::default();
        state.insert_new("k".into(), record(Category::Spam, Utc::now()));
        state.evict_to_cap(3);
        assert_eq!(state.emails.len(), 1);
    }

    #[test]
    fn mark_all_surfaced_flips_only_matching_categories() {
        let mut state = StoreState::default();
        let now = Utc::now();
        state.insert_new("u".into(), record(Category::Urgent, now));
        state.insert_new("n".into(), record(Category::NeedsResponse, now));
        state.insert_new("i".into(), record(Category::Informational, now));

        let count = state.mark_all_surfaced(&Category::IMPORTANT);
        assert_eq!(count, 2);
        assert!(state.emails["u"].surfaced);
        assert!(state.emails["n"].surfaced);
        assert!(!state.emails["i"].surfaced);

        // Second pass finds nothing left to flip.
        assert_eq!(state.mark_all_surfaced(&Category::IMPORTANT), 0);
    }
}

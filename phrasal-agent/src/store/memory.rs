//! In-memory expression store.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use tracing::{debug, info};

use phrasal_core::LearningBundle;

use super::traits::{ExpressionStore, StoreError};

#[derive(Debug, Clone)]
struct StoredBundle {
    seq: u64,
    bundle: LearningBundle,
    stored_at: DateTime<Utc>,
}

/// DashMap-backed store.
///
/// Fuzzy lookup matches stored expressions that start with or contain the
/// query, prefix matches first, each group in insertion order. Row ids are
/// `"1"`, `"2"`, ... in result order.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredBundle>,
    next_seq: AtomicU64,
    fail_lookups: AtomicBool,
    fail_persist: AtomicBool,
    exact_calls: AtomicU32,
    fuzzy_calls: AtomicU32,
    persist_calls: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with bundles, in order.
    pub fn with_bundles(bundles: impl IntoIterator<Item = LearningBundle>) -> Self {
        let store = Self::new();
        for bundle in bundles {
            store.insert(bundle);
        }
        store
    }

    /// Make lookups fail with [`StoreError::Unavailable`].
    pub fn with_failing_lookups(self, fail: bool) -> Self {
        self.fail_lookups.store(fail, Ordering::SeqCst);
        self
    }

    /// Make persist fail with [`StoreError::Unavailable`].
    pub fn with_failing_persist(self, fail: bool) -> Self {
        self.fail_persist.store(fail, Ordering::SeqCst);
        self
    }

    pub fn insert(&self, bundle: LearningBundle) {
        match self.entries.entry(bundle.expression.clone()) {
            Entry::Occupied(mut existing) => {
                let existing = existing.get_mut();
                existing.bundle = bundle;
                existing.stored_at = Utc::now();
            }
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                slot.insert(StoredBundle {
                    seq,
                    bundle,
                    stored_at: Utc::now(),
                });
            }
        }
    }

    pub fn get(&self, expression: &str) -> Option<LearningBundle> {
        self.entries.get(expression).map(|e| e.bundle.clone())
    }

    /// When `expression` was last written.
    pub fn stored_at(&self, expression: &str) -> Option<DateTime<Utc>> {
        self.entries.get(expression).map(|e| e.stored_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn exact_calls(&self) -> u32 {
        self.exact_calls.load(Ordering::SeqCst)
    }

    pub fn fuzzy_calls(&self) -> u32 {
        self.fuzzy_calls.load(Ordering::SeqCst)
    }

    pub fn persist_calls(&self) -> u32 {
        self.persist_calls.load(Ordering::SeqCst)
    }

    /// All bundles in insertion order.
    pub fn bundles(&self) -> Vec<LearningBundle> {
        let mut entries: Vec<StoredBundle> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.bundle).collect()
    }

    /// Load a JSON array of bundles. A missing file yields an empty store.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            debug!(path = %path.display(), "Store file not found, starting empty");
            return Ok(Self::new());
        }
        let content = tokio::fs::read_to_string(path).await?;
        let bundles: Vec<LearningBundle> = serde_json::from_str(&content)?;
        info!(path = %path.display(), count = bundles.len(), "Loaded store");
        Ok(Self::with_bundles(bundles))
    }

    /// Write all bundles as a JSON array, in insertion order.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&self.bundles())?;
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(())
    }

    fn check_lookups(&self) -> Result<(), StoreError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("lookups disabled".to_string()));
        }
        Ok(())
    }
}

fn candidate_row(id: usize, bundle: &LearningBundle) -> Value {
    let selection = bundle.selection_meta.as_ref();
    let sense_label = selection
        .map(|s| s.selected_sense_label.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&bundle.expression);
    let short_hint = bundle
        .meaning
        .as_ref()
        .map(|m| m.real_usage.as_str())
        .unwrap_or_default();
    let domains: Vec<&str> = selection.map(|s| vec![s.selected_domain.as_str()]).unwrap_or_default();

    json!({
        "id": id.to_string(),
        "phrase": bundle.expression,
        "senseLabel": sense_label,
        "shortHint": short_hint,
        "domains": domains,
    })
}

#[async_trait]
impl ExpressionStore for MemoryStore {
    async fn lookup_exact(&self, expression: &str) -> Result<Option<LearningBundle>, StoreError> {
        self.exact_calls.fetch_add(1, Ordering::SeqCst);
        self.check_lookups()?;
        Ok(self.get(expression))
    }

    async fn lookup_fuzzy(&self, query: &str) -> Result<Vec<Value>, StoreError> {
        self.fuzzy_calls.fetch_add(1, Ordering::SeqCst);
        self.check_lookups()?;

        let mut matches: Vec<(bool, u64, LearningBundle)> = self
            .entries
            .iter()
            .filter(|e| e.key() != query && e.key().contains(query))
            .map(|e| (!e.key().starts_with(query), e.seq, e.bundle.clone()))
            .collect();
        matches.sort_by_key(|(not_prefix, seq, _)| (*not_prefix, *seq));

        Ok(matches
            .iter()
            .enumerate()
            .map(|(i, (_, _, bundle))| candidate_row(i + 1, bundle))
            .collect())
    }

    async fn persist(&self, bundle: &LearningBundle) -> Result<(), StoreError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("persist disabled".to_string()));
        }
        self.insert(bundle.clone());
        Ok(())
    }
}

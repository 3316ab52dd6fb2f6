use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::Mutex;

use crate::error::{CatalogError, Result};
use crate::store::{RecordFields, Store};

use async_trait::async_trait;

/// In-memory store double for deterministic tests.
///
/// Every operation runs under one lock, so an attempt can never race a real
/// writer mid-flight; the optimistic fence therefore only trips when a test
/// forces it via [`MemoryStore::force_conflicts`]. Ranked reads use the same
/// tie-break as the production store: descending score, then descending
/// member order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    forced_conflicts: AtomicU32,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, RecordFields>,
    ranks: HashMap<String, HashMap<String, i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record at `key`.
    pub async fn put_record(&self, key: &str, fields: RecordFields) {
        self.inner.lock().await.records.insert(key.to_string(), fields);
    }

    /// Set the score of `member` in the sorted set at `rank_key`.
    pub async fn put_score(&self, rank_key: &str, member: &str, score: i64) {
        self.inner
            .lock()
            .await
            .ranks
            .entry(rank_key.to_string())
            .or_default()
            .insert(member.to_string(), score);
    }

    /// Current score of `member`, if any.
    pub async fn score(&self, rank_key: &str, member: &str) -> Option<i64> {
        self.inner
            .lock()
            .await
            .ranks
            .get(rank_key)
            .and_then(|scores| scores.get(member))
            .copied()
    }

    /// Raw field value of a record, if any.
    pub async fn record_field(&self, key: &str, field: &str) -> Option<String> {
        self.inner
            .lock()
            .await
            .records
            .get(key)
            .and_then(|fields| fields.get(field))
            .cloned()
    }

    /// Make the next `n` ranked-read attempts report a tripped fence.
    pub fn force_conflicts(&self, n: u32) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn record_fields(&self, key: &str) -> Result<RecordFields> {
        Ok(self
            .inner
            .lock()
            .await
            .records
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_exists(&self, key: &str) -> Result<bool> {
        Ok(self.inner.lock().await.records.contains_key(key))
    }

    async fn increment_record_and_rank(
        &self,
        record_key: &str,
        field: &str,
        rank_key: &str,
        member: &str,
        delta: i64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let fields = inner.records.entry(record_key.to_string()).or_default();
        let current: i64 = match fields.get(field) {
            Some(value) => value.parse().map_err(|_| {
                CatalogError::StoreUnavailable(format!(
                    "field `{field}` of {record_key} is not an integer"
                ))
            })?,
            None => 0,
        };
        fields.insert(field.to_string(), (current + delta).to_string());

        let scores = inner.ranks.entry(rank_key.to_string()).or_default();
        *scores.entry(member.to_string()).or_insert(0) += delta;

        Ok(())
    }

    async fn ranked_records(
        &self,
        rank_key: &str,
        count: usize,
        record_prefix: &str,
    ) -> Result<Option<Vec<(String, RecordFields)>>> {
        if self.take_forced_conflict() {
            return Ok(None);
        }

        let inner = self.inner.lock().await;

        let mut ranked: Vec<(&String, i64)> = inner
            .ranks
            .get(rank_key)
            .map(|scores| scores.iter().map(|(m, s)| (m, *s)).collect())
            .unwrap_or_default();
        // Score descending, equal scores in descending member order, matching
        // a reversed range read of the production sorted set.
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(a.0)));

        let snapshot = ranked
            .into_iter()
            .take(count)
            .map(|(member, _)| {
                let fields = inner
                    .records
                    .get(&format!("{record_prefix}{member}"))
                    .cloned()
                    .unwrap_or_default();
                (member.clone(), fields)
            })
            .collect();

        Ok(Some(snapshot))
    }
}

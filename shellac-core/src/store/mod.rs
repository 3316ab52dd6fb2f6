//! Store port and its adapters.
//!
//! The repository composes the primitives below; adapters own connection
//! handling. [`RedisStore`] is the production adapter, [`MemoryStore`] the
//! deterministic test double.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Field map of one stored record, as returned by a hash read.
pub type RecordFields = HashMap<String, String>;

/// The key-value store primitives the album repository is built from.
///
/// Every method checks out one connection for the duration of the call and
/// returns it before the future resolves, regardless of outcome.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read all fields of the hash record at `key`. A missing key is
    /// indistinguishable from an empty record and reads as an empty map.
    async fn record_fields(&self, key: &str) -> Result<RecordFields>;

    /// Whether a hash record exists at `key`.
    async fn record_exists(&self, key: &str) -> Result<bool>;

    /// Atomically add `delta` to `field` of the record at `record_key` and to
    /// the score of `member` in the sorted set at `rank_key`. The store
    /// applies both as one indivisible group: no other operation can observe
    /// one increment without the other.
    async fn increment_record_and_rank(
        &self,
        record_key: &str,
        field: &str,
        rank_key: &str,
        member: &str,
        delta: i64,
    ) -> Result<()>;

    /// One optimistic attempt at a consistent ranked read.
    ///
    /// Fences the sorted set at `rank_key`, reads its top `count` members by
    /// descending score (equal scores in descending member order), then reads
    /// the record at `{record_prefix}{member}` for each within a single
    /// atomic group. Returns `Ok(None)` when the fence tripped because some
    /// other party mutated the sorted set mid-attempt; the caller decides
    /// whether to retry.
    async fn ranked_records(
        &self,
        rank_key: &str,
        count: usize,
        record_prefix: &str,
    ) -> Result<Option<Vec<(String, RecordFields)>>>;
}

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::album::Album;
use crate::error::{CatalogError, Result};
use crate::store::Store;

/// Key scheme shared by every store adapter.
#[derive(Debug, Clone, Copy)]
pub struct CatalogKeys;

impl CatalogKeys {
    /// Sorted set mapping album id to its likes count.
    pub const RANKING: &'static str = "likes";

    /// Counter field inside each album record.
    pub const LIKES_FIELD: &'static str = "likes";

    pub const RECORD_PREFIX: &'static str = "album:";

    pub fn record(id: &str) -> String {
        format!("{}{id}", Self::RECORD_PREFIX)
    }
}

/// How many entries a popular query returns.
pub const TOP_COUNT: usize = 3;

/// Data-access layer for the album catalog.
///
/// Keeps the per-album record and the global ranking in lock-step: the score
/// of every existing album in [`CatalogKeys::RANKING`] equals the record's
/// likes field after every completed [`add_like`](Self::add_like).
pub struct AlbumRepository {
    store: Arc<dyn Store>,
    top_retry_limit: Option<u32>,
}

impl fmt::Debug for AlbumRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlbumRepository")
            .field("top_retry_limit", &self.top_retry_limit)
            .finish_non_exhaustive()
    }
}

impl AlbumRepository {
    /// By default ranked reads retry indefinitely; conflicts are rare
    /// relative to read latency.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            top_retry_limit: None,
        }
    }

    /// Cap the optimistic retry loop. Exceeding the cap surfaces
    /// [`CatalogError::Contention`] so callers can apply backoff.
    pub fn with_top_retry_limit(mut self, limit: Option<u32>) -> Self {
        self.top_retry_limit = limit;
        self
    }

    /// Look up one album by id.
    pub async fn find(&self, id: &str) -> Result<Album> {
        let fields = self.store.record_fields(&CatalogKeys::record(id)).await?;
        if fields.is_empty() {
            // The store cannot distinguish a missing key from an empty
            // record; both mean the album does not exist.
            return Err(CatalogError::NotFound);
        }
        Album::from_fields(id, &fields)
    }

    /// Add one like to an album, updating the record and the ranking as one
    /// indivisible group.
    pub async fn add_like(&self, id: &str) -> Result<()> {
        let key = CatalogKeys::record(id);

        // Check-then-act is sound only because album records are never
        // deleted; revisit this if deletion ever becomes a feature.
        if !self.store.record_exists(&key).await? {
            return Err(CatalogError::NotFound);
        }

        self.store
            .increment_record_and_rank(
                &key,
                CatalogKeys::LIKES_FIELD,
                CatalogKeys::RANKING,
                id,
                1,
            )
            .await
    }

    /// The three most-liked albums, in descending rank order.
    ///
    /// Returns a consistent snapshot of the ranking and its records. A
    /// concurrent like between the ranked read and the record reads trips
    /// the store's optimistic fence and the whole attempt restarts. Fewer
    /// than three albums is not an error: the result has 0 to 3 entries.
    pub async fn top_three(&self) -> Result<Vec<Album>> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let snapshot = self
                .store
                .ranked_records(
                    CatalogKeys::RANKING,
                    TOP_COUNT,
                    CatalogKeys::RECORD_PREFIX,
                )
                .await?;

            let Some(ranked) = snapshot else {
                debug!(attempts, "ranking changed mid-read, retrying");
                if let Some(limit) = self.top_retry_limit
                    && attempts >= limit
                {
                    warn!(attempts, "abandoning contended ranking read");
                    return Err(CatalogError::Contention { attempts });
                }
                continue;
            };

            let mut albums = Vec::with_capacity(ranked.len());
            for (id, fields) in &ranked {
                albums.push(Album::from_fields(id, fields)?);
            }
            return Ok(albums);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RecordFields};

    fn record(title: &str, artist: &str, price: &str, likes: u64) -> RecordFields {
        [
            ("title".to_string(), title.to_string()),
            ("artist".to_string(), artist.to_string()),
            ("price".to_string(), price.to_string()),
            ("likes".to_string(), likes.to_string()),
        ]
        .into_iter()
        .collect()
    }

    async fn seeded(entries: &[(&str, u64)]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (id, likes) in entries {
            store
                .put_record(
                    &CatalogKeys::record(id),
                    record(&format!("Album {id}"), "Artist", "9.99", *likes),
                )
                .await;
            store
                .put_score(CatalogKeys::RANKING, id, *likes as i64)
                .await;
        }
        store
    }

    #[tokio::test]
    async fn find_returns_the_stored_album() {
        let store = seeded(&[("1", 8)]).await;
        let repo = AlbumRepository::new(store);

        let album = repo.find("1").await.unwrap();
        assert_eq!(album.title, "Album 1");
        assert_eq!(album.likes, 8);
    }

    #[tokio::test]
    async fn find_unknown_id_is_not_found() {
        let store = seeded(&[]).await;
        let repo = AlbumRepository::new(store);

        assert!(matches!(repo.find("999").await, Err(CatalogError::NotFound)));
    }

    #[tokio::test]
    async fn add_like_updates_record_and_ranking_together() {
        let store = seeded(&[("7", 0)]).await;
        let repo = AlbumRepository::new(store.clone());

        repo.add_like("7").await.unwrap();

        assert_eq!(repo.find("7").await.unwrap().likes, 1);
        assert_eq!(store.score(CatalogKeys::RANKING, "7").await, Some(1));
    }

    #[tokio::test]
    async fn add_like_unknown_id_mutates_nothing() {
        let store = seeded(&[("1", 3)]).await;
        let repo = AlbumRepository::new(store.clone());

        assert!(matches!(
            repo.add_like("999").await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(repo.find("999").await, Err(CatalogError::NotFound)));
        assert_eq!(store.score(CatalogKeys::RANKING, "999").await, None);
        // The existing album is untouched.
        assert_eq!(repo.find("1").await.unwrap().likes, 3);
    }

    #[tokio::test]
    async fn concurrent_likes_lose_no_updates() {
        let store = seeded(&[("7", 0)]).await;
        let repo = Arc::new(AlbumRepository::new(store.clone()));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.add_like("7").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(repo.find("7").await.unwrap().likes, 32);
        assert_eq!(store.score(CatalogKeys::RANKING, "7").await, Some(32));
    }

    #[tokio::test]
    async fn top_three_orders_by_likes_with_deterministic_ties() {
        let store = seeded(&[("1", 5), ("2", 9), ("3", 2), ("4", 9)]).await;
        let repo = AlbumRepository::new(store);

        let top = repo.top_three().await.unwrap();
        let ids: Vec<&str> = top.iter().map(|a| a.id.as_str()).collect();

        // 2 and 4 tie at 9 likes; ties rank in descending id order.
        assert_eq!(ids, ["4", "2", "1"]);
        assert_eq!(top[0].likes, 9);
        assert_eq!(top[2].likes, 5);
    }

    #[tokio::test]
    async fn top_three_with_fewer_albums_returns_what_exists() {
        let store = seeded(&[("1", 4), ("2", 6)]).await;
        let repo = AlbumRepository::new(store);

        let top = repo.top_three().await.unwrap();
        let ids: Vec<&str> = top.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["2", "1"]);
    }

    #[tokio::test]
    async fn top_three_with_no_albums_is_empty() {
        let store = seeded(&[]).await;
        let repo = AlbumRepository::new(store);

        assert!(repo.top_three().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn top_three_retries_past_tripped_fences() {
        let store = seeded(&[("1", 1)]).await;
        store.force_conflicts(3);
        let repo = AlbumRepository::new(store);

        let top = repo.top_three().await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn top_three_surfaces_contention_past_the_ceiling() {
        let store = seeded(&[("1", 1)]).await;
        store.force_conflicts(10);
        let repo =
            AlbumRepository::new(store).with_top_retry_limit(Some(4));

        assert!(matches!(
            repo.top_three().await,
            Err(CatalogError::Contention { attempts: 4 })
        ));
    }

    #[tokio::test]
    async fn top_three_reports_corrupt_records() {
        let store = seeded(&[]).await;
        store
            .put_record(
                &CatalogKeys::record("1"),
                [("title".to_string(), "broken".to_string())]
                    .into_iter()
                    .collect(),
            )
            .await;
        store.put_score(CatalogKeys::RANKING, "1", 5).await;
        let repo = AlbumRepository::new(store);

        assert!(matches!(
            repo.top_three().await,
            Err(CatalogError::MalformedRecord(_))
        ));
    }
}

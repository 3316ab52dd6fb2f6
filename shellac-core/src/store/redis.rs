use std::fmt;

use redis::{AsyncCommands, aio::ConnectionManager};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::store::{RecordFields, Store};

use async_trait::async_trait;

/// Redis-backed store with a bounded connection pool.
///
/// `WATCH` state lives on a connection, so pooled connections are handed out
/// exclusively: one checkout per logical operation, returned to the idle list
/// on success. A connection that errors mid-operation may carry unknown
/// transactional state and is dropped instead of recycled; the next checkout
/// dials a replacement.
pub struct RedisStore {
    client: redis::Client,
    idle: Mutex<Vec<ConnectionManager>>,
    slots: Semaphore,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("connections", &self.slots.available_permits())
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to the store and verify it is reachable. Called once at
    /// startup; the pool lives for the life of the process.
    pub async fn connect(url: &str, pool_size: usize) -> Result<Self> {
        info!("Connecting to album store at {}", url);

        let client = redis::Client::open(url)
            .map_err(|e| CatalogError::StoreUnavailable(format!("invalid store URL: {e}")))?;

        // Dial one connection up front so a bad address fails at startup
        // rather than on the first request.
        let conn = ConnectionManager::new(client.clone()).await?;

        info!("Connected to album store (pool of {})", pool_size);

        Ok(Self {
            client,
            idle: Mutex::new(vec![conn]),
            slots: Semaphore::new(pool_size.max(1)),
        })
    }

    async fn checkout(&self) -> Result<(SemaphorePermit<'_>, ConnectionManager)> {
        let permit = self.slots.acquire().await.map_err(|_| {
            CatalogError::StoreUnavailable("connection pool closed".to_string())
        })?;

        let idle = self.idle.lock().await.pop();
        let conn = match idle {
            Some(conn) => conn,
            None => {
                debug!("pool empty, dialing a new store connection");
                ConnectionManager::new(self.client.clone()).await?
            }
        };

        Ok((permit, conn))
    }

    async fn recycle(&self, conn: ConnectionManager) {
        self.idle.lock().await.push(conn);
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn record_fields(&self, key: &str) -> Result<RecordFields> {
        let (_permit, mut conn) = self.checkout().await?;
        let fields: RecordFields = conn.hgetall(key).await?;
        self.recycle(conn).await;
        Ok(fields)
    }

    async fn record_exists(&self, key: &str) -> Result<bool> {
        let (_permit, mut conn) = self.checkout().await?;
        let exists: bool = conn.exists(key).await?;
        self.recycle(conn).await;
        Ok(exists)
    }

    async fn increment_record_and_rank(
        &self,
        record_key: &str,
        field: &str,
        rank_key: &str,
        member: &str,
        delta: i64,
    ) -> Result<()> {
        let (_permit, mut conn) = self.checkout().await?;

        // MULTI/EXEC: both increments apply as one indivisible group.
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hincr(record_key, field, delta)
            .ignore()
            .zincr(rank_key, member, delta)
            .ignore();
        pipe.query_async::<()>(&mut conn).await?;

        self.recycle(conn).await;
        Ok(())
    }

    async fn ranked_records(
        &self,
        rank_key: &str,
        count: usize,
        record_prefix: &str,
    ) -> Result<Option<Vec<(String, RecordFields)>>> {
        if count == 0 {
            return Ok(Some(Vec::new()));
        }

        let (_permit, mut conn) = self.checkout().await?;

        // Arm the fence before the ranked read: any mutation of the sorted
        // set between here and EXEC turns the transaction into a no-op.
        redis::cmd("WATCH")
            .arg(rank_key)
            .query_async::<()>(&mut conn)
            .await?;

        let members: Vec<String> = conn
            .zrevrange(rank_key, 0, count as isize - 1)
            .await?;

        if members.is_empty() {
            redis::cmd("UNWATCH").query_async::<()>(&mut conn).await?;
            self.recycle(conn).await;
            return Ok(Some(Vec::new()));
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for member in &members {
            pipe.hgetall(format!("{record_prefix}{member}"));
        }

        // EXEC replies nil when the watched key changed; the redis crate
        // surfaces that as None.
        let reply: Option<Vec<RecordFields>> = pipe.query_async(&mut conn).await?;
        self.recycle(conn).await;

        Ok(reply.map(|records| members.into_iter().zip(records).collect()))
    }
}

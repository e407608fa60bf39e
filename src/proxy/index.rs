//! Scored candidate ranking backed by a Redis sorted set.
//!
//! The set doubles as dedup and health state: a fresh candidate enters at
//! [`INIT_SCORE`], every successful probe pins it to [`MAX_SCORE`], every
//! failed probe costs one point, and the floor evicts. The selection API
//! prefers the `MAX` tier so callers always get the freshest-verified proxy
//! first.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

use crate::core::error::StoreError;
use crate::core::pick_uniform;

pub const MIN_SCORE: f64 = 0.0;
pub const INIT_SCORE: f64 = 10.0;
pub const MAX_SCORE: f64 = 100.0;

/// Fallback window for [`ScoredIndex::random_top`] when no member is pinned
/// at `MAX_SCORE`: the best up-to-100 members by descending score.
const TOP_WINDOW: isize = 100;

const OPEN_TIMEOUT_SECS: u64 = 5;

/// The persistent sorted ranking the proxy scheduler works against.
///
/// Implementations must keep every operation individually atomic; the
/// schedulers never assume multi-key transactions.
#[async_trait]
pub trait ScoredIndex: Send + Sync {
    /// Insert `candidate` with `score` if absent. A present candidate is a
    /// silent no-op — `add` never errors on duplicates. Fails with
    /// [`StoreError::OutOfRange`] when `score` lies outside `[MIN, MAX]`.
    async fn add(&self, candidate: &str, score: f64) -> Result<(), StoreError>;

    /// Insert-if-absent at [`INIT_SCORE`].
    async fn add_default(&self, candidate: &str) -> Result<(), StoreError> {
        self.add(candidate, INIT_SCORE).await
    }

    /// Unconditionally pin `candidate` at [`MAX_SCORE`], creating it if absent.
    async fn set_max(&self, candidate: &str) -> Result<(), StoreError>;

    /// Subtract one point, evicting once the score has reached the floor
    /// (`score <= MIN + 1`). Fails with [`StoreError::NotFound`] when the
    /// candidate was never stored.
    async fn decrement(&self, candidate: &str) -> Result<(), StoreError>;

    async fn exists(&self, candidate: &str) -> Result<bool, StoreError>;

    /// Uniform pick from the `MAX` tier; with an empty tier, uniform pick
    /// from the best up-to-100 members by descending score. Fails with
    /// [`StoreError::Empty`] when the index holds nothing.
    async fn random_top(&self) -> Result<String, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Snapshot of every stored candidate. Ordering is unspecified.
    async fn get_all(&self) -> Result<Vec<String>, StoreError>;

    /// Best-effort removal; each candidate is passed as an individual member.
    async fn remove(&self, candidates: &[String]) -> Result<(), StoreError>;
}

/// Production [`ScoredIndex`] on one Redis sorted set.
pub struct RedisIndex {
    conn: redis::aio::MultiplexedConnection,
    key: String,
}

impl RedisIndex {
    /// Connect and ping within a 5 s budget. A store that cannot be reached
    /// at construction is fatal; everything after this is per-item.
    pub async fn open(addr: &str, password: &str, key: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(store_url(addr, password))?;
        let conn = tokio::time::timeout(
            Duration::from_secs(OPEN_TIMEOUT_SECS),
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| StoreError::ConnectTimeout(OPEN_TIMEOUT_SECS))??;

        info!("scored index open: {} (key {})", addr, key);
        Ok(Self {
            conn,
            key: key.to_string(),
        })
    }

    fn conn(&self) -> redis::aio::MultiplexedConnection {
        self.conn.clone()
    }
}

#[async_trait]
impl ScoredIndex for RedisIndex {
    async fn add(&self, candidate: &str, score: f64) -> Result<(), StoreError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(StoreError::OutOfRange(score));
        }
        let mut conn = self.conn();
        let existing: Option<f64> = conn.zscore(&self.key, candidate).await?;
        if existing.is_none() {
            let _: () = conn.zadd(&self.key, candidate, score).await?;
        }
        Ok(())
    }

    async fn set_max(&self, candidate: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let _: () = conn.zadd(&self.key, candidate, MAX_SCORE).await?;
        Ok(())
    }

    async fn decrement(&self, candidate: &str) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let score: Option<f64> = conn.zscore(&self.key, candidate).await?;
        let Some(score) = score else {
            return Err(StoreError::NotFound(candidate.to_string()));
        };
        if score > MIN_SCORE + 1.0 {
            let _: f64 = conn.zincr(&self.key, candidate, -1.0).await?;
        } else {
            let _: () = conn.zrem(&self.key, candidate).await?;
        }
        Ok(())
    }

    async fn exists(&self, candidate: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn();
        let score: Option<f64> = conn.zscore(&self.key, candidate).await?;
        Ok(score.is_some())
    }

    async fn random_top(&self) -> Result<String, StoreError> {
        let mut conn = self.conn();
        let pinned: Vec<String> = conn.zrangebyscore(&self.key, MAX_SCORE, MAX_SCORE).await?;
        if let Some(candidate) = pick_uniform(&pinned) {
            return Ok(candidate);
        }
        let best: Vec<String> = conn.zrevrange(&self.key, 0, TOP_WINDOW - 1).await?;
        pick_uniform(&best).ok_or_else(|| StoreError::Empty(self.key.clone()))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let mut conn = self.conn();
        Ok(conn.zcard(&self.key).await?)
    }

    async fn get_all(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn();
        Ok(conn.zrangebyscore(&self.key, MIN_SCORE, MAX_SCORE).await?)
    }

    async fn remove(&self, candidates: &[String]) -> Result<(), StoreError> {
        if candidates.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn.zrem(&self.key, candidates.to_vec()).await?;
        Ok(())
    }
}

fn store_url(addr: &str, password: &str) -> String {
    if password.is_empty() {
        format!("redis://{addr}/0")
    } else {
        format!("redis://:{password}@{addr}/0")
    }
}

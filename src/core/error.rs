use thiserror::Error;

/// Failures surfaced by the persistent pool stores.
///
/// Per-item store failures never abort a scheduler sweep — callers log and
/// move on. Connection failures are fatal at construction only.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A score outside the closed `[0, 100]` interval was passed to `add`.
    #[error("score {0} must lie in [0, 100]")]
    OutOfRange(f64),

    /// The addressed member was never stored (or has already been evicted).
    #[error("no entry for {0:?}")]
    NotFound(String),

    /// Random selection over a pool that holds nothing.
    #[error("nothing stored under key {0:?}")]
    Empty(String),

    /// Opening the store took longer than the connect budget.
    #[error("store connect timed out after {0} s")]
    ConnectTimeout(u64),

    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

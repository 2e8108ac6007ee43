use thiserror::Error;

/// Event store failures. Cache trouble never surfaces here; the cache
/// layer degrades to recompute and only logs.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Database error: {0}")]
    Database(#[from] sql_connection::PgError),
    #[error("Connection error: {0}")]
    Connection(#[from] sql_connection::PoolError),
}

impl EventError {
    /// True when the store could not be reached at all, as opposed to a
    /// query that the store rejected.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, EventError::Connection(_))
    }
}

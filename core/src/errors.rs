use thiserror::Error;

/// Native store query failures.
///
/// Surfaced to the caller as-is; native calls run in-process and are assumed
/// available within a browser session, so nothing retries them.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("History store query failed: {reason}")]
    HistoryQueryFailed { reason: String },

    #[error("Bookmark store query failed: {reason}")]
    BookmarkQueryFailed { reason: String },

    #[error("History entry not found: {url}")]
    HistoryEntryNotFound { url: String },

    #[error("Bookmark not found: {id}")]
    BookmarkNotFound { id: String },
}

/// Metadata fetch failures.
///
/// Always recovered locally: the affected site resolves without metadata and
/// downstream filtering drops it. Never propagated past the enricher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP client construction failed: {reason}")]
    Client { reason: String },

    #[error("Request failed for {url}: {reason}")]
    Request { url: String, reason: String },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Response body unreadable for {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("Response body too large for {url}: {size} bytes")]
    TooLarge { url: String, size: usize },

    #[error("Fetch scheduler shut down")]
    Shutdown,
}

/// Persisted key-value store failures.
///
/// Fatal for the single operation that hit them; callers degrade to missing
/// previews rather than crashing.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to open cache database: {reason}")]
    Open { reason: String },

    #[error("Cache read failed: {reason}")]
    Read { reason: String },

    #[error("Cache write failed: {reason}")]
    Write { reason: String },
}

/// Main error type for the engine.
#[derive(Debug, Error)]
pub enum LinkEngineError {
    #[error("Aggregation error: {source}")]
    Aggregation {
        #[from]
        source: AggregationError,
    },

    #[error("Fetch error: {source}")]
    Fetch {
        #[from]
        source: FetchError,
    },

    #[error("Cache error: {source}")]
    Cache {
        #[from]
        source: CacheError,
    },
}

/// Result type alias for convenience
pub type Result<T, E = LinkEngineError> = std::result::Result<T, E>;

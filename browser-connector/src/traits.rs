//! Native store traits

use async_trait::async_trait;
use link_engine_core::*;

/// Read access to a native browsing-history store.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Range search over the store.
    ///
    /// Native bound matching is inclusive-OR: a record matches when its
    /// visit time satisfies either bound. Callers needing a logical AND on
    /// the range must post-filter.
    async fn search(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, AggregationError>;

    /// Delete every visit recorded for the given URL.
    async fn delete_url(&self, url: &str) -> Result<(), AggregationError>;
}

/// Read access to a native bookmark store.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// The full bookmark tree, folder nodes included.
    async fn tree(&self) -> Result<Vec<BookmarkNode>, AggregationError>;

    /// Bookmark nodes whose URL matches exactly.
    async fn search_by_url(&self, url: &str) -> Result<Vec<BookmarkNode>, AggregationError>;

    /// Remove a bookmark node by id.
    async fn remove(&self, id: &str) -> Result<(), AggregationError>;
}

//! User blocklist over the persisted blocked-URL store.

use data_access::BlocklistRepository;
use link_engine_core::*;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Exact-URL blocklist. Blocked URLs are removed from every result set the
/// engine produces.
pub struct Blocklist {
    repo: Arc<dyn BlocklistRepository>,
}

impl Blocklist {
    pub fn new(repo: Arc<dyn BlocklistRepository>) -> Self {
        Self { repo }
    }

    /// Records a block for the exact URL. Blocking an already blocked URL
    /// refreshes its block time.
    pub async fn block(&self, url: &str) -> Result<(), CacheError> {
        self.repo.add(url).await?;
        info!(url, "URL blocked");
        Ok(())
    }

    /// Removes the block for a URL. Unblocking a URL that is not blocked is
    /// a no-op.
    pub async fn unblock(&self, url: &str) -> Result<(), CacheError> {
        self.repo.remove(url).await
    }

    /// Clears every block.
    pub async fn unblock_all(&self) -> Result<(), CacheError> {
        self.repo.remove_all().await?;
        info!("Blocklist cleared");
        Ok(())
    }

    pub async fn is_blocked(&self, url: &str) -> Result<bool, CacheError> {
        self.repo.contains(url).await
    }

    /// Drops blocked URLs from a result list, preserving order. The block
    /// set is loaded once, so filtering is linear in links plus blocks.
    pub async fn filter(&self, links: Vec<Link>) -> Result<Vec<Link>, CacheError> {
        let blocked: HashSet<String> = self
            .repo
            .get_all()
            .await?
            .into_iter()
            .map(|b| b.url)
            .collect();
        if blocked.is_empty() {
            return Ok(links);
        }
        Ok(links
            .into_iter()
            .filter(|link| !blocked.contains(&link.url))
            .collect())
    }
}

//! History and bookmark aggregation.
//!
//! Merges native history and bookmark stores into unified [`Link`] lists.
//! History rows carry visit data; a bookmark sharing the URL contributes its
//! guid and creation time to the merged record. Blocked URLs never leave
//! this layer.

use crate::blocklist::Blocklist;
use browser_connector::{BookmarkStore, HistoryStore};
use link_engine_core::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

/// Derives a conventional favicon URL from a link URL. Non-HTTP URLs get no
/// favicon.
pub fn favicon_for(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    let host = parsed.host_str()?;
    Some(format!("{}://{}/favicon.ico", parsed.scheme(), host))
}

/// Merges the native stores into deduplicated, blocklist-filtered links.
pub struct LinkAggregator {
    history: Arc<dyn HistoryStore>,
    bookmarks: Arc<dyn BookmarkStore>,
    blocklist: Arc<Blocklist>,
    cache_state: Arc<RwLock<CacheState>>,
}

impl LinkAggregator {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        bookmarks: Arc<dyn BookmarkStore>,
        blocklist: Arc<Blocklist>,
    ) -> Self {
        Self {
            history,
            bookmarks,
            blocklist,
            cache_state: Arc::new(RwLock::new(CacheState::default())),
        }
    }

    pub async fn cache_state(&self) -> CacheState {
        *self.cache_state.read().await
    }

    /// History links in the query range, newest first.
    ///
    /// Native stores match time bounds with an inclusive OR, so the range is
    /// re-checked here as a strict AND with exclusive bounds. URLs are
    /// unique in the result; the newest visit per URL wins. A bookmark
    /// sharing a URL annotates the link with its guid and creation time.
    pub async fn get_history(&self, query: &HistoryQuery) -> Result<Vec<Link>> {
        {
            let mut state = self.cache_state.write().await;
            if *state == CacheState::Uninitialized {
                *state = CacheState::Paging;
            }
        }

        let (records, tree) =
            tokio::try_join!(self.history.search(query), self.bookmarks.tree())?;
        let bookmark_index = index_bookmarks(&tree);

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for record in records {
            let visited_at = record.last_visit_time as i64;
            if visited_at <= query.start_time || visited_at >= query.end_time {
                continue;
            }
            if !seen.insert(record.url.clone()) {
                continue;
            }
            let mut link = Link::new(&record.url, &record.title);
            link.last_visit_date = Some(visited_at);
            link.visit_count = Some(record.visit_count);
            link.favicon_url = favicon_for(&record.url);
            if let Some((guid, date_added)) = bookmark_index.get(record.url.as_str()) {
                link.bookmark_guid = Some(guid.to_string());
                link.date_added = Some(*date_added);
            }
            links.push(link);
        }

        let mut links = self.blocklist.filter(links).await?;
        links.truncate(query.max_results);
        debug!("History aggregation produced {} links", links.len());

        *self.cache_state.write().await = CacheState::Complete;
        Ok(links)
    }

    /// Bookmark links created strictly before the query date, in tree
    /// pre-order. Folder nodes are flattened away; the first node per URL
    /// wins.
    pub async fn get_bookmarks(&self, query: &BookmarkQuery) -> Result<Vec<Link>> {
        let tree = self.bookmarks.tree().await?;
        let mut nodes = Vec::new();
        flatten(&tree, &mut nodes);

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for node in nodes {
            if !node.is_link() || node.date_added >= query.before_date {
                continue;
            }
            // is_link guarantees a non-empty URL
            let url = node.url.clone().unwrap_or_default();
            if !seen.insert(url.clone()) {
                continue;
            }
            let mut link = Link::new(&url, &node.title);
            link.date_added = Some(node.date_added);
            link.bookmark_guid = Some(node.id.clone());
            link.favicon_url = favicon_for(&url);
            links.push(link);
        }

        let mut links = self.blocklist.filter(links).await?;
        links.truncate(query.max_results);
        debug!("Bookmark aggregation produced {} links", links.len());
        Ok(links)
    }
}

/// URL to (guid, date_added) over every link node in the tree. The first
/// node per URL wins, matching pre-order traversal.
fn index_bookmarks(tree: &[BookmarkNode]) -> HashMap<&str, (&str, i64)> {
    let mut nodes = Vec::new();
    flatten(tree, &mut nodes);
    let mut index = HashMap::new();
    for node in nodes {
        if let Some(url) = node.url.as_deref().filter(|u| !u.is_empty()) {
            index.entry(url).or_insert((node.id.as_str(), node.date_added));
        }
    }
    index
}

fn flatten<'a>(nodes: &'a [BookmarkNode], out: &mut Vec<&'a BookmarkNode>) {
    for node in nodes {
        out.push(node);
        flatten(&node.children, out);
    }
}

//! In-memory native store implementations
//!
//! These mirror the observable behavior of the browser stores closely enough
//! for the engine to run against them: newest-first ordering, free-text
//! matching over URL and title, and the native inclusive-OR bound matching
//! on time ranges.

use async_trait::async_trait;
use link_engine_core::*;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::traits::{BookmarkStore, HistoryStore};

/// History store holding its records in memory.
#[derive(Default, Clone)]
pub struct MemoryHistoryStore {
    records: Arc<RwLock<Vec<HistoryRecord>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Record a visit. An existing record for the URL is updated in place:
    /// visit count incremented, title and visit time refreshed.
    pub async fn record_visit(&self, url: &str, title: &str, visited_at: i64) {
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter_mut().find(|r| r.url == url) {
            existing.visit_count += 1;
            existing.title = title.to_string();
            existing.last_visit_time = visited_at as f64;
        } else {
            records.push(HistoryRecord {
                url: url.to_string(),
                title: title.to_string(),
                last_visit_time: visited_at as f64,
                visit_count: 1,
            });
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn search(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>, AggregationError> {
        let records = self.records.read().await;
        let text = query.text.to_lowercase();

        let mut matches: Vec<HistoryRecord> = records
            .iter()
            .filter(|r| {
                text.is_empty()
                    || r.url.to_lowercase().contains(&text)
                    || r.title.to_lowercase().contains(&text)
            })
            // Inclusive-OR bound matching, as the native store does it.
            .filter(|r| {
                r.last_visit_time >= query.start_time as f64
                    || r.last_visit_time <= query.end_time as f64
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            b.last_visit_time
                .partial_cmp(&a.last_visit_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(query.max_results);

        debug!("History search matched {} records", matches.len());
        Ok(matches)
    }

    async fn delete_url(&self, url: &str) -> Result<(), AggregationError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.url != url);
        if records.len() == before {
            return Err(AggregationError::HistoryEntryNotFound {
                url: url.to_string(),
            });
        }
        Ok(())
    }
}

/// Bookmark store holding its tree in memory.
#[derive(Default, Clone)]
pub struct MemoryBookmarkStore {
    roots: Arc<RwLock<Vec<BookmarkNode>>>,
}

impl MemoryBookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree(roots: Vec<BookmarkNode>) -> Self {
        Self {
            roots: Arc::new(RwLock::new(roots)),
        }
    }

    /// Append a bookmark at the top level. Returns the generated node id.
    pub async fn add_bookmark(&self, url: &str, title: &str, date_added: i64) -> String {
        let id = Uuid::new_v4().to_string();
        let mut roots = self.roots.write().await;
        roots.push(BookmarkNode::link(id.clone(), url, title, date_added));
        id
    }

    /// Append a folder at the top level. Returns the generated node id.
    pub async fn add_folder(&self, title: &str, children: Vec<BookmarkNode>) -> String {
        let id = Uuid::new_v4().to_string();
        let mut roots = self.roots.write().await;
        roots.push(BookmarkNode::folder(id.clone(), title, children));
        id
    }
}

fn collect_by_url<'a>(nodes: &'a [BookmarkNode], url: &str, out: &mut Vec<&'a BookmarkNode>) {
    for node in nodes {
        if node.url.as_deref() == Some(url) {
            out.push(node);
        }
        collect_by_url(&node.children, url, out);
    }
}

fn remove_by_id(nodes: &mut Vec<BookmarkNode>, id: &str) -> bool {
    if let Some(pos) = nodes.iter().position(|n| n.id == id) {
        nodes.remove(pos);
        return true;
    }
    nodes
        .iter_mut()
        .any(|node| remove_by_id(&mut node.children, id))
}

#[async_trait]
impl BookmarkStore for MemoryBookmarkStore {
    async fn tree(&self) -> Result<Vec<BookmarkNode>, AggregationError> {
        Ok(self.roots.read().await.clone())
    }

    async fn search_by_url(&self, url: &str) -> Result<Vec<BookmarkNode>, AggregationError> {
        let roots = self.roots.read().await;
        let mut matches = Vec::new();
        collect_by_url(&roots, url, &mut matches);
        Ok(matches.into_iter().cloned().collect())
    }

    async fn remove(&self, id: &str) -> Result<(), AggregationError> {
        let mut roots = self.roots.write().await;
        if !remove_by_id(&mut roots, id) {
            return Err(AggregationError::BookmarkNotFound { id: id.to_string() });
        }
        Ok(())
    }
}

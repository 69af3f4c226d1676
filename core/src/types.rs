//! Shared data model for the link intelligence engine.
//!
//! All timestamps carried by these types are epoch milliseconds. The raw
//! visit timestamps delivered by native history stores are floating point;
//! they are integer-parsed at the aggregation boundary and stay integral
//! from then on.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Width of preview images recorded in the metadata cache.
pub const PREVIEW_IMAGE_WIDTH: u32 = 450;

/// Height of preview images recorded in the metadata cache.
pub const PREVIEW_IMAGE_HEIGHT: u32 = 278;

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A preview image attached to a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl PreviewImage {
    /// A preview image with the standard cache dimensions.
    pub fn standard(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: PREVIEW_IMAGE_WIDTH,
            height: PREVIEW_IMAGE_HEIGHT,
        }
    }
}

/// Unified link record.
///
/// A link may originate from history, from a bookmark, or be a merge of both
/// sharing a URL; a merge carries at most one bookmark reference. Within any
/// returned result set the `url` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Unique key within a result set.
    pub url: String,
    pub title: String,
    /// Most recent visit, epoch ms. Absent for bookmark-only links.
    pub last_visit_date: Option<i64>,
    /// Total visit count from the history store.
    pub visit_count: Option<u32>,
    /// Bookmark creation time, epoch ms. Present only for bookmark-origin links.
    pub date_added: Option<i64>,
    /// Back-reference to the native bookmark node.
    pub bookmark_guid: Option<String>,
    pub favicon_url: Option<String>,
    /// Ordered preview images resolved by metadata enrichment.
    pub images: Option<Vec<PreviewImage>>,
    pub description: Option<String>,
}

impl Link {
    /// A bare link with no history, bookmark, or metadata attached.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            last_visit_date: None,
            visit_count: None,
            date_added: None,
            bookmark_guid: None,
            favicon_url: None,
            images: None,
            description: None,
        }
    }

    /// Whether enrichment resolved both a preview image and a description.
    pub fn has_preview(&self) -> bool {
        matches!(&self.images, Some(images) if !images.is_empty()) && self.description.is_some()
    }
}

/// Persisted metadata cache record, keyed by URL.
///
/// Created on the first successful fetch for a URL and read on every later
/// request; entries never expire on their own. `images` and `description`
/// being `None` records explicit absence, not a pending state: an entry is
/// only written once a fetch has resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub url: String,
    pub images: Option<Vec<PreviewImage>>,
    pub description: Option<String>,
    /// When the fetch that produced this entry completed, epoch ms.
    pub fetched_at: i64,
}

/// A URL the user has explicitly excluded from all result sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedUrl {
    pub url: String,
    /// When the block was recorded, epoch ms.
    pub blocked_at: i64,
}

/// Raw record returned by a native history store.
///
/// `last_visit_time` is the store's floating point timestamp in epoch ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub url: String,
    pub title: String,
    pub last_visit_time: f64,
    pub visit_count: u32,
}

/// Node in a native bookmark tree. Folder nodes carry no URL and hold
/// children; link nodes carry a URL and an empty child list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkNode {
    pub id: String,
    pub url: Option<String>,
    pub title: String,
    /// Creation time, epoch ms.
    pub date_added: i64,
    #[serde(default)]
    pub children: Vec<BookmarkNode>,
}

impl BookmarkNode {
    /// A leaf bookmark node.
    pub fn link(
        id: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        date_added: i64,
    ) -> Self {
        Self {
            id: id.into(),
            url: Some(url.into()),
            title: title.into(),
            date_added,
            children: Vec::new(),
        }
    }

    /// A folder node holding the given children.
    pub fn folder(id: impl Into<String>, title: impl Into<String>, children: Vec<BookmarkNode>) -> Self {
        Self {
            id: id.into(),
            url: None,
            title: title.into(),
            date_added: 0,
            children,
        }
    }

    /// Whether this node is a link candidate (non-empty URL).
    pub fn is_link(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Parameters for a history range search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Free-text filter over URL and title. Empty matches everything.
    pub text: String,
    /// Exclusive lower bound on visit time, epoch ms.
    pub start_time: i64,
    /// Exclusive upper bound on visit time, epoch ms.
    pub end_time: i64,
    pub max_results: usize,
}

impl Default for HistoryQuery {
    /// Last 365 days, no text filter, at most 20 results.
    fn default() -> Self {
        let now = now_ms();
        Self {
            text: String::new(),
            start_time: now - 365 * MS_PER_DAY,
            end_time: now,
            max_results: 20,
        }
    }
}

/// Parameters for a bookmark listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkQuery {
    /// Only bookmarks created strictly before this time, epoch ms.
    pub before_date: i64,
    pub max_results: usize,
}

impl Default for BookmarkQuery {
    /// Everything created before now, at most 20 results.
    fn default() -> Self {
        Self {
            before_date: now_ms(),
            max_results: 20,
        }
    }
}

/// Milliseconds per day.
pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Lifecycle of the aggregation cache, threaded through the aggregator
/// instead of a global "initialized" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheState {
    #[default]
    Uninitialized,
    /// A first page of results has been requested but not completed.
    Paging,
    Complete,
}

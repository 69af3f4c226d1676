//! Highlight selection.
//!
//! Highlights re-surface links the user has touched but not worn out:
//! rarely visited, and either bookmarked a while ago or last visited long
//! enough ago to be worth another look. Selection is deliberately random;
//! callers must not assume stability across calls.

use crate::enrichment::MetadataEnricher;
use crate::frecency::filter_excluded;
use link_engine_core::*;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::debug;

/// Thresholds for the highlight inclusion predicate.
#[derive(Debug, Clone)]
pub struct HighlightConfig {
    /// Candidates visited more often than this are too familiar.
    pub max_visit_count: u32,
    /// A bookmark qualifies once it is at least this old.
    pub min_bookmark_age_ms: i64,
    /// A visit qualifies once it is at least this old.
    pub min_visit_age_ms: i64,
    /// At most this many shuffled candidates go to metadata enrichment.
    pub candidate_limit: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            max_visit_count: 3,
            min_bookmark_age_ms: 3 * MS_PER_DAY,
            min_visit_age_ms: 30 * 60 * 1000,
            candidate_limit: 8,
        }
    }
}

pub struct HighlightSelector {
    config: HighlightConfig,
    enricher: Arc<MetadataEnricher>,
}

impl HighlightSelector {
    pub fn new(enricher: Arc<MetadataEnricher>) -> Self {
        Self::with_config(enricher, HighlightConfig::default())
    }

    pub fn with_config(enricher: Arc<MetadataEnricher>, config: HighlightConfig) -> Self {
        Self { config, enricher }
    }

    /// Inclusion predicate: rarely visited, and stale on at least one of the
    /// bookmark-age or visit-age axes. A bookmark without history data is
    /// judged on its creation time alone; a bare history entry on its visit
    /// time alone.
    pub fn qualifies(&self, link: &Link, now: i64) -> bool {
        if link.visit_count.unwrap_or(0) > self.config.max_visit_count {
            return false;
        }
        let bookmarked_long_ago = link
            .date_added
            .is_some_and(|added| now - added > self.config.min_bookmark_age_ms);
        let visited_long_ago = link
            .last_visit_date
            .is_some_and(|visited| now - visited > self.config.min_visit_age_ms);
        bookmarked_long_ago || visited_long_ago
    }

    /// Selects highlights from bookmark and history candidates.
    ///
    /// Both lists pass the ranker's exclusion filter, then the inclusion
    /// predicate. Survivors are shuffled uniformly, capped, and enriched;
    /// only links that resolved both an image and a description come back.
    pub async fn select_highlights(
        &self,
        bookmarks: Vec<Link>,
        histories: Vec<Link>,
    ) -> Vec<Link> {
        let now = now_ms();

        let mut candidates: Vec<Link> = filter_excluded(bookmarks)
            .into_iter()
            .chain(filter_excluded(histories))
            .filter(|link| self.qualifies(link, now))
            .collect();

        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(self.config.candidate_limit);
        debug!("Enriching {} highlight candidates", candidates.len());

        let mut enriched = self.enricher.enrich(candidates).await;
        enriched.retain(Link::has_preview);
        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::PageFetcher;
    use data_access::DatabaseManager;

    /// Fetcher answering every URL with the same full metadata document.
    struct UniformFetcher;

    #[async_trait::async_trait]
    impl PageFetcher for UniformFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Ok(r#"<head>
                <meta property="og:image" content="https://cdn.example/og.png">
                <meta property="og:description" content="A page">
            </head>"#
                .to_string())
        }
    }

    /// Fetcher that refuses every request.
    struct DownFetcher;

    #[async_trait::async_trait]
    impl PageFetcher for DownFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            Err(FetchError::Request {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    async fn selector(fetcher: Arc<dyn PageFetcher>) -> HighlightSelector {
        let db = DatabaseManager::in_memory().await.unwrap();
        let enricher = Arc::new(MetadataEnricher::with_config(
            db.metadata_repository(),
            fetcher,
            crate::enrichment::EnrichmentConfig {
                fetch_delay: std::time::Duration::from_millis(1),
            },
        ));
        HighlightSelector::new(enricher)
    }

    fn old_bookmark(url: &str) -> Link {
        let mut link = Link::new(url, url);
        link.date_added = Some(now_ms() - 10 * MS_PER_DAY);
        link
    }

    fn history_visited_ago(url: &str, visit_count: u32, age_ms: i64) -> Link {
        let mut link = Link::new(url, url);
        link.visit_count = Some(visit_count);
        link.last_visit_date = Some(now_ms() - age_ms);
        link
    }

    #[tokio::test]
    async fn predicate_rejects_frequently_visited_links() {
        let selector = selector(Arc::new(UniformFetcher)).await;
        let now = now_ms();

        assert!(selector.qualifies(&history_visited_ago("https://a.example/", 3, MS_PER_DAY), now));
        assert!(!selector.qualifies(&history_visited_ago("https://b.example/", 4, MS_PER_DAY), now));
    }

    #[tokio::test]
    async fn predicate_branches_on_available_fields() {
        let selector = selector(Arc::new(UniformFetcher)).await;
        let now = now_ms();

        // Bookmark without history: creation age decides.
        assert!(selector.qualifies(&old_bookmark("https://a.example/"), now));
        let mut fresh_bookmark = Link::new("https://b.example/", "B");
        fresh_bookmark.date_added = Some(now - MS_PER_DAY);
        assert!(!selector.qualifies(&fresh_bookmark, now));

        // History without a bookmark: visit age decides.
        let recent = history_visited_ago("https://c.example/", 1, 60 * 1000);
        assert!(!selector.qualifies(&recent, now));
        let stale = history_visited_ago("https://d.example/", 1, 60 * 60 * 1000);
        assert!(selector.qualifies(&stale, now));

        // Neither field present: nothing to judge on.
        assert!(!selector.qualifies(&Link::new("https://e.example/", "E"), now));
    }

    #[tokio::test]
    async fn selection_is_capped_and_requires_full_previews() {
        let selector = selector(Arc::new(UniformFetcher)).await;
        let histories: Vec<Link> = (0..20)
            .map(|i| {
                history_visited_ago(&format!("https://site{}.example/", i), 1, 2 * MS_PER_DAY)
            })
            .collect();

        let highlights = selector.select_highlights(Vec::new(), histories).await;
        assert_eq!(highlights.len(), 8);
        assert!(highlights.iter().all(Link::has_preview));
        assert!(highlights.iter().all(|l| l.visit_count.unwrap_or(0) <= 3));
    }

    #[tokio::test]
    async fn excluded_urls_never_become_highlights() {
        let selector = selector(Arc::new(UniformFetcher)).await;
        let histories = vec![
            history_visited_ago("https://www.google.com/search?q=x", 1, 2 * MS_PER_DAY),
            history_visited_ago("http://localhost:3000/", 1, 2 * MS_PER_DAY),
            history_visited_ago("https://kept.example/", 1, 2 * MS_PER_DAY),
        ];

        let highlights = selector.select_highlights(Vec::new(), histories).await;
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].url, "https://kept.example/");
    }

    #[tokio::test]
    async fn unreachable_candidates_yield_no_highlights() {
        let selector = selector(Arc::new(DownFetcher)).await;
        let histories = vec![history_visited_ago("https://a.example/", 1, 2 * MS_PER_DAY)];

        let highlights = selector.select_highlights(Vec::new(), histories).await;
        assert!(highlights.is_empty());
    }
}

//! Engine facade and event loop.
//!
//! The engine consumes command requests over a channel and emits result
//! events over another, keeping the presentation layer decoupled from the
//! aggregation, ranking, and enrichment internals. One request produces
//! exactly one event; failures come back as [`EngineEvent::Failed`] instead
//! of tearing the loop down.

use crate::aggregator::LinkAggregator;
use crate::blocklist::Blocklist;
use crate::enrichment::MetadataEnricher;
use crate::fetcher::PageFetcher;
use crate::frecency::rank_top_sites;
use crate::highlights::HighlightSelector;
use browser_connector::{BookmarkStore, HistoryStore};
use data_access::DatabaseManager;
use link_engine_core::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Commands accepted by the engine loop. Serializable so a presentation
/// transport can carry them verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineRequest {
    /// Ranked, enriched top sites for the given history range.
    GetTopSites { query: HistoryQuery },
    /// Random highlight selection over default bookmark and history ranges.
    GetHighlights,
    GetHistory { query: HistoryQuery },
    GetBookmarks { query: BookmarkQuery },
    /// Free-text history search.
    Search { text: String, max_results: usize },
    BlockUrl { url: String },
    UnblockAll,
    DeleteHistoryUrl { url: String },
    /// A live page visit; warms the metadata cache in the background.
    NotifyVisit { url: String, title: String },
    Shutdown,
}

impl EngineRequest {
    fn name(&self) -> &'static str {
        match self {
            Self::GetTopSites { .. } => "GetTopSites",
            Self::GetHighlights => "GetHighlights",
            Self::GetHistory { .. } => "GetHistory",
            Self::GetBookmarks { .. } => "GetBookmarks",
            Self::Search { .. } => "Search",
            Self::BlockUrl { .. } => "BlockUrl",
            Self::UnblockAll => "UnblockAll",
            Self::DeleteHistoryUrl { .. } => "DeleteHistoryUrl",
            Self::NotifyVisit { .. } => "NotifyVisit",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// Results emitted by the engine loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    TopSites(Vec<Link>),
    Highlights(Vec<Link>),
    History(Vec<Link>),
    Bookmarks(Vec<Link>),
    SearchResults(Vec<Link>),
    UrlBlocked { url: String },
    BlocklistCleared,
    HistoryItemDeleted { url: String },
    VisitRecorded { url: String },
    Failed { request: String, reason: String },
}

/// Wires the aggregation, ranking, highlight, enrichment, and blocklist
/// components together behind a request/event channel pair.
pub struct LinkEngine {
    aggregator: LinkAggregator,
    selector: HighlightSelector,
    enricher: Arc<MetadataEnricher>,
    blocklist: Arc<Blocklist>,
    history: Arc<dyn HistoryStore>,
}

impl LinkEngine {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        bookmarks: Arc<dyn BookmarkStore>,
        database: &DatabaseManager,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let blocklist = Arc::new(Blocklist::new(database.blocklist_repository()));
        let enricher = Arc::new(MetadataEnricher::new(
            database.metadata_repository(),
            fetcher,
        ));
        Self {
            aggregator: LinkAggregator::new(
                Arc::clone(&history),
                bookmarks,
                Arc::clone(&blocklist),
            ),
            selector: HighlightSelector::new(Arc::clone(&enricher)),
            enricher,
            blocklist,
            history,
        }
    }

    /// Starts the engine loop.
    ///
    /// Returns the request sender, the event receiver, and the loop task.
    /// The loop runs until [`EngineRequest::Shutdown`] arrives or every
    /// request sender is dropped, then stops the fetch limiter.
    pub fn spawn(self, buffer: usize) -> (
        mpsc::Sender<EngineRequest>,
        mpsc::Receiver<EngineEvent>,
        JoinHandle<()>,
    ) {
        let (request_tx, mut request_rx) = mpsc::channel::<EngineRequest>(buffer);
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(buffer);

        let handle = tokio::spawn(async move {
            info!("Link engine started");
            while let Some(request) = request_rx.recv().await {
                if matches!(request, EngineRequest::Shutdown) {
                    break;
                }
                let event = self.handle(request).await;
                if event_tx.send(event).await.is_err() {
                    debug!("Event receiver dropped, stopping engine loop");
                    break;
                }
            }
            self.enricher.shutdown();
            info!("Link engine stopped");
        });

        (request_tx, event_rx, handle)
    }

    async fn handle(&self, request: EngineRequest) -> EngineEvent {
        let name = request.name();
        debug!(request = name, "Handling engine request");
        match self.dispatch(request).await {
            Ok(event) => event,
            Err(e) => {
                warn!(request = name, error = %e, "Engine request failed");
                EngineEvent::Failed {
                    request: name.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn dispatch(&self, request: EngineRequest) -> Result<EngineEvent> {
        match request {
            EngineRequest::GetTopSites { query } => {
                let links = self.aggregator.get_history(&query).await?;
                let ranked = rank_top_sites(links);
                Ok(EngineEvent::TopSites(self.enricher.enrich(ranked).await))
            }
            EngineRequest::GetHighlights => {
                let bookmark_query = BookmarkQuery::default();
                let history_query = HistoryQuery::default();
                let (bookmarks, histories) = tokio::try_join!(
                    self.aggregator.get_bookmarks(&bookmark_query),
                    self.aggregator.get_history(&history_query),
                )?;
                Ok(EngineEvent::Highlights(
                    self.selector.select_highlights(bookmarks, histories).await,
                ))
            }
            EngineRequest::GetHistory { query } => Ok(EngineEvent::History(
                self.aggregator.get_history(&query).await?,
            )),
            EngineRequest::GetBookmarks { query } => Ok(EngineEvent::Bookmarks(
                self.aggregator.get_bookmarks(&query).await?,
            )),
            EngineRequest::Search { text, max_results } => {
                let query = HistoryQuery {
                    text,
                    max_results,
                    ..HistoryQuery::default()
                };
                Ok(EngineEvent::SearchResults(
                    self.aggregator.get_history(&query).await?,
                ))
            }
            EngineRequest::BlockUrl { url } => {
                self.blocklist.block(&url).await?;
                // A blocked URL should not keep serving a cached preview.
                if let Err(e) = self.enricher.invalidate(&url).await {
                    warn!(url, error = %e, "Failed to invalidate metadata for blocked URL");
                }
                Ok(EngineEvent::UrlBlocked { url })
            }
            EngineRequest::UnblockAll => {
                self.blocklist.unblock_all().await?;
                Ok(EngineEvent::BlocklistCleared)
            }
            EngineRequest::DeleteHistoryUrl { url } => {
                self.history.delete_url(&url).await?;
                Ok(EngineEvent::HistoryItemDeleted { url })
            }
            EngineRequest::NotifyVisit { url, title } => {
                let enricher = Arc::clone(&self.enricher);
                let site = Link::new(&url, &title);
                tokio::spawn(async move {
                    enricher.cache_one(&site).await;
                });
                Ok(EngineEvent::VisitRecorded { url })
            }
            EngineRequest::Shutdown => unreachable!("Shutdown breaks the loop before dispatch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_connector::{MemoryBookmarkStore, MemoryHistoryStore};
    use std::collections::HashMap;

    struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait::async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Request {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                })
        }
    }

    async fn engine_with(
        history: MemoryHistoryStore,
        bookmarks: MemoryBookmarkStore,
        pages: Vec<(&str, &str)>,
    ) -> LinkEngine {
        let db = DatabaseManager::in_memory().await.unwrap();
        let fetcher = Arc::new(StaticFetcher {
            pages: pages
                .into_iter()
                .map(|(url, html)| (url.to_string(), html.to_string()))
                .collect(),
        });
        LinkEngine::new(Arc::new(history), Arc::new(bookmarks), &db, fetcher)
    }

    const PAGE: &str = r#"<head>
        <meta property="og:image" content="https://cdn.example/og.png">
        <meta property="og:description" content="A page">
    </head>"#;

    #[tokio::test]
    async fn top_sites_are_ranked_and_enriched() {
        let history = MemoryHistoryStore::new();
        let now = now_ms();
        history.record_visit("https://rare.example/", "Rare", now - 1_000).await;
        for _ in 0..5 {
            history.record_visit("https://busy.example/", "Busy", now - 2_000).await;
        }

        let engine = engine_with(
            history,
            MemoryBookmarkStore::new(),
            vec![("https://busy.example/", PAGE), ("https://rare.example/", PAGE)],
        )
        .await;
        let (requests, mut events, _handle) = engine.spawn(8);

        requests
            .send(EngineRequest::GetTopSites {
                query: HistoryQuery::default(),
            })
            .await
            .unwrap();

        match events.recv().await.unwrap() {
            EngineEvent::TopSites(sites) => {
                assert_eq!(sites.len(), 2);
                assert_eq!(sites[0].url, "https://busy.example/");
                assert!(sites[0].has_preview());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn block_removes_url_from_later_results() {
        let history = MemoryHistoryStore::new();
        let now = now_ms();
        history.record_visit("https://keep.example/", "Keep", now - 1_000).await;
        history.record_visit("https://drop.example/", "Drop", now - 2_000).await;

        let engine = engine_with(history, MemoryBookmarkStore::new(), vec![]).await;
        let (requests, mut events, _handle) = engine.spawn(8);

        requests
            .send(EngineRequest::BlockUrl {
                url: "https://drop.example/".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::UrlBlocked { .. }
        ));

        requests
            .send(EngineRequest::GetHistory {
                query: HistoryQuery::default(),
            })
            .await
            .unwrap();
        match events.recv().await.unwrap() {
            EngineEvent::History(links) => {
                assert_eq!(links.len(), 1);
                assert_eq!(links[0].url, "https://keep.example/");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        requests.send(EngineRequest::UnblockAll).await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::BlocklistCleared
        ));

        requests
            .send(EngineRequest::GetHistory {
                query: HistoryQuery::default(),
            })
            .await
            .unwrap();
        match events.recv().await.unwrap() {
            EngineEvent::History(links) => assert_eq!(links.len(), 2),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn search_filters_by_text() {
        let history = MemoryHistoryStore::new();
        let now = now_ms();
        history.record_visit("https://rust-lang.org/", "Rust", now - 1_000).await;
        history.record_visit("https://python.org/", "Python", now - 2_000).await;

        let engine = engine_with(history, MemoryBookmarkStore::new(), vec![]).await;
        let (requests, mut events, _handle) = engine.spawn(8);

        requests
            .send(EngineRequest::Search {
                text: "rust".to_string(),
                max_results: 10,
            })
            .await
            .unwrap();
        match events.recv().await.unwrap() {
            EngineEvent::SearchResults(links) => {
                assert_eq!(links.len(), 1);
                assert_eq!(links[0].url, "https://rust-lang.org/");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_history_url_reports_missing_urls_as_failed() {
        let history = MemoryHistoryStore::new();
        history.record_visit("https://example.com/", "Example", now_ms() - 1_000).await;

        let engine = engine_with(history, MemoryBookmarkStore::new(), vec![]).await;
        let (requests, mut events, _handle) = engine.spawn(8);

        requests
            .send(EngineRequest::DeleteHistoryUrl {
                url: "https://example.com/".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::HistoryItemDeleted { .. }
        ));

        requests
            .send(EngineRequest::DeleteHistoryUrl {
                url: "https://example.com/".to_string(),
            })
            .await
            .unwrap();
        match events.recv().await.unwrap() {
            EngineEvent::Failed { request, .. } => assert_eq!(request, "DeleteHistoryUrl"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn highlights_flow_end_to_end() {
        let history = MemoryHistoryStore::new();
        history
            .record_visit("https://stale.example/", "Stale", now_ms() - 2 * MS_PER_DAY)
            .await;

        let engine = engine_with(
            history,
            MemoryBookmarkStore::new(),
            vec![("https://stale.example/", PAGE)],
        )
        .await;
        let (requests, mut events, _handle) = engine.spawn(8);

        requests.send(EngineRequest::GetHighlights).await.unwrap();
        match events.recv().await.unwrap() {
            EngineEvent::Highlights(links) => {
                assert_eq!(links.len(), 1);
                assert_eq!(links[0].url, "https://stale.example/");
                assert!(links[0].has_preview());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let engine =
            engine_with(MemoryHistoryStore::new(), MemoryBookmarkStore::new(), vec![]).await;
        let (requests, _events, handle) = engine.spawn(8);

        requests.send(EngineRequest::Shutdown).await.unwrap();
        handle.await.unwrap();
        assert!(requests.send(EngineRequest::GetHighlights).await.is_err());
    }
}

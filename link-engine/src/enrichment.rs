//! Metadata enrichment cache.
//!
//! Resolves preview images and descriptions for candidate links. Lookups are
//! cache-first against the persisted metadata store; misses go to the network
//! through the fetch limiter. A failure anywhere leaves the affected site
//! unresolved instead of failing the batch.

use crate::fetcher::PageFetcher;
use crate::limiter::{FetchLimiter, DEFAULT_FETCH_DELAY};
use crate::parser;
use data_access::MetadataRepository;
use futures_util::future::join_all;
use link_engine_core::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the metadata enricher.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Spacing between outbound fetches.
    pub fetch_delay: Duration,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            fetch_delay: DEFAULT_FETCH_DELAY,
        }
    }
}

/// Resolves a possibly relative URL scraped from a page against the page URL.
fn resolve_url(base: &str, candidate: &str) -> Option<String> {
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Some(candidate.to_string());
    }
    if let Some(rest) = candidate.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    Url::parse(base)
        .ok()?
        .join(candidate)
        .ok()
        .map(|u| u.to_string())
}

/// Cache-backed metadata resolver.
pub struct MetadataEnricher {
    repo: Arc<dyn MetadataRepository>,
    fetcher: Arc<dyn PageFetcher>,
    limiter: FetchLimiter,
}

impl MetadataEnricher {
    pub fn new(repo: Arc<dyn MetadataRepository>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(repo, fetcher, EnrichmentConfig::default())
    }

    pub fn with_config(
        repo: Arc<dyn MetadataRepository>,
        fetcher: Arc<dyn PageFetcher>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            repo,
            fetcher,
            limiter: FetchLimiter::new(config.fetch_delay),
        }
    }

    /// Enriches a batch of sites.
    ///
    /// Sites with a cached entry are merged without network access; the rest
    /// fetch concurrently, each queued behind the rate limiter in batch
    /// order. Every input site comes back, resolved or not; callers filter
    /// on [`Link::has_preview`] as needed.
    pub async fn enrich(&self, sites: Vec<Link>) -> Vec<Link> {
        join_all(sites.into_iter().map(|site| self.enrich_one(site))).await
    }

    async fn enrich_one(&self, mut site: Link) -> Link {
        match self.repo.get(&site.url).await {
            Ok(Some(entry)) => {
                debug!(url = %site.url, "metadata cache hit");
                if site.images.is_none() {
                    site.images = entry.images;
                }
                if site.description.is_none() {
                    site.description = entry.description;
                }
                return site;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(url = %site.url, error = %e, "metadata cache read failed");
                return site;
            }
        }

        match self.fetch_and_store(&site.url).await {
            Ok((entry, icon_url)) => {
                site.images = entry.images;
                site.description = entry.description;
                if site.favicon_url.is_none() {
                    site.favicon_url = icon_url;
                }
                site
            }
            Err(e) => {
                debug!(url = %site.url, error = %e, "metadata fetch failed, leaving site unresolved");
                site
            }
        }
    }

    /// Fetches, parses, and persists metadata for one URL.
    ///
    /// Nothing is written when the fetch itself fails. After a successful
    /// fetch the entry is persisted even when only a subset of fields was
    /// found; absent fields are recorded as explicitly absent.
    async fn fetch_and_store(&self, url: &str) -> Result<(MetadataEntry, Option<String>)> {
        self.limiter.acquire().await?;
        let html = self.fetcher.fetch(url).await?;

        let meta = parser::parse_metadata(&html);
        let images = meta
            .image_url
            .as_deref()
            .and_then(|image| resolve_url(url, image))
            .map(|image| vec![PreviewImage::standard(image)]);
        let icon_url = meta.icon_url.as_deref().and_then(|icon| resolve_url(url, icon));

        let entry = MetadataEntry {
            url: url.to_string(),
            images,
            description: meta.description,
            fetched_at: now_ms(),
        };

        if let Err(e) = self.repo.upsert(&entry).await {
            // The resolved fields are still usable for this request.
            warn!(url, error = %e, "failed to persist metadata entry");
        }

        Ok((entry, icon_url))
    }

    /// Fire-and-forget warm of a single URL, used on live visit events.
    /// A URL that already has an entry is left alone.
    pub async fn cache_one(&self, site: &Link) {
        match self.repo.get(&site.url).await {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                warn!(url = %site.url, error = %e, "metadata cache read failed");
                return;
            }
        }
        if let Err(e) = self.fetch_and_store(&site.url).await {
            debug!(url = %site.url, error = %e, "metadata warm failed");
        }
    }

    /// Drops the cache entry for a URL.
    pub async fn invalidate(&self, url: &str) -> Result<(), CacheError> {
        self.repo.remove(url).await
    }

    /// Stops the fetch limiter; pending fetches resolve unenriched.
    pub fn shutdown(&self) {
        self.limiter.shutdown();
    }
}

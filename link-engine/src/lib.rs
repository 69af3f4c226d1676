//! Link intelligence engine.
//!
//! Aggregates native history and bookmarks into unified links, ranks top
//! sites by frecency, selects randomized highlights, enriches candidates
//! with cached page metadata, and filters everything through a user
//! blocklist. [`LinkEngine`] ties the pieces together behind a request and
//! event channel pair.

pub mod aggregator;
pub mod blocklist;
pub mod engine;
pub mod enrichment;
pub mod fetcher;
pub mod frecency;
pub mod highlights;
pub mod limiter;
pub mod parser;

pub use aggregator::LinkAggregator;
pub use blocklist::Blocklist;
pub use engine::{EngineEvent, EngineRequest, LinkEngine};
pub use enrichment::{EnrichmentConfig, MetadataEnricher};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use frecency::{frecency_score, is_excluded_url, rank_top_sites};
pub use highlights::{HighlightConfig, HighlightSelector};
pub use limiter::FetchLimiter;

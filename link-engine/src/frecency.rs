//! Frecency ranking for top sites.
//!
//! Scores links by a combined recency/frequency heuristic and orders them
//! descending. Raw timestamps are epoch milliseconds everywhere; ages are
//! converted to whole days only inside the score function, so there is a
//! single unit boundary to reason about.

use link_engine_core::*;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;
use url::Url;

/// URLs that are noise in a ranked or highlighted list: search result pages,
/// localhost, and browser-internal resource URLs.
static EXCLUDED_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)",
        r"(?:^https?://(?:www\.)?(?:google|bing|duckduckgo|yahoo)\.[^/]+/search)",
        r"|(?:^https?://(?:localhost|127\.0\.0\.1)(?::\d+)?(?:/|$))",
        r"|(?:^(?:about|chrome|chrome-extension|moz-extension|resource|view-source|file):)",
    ))
    .expect("exclusion pattern is a valid regex")
});

/// Whether a URL should never appear in ranked or highlighted results.
pub fn is_excluded_url(url: &str) -> bool {
    EXCLUDED_URL_PATTERN.is_match(url)
}

/// Removes excluded URLs from a candidate list.
pub fn filter_excluded(links: Vec<Link>) -> Vec<Link> {
    links.into_iter().filter(|l| !is_excluded_url(&l.url)).collect()
}

/// Host (URL authority) used for deduplication. Unparseable URLs fall back
/// to the full URL so they never collide with each other.
fn host_of(link: &Link) -> String {
    Url::parse(&link.url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| link.url.clone())
}

/// Frecency score: `visit_count * max(1, 100 * 225 / (age_days^2 + 225))`.
///
/// `age_days` is the whole number of days between `now` and the last visit,
/// both epoch ms. A link with no recorded visit time decays as if visited
/// just now; a link with no visit count scores zero.
pub fn frecency_score(link: &Link, now: i64) -> f64 {
    let visit_count = link.visit_count.unwrap_or(0) as f64;
    let last_visit = link.last_visit_date.unwrap_or(now);
    let age_days = ((now - last_visit).max(0) / MS_PER_DAY) as f64;
    let decay = (100.0 * 225.0 / (age_days * age_days + 225.0)).max(1.0);
    visit_count * decay
}

/// Ranks links descending by frecency.
///
/// Excluded URLs are dropped, then only the first-seen link per host is kept
/// (input order, which the store delivers newest-first), then the survivors
/// are sorted by score. Ties break on higher `last_visit_date`, then on the
/// lexicographically greater URL; anything still equal keeps input order.
pub fn rank_top_sites(links: Vec<Link>) -> Vec<Link> {
    rank_top_sites_at(links, now_ms())
}

/// Deterministic variant of [`rank_top_sites`] for callers that control time.
pub fn rank_top_sites_at(links: Vec<Link>, now: i64) -> Vec<Link> {
    let mut seen_hosts = HashSet::new();
    let deduped: Vec<Link> = links
        .into_iter()
        .filter(|link| !is_excluded_url(&link.url))
        .filter(|link| seen_hosts.insert(host_of(link)))
        .collect();

    let mut scored: Vec<(f64, Link)> = deduped
        .into_iter()
        .map(|link| (frecency_score(&link, now), link))
        .collect();

    // Vec::sort_by is stable, which makes the residual tie order stable too.
    scored.sort_by(|(score_a, link_a), (score_b, link_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                link_b
                    .last_visit_date
                    .unwrap_or(0)
                    .cmp(&link_a.last_visit_date.unwrap_or(0))
            })
            .then_with(|| link_b.url.cmp(&link_a.url))
    });

    scored.into_iter().map(|(_, link)| link).collect()
}

//! Page metadata extraction from fetched HTML.
//!
//! Pulls Open-Graph and plain meta tags with regexes rather than a full DOM
//! parse; preview metadata only needs the head section and tolerates missing
//! fields.

use once_cell::sync::Lazy;
use regex::Regex;

/// Metadata scraped from a fetched HTML document. Every field is optional;
/// absence is an ordinary outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub icon_url: Option<String>,
}

static ICON_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?is)<link[^>]+rel=["'][^"']*icon[^"']*["'][^>]+href=["']([^"']+)["']"#)
            .expect("icon pattern is a valid regex"),
        Regex::new(r#"(?is)<link[^>]+href=["']([^"']+)["'][^>]+rel=["'][^"']*icon[^"']*["']"#)
            .expect("icon pattern is a valid regex"),
    ]
});

/// Extracts the content of a `<meta>` tag by `property` or `name` key,
/// tolerating either attribute order.
fn extract_meta(html: &str, key: &str) -> Option<String> {
    let key_re = regex::escape(key);
    let patterns = [
        format!(r#"(?is)<meta[^>]+property=["']{key_re}["'][^>]+content=["']([^"']+)["']"#),
        format!(r#"(?is)<meta[^>]+name=["']{key_re}["'][^>]+content=["']([^"']+)["']"#),
        format!(r#"(?is)<meta[^>]+content=["']([^"']+)["'][^>]+property=["']{key_re}["']"#),
        format!(r#"(?is)<meta[^>]+content=["']([^"']+)["'][^>]+name=["']{key_re}["']"#),
    ];
    for pattern in patterns {
        if let Ok(re) = Regex::new(&pattern) {
            if let Some(captures) = re.captures(html) {
                if let Some(m) = captures.get(1) {
                    let value = m.as_str().trim();
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }
    None
}

fn extract_icon(html: &str) -> Option<String> {
    for re in ICON_PATTERNS.iter() {
        if let Some(captures) = re.captures(html) {
            if let Some(m) = captures.get(1) {
                let value = m.as_str().trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Parses preview metadata out of an HTML document.
pub fn parse_metadata(html: &str) -> PageMetadata {
    PageMetadata {
        image_url: extract_meta(html, "og:image").or_else(|| extract_meta(html, "twitter:image")),
        description: extract_meta(html, "og:description")
            .or_else(|| extract_meta(html, "description")),
        icon_url: extract_icon(html),
    }
}

//! Small helpers shared by the extractors.

use academy_core::text::collapse_whitespace;
use academy_core::{Error, Result};
use scraper::{ElementRef, Selector};
use url::Url;

pub fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))
}

/// Parses a configured selector, logging and skipping invalid ones.
pub fn parse_selector(selector: &str) -> Option<Selector> {
    Selector::parse(selector)
        .inspect_err(|e| tracing::warn!("Skipping invalid selector {:?}: {:?}", selector, e))
        .ok()
}

pub fn parse_selectors(selectors: &[String]) -> Vec<Selector> {
    selectors.iter().filter_map(|s| parse_selector(s)).collect()
}

/// Resolves an `href`/`src` value against the page URL. Fragment-only,
/// `javascript:`, `mailto:` and `data:` values resolve to nothing.
pub fn resolve_url(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    let lower = raw.to_ascii_lowercase();
    if raw.is_empty()
        || raw.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let resolved = base.join(raw).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

pub fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Escapes an attribute value the way the HTML serializer writes it.
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('"', "&quot;")
}

use academy_core::text::{collapse_whitespace, strip_tags, truncate_chars};
use academy_core::ScrapedArticle;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::config::{CategoryRule, ScrapeConfig};
use crate::html::{element_text, escape_attr, parse_selectors, resolve_url};

lazy_static! {
    static ref CHROME: Vec<Regex> = ["script", "style", "nav", "header", "footer"]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
        .collect();
}

/// Extracts the article body from an article page.
///
/// The first content selector with a non-empty match wins; otherwise the body
/// is used with scripts, styles and site chrome stripped. Image sources inside
/// the chosen container are made absolute and reported in `image_urls`.
/// Returns `None` for pages without a usable title or with too little text.
pub fn extract_article(
    html: &str,
    title: &str,
    url: &str,
    config: &ScrapeConfig,
) -> Option<ScrapedArticle> {
    let Ok(base) = Url::parse(url) else {
        tracing::warn!("Article URL is not absolute: {}", url);
        return None;
    };
    let document = Html::parse_document(html);

    let mut title = collapse_whitespace(title);
    if title.is_empty() {
        title = fallback_title(&document).unwrap_or_default();
    }
    if title.is_empty() {
        tracing::debug!("No title for {}, skipping", url);
        return None;
    }

    let container = content_container(&document, config)
        .unwrap_or_else(|| strip_chrome(&body_html(&document)));

    let sources = image_sources(&container, &base);
    let mut content = container;
    for (raw, absolute) in &sources {
        if raw != absolute {
            content = content.replace(
                &format!("src=\"{}\"", escape_attr(raw)),
                &format!("src=\"{}\"", escape_attr(absolute)),
            );
        }
    }
    let content = truncate_chars(&content, config.max_content_chars).to_string();

    if strip_tags(&content).trim().chars().count() < config.min_content_chars {
        tracing::debug!("Content too short for {}, skipping", url);
        return None;
    }

    let mut seen = HashSet::new();
    let image_urls = sources
        .into_iter()
        .map(|(_, absolute)| absolute)
        .filter(|u| seen.insert(u.clone()))
        .collect();

    Some(ScrapedArticle {
        category: categorize(&title, &config.category_rules, &config.default_category),
        title,
        content,
        image_urls,
        original_url: url.to_string(),
    })
}

/// First matching rule wins; `default` when no keyword occurs in the title.
pub fn categorize(title: &str, rules: &[CategoryRule], default: &str) -> String {
    rules
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| title.contains(k.as_str())))
        .map(|rule| rule.category.clone())
        .unwrap_or_else(|| default.to_string())
}

/// Absolute URLs of every `<img src>` inside `container_html`, in document order.
pub fn extract_image_urls(container_html: &str, base: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    image_sources(container_html, base)
        .into_iter()
        .map(|(_, absolute)| absolute)
        .filter(|u| seen.insert(u.clone()))
        .collect()
}

/// Removes `<script>`, `<style>`, `<nav>`, `<header>` and `<footer>` elements.
pub fn strip_chrome(html: &str) -> String {
    CHROME
        .iter()
        .fold(html.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
}

fn content_container(document: &Html, config: &ScrapeConfig) -> Option<String> {
    parse_selectors(&config.content_selectors)
        .iter()
        .find_map(|selector| {
            document
                .select(selector)
                .map(|el| el.inner_html())
                .find(|inner| !inner.trim().is_empty())
        })
}

fn body_html(document: &Html) -> String {
    Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next().map(|el| el.inner_html()))
        .unwrap_or_else(|| document.root_element().html())
}

fn fallback_title(document: &Html) -> Option<String> {
    ["h1", "title"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        document
            .select(&selector)
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty())
    })
}

fn image_sources(container_html: &str, base: &Url) -> Vec<(String, String)> {
    let fragment = Html::parse_fragment(container_html);
    let Ok(images) = Selector::parse("img[src]") else {
        return Vec::new();
    };
    fragment
        .select(&images)
        .filter_map(|img| {
            let raw = img.value().attr("src")?;
            let absolute = resolve_url(base, raw)?;
            Some((raw.to_string(), absolute))
        })
        .collect()
}

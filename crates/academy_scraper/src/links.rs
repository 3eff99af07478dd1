use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

use crate::config::ScrapeConfig;
use crate::html::{element_text, parse_selectors, resolve_url};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleLink {
    pub title: String,
    pub url: String,
}

/// Everything a listing page contributes to a crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub links: Vec<ArticleLink>,
    pub next_pages: Vec<String>,
}

pub fn parse_listing(html: &str, page_url: &str, config: &ScrapeConfig) -> ListingPage {
    let Ok(base) = Url::parse(page_url) else {
        tracing::warn!("Listing URL is not absolute: {}", page_url);
        return ListingPage::default();
    };
    let document = Html::parse_document(html);
    ListingPage {
        links: article_links(&document, &base, config),
        next_pages: if config.follow_pagination {
            pagination_links(&document, &base, config)
        } else {
            Vec::new()
        },
    }
}

/// Anchors that look like article links, in selector priority order.
/// An empty result is a normal outcome.
pub fn extract_article_links(html: &str, page_url: &str, config: &ScrapeConfig) -> Vec<ArticleLink> {
    match Url::parse(page_url) {
        Ok(base) => article_links(&Html::parse_document(html), &base, config),
        Err(_) => Vec::new(),
    }
}

fn article_links(document: &Html, base: &Url, config: &ScrapeConfig) -> Vec<ArticleLink> {
    let denylist: Vec<String> = config.nav_denylist.iter().map(|w| w.to_lowercase()).collect();
    let mut seen_titles = HashSet::new();
    let mut links = Vec::new();

    for selector in parse_selectors(&config.link_selectors) {
        for anchor in document.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let title = element_text(&anchor);
            if title.chars().count() < config.min_title_chars {
                continue;
            }
            let lowered = title.to_lowercase();
            if denylist.iter().any(|word| lowered.contains(word.as_str())) {
                continue;
            }
            let Some(url) = resolve_url(base, href) else {
                continue;
            };
            if seen_titles.insert(title.clone()) {
                links.push(ArticleLink { title, url });
            }
        }
    }

    links
}

fn pagination_links(document: &Html, base: &Url, config: &ScrapeConfig) -> Vec<String> {
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let current = base.as_str();
    let mut seen = HashSet::new();

    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(config.pagination_marker.as_str()))
        .filter_map(|href| resolve_url(base, href))
        .filter(|url| url != current && seen.insert(url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://academy.example.com/bbs/board.php?bo_table=admission";

    fn listing(rows: &[(&str, &str)]) -> String {
        let items: String = rows
            .iter()
            .map(|(title, href)| {
                format!(
                    "<tr><td class=\"subject\"><a href=\"{}\">{}</a></td></tr>",
                    href, title
                )
            })
            .collect();
        format!(
            r#"<html><body>
            <nav><a href="/">홈</a><a href="/menu">전체 메뉴 보기</a><a href="/login">로그인 하기</a></nav>
            <table>{}</table>
            </body></html>"#,
            items
        )
    }

    #[test]
    fn test_extracts_every_article_anchor() {
        let html = listing(&[
            ("2025 예중 입시요강 안내", "/bbs/board.php?bo_table=admission&wr_id=1"),
            ("예고 실기 시험 일정", "board.php?bo_table=admission&wr_id=2"),
            ("포트폴리오 준비 가이드", "https://academy.example.com/bbs/board.php?bo_table=admission&wr_id=3"),
        ]);
        let links = extract_article_links(&html, BASE, &ScrapeConfig::default());

        assert_eq!(links.len(), 3);
        assert!(links.iter().all(|l| !l.title.is_empty()));
        assert!(links.iter().all(|l| l.url.starts_with("https://academy.example.com/")));
        assert_eq!(
            links[1].url,
            "https://academy.example.com/bbs/board.php?bo_table=admission&wr_id=2"
        );
    }

    #[test]
    fn test_denylisted_anchors_are_dropped() {
        let html = r#"<div class="list">
            <a href="/">홈으로 이동</a>
            <a href="/m">메뉴 열기 닫기</a>
            <a href="/login">로그인 페이지</a>
            <a href="/view?idx=10">2024 입시 결과 분석</a>
        </div>"#;
        let links = extract_article_links(html, BASE, &ScrapeConfig::default());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "2024 입시 결과 분석");
        assert!(!links.iter().any(|l| ["홈", "메뉴", "로그인"].iter().any(|w| l.title.contains(w))));
    }

    #[test]
    fn test_duplicate_titles_keep_first_seen() {
        // the same anchor matches both `a[href*='wr_id']` and `.list a`
        let html = r#"<ul class="list">
            <li><a href="/view?wr_id=1">예고 입시설명회 안내</a></li>
            <li><a href="/view?wr_id=9">예고 입시설명회 안내</a></li>
        </ul>"#;
        let links = extract_article_links(html, BASE, &ScrapeConfig::default());
        assert_eq!(links.len(), 1);
        assert!(links[0].url.ends_with("wr_id=1"));
    }

    #[test]
    fn test_short_and_hrefless_anchors_are_skipped() {
        let html = r#"<div class="item"><a href="/v?idx=1">더보기</a><a>제목만 있는 앵커</a></div>"#;
        assert!(extract_article_links(html, BASE, &ScrapeConfig::default()).is_empty());
    }

    #[test]
    fn test_no_matching_selector_yields_nothing() {
        let html = "<html><body><p>게시글이 없습니다.</p></body></html>";
        assert!(extract_article_links(html, BASE, &ScrapeConfig::default()).is_empty());
    }

    #[test]
    fn test_parse_listing_collects_pagination() {
        let html = r#"<div class="list"><a href="/view?wr_id=1">겨울방학 실기 특강 모집</a></div>
            <div class="pg">
                <a href="/bbs/board.php?bo_table=admission&page=2">2</a>
                <a href="/bbs/board.php?bo_table=admission&page=3">3</a>
                <a href="/bbs/board.php?bo_table=admission&page=2">다음</a>
            </div>"#;
        let page = parse_listing(html, BASE, &ScrapeConfig::default());
        assert_eq!(page.links.len(), 1);
        assert_eq!(
            page.next_pages,
            vec![
                "https://academy.example.com/bbs/board.php?bo_table=admission&page=2".to_string(),
                "https://academy.example.com/bbs/board.php?bo_table=admission&page=3".to_string(),
            ]
        );

        let config = ScrapeConfig {
            follow_pagination: false,
            ..ScrapeConfig::default()
        };
        assert!(parse_listing(html, BASE, &config).next_pages.is_empty());
    }
}

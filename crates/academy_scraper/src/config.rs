//! Scraping policy. Everything that depends on the target site's markup lives
//! here as ordered data so a markup change is a configuration change.

use academy_core::{Error, Result, SchoolLevel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Maps title keywords to a category. Rules are tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keywords: Vec<String>,
    pub category: String,
}

impl CategoryRule {
    pub fn new(keywords: &[&str], category: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            category: category.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Pause between two page fetches of the same run.
    pub request_delay_ms: u64,
    /// Pause between two storage writes of the same run.
    pub record_delay_ms: u64,

    pub link_selectors: Vec<String>,
    pub content_selectors: Vec<String>,
    /// Anchor texts containing any of these are navigation, not articles.
    pub nav_denylist: Vec<String>,
    pub min_title_chars: usize,

    pub follow_pagination: bool,
    pub pagination_marker: String,
    /// Listing pages visited per listing URL, the first page included.
    pub max_pages: usize,
    pub max_articles: usize,

    pub max_content_chars: usize,
    pub min_content_chars: usize,
    pub excerpt_chars: usize,
    pub max_images_per_article: usize,

    pub category_rules: Vec<CategoryRule>,
    pub default_category: String,

    pub uploads_dir: PathBuf,
    /// Site path under which `uploads_dir` is served.
    pub uploads_prefix: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 15,
            request_delay_ms: 1500,
            record_delay_ms: 400,
            link_selectors: [
                "a[href*='wr_id']",
                "a[href*='idx=']",
                ".board-list a",
                "td.subject a",
                ".list a",
                ".item a",
                ".post a",
                "article a",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            content_selectors: [
                "#bo_v_con",
                ".view_content",
                ".board-view .content",
                ".article-content",
                ".post-content",
                ".entry-content",
                "article .content",
                ".content",
                "article",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            nav_denylist: ["홈", "메뉴", "로그인", "회원가입", "목록", "home", "menu", "login"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_title_chars: 5,
            follow_pagination: true,
            pagination_marker: "page=".to_string(),
            max_pages: 5,
            max_articles: 30,
            max_content_chars: 8_000,
            min_content_chars: 10,
            excerpt_chars: academy_core::text::EXCERPT_CHARS,
            max_images_per_article: 5,
            category_rules: vec![
                CategoryRule::new(&["입시요강", "모집요강"], "입시요강"),
                CategoryRule::new(&["실기", "시험"], "실기시험"),
                CategoryRule::new(&["설명회", "안내"], "입시설명회"),
                CategoryRule::new(&["포트폴리오"], "포트폴리오"),
                CategoryRule::new(&["결과", "분석"], "입시결과"),
            ],
            default_category: "입시정보".to_string(),
            uploads_dir: PathBuf::from("uploads"),
            uploads_prefix: "/uploads".to_string(),
        }
    }
}

impl ScrapeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn record_delay(&self) -> Duration {
        Duration::from_millis(self.record_delay_ms)
    }

    /// The uploads prefix is mounted as a router path, so it must be absolute and not the root.
    pub fn validate(&self) -> Result<()> {
        let prefix = &self.uploads_prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(Error::InvalidInput(format!(
                "uploads_prefix must look like \"/uploads\", got {:?}",
                prefix
            )));
        }
        Ok(())
    }
}

/// A remote board to import from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeTarget {
    pub name: String,
    pub listing_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub config: ScrapeConfig,
    pub middle_school: ScrapeTarget,
    pub high_school: ScrapeTarget,
}

impl ScraperSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&raw).map_err(|e| {
            Error::InvalidInput(format!(
                "Invalid scraper configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        settings.config.validate()?;
        Ok(settings)
    }

    pub fn target(&self, level: SchoolLevel) -> &ScrapeTarget {
        match level {
            SchoolLevel::Middle => &self.middle_school,
            SchoolLevel::High => &self.high_school,
        }
    }

    pub fn with_uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.uploads_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "config": {{ "request_delay_ms": 0, "content_selectors": [".board_view"] }},
                "high_school": {{ "name": "예고 입시", "listing_urls": ["https://example.com/board?bo_table=high"] }}
            }}"#
        )
        .unwrap();

        let settings = ScraperSettings::load(file.path()).unwrap();
        assert_eq!(settings.config.request_delay_ms, 0);
        assert_eq!(settings.config.content_selectors, vec![".board_view".to_string()]);
        assert_eq!(settings.config.max_content_chars, 8_000);
        assert_eq!(settings.target(SchoolLevel::High).listing_urls.len(), 1);
        assert!(settings.target(SchoolLevel::Middle).listing_urls.is_empty());
    }

    #[test]
    fn test_uploads_location_comes_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "config": {{ "uploads_dir": "/srv/media", "uploads_prefix": "/media" }} }}"#
        )
        .unwrap();

        let settings = ScraperSettings::load(file.path()).unwrap();
        assert_eq!(settings.config.uploads_dir, PathBuf::from("/srv/media"));
        assert_eq!(settings.config.uploads_prefix, "/media");
    }

    #[test]
    fn test_uploads_prefix_must_be_a_mountable_path() {
        for prefix in ["", "/", "media", "/media/"] {
            let config = ScrapeConfig {
                uploads_prefix: prefix.to_string(),
                ..ScrapeConfig::default()
            };
            assert!(config.validate().is_err(), "{:?}", prefix);
        }
        assert!(ScrapeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(ScraperSettings::load(file.path()).is_err());
    }
}

use academy_core::{SchoolLevel, ScrapedArticle, Storage};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::article::extract_article;
use crate::config::{ScrapeTarget, ScraperSettings};
use crate::fetcher::{build_client, Fetcher};
use crate::images::ImageDownloader;
use crate::importer::{ImportStage, Importer};
use crate::links::{parse_listing, ArticleLink};
use crate::logging::Logger;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Delete the level's existing admissions before inserting the new batch.
    pub clear_existing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported { count: usize, failed: usize },
    /// Scraping succeeded but produced no usable article.
    NothingFound,
    /// The run could not start.
    Failed(String),
}

/// Summary handed back to the admin UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub success: bool,
    pub message: String,
    pub count: usize,
}

impl From<ImportOutcome> for ImportReport {
    fn from(outcome: ImportOutcome) -> Self {
        match outcome {
            ImportOutcome::Imported { count: 0, failed } => Self {
                success: false,
                message: format!("저장에 성공한 글이 없습니다 (실패 {}건).", failed),
                count: 0,
            },
            ImportOutcome::Imported { count, failed } => Self {
                success: true,
                message: if failed > 0 {
                    format!("{}건을 가져왔습니다 (실패 {}건).", count, failed)
                } else {
                    format!("{}건을 가져왔습니다.", count)
                },
                count,
            },
            ImportOutcome::NothingFound => Self {
                success: false,
                message: "가져올 글을 찾지 못했습니다. 대상 주소나 선택자 설정을 확인하세요.".to_string(),
                count: 0,
            },
            ImportOutcome::Failed(reason) => Self {
                success: false,
                message: reason,
                count: 0,
            },
        }
    }
}

/// Runs admission imports against the configured targets.
pub struct ScrapeManager {
    settings: ScraperSettings,
    storage: Storage,
}

impl ScrapeManager {
    pub fn new(settings: ScraperSettings, storage: Storage) -> Self {
        Self { settings, storage }
    }

    pub fn settings(&self) -> &ScraperSettings {
        &self.settings
    }

    fn fetcher(&self) -> academy_core::Result<Fetcher> {
        let config = &self.settings.config;
        let client = build_client(&config.user_agent, config.request_timeout())?;
        Ok(Fetcher::new(client, config.request_delay()))
    }

    /// One full import run: crawl listings, extract articles, store them.
    /// Never returns an error; every problem ends up in the outcome.
    pub async fn run(&self, level: SchoolLevel, options: RunOptions) -> ImportOutcome {
        let logger = Logger::new().with_new_prefixes(format!("[{}]", level));
        let config = &self.settings.config;
        let target = self.settings.target(level);

        if target.listing_urls.is_empty() {
            logger.warn("No listing URLs configured");
            return ImportOutcome::Failed(format!(
                "{} 입시 게시판 주소가 설정되지 않았습니다.",
                level.label()
            ));
        }

        let fetcher = match self.fetcher() {
            Ok(fetcher) => fetcher,
            Err(e) => return ImportOutcome::Failed(format!("HTTP 클라이언트를 만들 수 없습니다: {}", e)),
        };
        let downloader = ImageDownloader::new(
            fetcher.client().clone(),
            &config.uploads_dir,
            &config.uploads_prefix,
        );
        if let Err(e) = downloader.ensure_dir().await {
            logger.error(&e.to_string());
            return ImportOutcome::Failed(format!("업로드 폴더를 만들 수 없습니다: {}", e));
        }

        logger.info(&format!("🦗 Starting import from {}", target.name));
        let links = self.collect_links(&fetcher, target, &logger).await;
        logger.info(&format!("🔗 Found {} article links", links.len()));

        let articles = self.scrape_articles(&fetcher, &links, &logger).await;
        if articles.is_empty() {
            logger.warn("No articles extracted");
            return ImportOutcome::NothingFound;
        }

        let repository = self.storage.admissions(level);
        if options.clear_existing {
            match repository.clear().await {
                Ok(removed) => logger.info(&format!("🧹 Removed {} existing records", removed)),
                Err(e) => logger.error(&format!("Failed to clear existing records: {}", e)),
            }
        }

        let importer = Importer::new(repository, downloader)
            .with_max_images(config.max_images_per_article)
            .with_excerpt_chars(config.excerpt_chars)
            .with_record_delay(config.record_delay())
            .with_logger(logger.clone());
        let summary = importer.import_articles(&articles).await;

        logger.info(&format!(
            "✨ Import finished: {} stored, {} failed",
            summary.count(),
            summary.failed
        ));
        ImportOutcome::Imported {
            count: summary.count(),
            failed: summary.failed,
        }
    }

    /// Walks every listing URL of `target`, following pagination up to
    /// `max_pages` pages each. Links are unique by title and URL.
    pub async fn collect_links(
        &self,
        fetcher: &Fetcher,
        target: &ScrapeTarget,
        logger: &Logger,
    ) -> Vec<ArticleLink> {
        let config = &self.settings.config;
        let mut titles = HashSet::new();
        let mut urls = HashSet::new();
        let mut links = Vec::new();

        'listings: for listing_url in &target.listing_urls {
            let mut queue = VecDeque::from([listing_url.clone()]);
            let mut visited = HashSet::new();

            while let Some(page_url) = queue.pop_front() {
                if visited.len() >= config.max_pages.max(1) {
                    break;
                }
                if !visited.insert(page_url.clone()) {
                    continue;
                }

                logger.debug(&format!("{} {}", ImportStage::Fetching, page_url));
                let Some(page) = fetcher.fetch(&page_url).await else {
                    continue;
                };
                let listing = parse_listing(&page.body, &page.url, config);

                for link in listing.links {
                    if titles.contains(&link.title) || urls.contains(&link.url) {
                        continue;
                    }
                    titles.insert(link.title.clone());
                    urls.insert(link.url.clone());
                    links.push(link);
                    if links.len() >= config.max_articles {
                        break 'listings;
                    }
                }

                queue.extend(
                    listing
                        .next_pages
                        .into_iter()
                        .filter(|next| !visited.contains(next)),
                );
            }
        }

        links
    }

    /// Fetches and extracts each article. Pages that fail either step are skipped.
    pub async fn scrape_articles(
        &self,
        fetcher: &Fetcher,
        links: &[ArticleLink],
        logger: &Logger,
    ) -> Vec<ScrapedArticle> {
        let mut articles = Vec::new();

        for link in links {
            logger.debug(&format!("{} {}", ImportStage::Fetching, link.url));
            let Some(page) = fetcher.fetch(&link.url).await else {
                continue;
            };

            logger.debug(&format!("{} {}", ImportStage::Extracting, link.title));
            match extract_article(&page.body, &link.title, &link.url, &self.settings.config) {
                Some(article) => articles.push(article),
                None => logger.debug(&format!("Skipped {}: no usable content", link.url)),
            }
        }

        articles
    }

    /// Fetches and extracts a single article without storing it.
    pub async fn preview(&self, url: &str, title: &str) -> Option<ScrapedArticle> {
        let fetcher = self.fetcher().ok()?;
        let page = fetcher.fetch(url).await?;
        extract_article(&page.body, title, url, &self.settings.config)
    }
}

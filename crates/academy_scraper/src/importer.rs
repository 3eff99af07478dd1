use academy_core::text::excerpt;
use academy_core::{Admission, Attachments, NewAdmission, Repository, Result, ScrapedArticle};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::html::escape_attr;
use crate::images::ImageDownloader;
use crate::logging::Logger;

/// Where an import run currently is. Failures in any stage move on to the next article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Idle,
    Fetching,
    Extracting,
    Downloading,
    Persisting,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportStage::Idle => "idle",
            ImportStage::Fetching => "fetching",
            ImportStage::Extracting => "extracting",
            ImportStage::Downloading => "downloading",
            ImportStage::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub imported: Vec<Admission>,
    pub failed: usize,
}

impl ImportSummary {
    pub fn count(&self) -> usize {
        self.imported.len()
    }
}

/// Persists scraped articles as admission records.
pub struct Importer {
    repository: Arc<dyn Repository<Admission>>,
    downloader: ImageDownloader,
    max_images: usize,
    excerpt_chars: usize,
    record_delay: Duration,
    logger: Logger,
}

impl Importer {
    pub fn new(repository: Arc<dyn Repository<Admission>>, downloader: ImageDownloader) -> Self {
        Self {
            repository,
            downloader,
            max_images: 5,
            excerpt_chars: academy_core::text::EXCERPT_CHARS,
            record_delay: Duration::from_millis(400),
            logger: Logger::new(),
        }
    }

    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images;
        self
    }

    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    pub fn with_record_delay(mut self, record_delay: Duration) -> Self {
        self.record_delay = record_delay;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Imports every article, one at a time. A failing article is logged and
    /// counted; the rest of the batch still runs.
    pub async fn import_articles(&self, articles: &[ScrapedArticle]) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for (i, article) in articles.iter().enumerate() {
            if i > 0 && !self.record_delay.is_zero() {
                sleep(self.record_delay).await;
            }
            match self.import_article(article).await {
                Ok(admission) => {
                    self.logger.info(&format!("✅ Imported #{} {}", admission.id, admission.title));
                    summary.imported.push(admission);
                }
                Err(e) => {
                    self.logger.error(&format!("❌ Failed to import {}: {}", article.title, e));
                    summary.failed += 1;
                }
            }
        }

        self.logger.debug(&format!("{}", ImportStage::Idle));
        summary
    }

    pub async fn import_article(&self, article: &ScrapedArticle) -> Result<Admission> {
        self.logger.debug(&format!("{} {}", ImportStage::Downloading, article.original_url));
        let (content, images) = self.localize_images(article).await;

        self.logger.debug(&format!("{} {}", ImportStage::Persisting, article.title));
        let draft = NewAdmission {
            title: article.title.clone(),
            excerpt: Some(excerpt(&content, self.excerpt_chars)),
            content,
            category: article.category.clone(),
            attachments: Attachments {
                images,
                original_url: Some(article.original_url.clone()),
            },
        };
        self.repository.create(draft).await
    }

    /// Downloads up to `max_images` images and rewrites their URLs in the
    /// content. Images that could not be stored keep their remote URL.
    pub async fn localize_images(&self, article: &ScrapedArticle) -> (String, Vec<String>) {
        let mut content = article.content.clone();
        let mut images = Vec::new();

        for remote in article.image_urls.iter().take(self.max_images) {
            let local = self.downloader.download_image(remote).await;
            if &local != remote {
                content = rewrite_url(&content, remote, &local);
            }
            images.push(local);
        }

        (content, images)
    }
}

/// Replaces whole quoted attribute values only, so a URL that merely starts
/// with `remote` is left alone.
fn rewrite_url(content: &str, remote: &str, local: &str) -> String {
    let quoted_local = format!("\"{}\"", local);
    let escaped = escape_attr(remote);
    let content = if escaped != remote {
        content.replace(&format!("\"{}\"", escaped), &quoted_local)
    } else {
        content.to_string()
    };
    content.replace(&format!("\"{}\"", remote), &quoted_local)
}

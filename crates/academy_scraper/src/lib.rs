pub mod article;
pub mod cli;
pub mod config;
pub mod fetcher;
pub mod html;
pub mod images;
pub mod importer;
pub mod links;
pub mod logging;
pub mod manager;

pub use cli::{handle_command, ScraperArgs, ScraperCommands};
pub use config::{CategoryRule, ScrapeConfig, ScrapeTarget, ScraperSettings};
pub use importer::{ImportSummary, Importer};
pub use logging::{init_logging, Logger};
pub use manager::{ImportOutcome, ImportReport, RunOptions, ScrapeManager};

pub mod prelude {
    pub use super::manager::{ImportReport, RunOptions, ScrapeManager};
    pub use super::config::ScraperSettings;
    pub use academy_core::{Error, Result, ScrapedArticle};
}

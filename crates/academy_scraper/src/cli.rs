use academy_core::{Result, SchoolLevel, Storage};
use clap::{Args, Subcommand};

use crate::config::ScraperSettings;
use crate::html::parse_url;
use crate::manager::{ImportReport, RunOptions, ScrapeManager};

#[derive(Args, Debug)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug)]
pub enum ScraperCommands {
    /// Import admission posts for one school level
    Run {
        /// middle or high
        level: SchoolLevel,
        /// Delete existing posts of the level before storing the new batch
        #[arg(long)]
        clear: bool,
    },
    /// Show the configured listing URLs
    Targets,
    /// Fetch and extract one article without storing it
    Preview {
        url: String,
        /// Title to use when the listing title is not known
        #[arg(long, default_value = "")]
        title: String,
    },
}

pub async fn handle_command(args: ScraperArgs, settings: ScraperSettings, storage: Storage) -> Result<()> {
    let manager = ScrapeManager::new(settings, storage);

    match args.command {
        ScraperCommands::Run { level, clear } => {
            let outcome = manager
                .run(level, RunOptions { clear_existing: clear })
                .await;
            let report = ImportReport::from(outcome);
            let emoji = if report.success { "✅" } else { "❌" };
            println!("{} {}", emoji, report.message);
            if !report.success {
                return Err(academy_core::Error::Scraping(report.message));
            }
        }
        ScraperCommands::Targets => {
            for level in SchoolLevel::ALL {
                let target = manager.settings().target(level);
                println!("{} ({})", level.label(), target.name);
                if target.listing_urls.is_empty() {
                    println!("  (none)");
                }
                for url in &target.listing_urls {
                    println!("  {}", url);
                }
            }
        }
        ScraperCommands::Preview { url, title } => match manager.preview(parse_url(&url)?.as_str(), &title).await {
            Some(article) => {
                println!("📰 {}", article.title);
                println!("🏷️ {}", article.category);
                println!("🖼️ {} images", article.image_urls.len());
                println!();
                println!("{}", academy_core::text::excerpt(&article.content, 500));
            }
            None => {
                return Err(academy_core::Error::NotFound(format!(
                    "No article content found at {}",
                    url
                )));
            }
        },
    }
    Ok(())
}

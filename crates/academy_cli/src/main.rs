use academy_core::{ListQuery, Repository, SchoolLevel, Storage};
use academy_scraper::{handle_command, init_logging, ScraperArgs, ScraperCommands, ScraperSettings};
use academy_web::{create_app, AdminCredentials, AppState, SessionStore};
use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "academy", author, version, about, long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, env = "ACADEMY_STORAGE", default_value = "memory")]
    storage: String,
    /// SQLite database file
    #[arg(long, env = "ACADEMY_DATABASE")]
    database: Option<PathBuf>,
    /// Directory holding uploaded and scraped images. Overrides `uploads_dir` of the scraper configuration
    #[arg(long, env = "ACADEMY_UPLOADS")]
    uploads: Option<PathBuf>,
    /// JSON file with scraper targets and selectors
    #[arg(long, env = "ACADEMY_SCRAPER_CONFIG")]
    scraper_config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        #[arg(long, env = "ACADEMY_ADDR", default_value = "0.0.0.0:5000")]
        addr: SocketAddr,
        #[arg(long, env = "ACADEMY_ADMIN_USER", default_value = "admin")]
        admin_user: String,
        /// Admin login is disabled when unset
        #[arg(long, env = "ACADEMY_ADMIN_PASSWORD", default_value = "", hide_env_values = true)]
        admin_password: String,
        #[arg(long, env = "ACADEMY_SESSION_TTL_MINS", default_value_t = 24 * 60)]
        session_ttl_mins: i64,
    },
    /// Import admission posts for one school level
    Scrape {
        /// middle or high
        level: SchoolLevel,
        /// Delete existing posts of the level first
        #[arg(long)]
        clear: bool,
    },
    /// Inspect scraper targets or preview a single article
    Scraper {
        #[command(subcommand)]
        command: ScraperCommands,
    },
}

fn load_settings(path: Option<&Path>, uploads: Option<&Path>) -> anyhow::Result<ScraperSettings> {
    let settings = match path {
        Some(path) => ScraperSettings::load(path)
            .with_context(|| format!("loading scraper configuration from {}", path.display()))?,
        None => {
            warn!("No scraper configuration given, no listing URLs are configured");
            ScraperSettings::default()
        }
    };
    Ok(match uploads {
        Some(dir) => settings.with_uploads_dir(dir),
        None => settings,
    })
}

async fn check_storage(storage: &Storage, kind: &str) -> anyhow::Result<()> {
    let first = ListQuery::new(1, 1);
    let notices = storage.notices.list(&first).await?.total;
    let gallery = storage.gallery.list(&first).await?.total;
    let roadmaps = storage.roadmaps.list(&first).await?.total;
    let middle = storage.middle_school.list(&first).await?.total;
    let high = storage.high_school.list(&first).await?.total;
    info!(
        "🏦 Storage ready (using {}): {} notices, {} gallery items, {} roadmaps, {}/{} admissions",
        kind, notices, gallery, roadmaps, middle, high
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let storage = academy_storage::create_storage(&cli.storage, cli.database.as_deref())
        .await
        .with_context(|| format!("initializing {} storage", cli.storage))?;
    check_storage(&storage, &cli.storage).await?;

    let settings = load_settings(cli.scraper_config.as_deref(), cli.uploads.as_deref())?;
    info!(
        "📁 Serving {} under {}",
        settings.config.uploads_dir.display(),
        settings.config.uploads_prefix
    );

    match cli.command {
        Commands::Serve {
            addr,
            admin_user,
            admin_password,
            session_ttl_mins,
        } => {
            if admin_password.is_empty() {
                warn!("⚠️ ACADEMY_ADMIN_PASSWORD is not set, admin login is disabled");
            }
            let state = AppState {
                storage: storage.clone(),
                sessions: SessionStore::new(chrono::Duration::minutes(session_ttl_mins)),
                scraper: academy_scraper::ScrapeManager::new(settings, storage),
                admin: AdminCredentials::new(admin_user, admin_password),
            };
            let app = create_app(state).await;

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {}", addr))?;
            info!("🚀 Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Scrape { level, clear } => {
            info!("🦗 Importing {} admissions", level);
            let args = ScraperArgs {
                command: ScraperCommands::Run { level, clear },
            };
            handle_command(args, settings, storage).await?;
        }
        Commands::Scraper { command } => {
            handle_command(ScraperArgs { command }, settings, storage).await?;
        }
    }

    Ok(())
}

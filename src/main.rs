mod api;
mod browser;
mod config;
mod connections;
mod db;
mod error;
mod export;
mod model;
mod parser;
mod scraper;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use browser::chrome::ChromeSession;
use config::{LogFormat, LoggingConfig, Settings};
use db::Store;

#[derive(Parser)]
#[command(name = "linkedin_scraper", about = "LinkedIn connection and profile scraper")]
struct Cli {
    /// Config file (TOML); overridden by LINKEDIN__* environment variables
    #[arg(short, long, global = true, default_value = "scraper.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, scrape connections, visit their profiles, export JSON
    Run {
        /// Max connections to collect
        #[arg(short = 'n', long)]
        max: Option<usize>,
    },
    /// Log in and scrape the connections list only
    Connections {
        #[arg(short = 'n', long)]
        max: Option<usize>,
    },
    /// Log in and visit profiles (default: stored connections not yet detailed)
    Profiles {
        urls: Vec<String>,
        /// Max stored profiles to visit when no URLs are given
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Write all stored connections to a JSON file
    Export {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Merge a previous export file back into the store
    Import { file: PathBuf },
    /// Serve the HTTP API
    Serve {
        /// Listen address (default from config)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Show store statistics
    Stats,
}

fn init_logging(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match cfg.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;
    init_logging(&settings.logging);

    let result = match cli.command {
        Commands::Run { max } => {
            let settings = Arc::new(settings);
            let store = Arc::new(Store::open(&settings.store.path)?);
            let out = PathBuf::from(&settings.scrape.export_path);
            let job_store = Arc::clone(&store);
            let (cards, reports) = tokio::task::spawn_blocking(move || {
                let session = login_session(&settings, &job_store)?;
                let max = max.unwrap_or(settings.scrape.max_connections);
                let cards = connections::scrape_connections(
                    session.page(),
                    &job_store,
                    &settings.scrape,
                    settings.browser.element_timeout(),
                    max,
                    None,
                )?;
                let urls: Vec<String> = cards.iter().map(|c| c.profile_url.clone()).collect();
                let reports = visit_with_progress(&session, &job_store, &settings, &urls);
                anyhow::Ok((cards.len(), reports))
            })
            .await??;
            let written = export::export_json(&store, &out)?;
            println!(
                "Collected {} connections, detailed {} profiles, exported {} records to {}",
                cards,
                reports,
                written,
                out.display()
            );
            Ok(())
        }
        Commands::Connections { max } => {
            let settings = Arc::new(settings);
            let store = Arc::new(Store::open(&settings.store.path)?);
            let cards = tokio::task::spawn_blocking(move || {
                let session = login_session(&settings, &store)?;
                let max = max.unwrap_or(settings.scrape.max_connections);
                let cards = connections::scrape_connections(
                    session.page(),
                    &store,
                    &settings.scrape,
                    settings.browser.element_timeout(),
                    max,
                    None,
                )?;
                anyhow::Ok(cards)
            })
            .await??;
            for (i, c) in cards.iter().enumerate() {
                println!("{:>3} | {:<28.28} | {}", i + 1, c.full_name, c.profile_url);
            }
            println!("\n{} connections saved", cards.len());
            Ok(())
        }
        Commands::Profiles { urls, limit } => {
            let settings = Arc::new(settings);
            let store = Arc::new(Store::open(&settings.store.path)?);
            let urls = if urls.is_empty() {
                store.fetch_undetailed(limit)?
            } else {
                urls
            };
            if urls.is_empty() {
                println!("No profiles to visit. Run 'connections' first or pass URLs.");
                return Ok(());
            }
            let ok = tokio::task::spawn_blocking(move || {
                let session = login_session(&settings, &store)?;
                anyhow::Ok(visit_with_progress(&session, &store, &settings, &urls))
            })
            .await??;
            println!("Detailed {} profiles", ok);
            Ok(())
        }
        Commands::Export { out } => {
            let store = Store::open(&settings.store.path)?;
            let out = out.unwrap_or_else(|| PathBuf::from(&settings.scrape.export_path));
            let n = export::export_json(&store, &out)?;
            println!("Exported {} connections to {}", n, out.display());
            Ok(())
        }
        Commands::Import { file } => {
            let store = Store::open(&settings.store.path)?;
            let counts = export::import_json(&store, &file)?;
            println!(
                "Imported {} new, merged {}, skipped {} from {}",
                counts.created,
                counts.updated,
                counts.skipped,
                file.display()
            );
            Ok(())
        }
        Commands::Serve { addr } => {
            if let Some(addr) = addr {
                settings.http.listen_addr = addr;
            }
            let settings = Arc::new(settings);
            let store = Arc::new(Store::open(&settings.store.path)?);
            let state = api::handlers::AppState::new(store, Arc::clone(&settings));
            api::server::serve(&settings.http, state).await
        }
        Commands::Stats => {
            let store = Store::open(&settings.store.path)?;
            let s = store.get_stats()?;
            println!("Connections: {}", s.connections);
            println!("Detailed:    {}", s.detailed);
            println!("Pending:     {}", s.undetailed);
            println!("Sessions:    {}", s.sessions);
            println!("Logged in:   {}", s.active_sessions);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", elapsed_label(elapsed));
    }

    result
}

/// Launch Chrome and sign in with the configured credentials.
fn login_session(settings: &Settings, store: &Store) -> anyhow::Result<ChromeSession> {
    let (Some(email), Some(password)) = (
        settings.credentials.email.as_deref(),
        settings.credentials.password.as_deref(),
    ) else {
        bail!("credentials.email and credentials.password must be set (config or LINKEDIN__CREDENTIALS__*)");
    };
    let session = ChromeSession::launch(&settings.browser)?;
    scraper::login(
        session.page(),
        store,
        email,
        password,
        settings.browser.element_timeout(),
        None,
    )
    .context("Login failed")?;
    Ok(session)
}

fn visit_with_progress(
    session: &ChromeSession,
    store: &Store,
    settings: &Settings,
    urls: &[String],
) -> usize {
    let pb = scraper::progress_bar(urls.len());
    let reports =
        scraper::visit_profiles(session.page(), store, &settings.scrape, urls, None, Some(&pb));
    pb.finish_and_clear();
    reports.iter().filter(|r| r.is_ok()).count()
}

fn elapsed_label(d: std::time::Duration) -> String {
    match d.as_secs() {
        s if s < 60 => format!("{:.1}s", d.as_secs_f64()),
        s => format!("{}m {:02}s", s / 60, s % 60),
    }
}

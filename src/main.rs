//! card_search - YuGiOh Card Database & Search
//!
//! Mirrors the YGOPRODeck card catalog into a local SQLite store and
//! serves a search web UI with cached card images.

use card_search::image_cache::ImageCache;
use card_search::ingest::{self, IngestConfig};
use card_search::status::StatusTracker;
use card_search::{database, web, ygoprodeck};
use clap::Parser;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::interval;

/// YuGiOh card database server - mirrors the YGOPRODeck catalog and serves card search
#[derive(Parser, Debug)]
#[command(name = "card_search")]
#[command(version, about, long_about = None)]
struct Args {
    /// Port for the web UI (defaults to the PORT environment variable)
    #[arg(short, long, default_value_t = default_port())]
    port: u16,

    /// Path to a SQLite database file (default: in-memory store)
    #[arg(short, long)]
    database: Option<String>,

    /// Card catalog endpoint to mirror
    #[arg(long, default_value = ygoprodeck::CATALOG_URL)]
    source_url: String,

    /// Re-fetch the catalog every N hours (default: ingest once at startup)
    #[arg(long)]
    refresh_interval_hours: Option<u64>,
}

/// Returns the listening port: $PORT if set, else 5000
fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000)
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    log::info!("Starting card_search...");
    match &args.database {
        Some(path) => log::info!("Card store: {}", path),
        None => log::info!("Card store: in-memory"),
    }

    let conn = match database::open_store(args.database.as_deref()) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to open card store: {}", e);
            std::process::exit(1);
        }
    };

    let db = Arc::new(Mutex::new(conn));
    let status = Arc::new(StatusTracker::new());
    let images = Arc::new(ImageCache::new());

    let config = IngestConfig {
        source_url: args.source_url.clone(),
        ..IngestConfig::default()
    };

    // Populate the store in the background; requests arriving before the
    // ready transition get a 503 from the readiness gate.
    {
        let db = Arc::clone(&db);
        let status = Arc::clone(&status);
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = ingest::run(&db, &status, &config).await {
                log::error!("Catalog ingestion failed: {}", e);
            }
        });
    }

    if let Some(hours) = args.refresh_interval_hours {
        let db = Arc::clone(&db);
        let status = Arc::clone(&status);
        let config = config.clone();
        log::info!("Catalog refresh scheduled every {} hour(s)", hours);
        tokio::spawn(async move {
            run_refresh_daemon(&db, &status, &config, hours).await;
        });
    }

    if let Err(e) = web::serve(db, status, images, args.port).await {
        log::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}

/// Periodic catalog refresh loop for the daemon variant
async fn run_refresh_daemon(
    db: &Arc<Mutex<Connection>>,
    status: &Arc<StatusTracker>,
    config: &IngestConfig,
    interval_hours: u64,
) {
    let mut ticker = interval(Duration::from_secs(interval_hours * 3600));
    // the first tick fires immediately; the startup run already covers it
    ticker.tick().await;

    loop {
        ticker.tick().await;
        log::info!("Scheduled catalog refresh triggered");
        match ingest::refresh(db, status, config).await {
            Ok(added) if added > 0 => log::info!("Refresh added {} new cards", added),
            Ok(_) => log::info!("Catalog unchanged"),
            Err(e) => log::error!("Catalog refresh failed: {}", e),
        }
    }
}

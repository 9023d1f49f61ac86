//! Catalog ingestion pipeline
//!
//! Populates the card store from the upstream catalog in chunks while
//! publishing progress through the shared status tracker. Exactly one run
//! executes at a time; the tracker's check-and-transition admits it.

use crate::database;
use crate::error::Result;
use crate::status::{StatusTracker, PROGRESS_FETCH};
use crate::ygoprodeck;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Cards committed per transaction
pub const CHUNK_SIZE: usize = 100;

/// Ingestion settings
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Catalog endpoint to mirror
    pub source_url: String,
    /// Cards committed per transaction
    pub chunk_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_url: ygoprodeck::CATALOG_URL.to_string(),
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// Run one full ingestion pass
///
/// A run that already completed, or is currently in flight, makes this a
/// no-op. An upstream or database failure is terminal for the run: the
/// tracker lands in the error state and nothing retries automatically.
/// Chunks committed before a failure stay in the store.
pub async fn run(
    db: &Arc<Mutex<Connection>>,
    status: &Arc<StatusTracker>,
    config: &IngestConfig,
) -> Result<()> {
    if !status.try_begin("Initializing database...") {
        log::info!("Ingestion already completed or in flight, skipping");
        return Ok(());
    }

    {
        let conn = db.lock().unwrap();
        if let Err(e) = database::init_schema(&conn) {
            status.fail("Failed to initialize database", &e.to_string());
            return Err(e.into());
        }
    }

    status.set_updating("Fetching card data from API...", PROGRESS_FETCH);

    let cards = match ygoprodeck::fetch_catalog(&config.source_url).await {
        Ok(cards) => cards,
        Err(e) => {
            status.fail("Failed to initialize database", &e.to_string());
            return Err(e);
        }
    };

    status.set_total(cards.len());

    for chunk in cards.chunks(config.chunk_size.max(1)) {
        let inserted = {
            let mut conn = db.lock().unwrap();
            database::upsert_cards(&mut conn, chunk)
        };
        if let Err(e) = inserted {
            status.fail("Failed to populate database", &e.to_string());
            return Err(e.into());
        }

        let (current, total, progress) = status.advance(chunk.len());
        log::info!(
            "Processed chunk of {} cards ({}/{}, {}%)",
            chunk.len(),
            current,
            total,
            progress
        );
    }

    status.complete();
    log::info!("Database initialization completed successfully");
    Ok(())
}

/// Periodic refresh pass for the daemon variant
///
/// Re-fetches the catalog and upserts every record, picking up cards added
/// upstream since the last pass. The store stays ready throughout, so
/// readers are never re-gated. When the initial run never completed, this
/// falls back to a full run instead.
///
/// Returns the number of cards added.
pub async fn refresh(
    db: &Arc<Mutex<Connection>>,
    status: &Arc<StatusTracker>,
    config: &IngestConfig,
) -> Result<usize> {
    if !status.is_ready() {
        run(db, status, config).await?;
        return Ok(0);
    }

    let cards = ygoprodeck::fetch_catalog(&config.source_url).await?;

    let before = {
        let conn = db.lock().unwrap();
        database::get_card_count(&conn)?
    };

    for chunk in cards.chunks(config.chunk_size.max(1)) {
        let mut conn = db.lock().unwrap();
        database::upsert_cards(&mut conn, chunk)?;
    }

    let after = {
        let conn = db.lock().unwrap();
        database::get_card_count(&conn)?
    };

    status.refreshed(after.max(0) as usize);

    let added = after.saturating_sub(before).max(0) as usize;
    log::info!("Catalog refresh complete: {} cards ({} new)", after, added);
    Ok(added)
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;

//! Card store operations
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Writes go through one transaction per chunk. The store is written only
//! by the ingestion pipeline; request handlers only read.

use crate::ygoprodeck::CardRecord;
use rusqlite::{params, Connection, Transaction};

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Open the card store
///
/// In-memory by default; file-backed when a path is given. The store is a
/// mirror of the upstream catalog, so losing it on restart just means
/// re-ingesting.
pub fn open_store(path: Option<&str>) -> DbResult<Connection> {
    match path {
        Some(path) => Connection::open(path),
        None => Connection::open_in_memory(),
    }
}

/// Initialize the database schema
///
/// `card_data` holds the original record as fetched; the other columns are
/// projections of it at insert time. Search is a full-table LIKE scan, so
/// no indexes beyond the primary key.
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            card_type TEXT NOT NULL,
            desc TEXT NOT NULL,
            card_data TEXT NOT NULL,
            image_url TEXT
        );
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Upsert one chunk of card records into the store
///
/// Uses INSERT OR REPLACE so a duplicate id updates in place instead of
/// failing. The whole chunk commits in a single transaction.
pub fn upsert_cards(conn: &mut Connection, cards: &[CardRecord]) -> DbResult<usize> {
    let tx = conn.transaction()?;
    let count = upsert_cards_tx(&tx, cards)?;
    tx.commit()?;
    Ok(count)
}

fn upsert_cards_tx(tx: &Transaction<'_>, cards: &[CardRecord]) -> DbResult<usize> {
    let mut stmt = tx.prepare_cached(
        "INSERT OR REPLACE INTO cards (id, name, card_type, desc, card_data, image_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    let mut count = 0;
    for card in cards {
        let card_data = serde_json::to_string(card)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        stmt.execute(params![
            card.id,
            &card.name,
            &card.card_type,
            &card.desc,
            card_data,
            card.image_url(),
        ])?;
        count += 1;
    }
    Ok(count)
}

/// Search cards by name or description (case-insensitive substring match)
///
/// A blank term returns an empty result rather than the whole store.
/// Returns the original records; order is whatever the storage yields.
pub fn search_cards(conn: &Connection, query: &str) -> DbResult<Vec<serde_json::Value>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", query);
    let mut stmt = conn.prepare(
        "SELECT card_data FROM cards
         WHERE name LIKE ?1 COLLATE NOCASE OR desc LIKE ?1 COLLATE NOCASE",
    )?;

    let results: DbResult<Vec<serde_json::Value>> = stmt
        .query_map(params![pattern], |row| {
            let raw: String = row.get(0)?;
            serde_json::from_str(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })?
        .collect();
    results
}

/// Look up a card's image URL by id; an absent id yields None
pub fn get_image_url(conn: &Connection, card_id: u64) -> DbResult<Option<String>> {
    let mut stmt = conn.prepare("SELECT image_url FROM cards WHERE id = ?1")?;
    let mut rows = stmt.query(params![card_id])?;

    match rows.next()? {
        Some(row) => row.get(0),
        None => Ok(None),
    }
}

/// Total count of cards in the store
pub fn get_card_count(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))
}

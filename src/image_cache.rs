//! In-memory cache for card images
//!
//! Maps card ids to raw image bytes, populated lazily on first request.
//! Entries are never evicted or invalidated, and growth is unbounded; the
//! store mirrors a bounded catalog, so the cache tops out at one image per
//! card. Two concurrent misses for the same id may both fetch; the second
//! insert overwrites the first with identical bytes.

use crate::database;
use crate::error::{CardSearchError, Result};
use crate::ygoprodeck;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory image cache keyed by card id
pub struct ImageCache {
    entries: Mutex<HashMap<u64, Vec<u8>>>,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Check if an image is cached
    pub fn contains(&self, card_id: u64) -> bool {
        self.entries.lock().unwrap().contains_key(&card_id)
    }

    /// Get a cached image
    pub fn get(&self, card_id: u64) -> Option<Vec<u8>> {
        match self.entries.lock().unwrap().get(&card_id) {
            Some(bytes) => {
                log::debug!("Image cache hit for card {}", card_id);
                Some(bytes.clone())
            }
            None => None,
        }
    }

    /// Store an image in the cache
    pub fn insert(&self, card_id: u64, bytes: Vec<u8>) {
        self.entries.lock().unwrap().insert(card_id, bytes);
        log::debug!("Cached image for card {}", card_id);
    }

    /// Number of cached images
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

/// Fetch a card image by id, checking the cache first
///
/// A miss resolves the image URL through the card store; an id that was
/// never ingested reports not-found without touching the network.
pub async fn fetch_image_cached(
    cache: &ImageCache,
    db: &Arc<Mutex<Connection>>,
    card_id: u64,
) -> Result<Vec<u8>> {
    if let Some(bytes) = cache.get(card_id) {
        return Ok(bytes);
    }

    let image_url = {
        let conn = db.lock().unwrap();
        database::get_image_url(&conn, card_id)?
    };
    let image_url = image_url.ok_or(CardSearchError::CardNotFound(card_id))?;

    log::info!("Image cache miss for card {}, fetching from catalog CDN", card_id);
    let bytes = ygoprodeck::fetch_image(&image_url).await?;

    cache.insert(card_id, bytes.clone());

    Ok(bytes)
}

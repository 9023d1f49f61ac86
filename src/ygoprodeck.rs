//! YGOPRODeck API client for fetching the card catalog
//!
//! One GET against the catalog endpoint returns every card in a single
//! JSON envelope. No retry and no backoff; the request timeout is the only
//! bound on waiting.

use crate::error::{CardSearchError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default catalog endpoint
pub const CATALOG_URL: &str = "https://db.ygoprodeck.com/api/v7/cardinfo.php";

const USER_AGENT: &str = "card_search/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One card record from the catalog
///
/// The named fields are what the store projects into columns; everything
/// else the API sends (atk, def, race, archetype, prices, ...) lands in
/// `extra` so the original record survives a serialize round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: String,
    pub desc: String,
    #[serde(default)]
    pub card_images: Vec<CardImage>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One entry of a record's image list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardImage {
    pub image_url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CardRecord {
    /// First entry of the record's image list
    pub fn image_url(&self) -> Option<&str> {
        self.card_images.first().map(|img| img.image_url.as_str())
    }
}

/// Catalog envelope returned by the API
#[derive(Debug, Deserialize)]
struct CatalogFile {
    data: Vec<CardRecord>,
}

/// Fetch the full card catalog from the given endpoint
///
/// A single attempt per invocation; fails on a non-success status or a
/// payload with zero records.
pub async fn fetch_catalog(url: &str) -> Result<Vec<CardRecord>> {
    log::info!("Fetching card catalog from {}", url);

    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let response = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(CardSearchError::HttpStatus(response.status()));
    }

    let file: CatalogFile = response.json().await?;
    if file.data.is_empty() {
        return Err(CardSearchError::EmptyCatalog);
    }

    log::info!("Fetched {} cards from catalog", file.data.len());
    Ok(file.data)
}

/// Fetch image bytes from a URL
pub async fn fetch_image(url: &str) -> Result<Vec<u8>> {
    log::debug!("Fetching image from URL: {}", url);

    let response = reqwest::Client::new()
        .get(url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?;

    if response.status().is_success() {
        Ok(response.bytes().await?.to_vec())
    } else {
        Err(CardSearchError::ImageFetchFailed(url.to_string()))
    }
}

#[cfg(test)]
pub use tests::{catalog_json, make_test_card};

#[cfg(test)]
#[path = "ygoprodeck_tests.rs"]
mod tests;

//! Error types for card_search

use std::fmt;

/// Unified error type for card_search operations
#[derive(Debug)]
pub enum CardSearchError {
    /// HTTP request failed (network error, timeout, etc.)
    Network(reqwest::Error),
    /// Failed to parse JSON data
    Parse(serde_json::Error),
    /// HTTP error status code from the catalog API
    HttpStatus(reqwest::StatusCode),
    /// Database operation failed
    Database(rusqlite::Error),
    /// Catalog API returned a payload with no card records
    EmptyCatalog,
    /// Card id not present in the store
    CardNotFound(u64),
    /// Failed to fetch image from URL
    ImageFetchFailed(String),
}

impl fmt::Display for CardSearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardSearchError::Network(e) => write!(f, "Network error: {}", e),
            CardSearchError::Parse(e) => write!(f, "Parse error: {}", e),
            CardSearchError::HttpStatus(status) => write!(f, "HTTP error: {}", status),
            CardSearchError::Database(e) => write!(f, "Database error: {}", e),
            CardSearchError::EmptyCatalog => {
                write!(f, "No card data received from API")
            }
            CardSearchError::CardNotFound(id) => write!(f, "Card not found: {}", id),
            CardSearchError::ImageFetchFailed(url) => {
                write!(f, "Failed to fetch image from: {}", url)
            }
        }
    }
}

impl std::error::Error for CardSearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CardSearchError::Network(e) => Some(e),
            CardSearchError::Parse(e) => Some(e),
            CardSearchError::HttpStatus(_) => None,
            CardSearchError::Database(e) => Some(e),
            CardSearchError::EmptyCatalog => None,
            CardSearchError::CardNotFound(_) => None,
            CardSearchError::ImageFetchFailed(_) => None,
        }
    }
}

impl From<reqwest::Error> for CardSearchError {
    fn from(err: reqwest::Error) -> Self {
        CardSearchError::Network(err)
    }
}

impl From<serde_json::Error> for CardSearchError {
    fn from(err: serde_json::Error) -> Self {
        CardSearchError::Parse(err)
    }
}

impl From<rusqlite::Error> for CardSearchError {
    fn from(err: rusqlite::Error) -> Self {
        CardSearchError::Database(err)
    }
}

/// Result alias for card_search operations
pub type Result<T> = std::result::Result<T, CardSearchError>;

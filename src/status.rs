//! Shared ingestion status and readiness tracking
//!
//! One mutex covers the status record together with the run-completed
//! flag, so the check-and-transition that admits an ingestion run is
//! atomic across concurrent triggers.

use chrono::Utc;
use serde::Serialize;
use std::sync::Mutex;

/// Progress reported while the catalog download is in flight
pub const PROGRESS_FETCH: u8 = 10;
/// Progress once the catalog payload has been received
pub const PROGRESS_PARSED: u8 = 20;

/// Ingestion lifecycle states, serialized snake_case for the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DbState {
    NotStarted,
    Initializing,
    Updating,
    Ready,
    Error,
}

/// Snapshot of the ingestion status, returned verbatim by /db-status
#[derive(Debug, Clone, Serialize)]
pub struct DbStatus {
    pub state: DbState,
    pub total_cards: usize,
    pub current_card: usize,
    pub message: String,
    pub progress: u8,
    pub error: Option<String>,
    pub last_updated: Option<String>,
}

impl Default for DbStatus {
    fn default() -> Self {
        Self {
            state: DbState::NotStarted,
            total_cards: 0,
            current_card: 0,
            message: "Database not initialized".to_string(),
            progress: 0,
            error: None,
            last_updated: None,
        }
    }
}

struct StatusInner {
    status: DbStatus,
    completed: bool,
}

/// Tracks ingestion progress and gates read queries on readiness
///
/// Written only by the ingestion pipeline; request handlers read cheap
/// snapshots.
pub struct StatusTracker {
    inner: Mutex<StatusInner>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatusInner {
                status: DbStatus::default(),
                completed: false,
            }),
        }
    }

    /// Admit at most one ingestion run
    ///
    /// The check and the transition to `initializing` happen under one
    /// lock, so two concurrent triggers cannot both start a run. Returns
    /// false when a run has already completed or is still in flight; a
    /// failed run may be admitted again.
    pub fn try_begin(&self, message: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.completed
            || matches!(
                inner.status.state,
                DbState::Initializing | DbState::Updating
            )
        {
            return false;
        }
        inner.status = DbStatus {
            state: DbState::Initializing,
            message: message.to_string(),
            ..DbStatus::default()
        };
        true
    }

    pub fn set_updating(&self, message: &str, progress: u8) {
        let mut inner = self.inner.lock().unwrap();
        inner.status.state = DbState::Updating;
        inner.status.message = message.to_string();
        inner.status.progress = progress;
    }

    /// Record the catalog size once the payload has arrived
    pub fn set_total(&self, total: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.status.total_cards = total;
        inner.status.message = format!("Processing {} cards...", total);
        inner.status.progress = PROGRESS_PARSED;
    }

    /// Advance the processed-card counter by one chunk
    ///
    /// Returns (current, total, progress) for logging.
    pub fn advance(&self, n: usize) -> (usize, usize, u8) {
        let mut inner = self.inner.lock().unwrap();
        inner.status.current_card += n;
        let current = inner.status.current_card;
        let total = inner.status.total_cards;
        let progress = processing_progress(current, total);
        inner.status.progress = progress;
        inner.status.message = format!("Processing cards ({}/{})", current, total);
        (current, total, progress)
    }

    /// Final transition: the store is ready and later runs are no-ops
    pub fn complete(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.completed = true;
        inner.status.state = DbState::Ready;
        inner.status.progress = 100;
        inner.status.message = format!("Database ready with {} cards", inner.status.total_cards);
        inner.status.error = None;
        inner.status.last_updated = Some(Utc::now().to_rfc3339());
    }

    /// Terminal failure for this run
    pub fn fail(&self, message: &str, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.status.state = DbState::Error;
        inner.status.message = message.to_string();
        inner.status.error = Some(error.to_string());
    }

    /// Stamp a completed refresh pass; the store stays ready throughout
    pub fn refreshed(&self, total: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.status.total_cards = total;
        inner.status.current_card = total;
        inner.status.message = format!("Database ready with {} cards", total);
        inner.status.last_updated = Some(Utc::now().to_rfc3339());
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock().unwrap().status.state == DbState::Ready
    }

    /// Cheap copy for request handlers and the status endpoint
    pub fn snapshot(&self) -> DbStatus {
        self.inner.lock().unwrap().status.clone()
    }
}

/// Map processed records onto the 20-90 band of the progress scale
///
/// The 0-20 band is reserved for setup and fetch; 100 is pinned by the
/// ready transition, never here.
pub fn processing_progress(current: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_PARSED;
    }
    let scaled = PROGRESS_PARSED as usize + 70 * current / total;
    scaled.min(90) as u8
}

//! Web server for the card search UI
//!
//! REST endpoints for status, card search and card images. Every data
//! endpoint consults the status tracker first and answers 503 until
//! ingestion completes, so a request can never observe a half-populated
//! store.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::database;
use crate::error::CardSearchError;
use crate::image_cache::{fetch_image_cached, ImageCache};
use crate::status::{DbState, DbStatus, StatusTracker};

/// Shared application state (thread-safe database connection, status
/// tracker and image cache)
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    status: Arc<StatusTracker>,
    images: Arc<ImageCache>,
}

/// Search query parameters
#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
}

/// Body returned by data endpoints while the store is not ready
#[derive(Serialize)]
struct NotReadyBody {
    error: &'static str,
    status: DbState,
    message: String,
}

fn not_ready_response(status: &DbStatus) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(NotReadyBody {
            error: "Database is not ready yet",
            status: status.state,
            message: status.message.clone(),
        }),
    )
        .into_response()
}

/// GET / - Serve the web UI (single HTML page)
async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// GET /db-status - Return the ingestion status verbatim
async fn db_status_handler(State(state): State<AppState>) -> Json<DbStatus> {
    Json(state.status.snapshot())
}

/// GET /search?query={term}
///
/// Returns the original records of every card whose name or description
/// contains the term; a blank term returns an empty array.
async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let status = state.status.snapshot();
    if status.state != DbState::Ready {
        return not_ready_response(&status);
    }

    let conn = state.db.lock().unwrap();
    match database::search_cards(&conn, &params.query) {
        Ok(cards) => Json(cards).into_response(),
        Err(e) => {
            log::error!("Search error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /card/{id}
///
/// Returns the card's image bytes, fetching and caching on first request.
async fn card_image_handler(State(state): State<AppState>, Path(card_id): Path<u64>) -> Response {
    let status = state.status.snapshot();
    if status.state != DbState::Ready {
        return not_ready_response(&status);
    }

    match fetch_image_cached(&state.images, &state.db, card_id).await {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "image/jpeg")
            .header(header::CACHE_CONTROL, "public, max-age=86400")
            .body(Body::from(bytes))
            .unwrap(),
        Err(CardSearchError::CardNotFound(_)) => {
            (StatusCode::NOT_FOUND, "Card not found").into_response()
        }
        Err(e) => {
            log::warn!("Failed to fetch image for card {}: {}", card_id, e);
            (StatusCode::NOT_FOUND, "Image not found").into_response()
        }
    }
}

/// Build the web server router
pub fn create_router(
    db: Arc<Mutex<Connection>>,
    status: Arc<StatusTracker>,
    images: Arc<ImageCache>,
) -> Router {
    let state = AppState { db, status, images };

    Router::new()
        .route("/", get(index_handler))
        .route("/db-status", get(db_status_handler))
        .route("/search", get(search_handler))
        .route("/card/{id}", get(card_image_handler))
        .with_state(state)
}

/// Start the web server (async)
///
/// Binds to 0.0.0.0 (all interfaces) to work with Docker port mapping.
/// Shuts down gracefully on ctrl-c.
pub async fn serve(
    db: Arc<Mutex<Connection>>,
    status: Arc<StatusTracker>,
    images: Arc<ImageCache>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(db, status, images);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Web UI listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install shutdown handler: {}", e);
        return;
    }
    log::info!("Shutdown signal received");
}

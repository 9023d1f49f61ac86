//! Tests for the catalog ingestion pipeline

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::database;
use crate::error::CardSearchError;
use crate::ingest::{refresh, run, IngestConfig};
use crate::status::{DbState, StatusTracker};
use crate::ygoprodeck::{catalog_json, make_test_card};

fn test_env() -> (Arc<Mutex<Connection>>, Arc<StatusTracker>) {
    let conn = Connection::open_in_memory().unwrap();
    (
        Arc::new(Mutex::new(conn)),
        Arc::new(StatusTracker::new()),
    )
}

fn test_config(mock_server: &MockServer, chunk_size: usize) -> IngestConfig {
    IngestConfig {
        source_url: format!("{}/cardinfo.php", mock_server.uri()),
        chunk_size,
    }
}

async fn mount_catalog(mock_server: &MockServer, cards: &[crate::ygoprodeck::CardRecord]) {
    Mock::given(method("GET"))
        .and(path("/cardinfo.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_json(cards)))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn successful_run_reaches_ready() {
    let mock_server = MockServer::start().await;
    let cards = vec![
        make_test_card(1, "Blue Dragon", "fire"),
        make_test_card(2, "Red Wolf", "ice dragon"),
        make_test_card(3, "Green Turtle", "water"),
    ];
    mount_catalog(&mock_server, &cards).await;

    let (db, status) = test_env();
    // chunk size below the card count so the loop takes several passes
    run(&db, &status, &test_config(&mock_server, 2))
        .await
        .unwrap();

    let snapshot = status.snapshot();
    assert_eq!(snapshot.state, DbState::Ready);
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.total_cards, 3);
    assert_eq!(snapshot.current_card, 3);
    assert_eq!(snapshot.message, "Database ready with 3 cards");
    assert!(snapshot.last_updated.is_some());

    let conn = db.lock().unwrap();
    assert_eq!(database::get_card_count(&conn).unwrap(), 3);
    assert_eq!(database::search_cards(&conn, "dragon").unwrap().len(), 2);
}

#[tokio::test]
async fn upstream_error_status_is_terminal() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cardinfo.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let (db, status) = test_env();
    let result = run(&db, &status, &test_config(&mock_server, 100)).await;

    assert!(matches!(result, Err(CardSearchError::HttpStatus(_))));

    let snapshot = status.snapshot();
    assert_eq!(snapshot.state, DbState::Error);
    assert_eq!(snapshot.message, "Failed to initialize database");
    assert!(snapshot.error.is_some());
    assert!(!status.is_ready());
}

#[tokio::test]
async fn empty_payload_is_terminal() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server, &[]).await;

    let (db, status) = test_env();
    let result = run(&db, &status, &test_config(&mock_server, 100)).await;

    assert!(matches!(result, Err(CardSearchError::EmptyCatalog)));
    assert_eq!(status.snapshot().state, DbState::Error);
}

#[tokio::test]
async fn malformed_record_aborts_the_run() {
    let mock_server = MockServer::start().await;
    // record is missing name/type/desc, so the envelope fails to parse
    Mock::given(method("GET"))
        .and(path("/cardinfo.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "data": [{ "id": 1 }] })),
        )
        .mount(&mock_server)
        .await;

    let (db, status) = test_env();
    let result = run(&db, &status, &test_config(&mock_server, 100)).await;

    assert!(result.is_err());
    assert_eq!(status.snapshot().state, DbState::Error);
}

#[tokio::test]
async fn second_run_is_a_noop() {
    let mock_server = MockServer::start().await;
    let cards = vec![make_test_card(1, "Blue Dragon", "fire")];

    Mock::given(method("GET"))
        .and(path("/cardinfo.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_json(&cards)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (db, status) = test_env();
    let config = test_config(&mock_server, 100);

    run(&db, &status, &config).await.unwrap();
    assert!(status.is_ready());

    // no second upstream fetch; expect(1) verifies on drop
    run(&db, &status, &config).await.unwrap();
    assert_eq!(status.snapshot().state, DbState::Ready);

    let conn = db.lock().unwrap();
    assert_eq!(database::get_card_count(&conn).unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_triggers_fetch_once() {
    let mock_server = MockServer::start().await;
    let cards = vec![make_test_card(1, "Blue Dragon", "fire")];

    // delay keeps the first run in flight while the second one triggers
    Mock::given(method("GET"))
        .and(path("/cardinfo.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(catalog_json(&cards))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&mock_server)
        .await;

    let (db, status) = test_env();
    let config = test_config(&mock_server, 100);

    let first = {
        let (db, status, config) = (Arc::clone(&db), Arc::clone(&status), config.clone());
        tokio::spawn(async move { run(&db, &status, &config).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = {
        let (db, status, config) = (Arc::clone(&db), Arc::clone(&status), config.clone());
        tokio::spawn(async move { run(&db, &status, &config).await })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert!(status.is_ready());
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn run_after_failure_retries() {
    let mock_server = MockServer::start().await;
    let cards = vec![make_test_card(1, "Blue Dragon", "fire")];

    // first attempt fails, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/cardinfo.php"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_catalog(&mock_server, &cards).await;

    let (db, status) = test_env();
    let config = test_config(&mock_server, 100);

    assert!(run(&db, &status, &config).await.is_err());
    assert_eq!(status.snapshot().state, DbState::Error);

    run(&db, &status, &config).await.unwrap();
    assert!(status.is_ready());
    assert!(status.snapshot().error.is_none());
}

#[tokio::test]
async fn refresh_upserts_new_cards() {
    let mock_server = MockServer::start().await;
    let initial = vec![
        make_test_card(1, "Blue Dragon", "fire"),
        make_test_card(2, "Red Wolf", "ice dragon"),
    ];

    Mock::given(method("GET"))
        .and(path("/cardinfo.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_json(&initial)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    let (db, status) = test_env();
    let config = test_config(&mock_server, 100);
    run(&db, &status, &config).await.unwrap();

    // the next fetch sees one extra card upstream
    let mut grown = initial.clone();
    grown.push(make_test_card(3, "Green Turtle", "water"));
    mount_catalog(&mock_server, &grown).await;

    let added = refresh(&db, &status, &config).await.unwrap();
    assert_eq!(added, 1);

    let snapshot = status.snapshot();
    assert_eq!(snapshot.state, DbState::Ready);
    assert_eq!(snapshot.total_cards, 3);

    let conn = db.lock().unwrap();
    assert_eq!(database::search_cards(&conn, "turtle").unwrap().len(), 1);
}

#[tokio::test]
async fn refresh_before_ready_runs_full_ingestion() {
    let mock_server = MockServer::start().await;
    let cards = vec![make_test_card(1, "Blue Dragon", "fire")];
    mount_catalog(&mock_server, &cards).await;

    let (db, status) = test_env();
    let config = test_config(&mock_server, 100);

    let added = refresh(&db, &status, &config).await.unwrap();
    assert_eq!(added, 0);
    assert!(status.is_ready());

    let conn = db.lock().unwrap();
    assert_eq!(database::get_card_count(&conn).unwrap(), 1);
}

#[tokio::test]
async fn refresh_failure_keeps_store_ready() {
    let mock_server = MockServer::start().await;
    let cards = vec![make_test_card(1, "Blue Dragon", "fire")];

    Mock::given(method("GET"))
        .and(path("/cardinfo.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_json(&cards)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cardinfo.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let (db, status) = test_env();
    let config = test_config(&mock_server, 100);
    run(&db, &status, &config).await.unwrap();

    let result = refresh(&db, &status, &config).await;
    assert!(result.is_err());

    // the last good catalog keeps serving
    assert!(status.is_ready());
    let conn = db.lock().unwrap();
    assert_eq!(database::get_card_count(&conn).unwrap(), 1);
}

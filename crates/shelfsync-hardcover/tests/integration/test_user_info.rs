//! Integration test for the Hardcover current-user lookup
//!
//! Verifies that `HardcoverClient::current_username` correctly round-trips
//! through the mocked GraphQL endpoint.

use shelfsync_core::domain::BookId;
use shelfsync_core::ports::hardcover_client::IHardcoverClient;

use crate::common;

#[tokio::test]
async fn test_current_username_returns_me_username() {
    let (server, client) = common::setup_hardcover_mock().await;
    common::mount_graphql_response(&server, serde_json::json!({ "me": [{ "username": "alice" }] })).await;

    let username = client.current_username().await.expect("current_username failed");
    assert_eq!(username, "alice");
}

#[tokio::test]
async fn test_find_by_asin_returns_book_match() {
    let (server, client) = common::setup_hardcover_mock().await;
    common::mount_graphql_response(
        &server,
        serde_json::json!({ "editions": [{ "id": 77, "book_id": 42, "reading_format_id": 2 }] }),
    )
    .await;

    let found = client.find_by_asin("B0036VMS0Y").await.expect("find_by_asin failed");
    let found = found.expect("expected a match");
    assert_eq!(found.book_id, BookId::new(42));
    assert_eq!(found.edition_id.unwrap().value(), 77);
}

#[tokio::test]
async fn test_find_by_asin_returns_none_when_no_rows() {
    let (server, client) = common::setup_hardcover_mock().await;
    common::mount_graphql_response(&server, serde_json::json!({ "editions": [] })).await;

    let found = client.find_by_asin("does-not-exist").await.expect("find_by_asin failed");
    assert!(found.is_none());
}

#[tokio::test]
async fn test_graphql_errors_surface_as_err() {
    let (server, client) = common::setup_hardcover_mock().await;
    common::mount_graphql_error(&server, "field 'me' is not defined").await;

    let result = client.current_username().await;
    assert!(result.is_err());
}

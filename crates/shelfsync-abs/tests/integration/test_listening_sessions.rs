//! Integration tests for the incremental listening-sessions endpoint.
//!
//! Per the port contract, a server that does not expose this endpoint must
//! surface an `Err` rather than an empty list, so callers can fall back to a
//! full sync instead of silently skipping changes.

use shelfsync_core::ports::abs_client::IAbsClient;

use crate::common;

#[tokio::test]
async fn test_list_listening_sessions_since_returns_updated_sessions() {
    let (server, client) = common::setup_abs_mock().await;
    common::mount_json(
        &server,
        "/api/me/listening-sessions",
        serde_json::json!({
            "sessions": [
                { "libraryItemId": "item1", "updatedAt": 1_700_000_000_000i64 },
                { "libraryItemId": "item2", "updatedAt": 1_700_000_100_000i64 },
            ]
        }),
    )
    .await;

    let sessions = client
        .list_listening_sessions_since(1_699_999_000_000)
        .await
        .expect("list_listening_sessions_since failed");

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].library_item_id, "item1");
}

#[tokio::test]
async fn test_list_listening_sessions_since_unavailable_endpoint_is_err() {
    let (server, client) = common::setup_abs_mock().await;
    common::mount_not_found(&server, "/api/me/listening-sessions").await;

    let result = client.list_listening_sessions_since(0).await;
    assert!(result.is_err(), "unavailable endpoint must surface as Err, not an empty Vec");
}

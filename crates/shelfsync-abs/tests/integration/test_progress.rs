//! Integration tests for the current-user media progress endpoint.

use shelfsync_core::ports::abs_client::IAbsClient;

use crate::common;

#[tokio::test]
async fn test_get_media_progress_maps_finished_flag_and_timestamp() {
    let (server, client) = common::setup_abs_mock().await;
    common::mount_json(
        &server,
        "/api/me",
        serde_json::json!({
            "mediaProgress": [
                {
                    "libraryItemId": "item1",
                    "progress": 1.0,
                    "currentTime": 36000.0,
                    "duration": 36000.0,
                    "isFinished": true,
                    "finishedAt": 1_700_000_000_000i64,
                },
                {
                    "libraryItemId": "item2",
                    "progress": 0.4,
                    "currentTime": 1200.0,
                    "duration": 3000.0,
                    "isFinished": false,
                    "finishedAt": null,
                }
            ]
        }),
    )
    .await;

    let progress = client.get_media_progress().await.expect("get_media_progress failed");
    assert_eq!(progress.len(), 2);

    let finished = &progress[0];
    assert!(finished.is_finished);
    assert!(finished.finished_at.is_some());

    let in_progress = &progress[1];
    assert!(!in_progress.is_finished);
    assert!(in_progress.finished_at.is_none());
    assert_eq!(in_progress.progress, 0.4);
}

#[tokio::test]
async fn test_get_media_progress_empty_list() {
    let (server, client) = common::setup_abs_mock().await;
    common::mount_json(&server, "/api/me", serde_json::json!({ "mediaProgress": [] })).await;

    let progress = client.get_media_progress().await.expect("get_media_progress failed");
    assert!(progress.is_empty());
}

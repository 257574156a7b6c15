//! Integration tests for library and library-item listing.

use shelfsync_core::ports::abs_client::IAbsClient;

use crate::common;

#[tokio::test]
async fn test_list_libraries_returns_all_libraries() {
    let (server, client) = common::setup_abs_mock().await;
    common::mount_json(
        &server,
        "/api/libraries",
        serde_json::json!({
            "libraries": [
                { "id": "lib1", "name": "Audiobooks" },
                { "id": "lib2", "name": "Podcasts" },
            ]
        }),
    )
    .await;

    let libraries = client.list_libraries().await.expect("list_libraries failed");
    assert_eq!(libraries.len(), 2);
    assert_eq!(libraries[0].id, "lib1");
    assert_eq!(libraries[1].name, "Podcasts");
}

#[tokio::test]
async fn test_list_library_items_maps_metadata() {
    let (server, client) = common::setup_abs_mock().await;
    common::mount_json(
        &server,
        "/api/libraries/lib1/items",
        serde_json::json!({
            "results": [
                {
                    "id": "item1",
                    "libraryId": "lib1",
                    "mediaType": "book",
                    "media": {
                        "duration": 36000.0,
                        "coverPath": "/covers/item1.jpg",
                        "metadata": {
                            "title": "Project Hail Mary",
                            "authorName": "Andy Weir",
                            "narrators": ["Ray Porter"],
                            "asin": "B08G9PRS1K",
                            "genres": ["Science Fiction"],
                        }
                    }
                }
            ]
        }),
    )
    .await;

    let items = client.list_library_items("lib1").await.expect("list_library_items failed");
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.id, "item1");
    assert_eq!(item.metadata.title, "Project Hail Mary");
    assert_eq!(item.metadata.narrators, vec!["Ray Porter".to_string()]);
    assert_eq!(item.duration_seconds, 36000.0);
}

#[tokio::test]
async fn test_list_library_items_unknown_library_returns_err() {
    let (server, client) = common::setup_abs_mock().await;
    common::mount_not_found(&server, "/api/libraries/does-not-exist/items").await;

    let result = client.list_library_items("does-not-exist").await;
    assert!(result.is_err());
}

//! Shared test helpers for Hardcover API integration tests
//!
//! Provides wiremock-based mock server setup for the Hardcover GraphQL
//! endpoint.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shelfsync_hardcover::client::HardcoverClient;

/// Starts a mock server and returns a `HardcoverClient` pointing at it.
pub async fn setup_hardcover_mock() -> (MockServer, HardcoverClient) {
    let server = MockServer::start().await;
    let client = HardcoverClient::with_base_url("test-hc-token", format!("{}/graphql", server.uri()));
    (server, client)
}

/// Mounts a response for any POST to `/graphql`, regardless of query body.
pub async fn mount_graphql_response(server: &MockServer, data: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data })))
        .mount(server)
        .await;
}

/// Mounts a GraphQL error response.
pub async fn mount_graphql_error(server: &MockServer, message: &str) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errors": [{ "message": message }]
        })))
        .mount(server)
        .await;
}

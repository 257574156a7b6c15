//! Shared wiremock setup for Audiobookshelf client integration tests.

use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shelfsync_abs::client::AbsClient;

pub async fn setup_abs_mock() -> (MockServer, AbsClient) {
    let server = MockServer::start().await;
    let client = AbsClient::new(server.uri(), "test-token");
    (server, client)
}

pub async fn mount_json(server: &MockServer, endpoint_path: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint_path))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_not_found(server: &MockServer, endpoint_path: &str) {
    Mock::given(method("GET"))
        .and(path(endpoint_path))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

//! JobApiClient against a local HTTP double

mod common;

use std::time::Duration;

use common::payload;
use providers::{JobApiClient, JobBackend, JobStatus, ProviderError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> JobApiClient {
    JobApiClient::new("fashn", &format!("{}/v1/", server.uri()), "fa-key", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_submit_posts_payload_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/run"))
        .and(header("authorization", "Bearer fa-key"))
        .and(body_json(json!({"model_name": "tryon-v1.6", "inputs": {"num_samples": 1}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc", "error": null})))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server).submit(&payload()).await.unwrap();
    assert_eq!(id, "abc");
}

#[tokio::test]
async fn test_submit_without_id_is_data_integrity_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client(&server).submit(&payload()).await.unwrap_err();
    assert!(matches!(err, ProviderError::DataIntegrity { .. }));
}

#[tokio::test]
async fn test_http_error_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/status/abc"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server).query("abc").await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_query_parses_status_and_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc",
            "status": "in_queue",
            "output": null,
            "error": null
        })))
        .mount(&server)
        .await;

    let response = client(&server).query("abc").await.unwrap();
    assert_eq!(response.job_status(), JobStatus::Processing);
    assert_eq!(response.output, None);
}

#[tokio::test]
async fn test_health_check_rejects_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(!client(&server).health_check().await);
}

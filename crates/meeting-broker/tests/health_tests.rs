//! Health and metrics endpoint integration tests.
//!
//! Tests the operational endpoints using the `TestBrokerServer` harness.

use mb_test_utils::TestBrokerServer;
use meeting_broker::services::identity::mock::MockIdentityProvider;
use std::sync::Arc;

/// Test that health endpoint returns 200 and healthy status.
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestBrokerServer::spawn(Some(Arc::new(MockIdentityProvider::working()))).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["acsConfigured"], true);

    Ok(())
}

/// Test that health stays healthy without ACS configuration.
#[tokio::test]
async fn test_health_endpoint_reports_unconfigured_acs() -> Result<(), anyhow::Error> {
    let server = TestBrokerServer::spawn(None).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["acsConfigured"], false);

    Ok(())
}

/// Test that health endpoint returns JSON content type.
#[tokio::test]
async fn test_health_endpoint_returns_json() -> Result<(), anyhow::Error> {
    let server = TestBrokerServer::spawn(None).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok());

    assert!(
        content_type.is_some_and(|ct| ct.contains("application/json")),
        "Expected application/json content type, got {:?}",
        content_type
    );

    Ok(())
}

/// Test that non-existent routes return 404.
#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = TestBrokerServer::spawn(None).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/DeleteMeeting", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 404);

    Ok(())
}

/// Test that /metrics exposes HTTP and flow metrics after traffic.
#[tokio::test]
async fn test_metrics_endpoint_exposes_broker_metrics() -> Result<(), anyhow::Error> {
    let server = TestBrokerServer::spawn(Some(Arc::new(MockIdentityProvider::working()))).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/GetToken", server.url()))
        .json(&serde_json::json!({}))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let response = client.get(format!("{}/metrics", server.url())).send().await?;
    assert_eq!(response.status(), 200);

    let body = response.text().await?;
    assert!(body.contains("mb_http_requests_total"), "metrics: {}", body);
    assert!(body.contains("mb_operations_total"), "metrics: {}", body);
    assert!(body.contains("mb_provider_calls_total"), "metrics: {}", body);
    assert!(!body.contains("mock-token-for"), "metrics must not carry tokens");

    Ok(())
}

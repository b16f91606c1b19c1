use std::sync::Arc;

use reposter_core::CreditStatus;
use reposter_cycle::{CreditMonitor, CreditSource, HttpCreditSource, ManualCreditSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn monitor_for(server: &MockServer) -> CreditMonitor {
    let remote = HttpCreditSource::new(&format!("{}/usage", server.uri())).expect("client");
    CreditMonitor::new(
        Arc::new(ManualCreditSource::default()),
        Some(Box::new(remote)),
        5.0,
    )
}

#[tokio::test]
async fn remote_usage_below_limit_is_available() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "used": 1.5 })))
        .mount(&server)
        .await;

    let status = monitor_for(&server).await.check().await;
    assert_eq!(status, CreditStatus::Available { remaining: 3.5 });
}

#[tokio::test]
async fn remote_usage_at_limit_is_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "used": 5.0 })))
        .mount(&server)
        .await;

    assert!(monitor_for(&server).await.check().await.is_exhausted());
}

#[tokio::test]
async fn unreachable_usage_endpoint_does_not_pause() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let status = monitor_for(&server).await.check().await;
    assert!(!status.is_exhausted());
}

#[tokio::test]
async fn malformed_usage_body_is_a_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let source = HttpCreditSource::new(&format!("{}/usage", server.uri())).expect("client");
    let err = source.used(5.0).await.expect_err("bad body");
    assert!(err.to_string().contains("credit usage"), "{err}");
}

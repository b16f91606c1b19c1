//! Integration tests for `TelegramReporter` against a mock Bot API.

use std::time::Duration;

use chrono::Utc;
use reposter_core::{CycleOutcome, CycleReport, ReportSettings};
use reposter_notify::{Notice, ReportError, Reporter, TelegramReporter};
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEND_PATH: &str = "/botTEST:token/sendMessage";

fn reporter(server: &MockServer, max_attempts: u32) -> TelegramReporter {
    let settings = ReportSettings {
        telegram_base_url: server.uri(),
        timeout_secs: 5,
        max_attempts,
    };
    TelegramReporter::new(&settings, "TEST:token", "-100200")
        .unwrap()
        .with_retry_delay(Duration::from_millis(10))
}

fn skipped_report() -> CycleReport {
    let now = Utc::now();
    CycleReport {
        candidate: None,
        caption: None,
        publish: None,
        outcome: CycleOutcome::Skipped { batch_size: 12 },
        started_at: now,
        finished_at: now,
    }
}

fn ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true, "result": {} }))
}

#[tokio::test]
async fn report_is_sent_as_html_to_chat() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(serde_json::json!({
            "chat_id": "-100200",
            "parse_mode": "HTML"
        })))
        .and(body_string_contains("no eligible candidate among 12"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    reporter(&server, 3).report(&skipped_report()).await.unwrap();
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    reporter(&server, 3)
        .notify(&Notice::info("scheduler started"))
        .await
        .unwrap();
}

#[tokio::test]
async fn attempts_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let err = reporter(&server, 2)
        .report(&skipped_report())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ReportError::Exhausted { attempts: 2, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn rejected_message_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = reporter(&server, 3)
        .notify(&Notice::warning("budget low"))
        .await
        .unwrap_err();
    match err {
        ReportError::Rejected {
            status,
            description,
        } => {
            assert_eq!(status, 400);
            assert!(description.contains("chat not found"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn archive_notice_carries_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_string_contains("https://bot.example.com/download-bundle?token=abc"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    let notice = Notice::archive_ready(
        "https://bot.example.com/download-bundle?token=abc",
        2 * 1024 * 1024,
        "deadbeef",
    );
    reporter(&server, 1).notify(&notice).await.unwrap();
}

// tests/lark_publisher.rs
//
// Lark Open API client against a local mock server: one test per step outcome,
// plus the end-to-end pipeline run where token exchange is refused.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forex_scraper::batch::{RateBatch, UploadRows};
use forex_scraper::config::{AppConfig, LarkConfig};
use forex_scraper::error::{PipelineError, PublishError};
use forex_scraper::sheet::lark::LarkSheetPublisher;
use forex_scraper::sheet::SheetPublisher;
use forex_scraper::sources::fetcher::{FetchTimeouts, StaticPageFetcher};
use forex_scraper::sources::types::{default_sources, ExtractedRate};
use forex_scraper::Pipeline;

const SHEET_TOKEN: &str = "KUNHs3CFVhsub2tCf7LlOXeEgUe";
const TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";

fn sheets_path() -> String {
    format!("/open-apis/sheets/v3/spreadsheets/{SHEET_TOKEN}/sheets/query")
}

fn append_path() -> String {
    format!("/open-apis/sheets/v2/spreadsheets/{SHEET_TOKEN}/values_append")
}

fn publisher(server: &MockServer) -> LarkSheetPublisher {
    LarkSheetPublisher::new(LarkConfig {
        app_id: "cli_test".into(),
        app_secret: "secret".into(),
        spreadsheet_token: SHEET_TOKEN.into(),
        api_base: format!("{}/open-apis", server.uri()),
    })
    .expect("lark client")
}

fn rows() -> UploadRows {
    let mut batch = RateBatch::new(Uuid::new_v4(), &default_sources());
    let at = Utc.with_ymd_and_hms(2026, 10, 18, 2, 0, 0).unwrap();
    let rate = |s: &str, buy: f64, sell: f64| ExtractedRate {
        source_name: s.into(),
        currency_code: "USD".into(),
        buy_rate: buy,
        sell_rate: sell,
    };
    batch.record_at(rate("CIMB", 15230.0, 15330.0), at);
    batch
        .record_at(rate("BCA", 15300.0, 15400.0), at)
        .expect("batch complete")
}

async fn mount_token_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_partial_json(json!({ "app_id": "cli_test", "app_secret": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0, "msg": "ok", "tenant_access_token": "t-abc", "expire": 7200
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_sheets(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(sheets_path()))
        .and(header("authorization", "Bearer t-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn publish_appends_two_rows_to_first_sheet() {
    let server = MockServer::start().await;
    mount_token_ok(&server).await;
    mount_sheets(
        &server,
        json!({ "code": 0, "msg": "ok", "data": { "sheets": [
            { "sheet_id": "a1b2c3", "title": "Rates" },
            { "sheet_id": "zzz", "title": "Archive" }
        ]}}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(append_path()))
        .and(header("authorization", "Bearer t-abc"))
        .and(body_partial_json(json!({ "valueRange": {
            "range": "a1b2c3!A:K",
            "values": [
                ["18 Oct 26", "Deposit", "09:00 AM", "", "", "", "", 15230, 15300, "", ""],
                ["18 Oct 26", "Withdrawal", "09:00 AM", "", "", "", "", 15330, 15400, "", ""]
            ]
        }})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0, "msg": "success",
            "data": { "updates": { "updatedRange": "a1b2c3!A5:K6", "updatedRows": 2 } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = publisher(&server).publish(&rows()).await.expect("publish ok");
    assert_eq!(receipt.sheet_id, "a1b2c3");
    assert_eq!(receipt.range, "a1b2c3!A:K");
    assert_eq!(receipt.rows, 2);
}

#[tokio::test]
async fn non_zero_token_code_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 10014, "msg": "app secret invalid"
        })))
        .mount(&server)
        .await;

    let err = publisher(&server).publish(&rows()).await.unwrap_err();
    match err {
        PublishError::Auth(msg) => assert!(msg.contains("app secret invalid"), "{msg}"),
        other => panic!("expected Auth, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_token_response_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = publisher(&server).publish(&rows()).await.unwrap_err();
    assert!(matches!(err, PublishError::Auth(ref m) if m.contains("502")), "{err}");
}

#[tokio::test]
async fn empty_sheet_list_is_lookup_error() {
    let server = MockServer::start().await;
    mount_token_ok(&server).await;
    mount_sheets(&server, json!({ "code": 0, "msg": "ok", "data": { "sheets": [] } })).await;

    let err = publisher(&server).publish(&rows()).await.unwrap_err();
    assert!(matches!(err, PublishError::Lookup(_)), "{err}");
}

#[tokio::test]
async fn non_zero_append_code_is_write_error() {
    let server = MockServer::start().await;
    mount_token_ok(&server).await;
    mount_sheets(
        &server,
        json!({ "code": 0, "data": { "sheets": [{ "sheet_id": "a1b2c3" }] } }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(append_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 90202, "msg": "range out of sheet"
        })))
        .mount(&server)
        .await;

    let err = publisher(&server).publish(&rows()).await.unwrap_err();
    assert_eq!(
        err,
        PublishError::Write("code 90202: range out of sheet".to_string())
    );
}

#[tokio::test]
async fn pipeline_reports_failure_when_token_exchange_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 99991663, "msg": "tenant access denied"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = StaticPageFetcher::new()
        .with_page("CIMB", include_str!("fixtures/cimb_kurs.html"))
        .with_page("BCA", include_str!("fixtures/bca_kurs.html"));
    let pipeline = Pipeline::new(
        default_sources(),
        Arc::new(fetcher),
        Arc::new(publisher(&server)),
    );

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::Publish(PublishError::Auth(_))));

    // Batch was cleared: the next run completes a fresh batch and tries again.
    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::Publish(PublishError::Auth(_))));
}

#[tokio::test]
async fn production_wiring_builds_from_config() {
    let server = MockServer::start().await;
    let cfg = AppConfig {
        lark: LarkConfig {
            app_id: "cli_test".into(),
            app_secret: "secret".into(),
            spreadsheet_token: SHEET_TOKEN.into(),
            api_base: format!("{}/open-apis", server.uri()),
        },
        port: 8080,
        sources: default_sources(),
        timeouts: FetchTimeouts::default(),
    };

    let pipeline = Pipeline::from_config(&cfg).expect("clients build");
    let names: Vec<&str> = pipeline.sources().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["CIMB", "BCA"]);
    assert_eq!(publisher(&server).name(), "lark");
}

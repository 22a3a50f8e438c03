/// Integration tests with a mocked record store
/// Exercises the REST store, load coordination and the HTTP routes without a real backend
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rust_lead_cockpit::config::{Config, StoreBackend};
use rust_lead_cockpit::api::handlers::AppState;
use rust_lead_cockpit::api::routes::build_router;
use rust_lead_cockpit::integrations::rest_client::RestRecordStore;
use rust_lead_cockpit::integrations::store::RecordStore;
use rust_lead_cockpit::loader::{fetch_snapshot, ErrorKind, LoadCoordinator, ViewState};
use rust_lead_cockpit::models::{OrgId, OrgScope};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{header as header_is, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test_anon_key";

fn org() -> OrgId {
    OrgId(Uuid::from_u128(0x0123))
}

/// Helper function to create test config
fn create_test_config(base_url: String, secret: Option<&str>) -> Config {
    Config {
        port: 8080,
        store: StoreBackend::Rest {
            base_url,
            api_key: API_KEY.to_string(),
        },
        realtime_webhook_secret: secret.map(str::to_string),
        snapshot_idle: Duration::from_secs(60),
        snapshot_max_orgs: 100,
    }
}

fn rest_store(server: &MockServer) -> RecordStore {
    RecordStore::Rest(RestRecordStore::new(server.uri(), API_KEY.to_string()).unwrap())
}

fn test_app(server: &MockServer, secret: Option<&str>) -> Router {
    let state = AppState::new(create_test_config(server.uri(), secret), rest_store(server));
    build_router(Arc::new(state), false).unwrap()
}

fn score_rows(scores: &[u8]) -> Value {
    Value::Array(
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| {
                json!({
                    "id": format!("s{}", i),
                    "org_id": org().to_string(),
                    "lead_id": format!("l{}", i),
                    "score": score,
                    "factors": { "demographic": 60, "behavior": 40, "engagement": 80 },
                    "generated_at": "2024-06-01T10:00:00+00:00",
                    "lead": { "name": format!("Lead {}", i), "company": "Acme", "email": null }
                })
            })
            .collect(),
    )
}

fn lead_rows() -> Value {
    json!([
        { "id": "l0", "org_id": org().to_string(), "name": "Lead 0", "status": "qualified", "source": "ads" },
        { "id": "l1", "org_id": org().to_string(), "name": "Lead 1", "status": "novo", "source": "referral" }
    ])
}

async fn mount_store(server: &MockServer, scores: &[u8]) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/lead_scores"))
        .and(query_param("org_id", format!("eq.{}", org()).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(score_rows(scores)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .and(query_param("org_id", format!("eq.{}", org()).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(lead_rows()))
        .mount(server)
        .await;
}

fn get(uri: &str, org_header: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(value) = org_header {
        builder = builder.header("X-Organization-Id", value);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, org_header: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(value) = org_header {
        builder = builder.header("X-Organization-Id", value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_rest_store_sends_org_filter_and_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/lead_scores"))
        .and(query_param("org_id", format!("eq.{}", org()).as_str()))
        .and(query_param("order", "generated_at.desc"))
        .and(header_is("apikey", API_KEY))
        .and(header_is("authorization", format!("Bearer {}", API_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(score_rows(&[90, 20])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .and(query_param("org_id", format!("eq.{}", org()).as_str()))
        .and(header_is("apikey", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(lead_rows()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let snapshot = fetch_snapshot(&rest_store(&mock_server), org(), 1)
        .await
        .unwrap();

    assert_eq!(snapshot.records.len(), 2);
    assert_eq!(snapshot.leads.len(), 2);
    assert_eq!(snapshot.records[0].score, 90);
    assert_eq!(snapshot.records[0].status.as_deref(), Some("qualified"));
    let summary = snapshot.records[1].lead_summary.as_ref().unwrap();
    assert_eq!(summary.company.as_deref(), Some("Acme"));
    assert_eq!(summary.email, None);
}

#[tokio::test]
async fn test_missing_org_issues_zero_requests() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let loads = LoadCoordinator::new(Duration::from_secs(60), 10);
    let state = loads.load(&rest_store(&mock_server), OrgScope::Missing).await;
    match state {
        ViewState::Error(e) => {
            assert_eq!(e.kind, ErrorKind::MissingContext);
            assert!(!e.retry_available);
        }
        other => panic!("unexpected state {:?}", other),
    }

    let app = test_app(&mock_server, None);
    let response = app
        .clone()
        .oneshot(get("/api/v1/lead-scores", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["state"], "error");
    assert_eq!(body["error"]["kind"], "missing_context");

    let response = app.oneshot(post("/api/v1/refresh", Some(" "))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    // expect(0) is verified when the server drops
}

#[tokio::test]
async fn test_foreign_rows_are_dropped() {
    let mock_server = MockServer::start().await;
    let mut rows = score_rows(&[50, 95]);
    rows[1]["org_id"] = json!(Uuid::from_u128(0x0999).to_string());

    Mock::given(method("GET"))
        .and(path("/rest/v1/lead_scores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let snapshot = fetch_snapshot(&rest_store(&mock_server), org(), 1)
        .await
        .unwrap();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].score, 50);
}

#[tokio::test]
async fn test_non_array_response_is_fetch_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/lead_scores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "oops" })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = fetch_snapshot(&rest_store(&mock_server), org(), 1).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_stale_load_never_overwrites_newer_one() {
    let mock_server = MockServer::start().await;

    // First request is slow and returns old data
    Mock::given(method("GET"))
        .and(path("/rest/v1/lead_scores"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(score_rows(&[10]))
                .set_delay(Duration::from_millis(600)),
        )
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/lead_scores"))
        .respond_with(ResponseTemplate::new(200).set_body_json(score_rows(&[90])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lead_rows()))
        .mount(&mock_server)
        .await;

    let store = rest_store(&mock_server);
    let loads = LoadCoordinator::new(Duration::from_secs(60), 10);

    let slow = {
        let loads = loads.clone();
        let store = store.clone();
        tokio::spawn(async move { loads.load(&store, OrgScope::Active(org())).await })
    };
    tokio::time::sleep(Duration::from_millis(150)).await;

    let fast = loads.load(&store, OrgScope::Active(org())).await;
    let snapshot = fast.snapshot().unwrap().clone();
    assert_eq!(snapshot.generation, 2);
    assert_eq!(snapshot.records[0].score, 90);

    slow.await.unwrap();
    let current = loads.current(OrgScope::Active(org())).await;
    let published = current.snapshot().unwrap();
    assert_eq!(published.generation, 2);
    assert_eq!(published.records[0].score, 90);
}

#[tokio::test]
async fn test_fetch_failure_then_manual_retry() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/lead_scores"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_store(&mock_server, &[80]).await;

    let app = test_app(&mock_server, None);
    let org_header = org().to_string();

    let response = app
        .clone()
        .oneshot(get("/api/v1/lead-scores", Some(&org_header)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["state"], "error");
    assert_eq!(body["error"]["kind"], "fetch_failed");
    assert_eq!(body["error"]["retry_available"], true);

    // The error stays until a manual refresh
    let response = app
        .clone()
        .oneshot(get("/api/v1/state", Some(&org_header)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = app
        .clone()
        .oneshot(post("/api/v1/refresh", Some(&org_header)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["state"], "loaded");
    assert_eq!(body["view"]["score_records"], 1);
    assert_eq!(body["view"]["leads"], 2);
}

#[tokio::test]
async fn test_lead_scores_view_over_http() {
    let mock_server = MockServer::start().await;
    mount_store(&mock_server, &[90, 55, 30, 5]).await;
    let app = test_app(&mock_server, None);
    let org_header = org().to_string();

    let response = app
        .clone()
        .oneshot(get("/api/v1/lead-scores?band=hot&radius=100", Some(&org_header)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let etag = response
        .headers()
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap();
    assert!(etag.starts_with('"'));

    let body = body_json(response).await;
    assert_eq!(body["state"], "loaded");
    assert_eq!(body["digest"].as_str().map(|d| format!("\"{}\"", d)), Some(etag));
    let view = &body["view"];
    assert_eq!(view["filtered_count"], 1);
    assert_eq!(view["total_loaded"], 4);
    assert_eq!(view["kpis"]["total"], 4);
    assert_eq!(view["kpis"]["health_score"], 45);
    assert_eq!(view["records"][0]["classification"]["band"], "HOT");
    assert_eq!(view["records"][0]["classification"]["label"], "Quente");
    // demographic axis points straight up on a radius-100 canvas
    let top_y = view["records"][0]["radar"]["points"][0]["y"].as_f64().unwrap();
    assert!(top_y.abs() < 1e-9);
    assert_eq!(view["sources"], json!(["ads", "referral"]));
}

#[tokio::test]
async fn test_pipeline_view_over_http() {
    let mock_server = MockServer::start().await;
    mount_store(&mock_server, &[]).await;
    let app = test_app(&mock_server, None);
    let org_header = org().to_string();

    let response = app
        .oneshot(get("/api/v1/pipeline?source=ads", Some(&org_header)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let view = &body["view"];
    assert_eq!(view["filtered_count"], 1);
    assert_eq!(view["kpis"]["total"], 2);
    assert_eq!(view["kpis"]["conversion_rate_proxy"], 50.0);
    let stages = view["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 6);
    assert_eq!(stages[2]["display_name"], "Qualificado");
    assert_eq!(stages[2]["leads"][0]["id"], "l0");
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let mock_server = MockServer::start().await;
    let app = test_app(&mock_server, None);

    let response = app
        .clone()
        .oneshot(get("/api/v1/lead-scores", Some("not-a-uuid")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let org_header = org().to_string();
    let response = app
        .oneshot(get("/api/v1/pipeline?band=lukewarm", Some(&org_header)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("lukewarm"));
}

#[tokio::test]
async fn test_state_without_load_is_loading() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;
    let app = test_app(&mock_server, None);

    let response = app
        .oneshot(get("/api/v1/state", Some(&org().to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["state"], "loading");
}

#[tokio::test]
async fn test_health_reports_backend() {
    let mock_server = MockServer::start().await;
    let app = test_app(&mock_server, None);

    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "rest");
}

#[tokio::test]
async fn test_realtime_webhook_requires_token() {
    let mock_server = MockServer::start().await;
    let app = test_app(&mock_server, Some("s3cret"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/realtime")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Webhook-Token", "wrong")
        .body(Body::from(json!({ "table": "leads" }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_realtime_webhook_refreshes_each_org_once() {
    let mock_server = MockServer::start().await;
    mount_store(&mock_server, &[70]).await;
    let app = test_app(&mock_server, Some("s3cret"));

    let payload = json!([
        { "table": "lead_scores", "type": "UPDATE", "record": { "org_id": org().to_string() } },
        { "table": "leads", "org_id": org().to_string() },
        { "table": "invoices", "org_id": org().to_string() },
        { "table": "leads" }
    ]);
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/realtime")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Webhook-Token", "s3cret")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["received"], 4);
    assert_eq!(body["ignored"], 2);
    assert_eq!(body["refreshed_orgs"], 1);

    // Background reload publishes without any view request
    let org_header = org().to_string();
    let mut loaded = false;
    for _ in 0..50 {
        let response = app
            .clone()
            .oneshot(get("/api/v1/state", Some(&org_header)))
            .await
            .unwrap();
        if response.status() == StatusCode::OK {
            loaded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(loaded);

    let scores_requests = mock_server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/rest/v1/lead_scores")
        .count();
    assert_eq!(scores_requests, 1);
}

use crate::config::Config;
use crate::errors::AppError;
use crate::filter::{FilterQuery, LeadFilter};
use crate::loader::{LoadCoordinator, Snapshot, ViewState};
use crate::models::{OrgId, OrgScope};
use crate::pipeline::PipelineStager;
use crate::radar::RadarCanvas;
use crate::store::RecordStore;
use crate::views::{lead_scoring_view, pipeline_view};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Header carrying the caller's active organization.
pub const ORG_HEADER: &str = "x-organization-id";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Backend the two list queries run against.
    pub store: RecordStore,
    /// Per-organization load generations and published view states.
    pub loads: LoadCoordinator,
    /// Stage lookup table, built once.
    pub stager: PipelineStager,
}

impl AppState {
    pub fn new(config: Config, store: RecordStore) -> Self {
        let loads = LoadCoordinator::new(config.snapshot_idle, config.snapshot_max_orgs);
        Self {
            config,
            store,
            loads,
            stager: PipelineStager::default(),
        }
    }
}

/// Radar canvas overrides on the lead-scores query string.
#[derive(Debug, Default, Deserialize)]
pub struct CanvasQuery {
    pub cx: Option<f64>,
    pub cy: Option<f64>,
    pub radius: Option<f64>,
}

/// Counts shown by the state and refresh endpoints.
#[derive(Debug, Serialize)]
pub struct SnapshotSummary {
    pub score_records: usize,
    pub leads: usize,
}

/// Reads the active organization from the request headers.
///
/// A missing or blank header is a session without an organization, not an
/// error. A value that is not an organization id is rejected.
pub fn org_scope(headers: &HeaderMap) -> Result<OrgScope, AppError> {
    let Some(value) = headers.get(ORG_HEADER) else {
        return Ok(OrgScope::Missing);
    };
    let raw = value
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid X-Organization-Id header".to_string()))?;
    if raw.trim().is_empty() {
        return Ok(OrgScope::Missing);
    }
    OrgId::parse(raw)
        .map(OrgScope::Active)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid organization id '{}'", raw.trim())))
}

/// Renders a view state with its status code, adding the snapshot `ETag`
/// when data is loaded.
fn view_response<V, F>(view_state: &ViewState, build: F) -> Response
where
    V: Serialize,
    F: FnOnce(&Snapshot) -> V,
{
    let status = view_state.status_code();
    let etag = view_state
        .snapshot()
        .and_then(|s| HeaderValue::from_str(&s.digest.etag()).ok());

    let mut response = (status, Json(view_state.render(build))).into_response();
    if let Some(etag) = etag {
        response.headers_mut().insert(header::ETAG, etag);
    }
    response
}

fn summary(snapshot: &Snapshot) -> SnapshotSummary {
    SnapshotSummary {
        score_records: snapshot.records.len(),
        leads: snapshot.leads.len(),
    }
}

/// Health check endpoint.
///
/// Returns the service status, version and configured store backend.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-lead-cockpit",
            "version": env!("CARGO_PKG_VERSION"),
            "store": state.store.backend_name(),
        })),
    )
}

/// GET /api/v1/lead-scores
///
/// Lead-scoring view: filtered score records, each with band classification
/// and radar geometry, plus KPIs over every loaded record. Loads the
/// organization on first access.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `headers` - Request headers carrying `X-Organization-Id`.
/// * `params` - Filter predicates.
/// * `canvas` - Optional radar canvas (`cx`, `cy`, `radius`).
///
/// # Returns
///
/// * `Result<Response, AppError>` - The view state, or 400 on invalid input.
pub async fn lead_scores(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<FilterQuery>,
    Query(canvas): Query<CanvasQuery>,
) -> Result<Response, AppError> {
    let scope = org_scope(&headers)?;
    let predicates = LeadFilter::from_query(&params)?;
    let canvas = RadarCanvas::new(canvas.cx, canvas.cy, canvas.radius);
    tracing::debug!("GET /lead-scores - scope: {:?}, filter: {:?}", scope, predicates);

    let view_state = state.loads.ensure_loaded(&state.store, scope).await;
    Ok(view_response(&view_state, |snapshot| {
        lead_scoring_view(snapshot, &predicates, canvas)
    }))
}

/// GET /api/v1/pipeline
///
/// Leads-management view: filtered leads, their pipeline stages and KPIs
/// over every loaded lead.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `headers` - Request headers carrying `X-Organization-Id`.
/// * `params` - Filter predicates.
///
/// # Returns
///
/// * `Result<Response, AppError>` - The view state, or 400 on invalid input.
pub async fn pipeline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<FilterQuery>,
) -> Result<Response, AppError> {
    let scope = org_scope(&headers)?;
    let predicates = LeadFilter::from_query(&params)?;
    tracing::debug!("GET /pipeline - scope: {:?}, filter: {:?}", scope, predicates);

    let view_state = state.loads.ensure_loaded(&state.store, scope).await;
    Ok(view_response(&view_state, |snapshot| {
        pipeline_view(snapshot, &predicates, &state.stager)
    }))
}

/// GET /api/v1/state
///
/// Current view state of the organization, without fetching.
pub async fn view_state(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let scope = org_scope(&headers)?;
    let view_state = state.loads.current(scope).await;
    Ok(view_response(&view_state, summary))
}

/// POST /api/v1/refresh
///
/// Re-fetches the organization's data. Also the retry path after a failed
/// load.
///
/// # Returns
///
/// * `Result<Response, AppError>` - The state visible after the load.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let scope = org_scope(&headers)?;
    tracing::info!("Manual refresh - scope: {:?}", scope);

    let view_state = state.loads.load(&state.store, scope).await;
    Ok(view_response(&view_state, summary))
}

use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{OrgId, OrgScope};
use crate::realtime_models::{RealtimePayload, RealtimeResponse};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Realtime change webhook
///
/// Receives row-change notifications from the store. Each distinct
/// organization touched by a watched table gets exactly one background
/// reload; the rows in the payload are not applied.
///
/// Expected payload: Single event object OR array of events
/// Authentication: X-Webhook-Token header must match REALTIME_WEBHOOK_SECRET
pub async fn realtime_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RealtimePayload>,
) -> Result<(StatusCode, Json<RealtimeResponse>), AppError> {
    validate_webhook_secret(&state, &headers)?;

    let events = payload.into_events();
    let received = events.len();

    let mut orgs: BTreeSet<OrgId> = BTreeSet::new();
    let mut ignored = 0;
    for event in events {
        if !event.is_watched() {
            tracing::debug!("Ignoring change on unwatched table {}", event.table);
            ignored += 1;
            continue;
        }
        match event.org_id() {
            Some(org) => {
                orgs.insert(org);
            }
            None => {
                tracing::debug!("Ignoring {} change without org_id", event.table);
                ignored += 1;
            }
        }
    }

    for org in &orgs {
        spawn_reload(state.clone(), *org);
    }

    tracing::info!(
        "Realtime webhook: {} received, {} ignored, {} org(s) refreshing",
        received,
        ignored,
        orgs.len()
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(RealtimeResponse {
            status: "accepted".to_string(),
            received,
            ignored,
            refreshed_orgs: orgs.len(),
        }),
    ))
}

/// Reloads one organization in the background. The generation guard makes
/// overlapping reloads safe.
fn spawn_reload(state: Arc<AppState>, org: OrgId) {
    tokio::spawn(async move {
        let view_state = state.loads.load(&state.store, OrgScope::Active(org)).await;
        tracing::debug!(
            "Background reload for org {} finished with status {}",
            org,
            view_state.status_code()
        );
    });
}

/// Validate webhook secret from X-Webhook-Token header
fn validate_webhook_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    // No secret configured: accepted (warned at startup)
    let Some(ref expected_secret) = state.config.realtime_webhook_secret else {
        return Ok(());
    };

    let token = headers
        .get("x-webhook-token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Webhook-Token header".to_string()))?;

    if !constant_time_compare(token, expected_secret) {
        tracing::warn!("Invalid realtime webhook token received");
        return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

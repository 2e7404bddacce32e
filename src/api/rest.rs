// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. CORS is configured permissively for
// development; tighten `allowed_origins` in production. The surface carries
// no authentication layer — the engine is single-user by design.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis;
use crate::app_state::AppState;
use crate::market_data::RateSource;

/// Shared handler context: the engine state plus the rate source used by the
/// on-demand analysis trigger.
#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<AppState>,
    pub source: Arc<dyn RateSource>,
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(ctx: ApiContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/analyze", post(analyze))
        .route("/api/v1/recommendation", get(latest_recommendation))
        .route("/api/v1/recommendations", get(recent_recommendations))
        .route("/api/v1/history", get(history))
        .route("/api/v1/alerts", get(alerts))
        .route("/api/v1/alerts/read-all", post(mark_all_alerts_read))
        .route("/api/v1/alerts/:id/read", post(mark_alert_read))
        .route("/api/v1/alerts/:id", delete(delete_alert))
        .route("/api/v1/config/alert-policy", get(get_alert_policy))
        .route("/api/v1/config/alert-policy", post(set_alert_policy))
        .layer(cors)
        .with_state(ctx)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: ctx.state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Full state snapshot
// =============================================================================

async fn full_state(State(ctx): State<ApiContext>) -> impl IntoResponse {
    Json(ctx.state.build_snapshot())
}

// =============================================================================
// Analysis trigger
// =============================================================================

async fn analyze(State(ctx): State<ApiContext>) -> impl IntoResponse {
    match analysis::run_analysis(&ctx.state, ctx.source.as_ref()).await {
        Ok(rec) => {
            let body = serde_json::json!({
                "success": true,
                "recommendation": rec,
            });
            (StatusCode::OK, Json(body))
        }
        Err(e) => {
            warn!(error = %e, "on-demand analysis failed");
            ctx.state.push_error(format!("analysis failed: {e:#}"));
            let body = serde_json::json!({
                "success": false,
                "error": format!("{e:#}"),
            });
            (StatusCode::BAD_GATEWAY, Json(body))
        }
    }
}

// =============================================================================
// Recommendations
// =============================================================================

async fn latest_recommendation(State(ctx): State<ApiContext>) -> impl IntoResponse {
    match ctx.state.last_recommendation.read().clone() {
        Some(rec) => Json(serde_json::json!({ "recommendation": rec })).into_response(),
        None => Json(serde_json::json!({
            "recommendation": null,
            "message": "No recommendation generated yet",
        }))
        .into_response(),
    }
}

async fn recent_recommendations(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let recs: Vec<_> = ctx.state.recent_recommendations.read().iter().cloned().collect();
    Json(recs)
}

// =============================================================================
// Indicator history
// =============================================================================

#[derive(Deserialize)]
struct HistoryQuery {
    days: Option<usize>,
}

async fn history(
    State(ctx): State<ApiContext>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let days = query.days.unwrap_or(7).min(365);
    Json(ctx.state.daily_store.recent(days))
}

// =============================================================================
// Alerts
// =============================================================================

async fn alerts(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let body = serde_json::json!({
        "alerts": ctx.state.alert_center.alerts(),
        "unread": ctx.state.alert_center.unread_count(),
    });
    Json(body)
}

async fn mark_alert_read(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if !ctx.state.alert_center.mark_read(&id) {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown alert id '{id}'") })),
        );
    }

    ctx.state.persist_alerts();
    ctx.state.increment_version();

    (
        StatusCode::OK,
        Json(serde_json::json!({ "unread": ctx.state.alert_center.unread_count() })),
    )
}

async fn mark_all_alerts_read(State(ctx): State<ApiContext>) -> impl IntoResponse {
    ctx.state.alert_center.mark_all_read();
    ctx.state.persist_alerts();
    ctx.state.increment_version();

    Json(serde_json::json!({ "unread": 0 }))
}

async fn delete_alert(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if !ctx.state.alert_center.delete(&id) {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown alert id '{id}'") })),
        );
    }

    ctx.state.persist_alerts();
    ctx.state.increment_version();
    info!(alert_id = %id, "alert deleted via API");

    (
        StatusCode::OK,
        Json(serde_json::json!({ "deleted": id })),
    )
}

// =============================================================================
// Alert policy configuration
// =============================================================================

async fn get_alert_policy(State(ctx): State<ApiContext>) -> impl IntoResponse {
    Json(ctx.state.alert_center.policy())
}

#[derive(Deserialize)]
struct AlertPolicyUpdate {
    #[serde(default)]
    min_confidence: Option<f64>,
    #[serde(default)]
    min_profit_pct: Option<f64>,
    #[serde(default)]
    cooldown_secs: Option<u64>,
    #[serde(default)]
    dedupe_window_secs: Option<u64>,
    #[serde(default)]
    history_cap: Option<usize>,
}

async fn set_alert_policy(
    State(ctx): State<ApiContext>,
    Json(update): Json<AlertPolicyUpdate>,
) -> impl IntoResponse {
    if let Some(c) = update.min_confidence {
        if !(0.0..=100.0).contains(&c) {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!("min_confidence must be in [0, 100], got {c}"),
                })),
            );
        }
    }

    let mut policy = ctx.state.alert_center.policy();
    let mut changes = Vec::new();

    macro_rules! apply_field {
        ($field:ident) => {
            if let Some(val) = update.$field {
                if policy.$field != val {
                    changes.push(format!("{}: {} -> {}", stringify!($field), policy.$field, val));
                    policy.$field = val;
                }
            }
        };
    }

    apply_field!(min_confidence);
    apply_field!(min_profit_pct);
    apply_field!(cooldown_secs);
    apply_field!(dedupe_window_secs);
    apply_field!(history_cap);

    if !changes.is_empty() {
        ctx.state.alert_center.set_policy(policy.clone());

        // Mirror into the runtime config and save to disk (best-effort).
        let config_clone = {
            let mut config = ctx.state.runtime_config.write();
            config.alert_policy = policy.clone();
            config.clone()
        };
        if let Err(e) = config_clone.save("runtime_config.json") {
            warn!(error = %e, "failed to save alert policy to disk");
        }

        ctx.state.increment_version();
        info!(changes = ?changes, "alert policy updated via API");
    }

    let mut response = serde_json::to_value(&policy).unwrap_or_default();
    if let Some(obj) = response.as_object_mut() {
        obj.insert(
            "changes".to_string(),
            serde_json::to_value(&changes).unwrap_or_default(),
        );
    }
    (StatusCode::OK, Json(response))
}

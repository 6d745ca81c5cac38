//! Alert history endpoints backed by Postgres.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info};

use super::{api_error, ApiError, AppState};
use crate::store::{self, AlertQuery, AlertRecord, AlertSummary};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/alerts", get(history))
        .route("/alerts/summary", get(summary))
}

async fn history(
    Query(params): Query<AlertQuery>,
    State((pool, _, _)): State<AppState>,
) -> Result<Json<Vec<AlertRecord>>, ApiError> {
    // ---
    info!("GET /alerts: {:?}", params);
    let alerts = store::list_alerts(&pool, &params).await.map_err(|e| {
        error!("Failed to load alert history: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load alert history")
    })?;
    Ok(Json(alerts))
}

async fn summary(
    Query(params): Query<AlertQuery>,
    State((pool, _, _)): State<AppState>,
) -> Result<Json<AlertSummary>, ApiError> {
    // ---
    info!("GET /alerts/summary: {:?}", params);
    let summary = store::count_alerts(&pool, &params).await.map_err(|e| {
        error!("Failed to count alert history: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to count alert history")
    })?;
    Ok(Json(summary))
}

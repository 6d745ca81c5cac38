//! Liveness endpoint.
//!
//! `GET /health` answers from in-memory dashboard state only, so it stays up
//! while the sensor backend or Postgres are unreachable. The payload reports
//! how many sensors the poller has published and how many banners are raised.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    tracked_sensors: usize,
    active_alerts: usize,
}

async fn health(State((_, _, dashboard)): State<AppState>) -> Json<HealthResponse> {
    // ---
    let ids = dashboard.sensor_ids();
    let active_alerts = ids
        .iter()
        .filter_map(|id| dashboard.snapshot(id))
        .filter(|snap| snap.banner.is_some())
        .count();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tracked_sensors: ids.len(),
        active_alerts,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

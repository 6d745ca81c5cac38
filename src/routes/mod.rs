//! Route gateway for the dashboard API.
//!
//! Sibling modules each export a subrouter; this gateway merges them and
//! attaches the shared state so that `main.rs` only sees [`router`].

use axum::{http::StatusCode, Json, Router};
use serde::Serialize;
use sqlx::PgPool;

use crate::dashboard::Dashboard;
use crate::Config;

mod alerts;
mod health;
mod sensors;

/// State shared by every handler.
pub type AppState = (PgPool, Config, Dashboard);

// ---

pub fn router(pool: PgPool, config: Config, dashboard: Dashboard) -> Router {
    // ---
    Router::new()
        .merge(sensors::router())
        .merge(alerts::router())
        .merge(health::router())
        .with_state((pool, config, dashboard))
}

/// JSON error body returned by every failing handler.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

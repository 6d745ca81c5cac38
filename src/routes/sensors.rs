//! Per-sensor dashboard endpoints.
//!
//! Everything here reads the [`Dashboard`](crate::dashboard::Dashboard)
//! snapshot published by the poller and runs the stateless analytics over it.
//! `now` defaults to the wall clock but may be pinned with `?now=`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{api_error, ApiError, AppState};
use crate::analytics::{
    classify_trend, forecast, metric_stats, step_directions, window_readings, LinearFit,
};
use crate::dashboard::{AlertBanner, Dashboard, SensorSnapshot};
use crate::models::{ForecastPoint, Metric, SensorReading, SmoothedReading, TrendDirection};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/sensors", get(list_sensors))
        .route("/sensors/{sensor_id}/readings", get(readings))
        .route("/sensors/{sensor_id}/trends", get(trends))
        .route("/sensors/{sensor_id}/forecast", get(forecast_metric))
        .route("/sensors/{sensor_id}/alert", get(alert_status))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SensorListItem {
    sensor_id: String,
    sensor_name: Option<String>,
    stable: bool,
    alert: Option<String>,
    updated_at: i64,
}

async fn list_sensors(State((_, _, dashboard)): State<AppState>) -> Json<Vec<SensorListItem>> {
    // ---
    let items = dashboard
        .sensor_ids()
        .into_iter()
        .filter_map(|id| {
            let snap = dashboard.snapshot(&id)?;
            Some(SensorListItem {
                sensor_name: snap.threshold.as_ref().map(|t| t.sensor_name.clone()),
                stable: snap.stable,
                alert: snap.banner.as_ref().map(|b| b.message.clone()),
                updated_at: snap.updated_at,
                sensor_id: id,
            })
        })
        .collect();
    Json(items)
}

async fn readings(
    Path(sensor_id): Path<String>,
    State((_, _, dashboard)): State<AppState>,
) -> Result<Json<Vec<SmoothedReading>>, ApiError> {
    // ---
    let snap = find_sensor(&dashboard, &sensor_id)?;
    Ok(Json(snap.readings))
}

#[derive(Debug, Deserialize)]
struct TrendQuery {
    minutes: Option<i64>,
    now: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendSummary {
    metric: Metric,
    direction: TrendDirection,
    avg: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    latest: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendsResponse {
    sensor_id: String,
    minutes: i64,
    now: i64,
    metrics: Vec<TrendSummary>,
}

async fn trends(
    Path(sensor_id): Path<String>,
    Query(params): Query<TrendQuery>,
    State((_, config, dashboard)): State<AppState>,
) -> Result<Json<TrendsResponse>, ApiError> {
    // ---
    let snap = find_sensor(&dashboard, &sensor_id)?;
    let minutes = window_minutes(params.minutes, config.engine.trend_window_minutes)?;
    let now = params.now.unwrap_or_else(|| chrono::Utc::now().timestamp());
    let readings = snap.raw_readings();
    let engine = &config.engine;

    debug!("GET /sensors/{}/trends minutes={} now={}", sensor_id, minutes, now);

    let metrics = Metric::ALL
        .iter()
        .map(|&metric| {
            let stats = metric_stats(&readings, metric, now, minutes);
            TrendSummary {
                metric,
                direction: classify_trend(
                    &readings,
                    metric,
                    now,
                    minutes,
                    engine.min_trend_points,
                    engine.trend_deadband,
                ),
                avg: stats.avg,
                min: stats.min,
                max: stats.max,
                latest: snap.latest().map(|r| metric.value_of(r)),
            }
        })
        .collect();

    Ok(Json(TrendsResponse {
        sensor_id,
        minutes,
        now,
        metrics,
    }))
}

#[derive(Debug, Deserialize)]
struct ForecastQuery {
    metric: Option<String>,
    count: Option<usize>,
    minutes: Option<i64>,
    now: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ActualPoint {
    timestamp: i64,
    value: f64,
    direction: TrendDirection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastResponse {
    sensor_id: String,
    metric: Metric,
    fit: Option<LinearFit>,
    actual: Vec<ActualPoint>,
    forecast: Vec<ForecastPoint>,
}

/// Largest forecast a client may request.
const MAX_FORECAST_COUNT: usize = 500;

/// Widest trailing window a client may request (one leap year).
const MAX_WINDOW_MINUTES: i64 = 366 * 24 * 60;

async fn forecast_metric(
    Path(sensor_id): Path<String>,
    Query(params): Query<ForecastQuery>,
    State((_, config, dashboard)): State<AppState>,
) -> Result<Json<ForecastResponse>, ApiError> {
    // ---
    let snap = find_sensor(&dashboard, &sensor_id)?;
    let metric = match params.metric.as_deref() {
        None => Metric::Temperature,
        Some(name) => Metric::parse(name).ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("unknown metric {:?} (expected temperature, moisture or ph)", name),
            )
        })?,
    };
    let count = params.count.unwrap_or(config.engine.forecast_count);
    if count > MAX_FORECAST_COUNT {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("count must be at most {}", MAX_FORECAST_COUNT),
        ));
    }
    let minutes = window_minutes(params.minutes, config.engine.trend_window_minutes)?;
    let now = params.now.unwrap_or_else(|| chrono::Utc::now().timestamp());

    let all = snap.raw_readings();
    let recent: Vec<SensorReading> = window_readings(&all, now, minutes)
        .into_iter()
        .cloned()
        .collect();

    let result = forecast(&recent, metric, count, config.engine.forecast_cadence_secs);
    let values: Vec<f64> = result.actual.iter().map(|p| p.value).collect();
    let actual = result
        .actual
        .iter()
        .zip(step_directions(&values))
        .map(|(p, direction)| ActualPoint {
            timestamp: p.timestamp,
            value: p.value,
            direction,
        })
        .collect();

    Ok(Json(ForecastResponse {
        sensor_id,
        metric,
        fit: result.fit,
        actual,
        forecast: result.forecast,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertStatus {
    sensor_id: String,
    stable: bool,
    banner: Option<AlertBanner>,
}

async fn alert_status(
    Path(sensor_id): Path<String>,
    State((_, _, dashboard)): State<AppState>,
) -> Result<Json<AlertStatus>, ApiError> {
    // ---
    let snap = find_sensor(&dashboard, &sensor_id)?;
    Ok(Json(AlertStatus {
        sensor_id,
        stable: snap.stable,
        banner: snap.banner,
    }))
}

// ---

fn find_sensor(dashboard: &Dashboard, sensor_id: &str) -> Result<SensorSnapshot, ApiError> {
    dashboard.snapshot(sensor_id).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("sensor {} is not tracked", sensor_id),
        )
    })
}

fn window_minutes(requested: Option<i64>, default: i64) -> Result<i64, ApiError> {
    match requested {
        Some(m) if m <= 0 => Err(api_error(
            StatusCode::BAD_REQUEST,
            "minutes must be greater than zero",
        )),
        Some(m) if m > MAX_WINDOW_MINUTES => Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("minutes must be at most {}", MAX_WINDOW_MINUTES),
        )),
        Some(m) => Ok(m),
        None => Ok(default),
    }
}

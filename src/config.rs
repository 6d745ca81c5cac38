//! Configuration loader for the `fieldwatch` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Engine tunables are handed to the analytics layer
//! as a plain [`EngineConfig`] so that the engine never reads the environment.
//!
use std::env;

use anyhow::{anyhow, Result};

use crate::analytics::{DedupCommit, EngineConfig};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_num {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string (alert history).
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Sensor backend base URL.
    pub api_url: String,

    /// HTTP port for the dashboard API.
    pub listen_port: u16,

    /// Sensors to track; empty means discover them from the backend.
    pub sensor_ids: Vec<String>,

    /// Seconds between polling ticks.
    pub poll_interval_secs: u64,

    /// How far back each tick fetches readings, in minutes.
    pub readings_lookback_minutes: i64,

    /// How long a sensor must stay stable before its alert banner clears.
    pub alert_hold_secs: i64,

    /// Analytics engine tunables.
    pub engine: EngineConfig,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `SENSOR_API_URL` – Sensor backend base URL
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
/// - `SENSOR_IDS` – comma separated sensor ids (default: discover)
/// - `POLL_INTERVAL_SECS` – tick interval (default: 10)
/// - `READINGS_LOOKBACK_MINUTES` – fetch window (default: 1440)
/// - `ALERT_HOLD_SECS` – banner hold once stable (default: 10)
/// - `SMOOTHING_WINDOW` – moving average samples (default: 5)
/// - `ALERT_COOLDOWN_SECS` – dedup cooldown (default: 300)
/// - `DEDUP_COMMIT` – `on_emit` or `on_persist` (default: `on_emit`)
/// - `TREND_WINDOW_MINUTES` – default trend window (default: 60)
/// - `FORECAST_COUNT` – forecast points (default: 10)
/// - `FORECAST_CADENCE_SECS` – forecast spacing (default: 600)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let api_url = require_env!("SENSOR_API_URL");
    let db_pool_max = parse_env_num!("DB_POOL_MAX", u32, 5);
    let listen_port = parse_env_num!("LISTEN_PORT", u16, 8080);
    let poll_interval_secs = parse_env_num!("POLL_INTERVAL_SECS", u64, 10);
    let readings_lookback_minutes = parse_env_num!("READINGS_LOOKBACK_MINUTES", i64, 1440);
    let alert_hold_secs = parse_env_num!("ALERT_HOLD_SECS", i64, 10);

    let sensor_ids = parse_sensor_ids(&env::var("SENSOR_IDS").unwrap_or_default());

    let defaults = EngineConfig::default();
    let dedup_commit = match env::var("DEDUP_COMMIT") {
        Ok(v) if !v.trim().is_empty() => DedupCommit::parse(v.trim())
            .ok_or_else(|| anyhow!("Invalid DEDUP_COMMIT: {} (expected on_emit|on_persist)", v))?,
        _ => defaults.dedup_commit,
    };

    let engine = EngineConfig {
        smoothing_window: parse_env_num!("SMOOTHING_WINDOW", usize, defaults.smoothing_window),
        cooldown_secs: parse_env_num!("ALERT_COOLDOWN_SECS", i64, defaults.cooldown_secs),
        dedup_commit,
        trend_window_minutes: parse_env_num!(
            "TREND_WINDOW_MINUTES",
            i64,
            defaults.trend_window_minutes
        ),
        forecast_count: parse_env_num!("FORECAST_COUNT", usize, defaults.forecast_count),
        forecast_cadence_secs: parse_env_num!(
            "FORECAST_CADENCE_SECS",
            i64,
            defaults.forecast_cadence_secs
        ),
        ..defaults
    };

    if poll_interval_secs == 0 {
        return Err(anyhow!("POLL_INTERVAL_SECS must be greater than zero"));
    }
    if engine.smoothing_window == 0 {
        return Err(anyhow!("SMOOTHING_WINDOW must be greater than zero"));
    }

    Ok(Config {
        db_url,
        db_pool_max,
        api_url: api_url.trim_end_matches('/').to_string(),
        listen_port,
        sensor_ids,
        poll_interval_secs,
        readings_lookback_minutes,
        alert_hold_secs,
        engine,
    })
}

/// Split a comma separated list, dropping blanks and duplicates.
pub fn parse_sensor_ids(raw: &str) -> Vec<String> {
    // ---
    let mut ids: Vec<String> = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Replace the password in a connection URL with `****`.
pub fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // `postgres://user@host` has its only colon in the scheme.
            if !db_url[colon_pos..].starts_with("://") {
                return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
            }
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password while showing all other values.
    pub fn log_config(&self) {
        // ---
        let sensors = if self.sensor_ids.is_empty() {
            "(discover)".to_string()
        } else {
            self.sensor_ids.join(",")
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL          : {}", mask_db_url(&self.db_url));
        tracing::info!("  SENSOR_API_URL        : {}", self.api_url);
        tracing::info!("  DB_POOL_MAX           : {}", self.db_pool_max);
        tracing::info!("  LISTEN_PORT           : {}", self.listen_port);
        tracing::info!("  SENSOR_IDS            : {}", sensors);
        tracing::info!("  POLL_INTERVAL_SECS    : {}", self.poll_interval_secs);
        tracing::info!("  READINGS_LOOKBACK_MIN : {}", self.readings_lookback_minutes);
        tracing::info!("  ALERT_HOLD_SECS       : {}", self.alert_hold_secs);
        tracing::info!("  SMOOTHING_WINDOW      : {}", self.engine.smoothing_window);
        tracing::info!("  ALERT_COOLDOWN_SECS   : {}", self.engine.cooldown_secs);
        tracing::info!("  DEDUP_COMMIT          : {}", self.engine.dedup_commit.as_str());
        tracing::info!("  TREND_WINDOW_MINUTES  : {}", self.engine.trend_window_minutes);
        tracing::info!("  FORECAST_COUNT        : {}", self.engine.forecast_count);
        tracing::info!("  FORECAST_CADENCE_SECS : {}", self.engine.forecast_cadence_secs);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parse_sensor_ids() {
        // ---
        assert_eq!(
            parse_sensor_ids(" Sensor-001, ,Sensor-002,Sensor-001 "),
            vec!["Sensor-001".to_string(), "Sensor-002".to_string()]
        );
        assert!(parse_sensor_ids("").is_empty());
    }

    #[test]
    fn test_mask_db_url() {
        // ---
        assert_eq!(
            mask_db_url("postgres://farm:secret@db:5432/fieldwatch"),
            "postgres://farm:****@db:5432/fieldwatch"
        );
        assert_eq!(
            mask_db_url("postgres://farm@db/fieldwatch"),
            "postgres://farm@db/fieldwatch"
        );
        assert_eq!(mask_db_url("postgres://db/fieldwatch"), "postgres://db/fieldwatch");
    }
}

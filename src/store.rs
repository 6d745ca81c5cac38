//! Postgres persistence for emitted alerts.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::AlertEvent;

// ---

/// A persisted alert as returned by the history endpoint.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    // ---
    pub id: Uuid,
    pub sensor_id: String,
    pub alert_type: String,
    pub timestamp: i64,
    pub temperature: f64,
    pub ph: f64,
    pub moisture: f64,
    pub created_at: DateTime<Utc>,
}

/// Filters for an alert history query.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AlertQuery {
    pub sensor_id: Option<String>,
    /// Inclusive lower bound, epoch seconds.
    pub from: Option<i64>,
    /// Inclusive upper bound, epoch seconds.
    pub to: Option<i64>,
    /// Case-insensitive substring match on the alert type label.
    pub search: Option<String>,
    pub limit: Option<u32>,
}

/// Alert counts per type over the whole matching history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSummary {
    pub total: i64,
    pub counts: BTreeMap<String, i64>,
}

/// Fold `(alert_type, count)` rows into a summary.
pub fn summarize(rows: impl IntoIterator<Item = (String, i64)>) -> AlertSummary {
    // ---
    let mut counts = BTreeMap::new();
    let mut total = 0;
    for (alert_type, count) in rows {
        *counts.entry(alert_type).or_insert(0) += count;
        total += count;
    }
    AlertSummary { total, counts }
}

/// Persistence seam for emitted alerts.
pub trait AlertStore {
    /// Store `alert`; returns its generated id.
    fn save_alert(
        &self,
        alert: &AlertEvent,
    ) -> impl Future<Output = Result<Uuid, sqlx::Error>> + Send;
}

impl AlertStore for PgPool {
    fn save_alert(
        &self,
        alert: &AlertEvent,
    ) -> impl Future<Output = Result<Uuid, sqlx::Error>> + Send {
        insert_alert(self, alert)
    }
}

/// Insert an emitted alert; returns its generated id.
pub async fn insert_alert(pool: &PgPool, alert: &AlertEvent) -> Result<Uuid, sqlx::Error> {
    // ---
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO alert_history (
            id, sensor_id, alert_type, timestamp,
            temperature, ph, moisture
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(&alert.sensor_id)
    .bind(alert.alert_type.as_str())
    .bind(alert.timestamp)
    .bind(alert.temperature)
    .bind(alert.ph)
    .bind(alert.moisture)
    .execute(pool)
    .await?;

    Ok(id)
}

/// Alerts matching `query`, newest first.
pub async fn list_alerts(pool: &PgPool, query: &AlertQuery) -> Result<Vec<AlertRecord>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, AlertRecord>(
        r#"
        SELECT id, sensor_id, alert_type, timestamp,
               temperature, ph, moisture, created_at
        FROM alert_history
        WHERE ($1::TEXT   IS NULL OR sensor_id = $1)
          AND ($2::BIGINT IS NULL OR timestamp >= $2)
          AND ($3::BIGINT IS NULL OR timestamp <= $3)
          AND ($4::TEXT   IS NULL OR alert_type ILIKE $4)
        ORDER BY timestamp DESC
        LIMIT $5
        "#,
    )
    .bind(query.sensor_id.as_deref())
    .bind(query.from)
    .bind(query.to)
    .bind(search_pattern(query))
    .bind(i64::from(query.limit.unwrap_or(1000)))
    .fetch_all(pool)
    .await
}

/// Per-type counts of alerts matching `query`. `limit` is ignored.
pub async fn count_alerts(pool: &PgPool, query: &AlertQuery) -> Result<AlertSummary, sqlx::Error> {
    // ---
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT alert_type, COUNT(*) AS count
        FROM alert_history
        WHERE ($1::TEXT   IS NULL OR sensor_id = $1)
          AND ($2::BIGINT IS NULL OR timestamp >= $2)
          AND ($3::BIGINT IS NULL OR timestamp <= $3)
          AND ($4::TEXT   IS NULL OR alert_type ILIKE $4)
        GROUP BY alert_type
        "#,
    )
    .bind(query.sensor_id.as_deref())
    .bind(query.from)
    .bind(query.to)
    .bind(search_pattern(query))
    .fetch_all(pool)
    .await?;

    Ok(summarize(rows))
}

fn search_pattern(query: &AlertQuery) -> Option<String> {
    query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)))
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_summarize_counts_per_type() {
        // ---
        let summary = summarize([
            ("High pH".to_string(), 1500),
            ("Low Moisture".to_string(), 1),
        ]);
        assert_eq!(summary.total, 1501);
        assert_eq!(summary.counts.get("High pH"), Some(&1500));
        assert_eq!(summary.counts.get("Low Moisture"), Some(&1));
    }

    #[test]
    fn test_summarize_empty() {
        // ---
        let summary = summarize(Vec::new());
        assert_eq!(summary.total, 0);
        assert!(summary.counts.is_empty());
    }

    #[test]
    fn test_search_pattern() {
        // ---
        let query = AlertQuery {
            search: Some("  high ".into()),
            ..Default::default()
        };
        assert_eq!(search_pattern(&query).as_deref(), Some("%high%"));

        let blank = AlertQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(search_pattern(&blank), None);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
    }
}

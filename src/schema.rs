//! Database schema management for `fieldwatch`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `alert_history` table holding every alert the pipeline
/// emitted. Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Emitted alerts served by `/alerts`
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alert_history (
            id           UUID PRIMARY KEY,
            sensor_id    TEXT             NOT NULL,
            alert_type   TEXT             NOT NULL,
            timestamp    BIGINT           NOT NULL,
            temperature  DOUBLE PRECISION NOT NULL,
            ph           DOUBLE PRECISION NOT NULL,
            moisture     DOUBLE PRECISION NOT NULL,
            created_at   TIMESTAMPTZ      NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // History queries filter by sensor and time range
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_alert_history_sensor_ts
            ON alert_history (sensor_id, timestamp);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

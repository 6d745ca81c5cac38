//! Polling scheduler driving the analytics pipeline.
//!
//! Every tick it resolves the tracked sensors, then for each one (concurrently)
//! fetches the threshold and recent readings, runs the pipeline, persists any
//! emitted alert and publishes the result to the [`Dashboard`]. Fetch failures
//! are logged and retried on the next tick.

use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::analytics::AlertPipeline;
use crate::dashboard::{Dashboard, TickUpdate};
use crate::models::AlertEvent;
use crate::store::AlertStore;
use crate::upstream::UpstreamClient;
use crate::Config;

// ---

/// Handles a polling task needs; cheap to clone per sensor.
#[derive(Debug, Clone)]
pub struct Poller<S = PgPool> {
    config: Config,
    upstream: UpstreamClient,
    store: S,
    pipeline: AlertPipeline,
    dashboard: Dashboard,
}

impl<S> Poller<S>
where
    S: AlertStore + Clone + Send + Sync + 'static,
{
    pub fn new(
        config: Config,
        upstream: UpstreamClient,
        store: S,
        pipeline: AlertPipeline,
        dashboard: Dashboard,
    ) -> Self {
        Self {
            config,
            upstream,
            store,
            pipeline,
            dashboard,
        }
    }

    /// Tick forever at the configured interval.
    pub async fn run(self) {
        // ---
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Polling sensors every {}s",
            self.config.poll_interval_secs
        );

        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                error!("Polling tick failed: {:#}", e);
            }
        }
    }

    /// Run one tick over every tracked sensor.
    pub async fn tick(&self) -> Result<()> {
        // ---
        let sensors = self.resolve_sensors().await?;
        self.dashboard.retain(&sensors);
        debug!("Tick over {} sensors", sensors.len());

        let now = chrono::Utc::now().timestamp();
        let mut tasks = JoinSet::new();
        for sensor_id in sensors {
            let poller = self.clone();
            tasks.spawn(async move {
                let result = poller.poll_sensor(&sensor_id, now).await;
                (sensor_id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((sensor_id, Err(e))) => error!("Sensor {} poll failed: {:#}", sensor_id, e),
                Err(e) => error!("Sensor poll task aborted: {}", e),
            }
        }
        Ok(())
    }

    async fn resolve_sensors(&self) -> Result<Vec<String>> {
        // ---
        if !self.config.sensor_ids.is_empty() {
            return Ok(self.config.sensor_ids.clone());
        }
        self.upstream.list_sensor_ids().await
    }

    /// Fetch, evaluate and publish one sensor at time `now`.
    pub async fn poll_sensor(&self, sensor_id: &str, now: i64) -> Result<()> {
        // ---
        let threshold = match self.upstream.fetch_threshold(sensor_id).await {
            Ok(threshold) => threshold,
            Err(e) => {
                warn!("Error fetching thresholds for {}: {:#}", sensor_id, e);
                None
            }
        };

        let from = now.saturating_sub(self.config.readings_lookback_minutes.saturating_mul(60));
        let readings = self
            .upstream
            .fetch_readings(sensor_id, Some(from), None)
            .await?;

        let outcome = self.pipeline.run(sensor_id, &readings, threshold.as_ref());

        let alert = match outcome.alert {
            Some(alert) => self.persist(sensor_id, alert).await,
            None => None,
        };

        self.dashboard.apply(
            sensor_id,
            TickUpdate {
                readings: outcome.smoothed,
                threshold,
                alert,
                stable: outcome.stable,
            },
            now,
            self.config.alert_hold_secs,
        );
        Ok(())
    }

    /// Store an emitted alert and commit it to the cooldown state. Only
    /// alerts that reached the store are returned for the banner.
    async fn persist(&self, sensor_id: &str, alert: AlertEvent) -> Option<AlertEvent> {
        // ---
        match self.store.save_alert(&alert).await {
            Ok(id) => {
                debug!("Stored alert {} for {}", id, sensor_id);
                self.pipeline.confirm(&alert);
                Some(alert)
            }
            Err(e) => {
                error!("Alert storage failed for {}: {}", sensor_id, e);
                None
            }
        }
    }
}

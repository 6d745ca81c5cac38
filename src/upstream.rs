//! HTTP client for the sensor backend.
//!
//! Fetches readings and threshold records and normalizes them at the
//! boundary. Retries are left to the next polling tick.

use anyhow::{Context, Result};
use reqwest::Client;

use crate::models::{
    normalize_threshold, prepare_batch, RawSensorReading, RawThreshold, SensorReading, Threshold,
};

// ---

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
}

impl UpstreamClient {
    // ---
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Readings for one sensor in `[from, to]`, sorted and deduplicated.
    ///
    /// Items that fail to parse are logged and skipped.
    pub async fn fetch_readings(
        &self,
        sensor_id: &str,
        from: Option<i64>,
        to: Option<i64>,
    ) -> Result<Vec<SensorReading>> {
        // ---
        let url = format!("{}/getSensorData", self.base_url);
        let mut query: Vec<(&str, String)> = vec![("sensorId", sensor_id.to_string())];
        if let Some(from) = from {
            query.push(("from", from.to_string()));
        }
        if let Some(to) = to {
            query.push(("to", to.to_string()));
        }

        tracing::debug!("Fetching readings for {} from: {}", sensor_id, url);

        let response: serde_json::Value = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()?
            .json()
            .await
            .context("Sensor data response is not JSON")?;

        let items: &[serde_json::Value] = match response.as_array() {
            Some(items) => items.as_slice(),
            None => {
                tracing::debug!("Sensor data response for {} is not an array", sensor_id);
                &[]
            }
        };

        let mut raw = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match serde_json::from_value::<RawSensorReading>(item.clone()) {
                Ok(reading) => raw.push(reading),
                Err(e) => {
                    tracing::debug!(
                        "Failed to parse reading {} for {}: {} - Raw item: {}",
                        i,
                        sensor_id,
                        e,
                        item
                    );
                }
            }
        }

        let batch = prepare_batch(&raw, sensor_id);
        tracing::debug!("Fetched {} readings for {}", batch.len(), sensor_id);
        Ok(batch)
    }

    /// Threshold for one sensor. `Ok(None)` when the backend has none or the
    /// record cannot be normalized.
    pub async fn fetch_threshold(&self, sensor_id: &str) -> Result<Option<Threshold>> {
        // ---
        let url = format!("{}/getThreshold", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("SensorId", sensor_id)])
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!("No thresholds found for sensor: {}", sensor_id);
            return Ok(None);
        }

        let body: serde_json::Value = response
            .error_for_status()?
            .json()
            .await
            .context("Threshold response is not JSON")?;

        if body.is_null() {
            tracing::warn!("No thresholds found for sensor: {}", sensor_id);
            return Ok(None);
        }

        let raw: RawThreshold =
            serde_json::from_value(body).context("Threshold record has an unexpected shape")?;
        match normalize_threshold(&raw) {
            Ok(threshold) => Ok(Some(threshold)),
            Err(e) => {
                tracing::warn!("Ignoring threshold for {}: {}", sensor_id, e);
                Ok(None)
            }
        }
    }

    /// Sensor ids known to the backend, in the order it lists them.
    pub async fn list_sensor_ids(&self) -> Result<Vec<String>> {
        // ---
        let url = format!("{}/getAllThresholds", self.base_url);
        let records: Vec<RawThreshold> = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()?
            .json()
            .await
            .context("Threshold list has an unexpected shape")?;

        let mut ids: Vec<String> = Vec::new();
        for id in records.into_iter().filter_map(|r| r.sensor_id) {
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

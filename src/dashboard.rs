//! In-memory presentation state shared by the poller and the HTTP routes.
//!
//! Holds, per sensor, the latest smoothed batch, its threshold and the alert
//! banner. The banner is cleared once the sensor has been stable for the
//! configured hold period; any unstable tick restarts the hold.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::models::{AlertEvent, SensorReading, SmoothedReading, Threshold};

// ---

/// The alert banner shown for a sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertBanner {
    // ---
    pub message: String,
    pub alert: AlertEvent,
    /// Epoch seconds when the banner was raised.
    pub raised_at: i64,
    /// Epoch seconds since which the sensor has been continuously stable.
    pub stable_since: Option<i64>,
}

impl AlertBanner {
    pub fn new(alert: AlertEvent, now: i64) -> Self {
        Self {
            message: alert.message(),
            alert,
            raised_at: now,
            stable_since: None,
        }
    }

    /// Feed one stability observation. Returns `true` once the banner has
    /// been stable for at least `hold_secs` and should be cleared.
    pub fn observe(&mut self, stable: bool, now: i64, hold_secs: i64) -> bool {
        // ---
        if !stable {
            self.stable_since = None;
            return false;
        }
        let since = *self.stable_since.get_or_insert(now);
        now - since >= hold_secs
    }
}

/// Latest known state of one sensor.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    // ---
    pub readings: Vec<SmoothedReading>,
    pub threshold: Option<Threshold>,
    pub banner: Option<AlertBanner>,
    pub stable: bool,
    /// Epoch seconds of the last successful refresh.
    pub updated_at: i64,
}

impl SensorSnapshot {
    /// Raw readings, without the smoothing column.
    pub fn raw_readings(&self) -> Vec<SensorReading> {
        self.readings.iter().map(|s| s.reading.clone()).collect()
    }

    pub fn latest(&self) -> Option<&SensorReading> {
        self.readings.last().map(|s| &s.reading)
    }
}

/// Cheaply clonable handle on all sensor snapshots.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    sensors: Arc<RwLock<BTreeMap<String, SensorSnapshot>>>,
}

/// Values produced by one polling tick for a sensor.
#[derive(Debug, Clone)]
pub struct TickUpdate {
    pub readings: Vec<SmoothedReading>,
    pub threshold: Option<Threshold>,
    pub alert: Option<AlertEvent>,
    pub stable: bool,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a tick's results for `sensor_id` at time `now`.
    pub fn apply(&self, sensor_id: &str, update: TickUpdate, now: i64, hold_secs: i64) {
        // ---
        let mut sensors = self.sensors.write().unwrap_or_else(PoisonError::into_inner);
        let snapshot = sensors.entry(sensor_id.to_string()).or_default();

        snapshot.readings = update.readings;
        snapshot.threshold = update.threshold;
        snapshot.stable = update.stable;
        snapshot.updated_at = now;

        if let Some(alert) = update.alert {
            let banner = AlertBanner::new(alert, now);
            tracing::info!(sensor_id, "{}", banner.message);
            snapshot.banner = Some(banner);
        }

        let clear = snapshot
            .banner
            .as_mut()
            .is_some_and(|b| b.observe(update.stable, now, hold_secs));
        if clear {
            tracing::info!(sensor_id, "Sensor stable, clearing alert banner");
            snapshot.banner = None;
        }
    }

    pub fn snapshot(&self, sensor_id: &str) -> Option<SensorSnapshot> {
        self.sensors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sensor_id)
            .cloned()
    }

    pub fn sensor_ids(&self) -> Vec<String> {
        self.sensors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Forget sensors that are no longer tracked.
    pub fn retain(&self, sensor_ids: &[String]) {
        self.sensors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|id, _| sensor_ids.contains(id));
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::AlertType;

    fn alert(ts: i64) -> AlertEvent {
        AlertEvent {
            sensor_id: "Sensor-001".into(),
            alert_type: AlertType::LowMoisture,
            timestamp: ts,
            temperature: 30.0,
            ph: 6.0,
            moisture: 40.0,
        }
    }

    fn update(alert: Option<AlertEvent>, stable: bool) -> TickUpdate {
        TickUpdate {
            readings: Vec::new(),
            threshold: None,
            alert,
            stable,
        }
    }

    #[test]
    fn test_banner_hold_timer() {
        // ---
        let mut banner = AlertBanner::new(alert(1000), 1000);
        assert!(!banner.observe(true, 1010, 10));
        assert!(!banner.observe(true, 1015, 10));
        assert!(banner.observe(true, 1020, 10));
    }

    #[test]
    fn test_unstable_tick_restarts_hold() {
        // ---
        let mut banner = AlertBanner::new(alert(1000), 1000);
        assert!(!banner.observe(true, 1000, 10));
        assert!(!banner.observe(false, 1005, 10));
        assert_eq!(banner.stable_since, None);
        assert!(!banner.observe(true, 1012, 10));
        assert!(banner.observe(true, 1022, 10));
    }

    #[test]
    fn test_dashboard_raises_and_clears_banner() {
        // ---
        let dashboard = Dashboard::new();

        dashboard.apply("Sensor-001", update(Some(alert(1000)), false), 1000, 10);
        let snap = dashboard.snapshot("Sensor-001").unwrap();
        let banner = snap.banner.unwrap();
        assert!(banner.message.starts_with("Low Moisture detected at "));

        dashboard.apply("Sensor-001", update(None, true), 1010, 10);
        assert!(dashboard.snapshot("Sensor-001").unwrap().banner.is_some());

        dashboard.apply("Sensor-001", update(None, true), 1020, 10);
        assert!(dashboard.snapshot("Sensor-001").unwrap().banner.is_none());
    }

    #[test]
    fn test_retain_drops_untracked_sensors() {
        // ---
        let dashboard = Dashboard::new();
        dashboard.apply("a", update(None, true), 0, 10);
        dashboard.apply("b", update(None, true), 0, 10);

        dashboard.retain(&["b".to_string()]);
        assert_eq!(dashboard.sensor_ids(), vec!["b".to_string()]);
        assert!(dashboard.snapshot("a").is_none());
    }
}

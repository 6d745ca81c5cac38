//! Data models shared by the analytics engine and its collaborators.
//!
//! Upstream payloads (`RawSensorReading`, `RawThreshold`) are normalized here,
//! at the system boundary, so the engine only ever sees the typed shapes.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ---

/// A single periodic reading for one sensor. Timestamps are epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    // ---
    pub sensor_id: String,
    pub timestamp: i64,
    pub temperature: f64,
    pub moisture: f64,
    pub ph: f64,
}

/// A reading with the trailing moving average of its moisture value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoothedReading {
    // ---
    #[serde(flatten)]
    pub reading: SensorReading,
    #[serde(rename = "moisture_smooth")]
    pub moisture_smooth: f64,
}

/// Normalized per-sensor threshold bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threshold {
    // ---
    pub sensor_id: String,
    pub sensor_name: String,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub moisture_min: f64,
    pub moisture_max: f64,
    pub ph_min: f64,
    pub ph_max: f64,
}

impl Threshold {
    /// Lower and upper bound for a metric.
    pub fn bounds(&self, metric: Metric) -> (f64, f64) {
        match metric {
            Metric::Temperature => (self.temperature_min, self.temperature_max),
            Metric::Moisture => (self.moisture_min, self.moisture_max),
            Metric::Ph => (self.ph_min, self.ph_max),
        }
    }
}

/// The three environmental metrics a sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Moisture,
    Ph,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Moisture, Metric::Ph];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Moisture => "moisture",
            Metric::Ph => "ph",
        }
    }

    /// Parse a metric name as used in query strings.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "temperature" => Some(Metric::Temperature),
            "moisture" => Some(Metric::Moisture),
            "ph" => Some(Metric::Ph),
            _ => None,
        }
    }

    pub fn value_of(&self, reading: &SensorReading) -> f64 {
        match self {
            Metric::Temperature => reading.temperature,
            Metric::Moisture => reading.moisture,
            Metric::Ph => reading.ph,
        }
    }
}

/// Alert kinds, declared in tie-break priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertType {
    #[serde(rename = "High Temperature")]
    HighTemperature,
    #[serde(rename = "Low Temperature")]
    LowTemperature,
    #[serde(rename = "High pH")]
    HighPH,
    #[serde(rename = "Low pH")]
    LowPH,
    #[serde(rename = "High Moisture")]
    HighMoisture,
    #[serde(rename = "Low Moisture")]
    LowMoisture,
}

impl AlertType {
    /// Fixed priority order used to pick a single alert per evaluation.
    pub const PRIORITY: [AlertType; 6] = [
        AlertType::HighTemperature,
        AlertType::LowTemperature,
        AlertType::HighPH,
        AlertType::LowPH,
        AlertType::HighMoisture,
        AlertType::LowMoisture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::HighTemperature => "High Temperature",
            AlertType::LowTemperature => "Low Temperature",
            AlertType::HighPH => "High pH",
            AlertType::LowPH => "Low pH",
            AlertType::HighMoisture => "High Moisture",
            AlertType::LowMoisture => "Low Moisture",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|t| t.as_str() == label)
    }

    pub fn metric(&self) -> Metric {
        match self {
            AlertType::HighTemperature | AlertType::LowTemperature => Metric::Temperature,
            AlertType::HighPH | AlertType::LowPH => Metric::Ph,
            AlertType::HighMoisture | AlertType::LowMoisture => Metric::Moisture,
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(
            self,
            AlertType::HighTemperature | AlertType::HighPH | AlertType::HighMoisture
        )
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the reading that triggered an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    // ---
    pub sensor_id: String,
    pub alert_type: AlertType,
    pub timestamp: i64,
    pub temperature: f64,
    pub ph: f64,
    pub moisture: f64,
}

impl AlertEvent {
    /// User-facing banner text, e.g. `"High pH detected at 3:04:05 PM"`.
    pub fn message(&self) -> String {
        // ---
        let time = chrono::DateTime::from_timestamp(self.timestamp, 0)
            .map(|utc| {
                utc.with_timezone(&chrono::Local)
                    .format("%-I:%M:%S %p")
                    .to_string()
            })
            .unwrap_or_else(|| self.timestamp.to_string());
        format!("{} detected at {}", self.alert_type, time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Rolling statistics over a time window; `None` when the window is empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

// ---

/// Raw reading as served by the sensor backend.
///
/// `timestamp` may arrive as a number or a numeric string; missing metric
/// values become `NaN` so that regression skips them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSensorReading {
    // ---
    #[serde(default, alias = "SensorID", alias = "sensor_id")]
    pub sensor_id: Option<String>,
    #[serde(alias = "ts", deserialize_with = "number_or_string")]
    pub timestamp: f64,
    #[serde(default, deserialize_with = "opt_number_or_string")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "opt_number_or_string")]
    pub moisture: Option<f64>,
    #[serde(default, deserialize_with = "opt_number_or_string")]
    pub ph: Option<f64>,
}

impl RawSensorReading {
    // ---
    pub fn to_reading(&self, fallback_sensor_id: &str) -> SensorReading {
        // ---
        SensorReading {
            sensor_id: self
                .sensor_id
                .clone()
                .unwrap_or_else(|| fallback_sensor_id.to_string()),
            timestamp: self.timestamp.trunc() as i64,
            temperature: self.temperature.unwrap_or(f64::NAN),
            moisture: self.moisture.unwrap_or(f64::NAN),
            ph: self.ph.unwrap_or(f64::NAN),
        }
    }
}

/// Normalize a raw batch: convert, sort ascending by timestamp and keep the
/// last reading for any repeated timestamp.
pub fn prepare_batch(raw: &[RawSensorReading], sensor_id: &str) -> Vec<SensorReading> {
    // ---
    let mut readings: Vec<SensorReading> = raw.iter().map(|r| r.to_reading(sensor_id)).collect();
    readings.sort_by_key(|r| r.timestamp);

    let mut batch: Vec<SensorReading> = Vec::with_capacity(readings.len());
    for reading in readings {
        match batch.last_mut() {
            Some(prev) if prev.timestamp == reading.timestamp => *prev = reading,
            _ => batch.push(reading),
        }
    }
    batch
}

/// Threshold record in the backend's PascalCase shape.
#[derive(Debug, Default, Deserialize)]
pub struct RawThreshold {
    // ---
    #[serde(rename = "SensorID", alias = "SensorId")]
    pub sensor_id: Option<String>,
    #[serde(rename = "SensorName")]
    pub sensor_name: Option<String>,
    #[serde(rename = "TemperatureMin", default, deserialize_with = "opt_number_or_string")]
    pub temperature_min: Option<f64>,
    #[serde(rename = "TemperatureMax", default, deserialize_with = "opt_number_or_string")]
    pub temperature_max: Option<f64>,
    #[serde(rename = "MoistureMin", default, deserialize_with = "opt_number_or_string")]
    pub moisture_min: Option<f64>,
    #[serde(rename = "MoistureMax", default, deserialize_with = "opt_number_or_string")]
    pub moisture_max: Option<f64>,
    #[serde(rename = "PhMin", default, deserialize_with = "opt_number_or_string")]
    pub ph_min: Option<f64>,
    #[serde(rename = "PhMax", default, deserialize_with = "opt_number_or_string")]
    pub ph_max: Option<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("threshold record has no sensor id")]
    MissingSensorId,

    #[error("threshold field {0} is missing")]
    MissingField(&'static str),

    #[error("threshold field {0} is not a finite number")]
    NotFinite(&'static str),
}

/// Convert an upstream threshold record into the engine's `Threshold`.
///
/// `min < max` is not checked here; the threshold editor owns that rule.
pub fn normalize_threshold(raw: &RawThreshold) -> Result<Threshold, ThresholdError> {
    // ---
    fn field(value: Option<f64>, name: &'static str) -> Result<f64, ThresholdError> {
        let v = value.ok_or(ThresholdError::MissingField(name))?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(ThresholdError::NotFinite(name))
        }
    }

    let sensor_id = raw
        .sensor_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(ThresholdError::MissingSensorId)?
        .to_string();

    Ok(Threshold {
        sensor_name: raw.sensor_name.clone().unwrap_or_else(|| sensor_id.clone()),
        sensor_id,
        temperature_min: field(raw.temperature_min, "TemperatureMin")?,
        temperature_max: field(raw.temperature_max, "TemperatureMax")?,
        moisture_min: field(raw.moisture_min, "MoistureMin")?,
        moisture_max: field(raw.moisture_max, "MoistureMax")?,
        ph_min: field(raw.ph_min, "PhMin")?,
        ph_max: field(raw.ph_max, "PhMax")?,
    })
}

// ---

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| E::custom(format!("invalid number {:?}: {}", s, e))),
        }
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrString::deserialize(deserializer)?.into_f64()
}

fn opt_number_or_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::into_f64)
        .transpose()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    fn raw_threshold() -> serde_json::Value {
        // ---
        json!({
            "SensorID": "Sensor-001",
            "SensorName": "Rice paddy",
            "TemperatureMin": 25,
            "TemperatureMax": "35",
            "MoistureMin": 60,
            "MoistureMax": 100,
            "PhMin": 5.5,
            "PhMax": 6.5
        })
    }

    #[test]
    fn test_threshold_normalization() {
        // ---
        let raw: RawThreshold = serde_json::from_value(raw_threshold()).unwrap();
        let t = normalize_threshold(&raw).unwrap();

        assert_eq!(t.sensor_id, "Sensor-001");
        assert_eq!(t.sensor_name, "Rice paddy");
        assert_eq!(t.temperature_max, 35.0);
        assert_eq!(t.bounds(Metric::Ph), (5.5, 6.5));
    }

    #[test]
    fn test_threshold_accepts_sensor_id_alias() {
        // ---
        let mut value = raw_threshold();
        let obj = value.as_object_mut().unwrap();
        obj.remove("SensorID");
        obj.insert("SensorId".into(), json!("Sensor-002"));

        let raw: RawThreshold = serde_json::from_value(value).unwrap();
        assert_eq!(normalize_threshold(&raw).unwrap().sensor_id, "Sensor-002");
    }

    #[test]
    fn test_threshold_missing_field_is_reported() {
        // ---
        let mut value = raw_threshold();
        value.as_object_mut().unwrap().remove("PhMax");

        let raw: RawThreshold = serde_json::from_value(value).unwrap();
        assert_eq!(
            normalize_threshold(&raw),
            Err(ThresholdError::MissingField("PhMax"))
        );
    }

    #[test]
    fn test_threshold_without_sensor_id() {
        // ---
        let raw = RawThreshold::default();
        assert_eq!(
            normalize_threshold(&raw),
            Err(ThresholdError::MissingSensorId)
        );
    }

    #[test]
    fn test_raw_reading_string_timestamp_and_missing_values() {
        // ---
        let raw: RawSensorReading = serde_json::from_value(json!({
            "timestamp": "1700000000",
            "temperature": 30.5,
            "ph": 6.1
        }))
        .unwrap();

        let reading = raw.to_reading("Sensor-003");
        assert_eq!(reading.sensor_id, "Sensor-003");
        assert_eq!(reading.timestamp, 1_700_000_000);
        assert_eq!(reading.temperature, 30.5);
        assert!(reading.moisture.is_nan());
    }

    #[test]
    fn test_prepare_batch_sorts_and_dedups() {
        // ---
        let raw: Vec<RawSensorReading> = serde_json::from_value(json!([
            { "timestamp": 30, "temperature": 3.0, "moisture": 1.0, "ph": 6.0 },
            { "timestamp": 10, "temperature": 1.0, "moisture": 1.0, "ph": 6.0 },
            { "timestamp": 30, "temperature": 4.0, "moisture": 1.0, "ph": 6.0 },
            { "timestamp": 20, "temperature": 2.0, "moisture": 1.0, "ph": 6.0 }
        ]))
        .unwrap();

        let batch = prepare_batch(&raw, "s");
        let ts: Vec<i64> = batch.iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec![10, 20, 30]);
        assert_eq!(batch[2].temperature, 4.0);
    }

    #[test]
    fn test_alert_type_labels_and_priority() {
        // ---
        assert_eq!(AlertType::HighPH.to_string(), "High pH");
        assert_eq!(AlertType::parse("Low Moisture"), Some(AlertType::LowMoisture));
        assert_eq!(AlertType::parse("bogus"), None);
        assert_eq!(AlertType::PRIORITY[0], AlertType::HighTemperature);
        assert_eq!(AlertType::LowPH.metric(), Metric::Ph);
        assert!(!AlertType::LowPH.is_high());

        let json = serde_json::to_string(&AlertType::HighMoisture).unwrap();
        assert_eq!(json, "\"High Moisture\"");
    }

    #[test]
    fn test_alert_message_format() {
        // ---
        let event = AlertEvent {
            sensor_id: "Sensor-001".into(),
            alert_type: AlertType::HighTemperature,
            timestamp: 1_700_000_000,
            temperature: 38.0,
            ph: 6.0,
            moisture: 70.0,
        };
        let msg = event.message();
        assert!(msg.starts_with("High Temperature detected at "));
        assert!(msg.ends_with("AM") || msg.ends_with("PM"));
    }

    #[test]
    fn test_metric_parse() {
        // ---
        assert_eq!(Metric::parse("pH"), Some(Metric::Ph));
        assert_eq!(Metric::parse("Temperature"), Some(Metric::Temperature));
        assert_eq!(Metric::parse("humidity"), None);
    }
}

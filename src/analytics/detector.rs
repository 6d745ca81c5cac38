use crate::models::{AlertEvent, AlertType, SensorReading, Threshold};

use super::DETECTION_SAMPLES;

// ---

/// Propose an alert when the last three readings all breach the same bound.
///
/// Returns `None` when there are fewer than three readings, no threshold, or
/// the three readings span more than `max_span_secs`. When several bounds are
/// breached at once, the first entry of [`AlertType::PRIORITY`] wins. The
/// event snapshots the most recent reading.
pub fn detect_alert(
    readings: &[SensorReading],
    sensor_id: &str,
    threshold: Option<&Threshold>,
    max_span_secs: i64,
) -> Option<AlertEvent> {
    // ---
    if readings.len() < DETECTION_SAMPLES {
        return None;
    }
    let threshold = threshold?;
    let window = &readings[readings.len() - DETECTION_SAMPLES..];

    let (first, last) = window
        .iter()
        .fold((i64::MAX, i64::MIN), |(lo, hi), r| {
            (lo.min(r.timestamp), hi.max(r.timestamp))
        });
    let span_secs = last.saturating_sub(first);
    if span_secs > max_span_secs {
        tracing::debug!(
            sensor_id,
            span_secs,
            "Detection window too wide, skipping evaluation"
        );
        return None;
    }

    let alert_type = AlertType::PRIORITY
        .into_iter()
        .find(|t| window.iter().all(|r| breaches(*t, r, threshold)))?;

    let latest = &window[DETECTION_SAMPLES - 1];
    Some(AlertEvent {
        sensor_id: sensor_id.to_string(),
        alert_type,
        timestamp: latest.timestamp,
        temperature: latest.temperature,
        ph: latest.ph,
        moisture: latest.moisture,
    })
}

/// Strict breach test; NaN never breaches.
fn breaches(alert_type: AlertType, reading: &SensorReading, threshold: &Threshold) -> bool {
    // ---
    let metric = alert_type.metric();
    let value = metric.value_of(reading);
    let (min, max) = threshold.bounds(metric);
    if alert_type.is_high() {
        value > max
    } else {
        value < min
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn threshold() -> Threshold {
        // ---
        Threshold {
            sensor_id: "Sensor-001".into(),
            sensor_name: "Rice".into(),
            temperature_min: 25.0,
            temperature_max: 35.0,
            moisture_min: 60.0,
            moisture_max: 100.0,
            ph_min: 5.5,
            ph_max: 6.5,
        }
    }

    fn reading(ts: i64, temperature: f64, moisture: f64, ph: f64) -> SensorReading {
        // ---
        SensorReading {
            sensor_id: "Sensor-001".into(),
            timestamp: ts,
            temperature,
            moisture,
            ph,
        }
    }

    fn temps(ts: [i64; 3], values: [f64; 3]) -> Vec<SensorReading> {
        ts.iter()
            .zip(values)
            .map(|(&t, v)| reading(t, v, 80.0, 6.0))
            .collect()
    }

    #[test]
    fn test_high_temperature_within_span() {
        // ---
        let readings = temps([1000, 1025, 1050], [36.0, 37.0, 38.0]);
        let alert = detect_alert(&readings, "Sensor-001", Some(&threshold()), 60).unwrap();

        assert_eq!(alert.alert_type, AlertType::HighTemperature);
        assert_eq!(alert.timestamp, 1050);
        assert_eq!(alert.temperature, 38.0);
        assert_eq!(alert.moisture, 80.0);
    }

    #[test]
    fn test_span_too_wide_yields_nothing() {
        // ---
        let readings = temps([1000, 1035, 1070], [36.0, 37.0, 38.0]);
        assert!(detect_alert(&readings, "Sensor-001", Some(&threshold()), 60).is_none());
    }

    #[test]
    fn test_span_exactly_at_limit_is_evaluated() {
        // ---
        let readings = temps([1000, 1030, 1060], [36.0, 37.0, 38.0]);
        assert!(detect_alert(&readings, "Sensor-001", Some(&threshold()), 60).is_some());
    }

    #[test]
    fn test_single_noisy_sample_is_debounced() {
        // ---
        let readings = temps([1000, 1010, 1020], [36.0, 30.0, 38.0]);
        assert!(detect_alert(&readings, "Sensor-001", Some(&threshold()), 60).is_none());
    }

    #[test]
    fn test_only_last_three_matter() {
        // ---
        let mut readings = temps([900, 910, 920], [20.0, 20.0, 20.0]);
        readings.extend(temps([1000, 1010, 1020], [36.0, 37.0, 38.0]));
        let alert = detect_alert(&readings, "Sensor-001", Some(&threshold()), 60).unwrap();
        assert_eq!(alert.alert_type, AlertType::HighTemperature);
    }

    #[test]
    fn test_tie_break_prefers_temperature() {
        // ---
        let readings: Vec<_> = (0..3)
            .map(|i| reading(1000 + i * 10, 40.0, 10.0, 6.0))
            .collect();
        let alert = detect_alert(&readings, "Sensor-001", Some(&threshold()), 60).unwrap();
        assert_eq!(alert.alert_type, AlertType::HighTemperature);
    }

    #[test]
    fn test_ph_beats_moisture() {
        // ---
        let readings: Vec<_> = (0..3)
            .map(|i| reading(1000 + i * 10, 30.0, 120.0, 4.0))
            .collect();
        let alert = detect_alert(&readings, "Sensor-001", Some(&threshold()), 60).unwrap();
        assert_eq!(alert.alert_type, AlertType::LowPH);
    }

    #[test]
    fn test_low_moisture() {
        // ---
        let readings: Vec<_> = (0..3)
            .map(|i| reading(1000 + i * 10, 30.0, 40.0, 6.0))
            .collect();
        let alert = detect_alert(&readings, "Sensor-001", Some(&threshold()), 60).unwrap();
        assert_eq!(alert.alert_type, AlertType::LowMoisture);
    }

    #[test]
    fn test_guards() {
        // ---
        let readings = temps([1000, 1010, 1020], [36.0, 37.0, 38.0]);
        assert!(detect_alert(&readings, "Sensor-001", None, 60).is_none());
        assert!(detect_alert(&readings[..2], "Sensor-001", Some(&threshold()), 60).is_none());
    }

    #[test]
    fn test_extreme_timestamps_are_a_wide_span() {
        // ---
        let readings = temps([i64::MIN, 0, i64::MAX], [36.0, 37.0, 38.0]);
        assert!(detect_alert(&readings, "Sensor-001", Some(&threshold()), 60).is_none());
    }

    #[test]
    fn test_boundary_value_is_not_a_breach() {
        // ---
        let readings = temps([1000, 1010, 1020], [35.0, 36.0, 37.0]);
        assert!(detect_alert(&readings, "Sensor-001", Some(&threshold()), 60).is_none());
    }
}

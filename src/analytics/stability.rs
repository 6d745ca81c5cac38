use crate::models::{Metric, SensorReading, Threshold};

use super::DETECTION_SAMPLES;

// ---

/// True when every one of the last three readings lies within `[min, max]`
/// for all metrics. Vacuously true with fewer than three readings or no
/// threshold.
///
/// This only answers the instantaneous question; how long an alert banner
/// stays up after stability returns is the dashboard's concern.
pub fn is_stable(readings: &[SensorReading], threshold: Option<&Threshold>) -> bool {
    // ---
    let Some(threshold) = threshold else {
        return true;
    };
    if readings.len() < DETECTION_SAMPLES {
        return true;
    }

    readings[readings.len() - DETECTION_SAMPLES..].iter().all(|r| {
        Metric::ALL.iter().all(|m| {
            let (min, max) = threshold.bounds(*m);
            let v = m.value_of(r);
            min <= v && v <= max
        })
    })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn threshold() -> Threshold {
        Threshold {
            sensor_id: "s".into(),
            sensor_name: "s".into(),
            temperature_min: 25.0,
            temperature_max: 35.0,
            moisture_min: 60.0,
            moisture_max: 100.0,
            ph_min: 5.5,
            ph_max: 6.5,
        }
    }

    fn reading(temperature: f64, moisture: f64, ph: f64) -> SensorReading {
        SensorReading {
            sensor_id: "s".into(),
            timestamp: 0,
            temperature,
            moisture,
            ph,
        }
    }

    #[test]
    fn test_vacuously_stable() {
        // ---
        let wild = vec![reading(99.0, 0.0, 1.0), reading(99.0, 0.0, 1.0)];
        assert!(is_stable(&wild, Some(&threshold())));
        assert!(is_stable(&[], Some(&threshold())));

        let three = vec![reading(99.0, 0.0, 1.0); 3];
        assert!(is_stable(&three, None));
    }

    #[test]
    fn test_all_within_bounds_inclusive() {
        // ---
        let readings = vec![
            reading(25.0, 60.0, 5.5),
            reading(30.0, 80.0, 6.0),
            reading(35.0, 100.0, 6.5),
        ];
        assert!(is_stable(&readings, Some(&threshold())));
    }

    #[test]
    fn test_one_metric_out_of_range_is_unstable() {
        // ---
        let readings = vec![
            reading(30.0, 80.0, 6.0),
            reading(30.0, 80.0, 6.9),
            reading(30.0, 80.0, 6.0),
        ];
        assert!(!is_stable(&readings, Some(&threshold())));
    }

    #[test]
    fn test_only_last_three_matter() {
        // ---
        let mut readings = vec![reading(50.0, 10.0, 9.0); 4];
        readings.extend(vec![reading(30.0, 80.0, 6.0); 3]);
        assert!(is_stable(&readings, Some(&threshold())));
    }

    #[test]
    fn test_missing_value_is_unstable() {
        // ---
        let readings = vec![reading(30.0, f64::NAN, 6.0); 3];
        assert!(!is_stable(&readings, Some(&threshold())));
    }
}

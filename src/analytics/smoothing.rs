use crate::models::{SensorReading, SmoothedReading};

use super::round2;

// ---

/// Attach a trailing moving average of moisture to each reading.
///
/// The window shrinks at the start of the batch, so every index gets a value.
/// A `window` of 0 is treated as 1.
pub fn smooth_moisture(readings: &[SensorReading], window: usize) -> Vec<SmoothedReading> {
    // ---
    let window = window.max(1);

    readings
        .iter()
        .enumerate()
        .map(|(i, reading)| {
            let slice = &readings[(i + 1).saturating_sub(window)..=i];
            let sum: f64 = slice.iter().map(|r| r.moisture).sum();
            SmoothedReading {
                reading: reading.clone(),
                moisture_smooth: round2(sum / slice.len() as f64),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn moisture_series(values: &[f64]) -> Vec<SensorReading> {
        // ---
        values
            .iter()
            .enumerate()
            .map(|(i, &m)| SensorReading {
                sensor_id: "Sensor-001".into(),
                timestamp: 1_000 + i as i64 * 10,
                temperature: 30.0,
                moisture: m,
                ph: 6.0,
            })
            .collect()
    }

    #[test]
    fn test_growing_then_sliding_window() {
        // ---
        let readings = moisture_series(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        let smoothed: Vec<f64> = smooth_moisture(&readings, 5)
            .iter()
            .map(|s| s.moisture_smooth)
            .collect();

        assert_eq!(smoothed, vec![10.0, 15.0, 20.0, 25.0, 30.0, 40.0]);
    }

    #[test]
    fn test_rounds_to_two_decimals() {
        // ---
        let readings = moisture_series(&[1.0, 2.0, 2.0]);
        let smoothed = smooth_moisture(&readings, 5);
        assert_eq!(smoothed[2].moisture_smooth, 1.67);
    }

    #[test]
    fn test_window_of_one_is_identity() {
        // ---
        let readings = moisture_series(&[12.5, 40.0, 7.25]);
        let smoothed = smooth_moisture(&readings, 1);
        for (s, r) in smoothed.iter().zip(&readings) {
            assert_eq!(s.moisture_smooth, r.moisture);
            assert_eq!(&s.reading, r);
        }
        assert_eq!(smooth_moisture(&readings, 0).len(), 3);
    }

    #[test]
    fn test_missing_value_only_affects_its_windows() {
        // ---
        let readings = moisture_series(&[10.0, f64::NAN, 30.0, 40.0]);
        let smoothed = smooth_moisture(&readings, 2);
        assert_eq!(smoothed[0].moisture_smooth, 10.0);
        assert!(smoothed[1].moisture_smooth.is_nan());
        assert!(smoothed[2].moisture_smooth.is_nan());
        assert_eq!(smoothed[3].moisture_smooth, 35.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(smooth_moisture(&[], 5).is_empty());
    }
}

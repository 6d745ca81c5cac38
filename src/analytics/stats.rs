use crate::models::{Metric, MetricStats, SensorReading, TrendDirection};

use super::round2;

// ---

/// Readings whose timestamp lies in `[now - window_minutes, now]`.
///
/// The lower bound saturates at `i64::MIN`.
pub fn window_readings(
    readings: &[SensorReading],
    now: i64,
    window_minutes: i64,
) -> Vec<&SensorReading> {
    // ---
    let from = now.saturating_sub(window_minutes.saturating_mul(60));
    readings
        .iter()
        .filter(|r| r.timestamp >= from && r.timestamp <= now)
        .collect()
}

/// Classify the direction of a metric over the trailing window.
///
/// Readings missing the metric are ignored. Fewer than `min_points` remaining
/// values yields `Stable`. Otherwise the values are split at `len / 2` and the
/// late-half mean is compared with the early-half mean; changes within
/// `deadband` (relative) are `Stable`.
pub fn classify_trend(
    readings: &[SensorReading],
    metric: Metric,
    now: i64,
    window_minutes: i64,
    min_points: usize,
    deadband: f64,
) -> TrendDirection {
    // ---
    let values = window_values(readings, metric, now, window_minutes);
    if values.len() < min_points.max(2) {
        return TrendDirection::Stable;
    }

    let mid = values.len() / 2;
    let early_avg = mean(values[..mid].iter().copied());
    let late_avg = mean(values[mid..].iter().copied());

    if late_avg > early_avg * (1.0 + deadband) {
        TrendDirection::Up
    } else if late_avg < early_avg * (1.0 - deadband) {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

/// Mean, minimum and maximum of a metric over the trailing window.
///
/// Readings missing the metric are skipped; a window with no values yields
/// all `None`.
pub fn metric_stats(
    readings: &[SensorReading],
    metric: Metric,
    now: i64,
    window_minutes: i64,
) -> MetricStats {
    // ---
    let values = window_values(readings, metric, now, window_minutes);

    if values.is_empty() {
        return MetricStats {
            avg: None,
            min: None,
            max: None,
        };
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    MetricStats {
        avg: Some(round2(mean(values.iter().copied()))),
        min: Some(round2(min)),
        max: Some(round2(max)),
    }
}

/// Point-to-point direction of a series; the first point is `Stable`.
pub fn step_directions(values: &[f64]) -> Vec<TrendDirection> {
    // ---
    let mut out = Vec::with_capacity(values.len());
    if let Some(first) = values.first() {
        let mut prev = *first;
        out.push(TrendDirection::Stable);
        for &curr in &values[1..] {
            out.push(if curr > prev {
                TrendDirection::Up
            } else if curr < prev {
                TrendDirection::Down
            } else {
                TrendDirection::Stable
            });
            prev = curr;
        }
    }
    out
}

fn window_values(
    readings: &[SensorReading],
    metric: Metric,
    now: i64,
    window_minutes: i64,
) -> Vec<f64> {
    window_readings(readings, now, window_minutes)
        .into_iter()
        .map(|r| metric.value_of(r))
        .filter(|v| !v.is_nan())
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    sum / count as f64
}

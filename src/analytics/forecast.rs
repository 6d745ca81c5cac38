use serde::Serialize;

use crate::models::{ForecastPoint, Metric, SensorReading};

use super::round2;

// ---

/// Ordinary-least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Observed points and their linear extrapolation for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Forecast {
    pub fit: Option<LinearFit>,
    pub actual: Vec<ForecastPoint>,
    pub forecast: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn is_empty(&self) -> bool {
        self.fit.is_none()
    }
}

/// Closed-form OLS fit over `(x, y)` points.
///
/// Returns `None` with fewer than two points or when every `x` is identical
/// (zero denominator), so callers never see infinite or NaN coefficients.
pub fn fit_line(points: &[(f64, f64)]) -> Option<LinearFit> {
    // ---
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let (sum_x, sum_y, sum_xy, sum_x2) = points.iter().fold(
        (0.0, 0.0, 0.0, 0.0),
        |(sx, sy, sxy, sx2), &(x, y)| (sx + x, sy + y, sxy + x * y, sx2 + x * x),
    );

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    if !slope.is_finite() || !intercept.is_finite() {
        return None;
    }
    Some(LinearFit { slope, intercept })
}

/// Fit a line over the metric's series and extrapolate `count` points.
///
/// Points are indexed by their position in `readings`; readings whose metric
/// is NaN are skipped but keep their index. Forecast step `j` takes the value
/// at `x = n + j`, with `n` the number of valid points, and is stamped
/// `cadence_secs * (j + 1)` after the last valid observation, saturating at
/// the `i64` range. Observed values are rounded like the forecast.
pub fn forecast(
    readings: &[SensorReading],
    metric: Metric,
    count: usize,
    cadence_secs: i64,
) -> Forecast {
    // ---
    let valid: Vec<(usize, &SensorReading)> = readings
        .iter()
        .enumerate()
        .filter(|(_, r)| !metric.value_of(r).is_nan())
        .collect();

    let points: Vec<(f64, f64)> = valid
        .iter()
        .map(|(i, r)| (*i as f64, metric.value_of(r)))
        .collect();

    let Some(fit) = fit_line(&points) else {
        return Forecast::default();
    };
    let Some((_, last)) = valid.last() else {
        return Forecast::default();
    };

    let n = valid.len();
    let actual = valid
        .iter()
        .map(|(_, r)| ForecastPoint {
            timestamp: r.timestamp,
            value: round2(metric.value_of(r)),
        })
        .collect();

    let forecast = (0..count)
        .map(|j| ForecastPoint {
            timestamp: last
                .timestamp
                .saturating_add((j as i64 + 1).saturating_mul(cadence_secs)),
            value: round2(fit.at((n + j) as f64)),
        })
        .collect();

    Forecast {
        fit: Some(fit),
        actual,
        forecast,
    }
}

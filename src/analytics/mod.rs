//! Analytics engine gateway.
//!
//! Turns a time-ordered batch of readings for one sensor into smoothed
//! values, debounced alert events, a stability signal, rolling trend
//! summaries and linear forecasts. Everything below this module is
//! synchronous and free of I/O and clocks; callers pass "now" explicitly.
//!
//! Sibling modules are private; this gateway re-exports their public surface.

mod dedup;
mod detector;
mod forecast;
mod pipeline;
mod smoothing;
mod stability;
mod stats;

pub use dedup::{AlertDeduplicator, DedupCommit, SharedDeduplicator};
pub use detector::detect_alert;
pub use forecast::{fit_line, forecast, Forecast, LinearFit};
pub use pipeline::{AlertPipeline, TickOutcome};
pub use smoothing::smooth_moisture;
pub use stability::is_stable;
pub use stats::{classify_trend, metric_stats, step_directions, window_readings};

// ---

/// Number of trailing readings the detector and stability monitor look at.
pub const DETECTION_SAMPLES: usize = 3;

/// Engine tunables. `Default` reproduces the dashboard's stock behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    // ---
    /// Moving-average window, in samples, inclusive of the current reading.
    pub smoothing_window: usize,

    /// Maximum timestamp span of the detection window, in seconds.
    pub max_detection_span_secs: i64,

    /// Minimum spacing between identical alerts for one sensor, in seconds.
    pub cooldown_secs: i64,

    /// When dedup state is committed relative to persistence.
    pub dedup_commit: DedupCommit,

    /// Rolling window for trend statistics, in minutes.
    pub trend_window_minutes: i64,

    /// Minimum number of in-window points before a trend is reported.
    pub min_trend_points: usize,

    /// Relative change ignored by the trend classifier (0.02 = 2%).
    pub trend_deadband: f64,

    /// Number of forecast points to extrapolate.
    pub forecast_count: usize,

    /// Spacing between forecast points, in seconds.
    pub forecast_cadence_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            max_detection_span_secs: 60,
            cooldown_secs: 300,
            dedup_commit: DedupCommit::OnEmit,
            trend_window_minutes: 60,
            min_trend_points: 6,
            trend_deadband: 0.02,
            forecast_count: 10,
            forecast_cadence_secs: 600,
        }
    }
}

/// Round to two decimal places, the precision of every value the engine emits.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_1), 1.24);
        assert_eq!(round2(-2.0), -2.0);
        assert!(round2(f64::NAN).is_nan());
    }

    #[test]
    fn test_default_config() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.smoothing_window, 5);
        assert_eq!(cfg.cooldown_secs, 300);
        assert_eq!(cfg.dedup_commit, DedupCommit::OnEmit);
        assert_eq!(cfg.forecast_cadence_secs, 600);
    }
}

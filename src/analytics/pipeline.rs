use crate::models::{AlertEvent, SensorReading, SmoothedReading, Threshold};

use super::{
    detect_alert, is_stable, smooth_moisture, AlertDeduplicator, DedupCommit, EngineConfig,
    SharedDeduplicator,
};

// ---

/// Result of running the pipeline once over a sensor's batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub smoothed: Vec<SmoothedReading>,
    /// Alert that passed detection and the cooldown check, if any.
    pub alert: Option<AlertEvent>,
    pub stable: bool,
}

/// Smoothing -> detection -> dedup, plus the stability signal.
///
/// Owns its dedup state through a [`SharedDeduplicator`], so one pipeline can
/// be cloned into per-sensor tasks without cross-contaminating cooldowns.
#[derive(Debug, Clone)]
pub struct AlertPipeline {
    config: EngineConfig,
    dedup: SharedDeduplicator,
}

impl AlertPipeline {
    pub fn new(config: EngineConfig) -> Self {
        let dedup = AlertDeduplicator::new(config.cooldown_secs, config.dedup_commit);
        Self {
            config,
            dedup: SharedDeduplicator::new(dedup),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dedup(&self) -> &SharedDeduplicator {
        &self.dedup
    }

    /// Run one evaluation over a time-ordered batch for `sensor_id`.
    pub fn run(
        &self,
        sensor_id: &str,
        readings: &[SensorReading],
        threshold: Option<&Threshold>,
    ) -> TickOutcome {
        // ---
        let smoothed = smooth_moisture(readings, self.config.smoothing_window);

        let alert = detect_alert(
            readings,
            sensor_id,
            threshold,
            self.config.max_detection_span_secs,
        )
        .and_then(|candidate| self.dedup.check(candidate));

        if let Some(event) = &alert {
            tracing::info!(
                sensor_id,
                alert_type = %event.alert_type,
                timestamp = event.timestamp,
                "Alert emitted"
            );
        }

        TickOutcome {
            smoothed,
            alert,
            stable: is_stable(readings, threshold),
        }
    }

    /// Commit an alert after the caller persisted it. No-op under
    /// `DedupCommit::OnEmit`, where `run` already recorded it.
    pub fn confirm(&self, event: &AlertEvent) {
        if self.dedup.commit_policy() == DedupCommit::OnPersist {
            self.dedup.record(event);
        }
    }
}

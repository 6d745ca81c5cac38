use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{AlertEvent, AlertType};

// ---

/// When the deduplicator commits a key's emission timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupCommit {
    /// Record as soon as an event passes the cooldown check. A later
    /// persistence failure does not reopen the key.
    #[default]
    OnEmit,
    /// Only check; the caller records the event once it has been persisted.
    OnPersist,
}

impl DedupCommit {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "on_emit" | "emit" => Some(DedupCommit::OnEmit),
            "on_persist" | "persist" => Some(DedupCommit::OnPersist),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DedupCommit::OnEmit => "on_emit",
            DedupCommit::OnPersist => "on_persist",
        }
    }
}

/// Suppresses repeats of the same `(sensor_id, alert_type)` within a cooldown.
///
/// Owned by one engine instance; state lives until the instance is dropped.
#[derive(Debug, Clone)]
pub struct AlertDeduplicator {
    cooldown_secs: i64,
    commit: DedupCommit,
    last_emitted: HashMap<(String, AlertType), i64>,
}

impl AlertDeduplicator {
    pub fn new(cooldown_secs: i64, commit: DedupCommit) -> Self {
        Self {
            cooldown_secs,
            commit,
            last_emitted: HashMap::new(),
        }
    }

    pub fn commit_policy(&self) -> DedupCommit {
        self.commit
    }

    /// Pass the candidate through unless an identical alert was emitted less
    /// than `cooldown_secs` before it. Suppression leaves state untouched.
    pub fn check(&mut self, candidate: AlertEvent) -> Option<AlertEvent> {
        // ---
        if let Some(last) = self.last_emitted_at(&candidate.sensor_id, candidate.alert_type) {
            if candidate.timestamp - last < self.cooldown_secs {
                tracing::debug!(
                    sensor_id = %candidate.sensor_id,
                    alert_type = %candidate.alert_type,
                    since_last_secs = candidate.timestamp - last,
                    "Alert suppressed by cooldown"
                );
                return None;
            }
        }

        if self.commit == DedupCommit::OnEmit {
            self.record(&candidate);
        }
        Some(candidate)
    }

    /// Commit an emission. Only needed under [`DedupCommit::OnPersist`].
    pub fn record(&mut self, event: &AlertEvent) {
        self.last_emitted
            .insert((event.sensor_id.clone(), event.alert_type), event.timestamp);
    }

    pub fn last_emitted_at(&self, sensor_id: &str, alert_type: AlertType) -> Option<i64> {
        self.last_emitted
            .get(&(sensor_id.to_string(), alert_type))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.last_emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_emitted.is_empty()
    }
}

/// Mutex-guarded deduplicator for hosts that evaluate sensors concurrently.
#[derive(Debug, Clone)]
pub struct SharedDeduplicator {
    inner: Arc<Mutex<AlertDeduplicator>>,
}

impl SharedDeduplicator {
    pub fn new(dedup: AlertDeduplicator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(dedup)),
        }
    }

    pub fn check(&self, candidate: AlertEvent) -> Option<AlertEvent> {
        self.lock().check(candidate)
    }

    pub fn record(&self, event: &AlertEvent) {
        self.lock().record(event)
    }

    pub fn commit_policy(&self) -> DedupCommit {
        self.lock().commit_policy()
    }

    pub fn last_emitted_at(&self, sensor_id: &str, alert_type: AlertType) -> Option<i64> {
        self.lock().last_emitted_at(sensor_id, alert_type)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AlertDeduplicator> {
        // The map stays consistent even if a holder panicked mid-call.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! In-memory session state: metrics, event log, bypass mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known metric names. Handlers and analytics agree on these strings;
/// anything else in the map is host-defined and carried untouched.
pub const METRIC_WOW_SCORE: &str = "wow_score";
pub const METRIC_TOOL_COUNT: &str = "tool_count";
pub const METRIC_VIOLATIONS: &str = "violations";
pub const METRIC_CREDENTIALS_DETECTED: &str = "credentials_detected";
pub const METRIC_DECISION_TIMEOUTS: &str = "decision_timeouts";
pub const METRIC_WEB_SEARCHES: &str = "web_searches";
pub const METRIC_BYPASSES_USED: &str = "bypasses_used";
pub const METRIC_SCORE_DECAYS: &str = "score_decays";

/// One entry in the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub name: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

/// Operator bypass state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BypassState {
    #[default]
    Inactive,
    Active {
        until: DateTime<Utc>,
    },
    Superadmin {
        until: DateTime<Utc>,
    },
}

/// Bypass state resolved against a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassMode {
    None,
    Bypass,
    Superadmin,
}

/// The mutable state for one logical session.
///
/// All mutation goes through these methods; the scoring engine and the
/// handlers never touch the fields directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    metrics: BTreeMap<String, i64>,
    events: Vec<SessionEvent>,
    pub bypass: BypassState,
    /// Set when a violation penalty lands; cleared by the recovery reward.
    #[serde(default)]
    pub pending_recovery: bool,
    /// Latched when the score falls into the blocked band; cleared only when
    /// it recovers past the critical band.
    #[serde(default)]
    pub block_gated: bool,
    #[serde(default)]
    pub last_violation_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_decay_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Fresh session. The id is a ULID (time-ordered) plus the process id,
    /// which is also the snapshot directory name.
    pub fn new(initial_score: i64) -> SessionState {
        let now = Utc::now();
        let mut metrics = BTreeMap::new();
        metrics.insert(METRIC_WOW_SCORE.to_string(), initial_score.clamp(0, 100));
        SessionState {
            session_id: format!("{}-{}", ulid::Ulid::new(), std::process::id()),
            started_at: now,
            metrics,
            events: Vec::new(),
            bypass: BypassState::Inactive,
            pending_recovery: false,
            block_gated: false,
            last_violation_at: None,
            last_decay_at: None,
        }
    }

    pub fn metric(&self, name: &str, default: i64) -> i64 {
        self.metrics.get(name).copied().unwrap_or(default)
    }

    pub fn set_metric(&mut self, name: &str, value: i64) {
        self.metrics.insert(name.to_string(), value);
    }

    pub fn increment_metric(&mut self, name: &str) -> i64 {
        let value = self.metric(name, 0) + 1;
        self.set_metric(name, value);
        value
    }

    pub fn metrics(&self) -> &BTreeMap<String, i64> {
        &self.metrics
    }

    /// Append to the event log. Timestamps never move backwards even if the
    /// system clock does.
    pub fn track_event(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        let mut timestamp = Utc::now();
        if let Some(last) = self.events.last()
            && timestamp < last.timestamp
        {
            timestamp = last.timestamp;
        }
        self.events.push(SessionEvent {
            name: name.into(),
            detail: detail.into(),
            timestamp,
        });
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// Replace the event log wholesale when rehydrating from a snapshot.
    pub(crate) fn restore_events(&mut self, events: Vec<SessionEvent>) {
        self.events = events;
    }

    /// Current reputation score.
    pub fn score(&self) -> i64 {
        self.metric(METRIC_WOW_SCORE, 70)
    }

    pub(crate) fn set_score(&mut self, value: i64) {
        self.set_metric(METRIC_WOW_SCORE, value.clamp(0, 100));
    }

    // ── Bypass ──────────────────────────────────────────────────────

    pub fn enable_bypass(&mut self, duration: chrono::Duration) {
        let until = Utc::now() + duration;
        self.bypass = BypassState::Active { until };
        self.track_event("bypass_enabled", until.to_rfc3339());
    }

    pub fn disable_bypass(&mut self) {
        self.bypass = BypassState::Inactive;
        self.track_event("bypass_disabled", "");
    }

    pub fn unlock_superadmin(&mut self, duration: chrono::Duration) {
        let until = Utc::now() + duration;
        self.bypass = BypassState::Superadmin { until };
        self.track_event("superadmin_unlocked", until.to_rfc3339());
    }

    /// Resolve the bypass state against `now`; expired deadlines read as
    /// inactive without mutating the stored state.
    pub fn bypass_mode(&self, now: DateTime<Utc>) -> BypassMode {
        match self.bypass {
            BypassState::Inactive => BypassMode::None,
            BypassState::Active { until } if now < until => BypassMode::Bypass,
            BypassState::Superadmin { until } if now < until => BypassMode::Superadmin,
            _ => BypassMode::None,
        }
    }
}

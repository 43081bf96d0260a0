//! Snapshot persistence.
//!
//! One directory per session under the sessions root. The metrics document
//! is written to `metrics.json.tmp` and renamed into place, so a reader
//! either sees a fully valid document or none at all. No locks: directories
//! are per-session and the document has a single writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use wow_core::GatewayError;

use crate::state::{BypassState, METRIC_WOW_SCORE, SessionEvent, SessionState};

pub const METRICS_FILE: &str = "metrics.json";
const METRICS_TMP_FILE: &str = "metrics.json.tmp";
/// Pointer to the session shared by hook invocations and operator commands.
const CURRENT_FILE: &str = "current";

/// The persisted form of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub wow_score: i64,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub metrics: BTreeMap<String, i64>,
    #[serde(default)]
    pub events: Vec<SessionEvent>,
    #[serde(default)]
    pub bypass: BypassState,
    #[serde(default)]
    pub pending_recovery: bool,
    #[serde(default)]
    pub block_gated: bool,
    #[serde(default)]
    pub last_violation_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_decay_at: Option<DateTime<Utc>>,
}

impl MetricsDocument {
    pub fn from_state(state: &SessionState) -> MetricsDocument {
        MetricsDocument {
            wow_score: state.score(),
            timestamp: Utc::now(),
            session_id: state.session_id.clone(),
            started_at: state.started_at,
            metrics: state.metrics().clone(),
            events: state.events().to_vec(),
            bypass: state.bypass,
            pending_recovery: state.pending_recovery,
            block_gated: state.block_gated,
            last_violation_at: state.last_violation_at,
            last_decay_at: state.last_decay_at,
        }
    }

    pub fn into_state(self) -> SessionState {
        let mut state = SessionState::new(self.wow_score);
        state.session_id = self.session_id;
        state.started_at = self.started_at;
        state.bypass = self.bypass;
        state.pending_recovery = self.pending_recovery;
        state.block_gated = self.block_gated;
        state.last_violation_at = self.last_violation_at;
        state.last_decay_at = self.last_decay_at;
        for (name, value) in &self.metrics {
            state.set_metric(name, *value);
        }
        state.set_metric(METRIC_WOW_SCORE, self.wow_score.clamp(0, 100));
        state.restore_events(self.events);
        state
    }
}

pub fn session_dir(root: &Path, session_id: &str) -> PathBuf {
    root.join(session_id)
}

/// Write the session's metrics document atomically. Returns the path of the
/// visible `metrics.json`.
pub fn snapshot(state: &SessionState, root: &Path) -> Result<PathBuf, GatewayError> {
    let dir = session_dir(root, &state.session_id);
    fs::create_dir_all(&dir)
        .map_err(|e| GatewayError::ConfigInvalid(format!("{}: {e}", dir.display())))?;

    let document = MetricsDocument::from_state(state);
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| GatewayError::ConfigInvalid(format!("serialize metrics: {e}")))?;

    let tmp = dir.join(METRICS_TMP_FILE);
    let target = dir.join(METRICS_FILE);
    fs::write(&tmp, json).map_err(|_| GatewayError::SnapshotUnreadable(tmp.clone()))?;
    fs::rename(&tmp, &target).map_err(|_| GatewayError::SnapshotUnreadable(target.clone()))?;
    Ok(target)
}

/// Load one session's document. Absence, unreadability, and parse failure
/// all collapse into `SnapshotUnreadable` so callers skip uniformly.
pub fn load_document(root: &Path, session_id: &str) -> Result<MetricsDocument, GatewayError> {
    let path = session_dir(root, session_id).join(METRICS_FILE);
    let content =
        fs::read_to_string(&path).map_err(|_| GatewayError::SnapshotUnreadable(path.clone()))?;
    serde_json::from_str(&content).map_err(|_| GatewayError::SnapshotUnreadable(path))
}

/// Load a session for reporting contexts.
pub fn load(root: &Path, session_id: &str) -> Result<SessionState, GatewayError> {
    load_document(root, session_id).map(MetricsDocument::into_state)
}

/// Open the session the `current` pointer names, or create a fresh one.
///
/// Hook invocations are one short-lived process per tool call; the pointer
/// is what makes them and the operator CLI act on the same logical session.
/// A stale pointer (directory gone, document unreadable) falls back to a
/// fresh session rather than failing.
pub fn open_current(root: &Path, initial_score: i64) -> SessionState {
    let pointer = root.join(CURRENT_FILE);
    if let Ok(id) = fs::read_to_string(&pointer) {
        let id = id.trim();
        if !id.is_empty() {
            match load(root, id) {
                Ok(state) => return state,
                Err(e) => tracing::debug!("stale current pointer '{id}': {e}"),
            }
        }
    }

    let state = SessionState::new(initial_score);
    if let Err(e) = snapshot(&state, root) {
        tracing::warn!("could not snapshot new session: {e}");
    }
    if let Err(e) = write_current(root, &state.session_id) {
        tracing::warn!("could not write current pointer: {e}");
    }
    state
}

fn write_current(root: &Path, session_id: &str) -> std::io::Result<()> {
    fs::create_dir_all(root)?;
    let tmp = root.join(format!("{CURRENT_FILE}.tmp"));
    fs::write(&tmp, session_id)?;
    fs::rename(tmp, root.join(CURRENT_FILE))
}

//! Friction capture.
//!
//! Deny decisions and other friction signals land here with a recency
//! window; pattern analysis only ever sees entries younger than the window,
//! so one bad hour last week does not color today's report.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default recency window: five minutes.
pub const DEFAULT_WINDOW_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrustrationEvent {
    pub id: u64,
    /// Event kind, e.g. "deny_repeat" or "bypass_denied".
    pub kind: String,
    /// Where it happened: tool name or subsystem.
    pub context: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

/// Windowed set of friction events.
#[derive(Debug, Clone)]
pub struct FrustrationWindow {
    window: Duration,
    next_id: u64,
    entries: Vec<FrustrationEvent>,
}

impl Default for FrustrationWindow {
    fn default() -> Self {
        FrustrationWindow::new(Duration::seconds(DEFAULT_WINDOW_SECS))
    }
}

impl FrustrationWindow {
    pub fn new(window: Duration) -> FrustrationWindow {
        FrustrationWindow {
            window,
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        kind: impl Into<String>,
        context: impl Into<String>,
        detail: impl Into<String>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(FrustrationEvent {
            id,
            kind: kind.into(),
            context: context.into(),
            detail: detail.into(),
            timestamp: Utc::now(),
        });
        id
    }

    /// Entries still inside the window as of `now`, oldest first.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<&FrustrationEvent> {
        self.entries
            .iter()
            .filter(|e| now - e.timestamp <= self.window)
            .collect()
    }

    /// Drop expired entries. Ids are never reused.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        self.entries.retain(|e| now - e.timestamp <= window);
    }

    /// Active entries in `context`, as of `now`.
    pub fn active_in_context(&self, context: &str, now: DateTime<Utc>) -> usize {
        self.active(now)
            .iter()
            .filter(|e| e.context == context)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

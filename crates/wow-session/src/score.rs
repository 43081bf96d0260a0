//! Reputation scoring.
//!
//! The score is a bounded integer 0..=100 living in the session's
//! `wow_score` metric. Every adjustment goes through the engine so the
//! clamp, the event log entry, and the recovery bookkeeping stay in one
//! place.

use chrono::{DateTime, Utc};
use wow_config::ScoringConfig;

use crate::state::{METRIC_SCORE_DECAYS, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Penalty {
    Violation,
    HighRiskOperation,
    CredentialLeak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reward {
    /// Safe operation following a violation.
    Recovery,
    GoodPractice,
    /// Idle decay reward: no violations for the configured window.
    IdleDecay,
}

/// Score bands, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Good,
    Warn,
    Critical,
    Blocked,
}

impl ScoreBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::Warn => "warn",
            ScoreBand::Critical => "critical",
            ScoreBand::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ScoreEngine {
    config: ScoringConfig,
}

impl ScoreEngine {
    pub fn new(config: ScoringConfig) -> ScoreEngine {
        ScoreEngine { config }
    }

    pub fn initial_score(&self) -> i64 {
        self.config.initial_score.clamp(0, 100)
    }

    fn penalty_amount(&self, penalty: Penalty) -> i64 {
        match penalty {
            Penalty::Violation => self.config.violation_penalty,
            Penalty::HighRiskOperation => self.config.high_risk_penalty,
            Penalty::CredentialLeak => self.config.credential_leak_penalty,
        }
    }

    fn reward_amount(&self, reward: Reward) -> i64 {
        match reward {
            Reward::Recovery => self.config.recovery_reward,
            Reward::GoodPractice => self.config.good_practice_reward,
            Reward::IdleDecay => self.config.idle_decay_reward,
        }
    }

    /// Apply a penalty; returns the new score.
    pub fn penalize(&self, session: &mut SessionState, penalty: Penalty) -> i64 {
        let before = session.score();
        let after = (before - self.penalty_amount(penalty)).max(0);
        session.set_score(after);
        if penalty == Penalty::Violation {
            session.pending_recovery = true;
            session.last_violation_at = Some(Utc::now());
        }
        session.track_event("score_penalty", format!("{penalty:?} {before}->{after}"));
        after
    }

    /// Apply a reward; returns the new score.
    pub fn reward(&self, session: &mut SessionState, reward: Reward) -> i64 {
        let before = session.score();
        let after = (before + self.reward_amount(reward)).min(100);
        session.set_score(after);
        session.track_event("score_reward", format!("{reward:?} {before}->{after}"));
        after
    }

    /// A safe operation completed. Grants the recovery reward when the
    /// previous scored operation was a violation.
    pub fn record_safe_operation(&self, session: &mut SessionState) {
        if session.pending_recovery {
            session.pending_recovery = false;
            self.reward(session, Reward::Recovery);
        }
    }

    /// Idle decay: +1 for each full violation-free window since the later of
    /// the last decay and the last violation.
    pub fn tick_idle(&self, session: &mut SessionState, now: DateTime<Utc>) {
        let window = chrono::Duration::seconds(self.config.idle_decay_secs as i64);
        if window <= chrono::Duration::zero() {
            return;
        }
        let anchor = [
            session.last_decay_at,
            session.last_violation_at,
            Some(session.started_at),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(session.started_at);

        if now - anchor >= window {
            session.last_decay_at = Some(now);
            session.increment_metric(METRIC_SCORE_DECAYS);
            self.reward(session, Reward::IdleDecay);
        }
    }

    /// Band for a given score, using the configured warn/block thresholds.
    pub fn band(&self, score: i64) -> ScoreBand {
        if score >= 90 {
            ScoreBand::Excellent
        } else if score >= 70 {
            ScoreBand::Good
        } else if score >= self.config.warn_threshold {
            ScoreBand::Warn
        } else if score >= self.config.block_threshold {
            ScoreBand::Critical
        } else {
            ScoreBand::Blocked
        }
    }

    /// Resolve the score gate that upgrades bypassable blocks to absolute.
    ///
    /// Latches when the score falls below the block threshold; once latched,
    /// it clears only when the score recovers past the critical band (the
    /// warn threshold), not merely back above the block threshold.
    pub fn update_block_gate(&self, session: &mut SessionState) -> bool {
        let score = session.score();
        if score < self.config.block_threshold {
            session.block_gated = true;
        } else if session.block_gated && score >= self.config.warn_threshold {
            session.block_gated = false;
        }
        session.block_gated
    }
}

//! The single context object threaded through the decision pipeline.

use wow_config::GatewayConfig;
use wow_core::EventBus;
use wow_rules::RuleSet;
use wow_secrets::Redaction;
use wow_session::{
    FrustrationWindow, METRIC_CREDENTIALS_DETECTED, Penalty, Reward, ScoreEngine, SessionState,
};

/// Everything a handler may touch. Handlers are pure with respect to state
/// except through the session interface and the bus, and both live here.
pub struct GatewayContext {
    pub config: GatewayConfig,
    pub session: SessionState,
    pub rules: RuleSet,
    pub bus: EventBus,
    pub scores: ScoreEngine,
    pub frustration: FrustrationWindow,
}

impl GatewayContext {
    pub fn new(config: GatewayConfig, session: SessionState, rules: RuleSet) -> GatewayContext {
        let scores = ScoreEngine::new(config.scoring.clone());
        GatewayContext {
            config,
            session,
            rules,
            bus: EventBus::new(),
            scores,
            frustration: FrustrationWindow::default(),
        }
    }

    /// Fresh context with default config and an empty rule set.
    pub fn for_session(session: SessionState) -> GatewayContext {
        GatewayContext::new(GatewayConfig::default(), session, RuleSet::empty())
    }

    /// Publish on the bus and record in the session log in one step.
    pub fn emit(&mut self, name: &str, detail: impl Into<String>) {
        let detail = detail.into();
        self.bus.publish(name, detail.clone());
        self.session.track_event(name, detail);
    }

    pub fn penalize(&mut self, penalty: Penalty) -> i64 {
        self.scores.penalize(&mut self.session, penalty)
    }

    pub fn reward(&mut self, reward: Reward) -> i64 {
        self.scores.reward(&mut self.session, reward)
    }

    /// Record a redaction's findings: metric, event, and the leak penalty.
    pub fn record_credentials(&mut self, redaction: &Redaction) {
        let mut hit = false;
        let kinds: Vec<String> = redaction
            .redacted_matches()
            .map(|m| m.kind.to_string())
            .collect();
        for kind in &kinds {
            hit = true;
            self.session.increment_metric(METRIC_CREDENTIALS_DETECTED);
            self.bus.publish("credential_detected", kind.clone());
        }
        if hit {
            self.session
                .track_event("credential_detected", kinds.join(","));
            self.penalize(Penalty::CredentialLeak);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wow_secrets::redact;
    use wow_session::METRIC_WOW_SCORE;

    fn context() -> GatewayContext {
        GatewayContext::for_session(SessionState::new(70))
    }

    #[test]
    fn test_emit_reaches_bus_and_log() {
        let mut cx = context();
        cx.emit("violation", "SYSTEM_FILE /etc/hosts");
        assert_eq!(cx.bus.published_count(), 1);
        assert_eq!(cx.session.events().len(), 1);
        assert_eq!(cx.session.events()[0].name, "violation");
    }

    #[test]
    fn test_record_credentials_counts_and_penalizes() {
        let mut cx = context();
        let redaction = redact(&format!("ghp_{}", "A".repeat(36)));
        cx.record_credentials(&redaction);

        assert_eq!(cx.session.metric(METRIC_CREDENTIALS_DETECTED, 0), 1);
        assert_eq!(cx.session.metric(METRIC_WOW_SCORE, 0), 55, "70 - 15 leak penalty");
    }

    #[test]
    fn test_record_credentials_noop_without_matches() {
        let mut cx = context();
        let redaction = redact("nothing secret here");
        cx.record_credentials(&redaction);
        assert_eq!(cx.session.metric(METRIC_CREDENTIALS_DETECTED, 0), 0);
        assert_eq!(cx.session.score(), 70);
    }
}

//! Request routing: rules, fast path, handler dispatch, score gate, bypass
//! resolution, and the decision budget.
//!
//! The pipeline is fail-open exactly once: a handler fault (panic or error)
//! becomes an allow with an internal error event, because a broken gateway
//! must not brick the assistant. Every deliberate policy decision stays
//! fail-closed.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use chrono::Utc;
use wow_core::{Decision, Outcome, ToolRequest};
use wow_rules::RuleAction;
use wow_session::{
    BypassMode, METRIC_BYPASSES_USED, METRIC_DECISION_TIMEOUTS, METRIC_TOOL_COUNT,
    METRIC_VIOLATIONS, Penalty,
};

use crate::context::GatewayContext;
use crate::fastpath::fast_path;
use crate::handler::HandlerRegistry;

/// Route one request to a decision. Never panics, never errors: every
/// internal failure mode resolves to an allow with a named reason.
pub fn route(registry: &HandlerRegistry, request: &ToolRequest, cx: &mut GatewayContext) -> Decision {
    let started = Instant::now();
    cx.session.increment_metric(METRIC_TOOL_COUNT);

    let decision = decide(registry, request, cx);
    let decision = apply_score_gate(decision, cx);
    let (decision, demoted) = apply_enforcement_mode(decision, cx);
    let (decision, bypassed) = apply_bypass(decision, cx);
    record_outcome(&decision, bypassed || demoted, request, cx);

    let budget_ms = cx.config.limits.decision_budget_ms;
    if started.elapsed().as_millis() as u64 > budget_ms {
        cx.session.increment_metric(METRIC_DECISION_TIMEOUTS);
        cx.emit("decision_timeout", format!("budget {budget_ms} ms exceeded"));
        return Decision::allow("decision timeout");
    }

    tracing::debug!(
        tool = %request.tool_name,
        outcome = ?decision.outcome,
        elapsed_us = started.elapsed().as_micros() as u64,
        "routed"
    );
    decision
}

/// Stages Received → Normalized → RuleChecked → FastPathChecked →
/// HandlerChecked. Any stage may land on a terminal decision early.
fn decide(registry: &HandlerRegistry, request: &ToolRequest, cx: &mut GatewayContext) -> Decision {
    if !registry.has_handler(&request.tool_name) {
        cx.emit("unknown_tool", request.tool_name.clone());
        return Decision::allow(format!(
            "no handler registered for tool '{}'",
            request.tool_name
        ));
    }

    // Custom rules run before built-ins. An `allow` is provisional: the
    // handler still gets to raise an absolute block, which outranks it.
    let rule_verdict = cx.rules.evaluate(&request.scannable_text());
    if let Some(verdict) = &rule_verdict {
        match verdict.action {
            RuleAction::Block => {
                return Decision::block_bypassable(verdict.message.clone())
                    .with_rule(verdict.rule_name.clone());
            }
            RuleAction::Warn => {
                cx.emit(
                    "rule_warning",
                    format!("{}: {}", verdict.rule_name, verdict.message),
                );
            }
            RuleAction::Allow => {
                let handler_decision = run_handler(registry, request, cx);
                if handler_decision.outcome == Outcome::BlockAbsolute {
                    return handler_decision.with_rule(verdict.rule_name.clone());
                }
                return Decision::allow(format!("allowed by rule '{}'", verdict.rule_name))
                    .with_rule(verdict.rule_name.clone());
            }
        }
    }

    if let Some(decision) = fast_path(request) {
        return decision;
    }

    run_handler(registry, request, cx)
}

/// Dispatch with panic isolation: the single fail-open point.
fn run_handler(registry: &HandlerRegistry, request: &ToolRequest, cx: &mut GatewayContext) -> Decision {
    let Some(handler) = registry.get(&request.tool_name) else {
        return Decision::allow(format!(
            "no handler registered for tool '{}'",
            request.tool_name
        ));
    };
    match catch_unwind(AssertUnwindSafe(|| handler.handle(request, cx))) {
        Ok(decision) => decision,
        Err(_) => {
            cx.emit(
                "internal_error",
                format!("handler fault in '{}'", request.tool_name),
            );
            Decision::allow("handler error, failing open")
        }
    }
}

/// While the session score sits in the blocked band, bypassable blocks
/// harden to absolute until the score recovers past the critical band.
fn apply_score_gate(decision: Decision, cx: &mut GatewayContext) -> Decision {
    let gated = cx.scores.update_block_gate(&mut cx.session);
    if gated && decision.outcome == Outcome::BlockBypassable {
        let mut upgraded = decision;
        upgraded.outcome = Outcome::BlockAbsolute;
        upgraded.reason = format!(
            "{} (session score is in the blocked band; bypass is suspended until it recovers)",
            upgraded.reason
        );
        return upgraded;
    }
    decision
}

/// Advisory mode: with `strict_mode` off, non-absolute denies are reported
/// as guidance instead of enforced. The classification still happens (an
/// event records it); only the verdict softens. Absolute blocks — including
/// score-gate upgrades, which run first — are unaffected.
fn apply_enforcement_mode(decision: Decision, cx: &mut GatewayContext) -> (Decision, bool) {
    if cx.config.enforcement.strict_mode {
        return (decision, false);
    }
    match decision.outcome {
        Outcome::BlockBypassable | Outcome::RequireElevation => {
            cx.emit("advisory_block", decision.reason.clone());
            let mut advisory = decision;
            advisory.outcome = Outcome::Allow;
            advisory.reason = format!("advisory (strict mode off): {}", advisory.reason);
            (advisory, true)
        }
        _ => (decision, false),
    }
}

/// Resolve operator bypass state. Absolute blocks survive plain bypass;
/// under superadmin they become elevation-required and the active
/// superadmin session satisfies that elevation.
fn apply_bypass(decision: Decision, cx: &mut GatewayContext) -> (Decision, bool) {
    if !decision.outcome.is_deny() {
        return (decision, false);
    }
    match cx.session.bypass_mode(Utc::now()) {
        BypassMode::None => (decision, false),
        BypassMode::Bypass => match decision.outcome {
            Outcome::BlockBypassable => {
                cx.session.increment_metric(METRIC_BYPASSES_USED);
                cx.emit("bypass_used", decision.reason.clone());
                (
                    Decision::allow(format!("bypassed: {}", decision.reason)),
                    true,
                )
            }
            _ => (decision, false),
        },
        BypassMode::Superadmin => match decision.outcome {
            Outcome::BlockBypassable | Outcome::RequireElevation | Outcome::BlockAbsolute => {
                cx.session.increment_metric(METRIC_BYPASSES_USED);
                cx.emit("superadmin_used", decision.reason.clone());
                (
                    Decision::allow(format!("elevation satisfied: {}", decision.reason)),
                    true,
                )
            }
            Outcome::Allow => (decision, false),
        },
    }
}

/// Session bookkeeping after the outcome is final. `converted` marks allows
/// that were really denies (bypassed or advisory); those earn no recovery
/// reward.
fn record_outcome(
    decision: &Decision,
    converted: bool,
    request: &ToolRequest,
    cx: &mut GatewayContext,
) {
    if decision.outcome.is_deny() {
        if cx.config.enforcement.block_on_violation {
            cx.session.increment_metric(METRIC_VIOLATIONS);
            cx.emit("violation", decision.reason.clone());
            cx.penalize(Penalty::Violation);
        }
        cx.frustration
            .record("deny", request.tool_name.clone(), decision.reason.clone());
    } else if !converted {
        cx.scores.record_safe_operation(&mut cx.session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wow_core::{ToolName, ToolRequest};
    use wow_rules::RuleSet;
    use wow_session::{METRIC_WOW_SCORE, SessionState};

    use crate::handler::{ToolHandler, default_registry};

    fn request(tool: &str, input: serde_json::Value) -> ToolRequest {
        ToolRequest::from_wire(&json!({"tool_name": tool, "tool_input": input})).unwrap()
    }

    fn cx() -> GatewayContext {
        GatewayContext::for_session(SessionState::new(70))
    }

    #[test]
    fn test_unknown_tool_default_allows() {
        let registry = default_registry();
        let mut cx = cx();
        let req = request("Telepathy", json!({"thought": "??"}));
        let decision = route(&registry, &req, &mut cx);
        assert_eq!(decision.outcome, Outcome::Allow);
        assert!(decision.reason.contains("no handler"));
        assert!(cx.session.events().iter().any(|e| e.name == "unknown_tool"));
    }

    #[test]
    fn test_tool_count_increments_on_every_route() {
        let registry = default_registry();
        let mut cx = cx();
        route(&registry, &request("Bash", json!({"command": "echo hi"})), &mut cx);
        route(&registry, &request("Bash", json!({"command": "git status"})), &mut cx);
        assert_eq!(cx.session.metric(METRIC_TOOL_COUNT, 0), 2);
    }

    #[test]
    fn test_fast_path_allows_without_extra_events() {
        let registry = default_registry();
        let mut cx = cx();
        let decision = route(&registry, &request("Bash", json!({"command": "echo hello"})), &mut cx);
        assert_eq!(decision.outcome, Outcome::Allow);
        assert!(
            cx.session.events().is_empty(),
            "fast path appends nothing: {:?}",
            cx.session.events()
        );
        assert_eq!(cx.session.metric(METRIC_TOOL_COUNT, 0), 1);
    }

    #[test]
    fn test_deny_increments_violations_and_penalizes() {
        let registry = default_registry();
        let mut cx = cx();
        let decision = route(
            &registry,
            &request("Write", json!({"file_path": "/etc/hosts", "content": "127.0.0.1 x"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::BlockAbsolute);
        assert_eq!(cx.session.metric(METRIC_VIOLATIONS, 0), 1);
        assert_eq!(cx.session.metric(METRIC_WOW_SCORE, 0), 60);
        assert!(cx.session.events().iter().any(|e| e.name == "violation"));
    }

    #[test]
    fn test_determinism_same_request_same_decision() {
        let registry = default_registry();
        let req = request("Bash", json!({"command": "rm -rf /"}));
        let a = route(&registry, &req, &mut cx());
        let b = route(&registry, &req, &mut cx());
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.reason, b.reason);
    }

    // ── Bypass semantics ────────────────────────────────────────────

    #[test]
    fn test_bypass_converts_bypassable_to_allow() {
        let registry = default_registry();
        let mut cx = cx();
        cx.session.enable_bypass(chrono::Duration::minutes(10));
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "sudo apt-get update"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::Allow);
        assert!(decision.reason.starts_with("bypassed:"));
        assert_eq!(cx.session.metric(METRIC_BYPASSES_USED, 0), 1);
    }

    #[test]
    fn test_bypass_never_converts_absolute() {
        let registry = default_registry();
        let mut cx = cx();
        cx.session.enable_bypass(chrono::Duration::minutes(10));
        let decision = route(&registry, &request("Bash", json!({"command": "rm -rf /"})), &mut cx);
        assert_eq!(decision.outcome, Outcome::BlockAbsolute);
    }

    #[test]
    fn test_superadmin_satisfies_absolute_as_elevation() {
        let registry = default_registry();
        let mut cx = cx();
        cx.session.unlock_superadmin(chrono::Duration::minutes(5));
        let decision = route(&registry, &request("Bash", json!({"command": "rm -rf /"})), &mut cx);
        assert_eq!(decision.outcome, Outcome::Allow);
        assert!(decision.reason.starts_with("elevation satisfied:"));
    }

    #[test]
    fn test_expired_bypass_does_not_convert() {
        let registry = default_registry();
        let mut cx = cx();
        cx.session.enable_bypass(chrono::Duration::seconds(-1));
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "sudo ls"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::BlockBypassable);
    }

    // ── Score gate ──────────────────────────────────────────────────

    #[test]
    fn test_blocked_score_upgrades_bypassable_to_absolute() {
        let registry = default_registry();
        let mut cx = GatewayContext::for_session(SessionState::new(20));
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "sudo ls"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::BlockAbsolute);
        assert!(decision.reason.contains("blocked band"));
    }

    #[test]
    fn test_blocked_score_makes_bypass_ineffective() {
        let registry = default_registry();
        let mut cx = GatewayContext::for_session(SessionState::new(10));
        cx.session.enable_bypass(chrono::Duration::minutes(10));
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "sudo ls"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::BlockAbsolute);
    }

    #[test]
    fn test_gate_holds_through_critical_band() {
        let registry = default_registry();
        let mut cx = GatewayContext::for_session(SessionState::new(25));
        route(&registry, &request("Bash", json!({"command": "sudo ls"})), &mut cx);

        // Score recovers into the critical band only; the gate still holds.
        cx.session.set_metric(METRIC_WOW_SCORE, 40);
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "sudo ls"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::BlockAbsolute);

        // Full recovery releases the gate.
        cx.session.set_metric(METRIC_WOW_SCORE, 55);
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "sudo ls"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::BlockBypassable);
    }

    // ── Enforcement mode ────────────────────────────────────────────

    #[test]
    fn test_strict_mode_off_demotes_bypassable_to_advisory_allow() {
        let registry = default_registry();
        let mut cx = cx();
        cx.config.enforcement.strict_mode = false;
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "sudo apt-get update"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::Allow);
        assert!(
            decision.reason.starts_with("advisory (strict mode off):"),
            "{}",
            decision.reason
        );
        assert!(
            cx.session.events().iter().any(|e| e.name == "advisory_block"),
            "classification is still recorded"
        );
        assert_eq!(
            cx.session.score(),
            70,
            "advisory allows are not safe operations and not violations"
        );
    }

    #[test]
    fn test_strict_mode_off_leaves_absolute_blocks_alone() {
        let registry = default_registry();
        let mut cx = cx();
        cx.config.enforcement.strict_mode = false;
        let decision = route(&registry, &request("Bash", json!({"command": "rm -rf /"})), &mut cx);
        assert_eq!(decision.outcome, Outcome::BlockAbsolute);
    }

    #[test]
    fn test_strict_mode_off_respects_score_gate_upgrade() {
        // The gate hardens a bypassable deny to absolute before the
        // advisory demotion looks at it, so a blocked-band session still
        // denies even in advisory mode.
        let registry = default_registry();
        let mut cx = GatewayContext::for_session(SessionState::new(10));
        cx.config.enforcement.strict_mode = false;
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "sudo ls"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::BlockAbsolute);
    }

    // ── DSL interplay ───────────────────────────────────────────────

    #[test]
    fn test_rule_block_wins_before_handler() {
        let registry = default_registry();
        let mut cx = cx();
        cx.rules = RuleSet::parse(
            "rule: no-git\npattern: ^git\naction: block\nmessage: git is frozen today\n",
        )
        .unwrap();
        let decision = route(&registry, &request("Bash", json!({"command": "git push"})), &mut cx);
        assert_eq!(decision.outcome, Outcome::BlockBypassable);
        assert_eq!(decision.reason, "git is frozen today");
        assert_eq!(decision.matched_rules, vec!["no-git".to_string()]);
    }

    #[test]
    fn test_rule_allow_short_circuits_bypassable_builtin() {
        let registry = default_registry();
        let mut cx = cx();
        cx.rules = RuleSet::parse("rule: trust-sudo\npattern: ^sudo\naction: allow\n").unwrap();
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "sudo apt-get update"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::Allow);
        assert_eq!(decision.matched_rules, vec!["trust-sudo".to_string()]);
    }

    #[test]
    fn test_rule_allow_cannot_override_absolute_builtin() {
        let registry = default_registry();
        let mut cx = cx();
        cx.rules = RuleSet::parse("rule: trust-rm\npattern: rm\naction: allow\n").unwrap();
        let decision = route(&registry, &request("Bash", json!({"command": "rm -rf /"})), &mut cx);
        assert_eq!(decision.outcome, Outcome::BlockAbsolute);
        assert_eq!(decision.matched_rules, vec!["trust-rm".to_string()]);
    }

    #[test]
    fn test_rule_warn_emits_event_and_continues() {
        let registry = default_registry();
        let mut cx = cx();
        cx.rules = RuleSet::parse("rule: watch-docker\npattern: docker\naction: warn\n").unwrap();
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "docker ps"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::Allow);
        assert!(cx.session.events().iter().any(|e| e.name == "rule_warning"));
    }

    // ── Fail-open ───────────────────────────────────────────────────

    struct PanickingHandler;

    impl ToolHandler for PanickingHandler {
        fn tool(&self) -> ToolName {
            ToolName::Bash
        }

        fn handle(&self, _request: &ToolRequest, _cx: &mut GatewayContext) -> Decision {
            panic!("handler bug")
        }
    }

    #[test]
    fn test_handler_panic_fails_open() {
        let mut registry = default_registry();
        registry.register("Bash", Box::new(PanickingHandler));
        let mut cx = cx();
        let decision = route(
            &registry,
            &request("Bash", json!({"command": "git status"})),
            &mut cx,
        );
        assert_eq!(decision.outcome, Outcome::Allow);
        assert_eq!(decision.reason, "handler error, failing open");
        assert!(cx.session.events().iter().any(|e| e.name == "internal_error"));
    }

    #[test]
    fn test_safe_operation_after_violation_earns_recovery() {
        let registry = default_registry();
        let mut cx = cx();
        route(
            &registry,
            &request("Write", json!({"file_path": "/etc/hosts", "content": "x"})),
            &mut cx,
        );
        assert_eq!(cx.session.score(), 60);
        route(&registry, &request("Bash", json!({"command": "git status"})), &mut cx);
        assert_eq!(cx.session.score(), 62, "recovery reward after clean operation");
    }

    #[test]
    fn test_frustration_recorded_on_denials() {
        let registry = default_registry();
        let mut cx = cx();
        route(&registry, &request("Bash", json!({"command": "sudo ls"})), &mut cx);
        route(&registry, &request("Bash", json!({"command": "sudo ls"})), &mut cx);
        assert_eq!(cx.frustration.active_in_context("Bash", Utc::now()), 2);
    }
}

//! The PreToolUse hook entrypoint.
//!
//! Contract with the host: exactly one JSON object on stdout, exit 0 for
//! allow and 1 for deny, and no internal failure ever surfaces as a
//! non-zero exit. stderr is free for logging.

use std::path::Path;

use wow_core::{Decision, HookOutput, ToolRequest};
use wow_handlers::{GatewayContext, default_registry, route};
use wow_rules::RuleSet;
use wow_session::{open_current, snapshot};

/// Outcome of one hook invocation, ready to print.
pub struct HookRun {
    pub output: HookOutput,
    pub exit_code: i32,
}

/// Decide one raw stdin payload against the session stored under
/// `sessions_root`. All error paths collapse into allow decisions whose
/// reason names the error kind.
pub fn run(raw_input: &str, sessions_root: &Path, config: wow_config::GatewayConfig) -> HookRun {
    let rules = RuleSet::load_or_empty(&wow_config::paths::rules_path());
    let session = open_current(sessions_root, config.scoring.initial_score);
    let mut cx = GatewayContext::new(config, session, rules);

    let decision = decide(raw_input, &mut cx);

    cx.scores.tick_idle(&mut cx.session, chrono::Utc::now());
    if let Err(e) = snapshot(&cx.session, sessions_root) {
        tracing::warn!("session snapshot failed: {e}");
    }

    let output = HookOutput::from_decision(&decision);
    let exit_code = output.exit_code();
    HookRun { output, exit_code }
}

fn decide(raw_input: &str, cx: &mut GatewayContext) -> Decision {
    let payload: serde_json::Value = match serde_json::from_str(raw_input) {
        Ok(payload) => payload,
        Err(e) => {
            cx.emit("invalid_request", e.to_string());
            return Decision::allow("invalid request: payload is not JSON, failing open");
        }
    };

    let request = match ToolRequest::from_wire(&payload) {
        Ok(request) => request,
        Err(e) => {
            cx.emit("invalid_request", e.to_string());
            return Decision::allow(format!("invalid request: {e}, failing open"));
        }
    };

    let registry = default_registry();
    route(&registry, &request, cx)
}

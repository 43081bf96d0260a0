//! Task (subagent dispatch) validation.

use wow_core::{Decision, ToolArgs, ToolName, ToolRequest};
use wow_secrets::redact;

use crate::context::GatewayContext;
use crate::handler::ToolHandler;

pub struct TaskHandler;

impl TaskHandler {
    pub fn new() -> TaskHandler {
        TaskHandler
    }
}

impl Default for TaskHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for TaskHandler {
    fn tool(&self) -> ToolName {
        ToolName::Task
    }

    fn handle(&self, request: &ToolRequest, cx: &mut GatewayContext) -> Decision {
        let ToolArgs::Task {
            prompt,
            subagent_type,
        } = &request.args
        else {
            return Decision::allow("not a Task payload");
        };

        if !subagent_type.is_empty()
            && !cx
                .config
                .task
                .subagent_types
                .iter()
                .any(|t| t == subagent_type)
        {
            return Decision::block_bypassable(format!(
                "subagent type '{subagent_type}' is not registered; \
                 register it in settings or bypass"
            ));
        }

        let redaction = redact(prompt);
        if redaction.changed() {
            cx.record_credentials(&redaction);
            return Decision::block_bypassable(
                "CREDENTIAL secret embedded in subagent prompt was redacted; \
                 secrets must not propagate into subagents",
            )
            .with_redacted_payload(redaction.redacted);
        }

        Decision::allow("subagent dispatch passed all checks")
    }
}

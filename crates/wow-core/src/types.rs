//! Request and decision types for the decision pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// The ten tools the gateway knows how to validate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolName {
    Bash,
    Write,
    Edit,
    Read,
    Glob,
    Grep,
    Task,
    WebFetch,
    WebSearch,
    NotebookEdit,
}

impl ToolName {
    /// All known tools, in registration order.
    pub const ALL: [ToolName; 10] = [
        Self::Bash,
        Self::Write,
        Self::Edit,
        Self::Read,
        Self::Glob,
        Self::Grep,
        Self::Task,
        Self::WebFetch,
        Self::WebSearch,
        Self::NotebookEdit,
    ];

    /// Wire-facing name as the host sends it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bash => "Bash",
            Self::Write => "Write",
            Self::Edit => "Edit",
            Self::Read => "Read",
            Self::Glob => "Glob",
            Self::Grep => "Grep",
            Self::Task => "Task",
            Self::WebFetch => "WebFetch",
            Self::WebSearch => "WebSearch",
            Self::NotebookEdit => "NotebookEdit",
        }
    }

    /// Parse a wire tool name. `None` for tools the gateway does not know;
    /// the router turns those into a default-allow "no handler" decision.
    pub fn parse(name: &str) -> Option<ToolName> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tool-specific parameters, parsed from the wire `tool_input` object.
///
/// Fields the gateway never inspects are dropped at parse time; the raw
/// object survives only for unknown tools.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    Bash {
        command: String,
    },
    Write {
        file_path: String,
        content: String,
    },
    Edit {
        file_path: String,
        old_string: String,
        new_string: String,
        replace_all: bool,
    },
    Read {
        file_path: String,
    },
    Glob {
        pattern: String,
        path: Option<String>,
    },
    Grep {
        pattern: String,
        path: Option<String>,
    },
    Task {
        prompt: String,
        subagent_type: String,
    },
    WebFetch {
        url: String,
    },
    WebSearch {
        query: String,
    },
    NotebookEdit {
        notebook_path: String,
        new_source: String,
        cell_type: Option<String>,
    },
    /// A tool the gateway has no handler for; kept verbatim.
    Unknown(Value),
}

fn required_str(input: &Value, key: &str, tool: &str) -> Result<String, GatewayError> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            GatewayError::InvalidRequest(format!("{tool} request missing '{key}'"))
        })
}

fn optional_str(input: &Value, key: &str) -> Option<String> {
    input.get(key).and_then(Value::as_str).map(str::to_string)
}

/// A single tool invocation the host wants vetted.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    /// Raw wire tool name, preserved for unknown tools.
    pub tool_name: String,
    pub args: ToolArgs,
    pub correlation_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl ToolRequest {
    /// Typed constructor from the wire payload `{tool_name, tool_input}`.
    ///
    /// Unknown tool names succeed with [`ToolArgs::Unknown`]; a known tool
    /// with a malformed `tool_input` is an [`GatewayError::InvalidRequest`].
    pub fn from_wire(payload: &Value) -> Result<ToolRequest, GatewayError> {
        let tool_name = payload
            .get("tool_name")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::InvalidRequest("missing tool_name".into()))?
            .to_string();
        let input = payload.get("tool_input").cloned().unwrap_or(Value::Null);

        let args = match ToolName::parse(&tool_name) {
            None => ToolArgs::Unknown(input),
            Some(tool) => {
                if !input.is_object() {
                    return Err(GatewayError::InvalidRequest(format!(
                        "{tool_name} request has no tool_input object"
                    )));
                }
                match tool {
                    ToolName::Bash => ToolArgs::Bash {
                        command: required_str(&input, "command", "Bash")?,
                    },
                    ToolName::Write => ToolArgs::Write {
                        file_path: required_str(&input, "file_path", "Write")?,
                        content: optional_str(&input, "content").unwrap_or_default(),
                    },
                    ToolName::Edit => ToolArgs::Edit {
                        file_path: required_str(&input, "file_path", "Edit")?,
                        old_string: optional_str(&input, "old_string").unwrap_or_default(),
                        new_string: optional_str(&input, "new_string").unwrap_or_default(),
                        replace_all: input
                            .get("replace_all")
                            .and_then(Value::as_bool)
                            .unwrap_or(false),
                    },
                    ToolName::Read => ToolArgs::Read {
                        file_path: required_str(&input, "file_path", "Read")?,
                    },
                    ToolName::Glob => ToolArgs::Glob {
                        pattern: required_str(&input, "pattern", "Glob")?,
                        path: optional_str(&input, "path"),
                    },
                    ToolName::Grep => ToolArgs::Grep {
                        pattern: required_str(&input, "pattern", "Grep")?,
                        path: optional_str(&input, "path"),
                    },
                    ToolName::Task => ToolArgs::Task {
                        prompt: optional_str(&input, "prompt").unwrap_or_default(),
                        subagent_type: optional_str(&input, "subagent_type").unwrap_or_default(),
                    },
                    ToolName::WebFetch => ToolArgs::WebFetch {
                        url: required_str(&input, "url", "WebFetch")?,
                    },
                    ToolName::WebSearch => ToolArgs::WebSearch {
                        query: required_str(&input, "query", "WebSearch")?,
                    },
                    ToolName::NotebookEdit => ToolArgs::NotebookEdit {
                        notebook_path: required_str(&input, "notebook_path", "NotebookEdit")?,
                        new_source: optional_str(&input, "new_source").unwrap_or_default(),
                        cell_type: optional_str(&input, "cell_type"),
                    },
                }
            }
        };

        Ok(ToolRequest {
            tool_name,
            args,
            correlation_id: payload
                .get("tool_use_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            received_at: Utc::now(),
        })
    }

    /// The tool, when it is one the gateway knows.
    pub fn tool(&self) -> Option<ToolName> {
        ToolName::parse(&self.tool_name)
    }

    /// Text the rule DSL and content scanners evaluate for this request.
    ///
    /// Concatenates the request's meaningful free-text fields; paths are
    /// included so path-shaped rules can match any tool uniformly.
    pub fn scannable_text(&self) -> String {
        match &self.args {
            ToolArgs::Bash { command } => command.clone(),
            ToolArgs::Write { file_path, content } => format!("{file_path}\n{content}"),
            ToolArgs::Edit {
                file_path,
                old_string,
                new_string,
                ..
            } => format!("{file_path}\n{old_string}\n{new_string}"),
            ToolArgs::Read { file_path } => file_path.clone(),
            ToolArgs::Glob { pattern, path } | ToolArgs::Grep { pattern, path } => match path {
                Some(p) => format!("{p}\n{pattern}"),
                None => pattern.clone(),
            },
            ToolArgs::Task {
                prompt,
                subagent_type,
            } => format!("{subagent_type}\n{prompt}"),
            ToolArgs::WebFetch { url } => url.clone(),
            ToolArgs::WebSearch { query } => query.clone(),
            ToolArgs::NotebookEdit {
                notebook_path,
                new_source,
                ..
            } => format!("{notebook_path}\n{new_source}"),
            ToolArgs::Unknown(value) => value.to_string(),
        }
    }
}

/// Decision outcome, ordered by severity.
///
/// The derived `Ord` places `Allow` lowest and `BlockAbsolute` highest, so
/// tie-breaking between competing signals is `max()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allow,
    BlockBypassable,
    RequireElevation,
    BlockAbsolute,
}

impl Outcome {
    pub fn is_deny(&self) -> bool {
        !matches!(self, Outcome::Allow)
    }

    /// Wire value for the hook decision document.
    pub fn permission_decision(&self) -> &'static str {
        match self {
            Outcome::Allow => "allow",
            _ => "deny",
        }
    }
}

/// The gateway's verdict for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub outcome: Outcome,
    /// Human-readable explanation; never empty.
    pub reason: String,
    /// Payload with credentials replaced by placeholders, when redaction ran.
    pub redacted_payload: Option<String>,
    /// Names of DSL rules that fired.
    pub matched_rules: Vec<String>,
}

impl Decision {
    pub fn allow(reason: impl Into<String>) -> Decision {
        Decision::new(Outcome::Allow, reason)
    }

    pub fn block_bypassable(reason: impl Into<String>) -> Decision {
        Decision::new(Outcome::BlockBypassable, reason)
    }

    pub fn block_absolute(reason: impl Into<String>) -> Decision {
        Decision::new(Outcome::BlockAbsolute, reason)
    }

    pub fn require_elevation(reason: impl Into<String>) -> Decision {
        Decision::new(Outcome::RequireElevation, reason)
    }

    pub fn new(outcome: Outcome, reason: impl Into<String>) -> Decision {
        let reason = reason.into();
        debug_assert!(!reason.is_empty(), "every decision carries a reason");
        Decision {
            outcome,
            reason,
            redacted_payload: None,
            matched_rules: Vec::new(),
        }
    }

    pub fn with_redacted_payload(mut self, payload: impl Into<String>) -> Decision {
        self.redacted_payload = Some(payload.into());
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Decision {
        self.matched_rules.push(rule.into());
        self
    }

    /// Combine two verdicts: the severest outcome wins and keeps its reason;
    /// rule matches and redactions from both sides are preserved.
    pub fn merge(self, other: Decision) -> Decision {
        let (mut winner, loser) = if other.outcome > self.outcome {
            (other, self)
        } else {
            (self, other)
        };
        winner.matched_rules.extend(loser.matched_rules);
        if winner.redacted_payload.is_none() {
            winner.redacted_payload = loser.redacted_payload;
        }
        winner
    }
}

/// The single JSON document the hook writes to stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookOutput {
    #[serde(rename = "hookSpecificOutput")]
    pub hook_specific_output: HookSpecificOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookSpecificOutput {
    #[serde(rename = "hookEventName")]
    pub hook_event_name: String,
    #[serde(rename = "permissionDecision")]
    pub permission_decision: String,
    #[serde(rename = "permissionDecisionReason")]
    pub permission_decision_reason: String,
}

impl HookOutput {
    pub fn from_decision(decision: &Decision) -> HookOutput {
        HookOutput {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: "PreToolUse".to_string(),
                permission_decision: decision.outcome.permission_decision().to_string(),
                permission_decision_reason: decision.reason.clone(),
            },
        }
    }

    /// Process exit code: 0 = allow, 1 = deny.
    pub fn exit_code(&self) -> i32 {
        if self.hook_specific_output.permission_decision == "allow" {
            0
        } else {
            1
        }
    }
}

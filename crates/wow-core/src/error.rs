use std::path::PathBuf;

/// Gateway-internal error kinds.
///
/// None of these ever cross the hook boundary as a failure: the decision
/// pipeline converts each to an allow decision whose reason names the kind.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No handler registered for tool '{0}'")]
    UnknownTool(String),

    #[error("Handler fault in '{tool}': {detail}")]
    HandlerFault { tool: String, detail: String },

    #[error("Snapshot unreadable at {}", .0.display())]
    SnapshotUnreadable(PathBuf),

    #[error("Decision timeout: exceeded {budget_ms} ms budget")]
    TimeoutExceeded { budget_ms: u64 },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
}

impl GatewayError {
    /// Short machine-friendly name used in event details and reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::UnknownTool(_) => "unknown_tool",
            Self::HandlerFault { .. } => "handler_fault",
            Self::SnapshotUnreadable(_) => "snapshot_unreadable",
            Self::TimeoutExceeded { .. } => "timeout_exceeded",
            Self::ConfigInvalid(_) => "config_invalid",
        }
    }
}

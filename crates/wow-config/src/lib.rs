//! Gateway configuration: the JSON settings document and path resolution.

pub mod config;
pub mod paths;

pub use config::{
    EnforcementConfig, GatewayConfig, LimitsConfig, NotebookConfig, ScoringConfig, TaskConfig,
};
pub use paths::{MessageFormat, data_root, debug_enabled, message_format, sessions_root};

//! The gateway settings document.
//!
//! A single JSON file; unknown keys are ignored so newer hosts can ship
//! extra sections without breaking older gateways. Every threshold the
//! decision pipeline consults lives here rather than in code.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use wow_core::GatewayError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub enforcement: EnforcementConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub notebook: NotebookConfig,
    #[serde(default)]
    pub task: TaskConfig,
}

fn default_version() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnforcementConfig {
    /// When false the gateway still classifies, but non-absolute denies are
    /// reported as advisory guidance (allow with the block reason) instead
    /// of enforced. Absolute blocks are unaffected.
    #[serde(default = "default_true")]
    pub strict_mode: bool,
    /// Whether deny decisions also count as violations against the score.
    #[serde(default = "default_true")]
    pub block_on_violation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringConfig {
    #[serde(default = "default_initial_score")]
    pub initial_score: i64,
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: i64,
    #[serde(default = "default_block_threshold")]
    pub block_threshold: i64,
    #[serde(default = "default_violation_penalty")]
    pub violation_penalty: i64,
    #[serde(default = "default_high_risk_penalty")]
    pub high_risk_penalty: i64,
    #[serde(default = "default_credential_penalty")]
    pub credential_leak_penalty: i64,
    #[serde(default = "default_recovery_reward")]
    pub recovery_reward: i64,
    #[serde(default = "default_good_practice_reward")]
    pub good_practice_reward: i64,
    #[serde(default = "default_idle_decay_reward")]
    pub idle_decay_reward: i64,
    /// Seconds without violations before each idle decay reward.
    #[serde(default = "default_idle_decay_secs")]
    pub idle_decay_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_initial_score() -> i64 {
    70
}
fn default_warn_threshold() -> i64 {
    50
}
fn default_block_threshold() -> i64 {
    30
}
fn default_violation_penalty() -> i64 {
    10
}
fn default_high_risk_penalty() -> i64 {
    5
}
fn default_credential_penalty() -> i64 {
    15
}
fn default_recovery_reward() -> i64 {
    2
}
fn default_good_practice_reward() -> i64 {
    5
}
fn default_idle_decay_reward() -> i64 {
    1
}
fn default_idle_decay_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitsConfig {
    /// Searches per session before a rate warning event (never a block).
    #[serde(default = "default_search_warn")]
    pub web_search_warn_threshold: i64,
    /// Wall-clock budget for one decision, in milliseconds.
    #[serde(default = "default_decision_budget_ms")]
    pub decision_budget_ms: u64,
    /// Most recent snapshots the analytics stack will read.
    #[serde(default = "default_snapshot_cap")]
    pub snapshot_cap: usize,
}

fn default_search_warn() -> i64 {
    50
}
fn default_decision_budget_ms() -> u64 {
    100
}
fn default_snapshot_cap() -> usize {
    200
}

/// Notebook magic command policy. The lists are data: hosts override them
/// in the settings document, nothing in the handlers hard-codes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotebookConfig {
    #[serde(default = "default_dangerous_magics")]
    pub dangerous_magics: Vec<String>,
    #[serde(default = "default_safe_magics")]
    pub safe_magics: Vec<String>,
}

fn default_dangerous_magics() -> Vec<String> {
    [
        "%sh", "%%sh", "%system", "%%bash", "!rm", "!sudo", "!curl", "!wget",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_safe_magics() -> Vec<String> {
    [
        "%matplotlib",
        "%time",
        "%%time",
        "%timeit",
        "%load_ext",
        "%autoreload",
        "%pwd",
        "%who",
        "%env",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskConfig {
    /// Subagent types the Task handler accepts.
    #[serde(default = "default_subagent_types")]
    pub subagent_types: Vec<String>,
}

fn default_subagent_types() -> Vec<String> {
    ["general-purpose", "code-reviewer", "test-runner", "researcher"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            version: default_version(),
            enforcement: EnforcementConfig::default(),
            scoring: ScoringConfig::default(),
            limits: LimitsConfig::default(),
            notebook: NotebookConfig::default(),
            task: TaskConfig::default(),
        }
    }
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        EnforcementConfig {
            strict_mode: true,
            block_on_violation: true,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            initial_score: default_initial_score(),
            warn_threshold: default_warn_threshold(),
            block_threshold: default_block_threshold(),
            violation_penalty: default_violation_penalty(),
            high_risk_penalty: default_high_risk_penalty(),
            credential_leak_penalty: default_credential_penalty(),
            recovery_reward: default_recovery_reward(),
            good_practice_reward: default_good_practice_reward(),
            idle_decay_reward: default_idle_decay_reward(),
            idle_decay_secs: default_idle_decay_secs(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            web_search_warn_threshold: default_search_warn(),
            decision_budget_ms: default_decision_budget_ms(),
            snapshot_cap: default_snapshot_cap(),
        }
    }
}

impl Default for NotebookConfig {
    fn default() -> Self {
        NotebookConfig {
            dangerous_magics: default_dangerous_magics(),
            safe_magics: default_safe_magics(),
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        TaskConfig {
            subagent_types: default_subagent_types(),
        }
    }
}

impl GatewayConfig {
    /// Strict load for offline subcommands: any failure is fatal.
    pub fn load(path: &Path) -> Result<GatewayConfig, GatewayError> {
        let content = fs::read_to_string(path)
            .map_err(|e| GatewayError::ConfigInvalid(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| GatewayError::ConfigInvalid(format!("{}: {e}", path.display())))
    }

    /// Hot-path load: a missing or broken settings file falls back to the
    /// embedded defaults with a warning, never an error.
    pub fn load_or_default(path: &Path) -> GatewayConfig {
        if !path.exists() {
            return GatewayConfig::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("falling back to default settings: {e}");
                GatewayConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_spec_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.scoring.initial_score, 70);
        assert_eq!(config.scoring.warn_threshold, 50);
        assert_eq!(config.scoring.block_threshold, 30);
        assert_eq!(config.scoring.violation_penalty, 10);
        assert_eq!(config.scoring.credential_leak_penalty, 15);
        assert_eq!(config.limits.web_search_warn_threshold, 50);
        assert_eq!(config.limits.decision_budget_ms, 100);
        assert_eq!(config.limits.snapshot_cap, 200);
        assert!(config.enforcement.strict_mode);
    }

    #[test]
    fn test_notebook_magic_lists_sized_as_documented() {
        let config = GatewayConfig::default();
        assert_eq!(config.notebook.dangerous_magics.len(), 8);
        assert_eq!(config.notebook.safe_magics.len(), 9);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{
                "version": "2",
                "enforcement": {"strict_mode": false, "future_flag": true},
                "telemetry": {"endpoint": "nowhere"}
            }"#,
        )
        .expect("unknown keys must not fail the parse");
        assert_eq!(config.version, "2");
        assert!(!config.enforcement.strict_mode);
        assert!(config.enforcement.block_on_violation);
    }

    #[test]
    fn test_partial_scoring_section_fills_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"scoring": {"initial_score": 90}}"#).unwrap();
        assert_eq!(config.scoring.initial_score, 90);
        assert_eq!(config.scoring.block_threshold, 30);
    }

    #[test]
    fn test_load_missing_file_is_config_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = GatewayConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().starts_with("Invalid configuration"));
    }

    #[test]
    fn test_load_or_default_on_broken_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let config = GatewayConfig::load_or_default(&path);
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut config = GatewayConfig::default();
        config.scoring.initial_score = 80;
        config.notebook.dangerous_magics.push("!pip".to_string());
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = GatewayConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}

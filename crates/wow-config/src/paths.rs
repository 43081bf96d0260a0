//! Path and environment resolution.
//!
//! All knobs come from `WOW_*` environment variables with XDG fallbacks via
//! the `directories` crate. Helpers take the environment as parameters where
//! practical so tests never mutate process state.

use std::path::PathBuf;

/// XDG app name for the gateway's data and config directories.
pub const APP_NAME: &str = "wow-system";

/// Settings document file name under the config dir.
pub const SETTINGS_FILE: &str = "settings.json";
/// Rule DSL file name under the config dir.
pub const RULES_FILE: &str = "rules.wow";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

fn data_root_from(override_dir: Option<&str>) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join(format!("{APP_NAME}-data")))
}

/// Data root: `WOW_DATA_DIR` when set, else the XDG data directory.
pub fn data_root() -> PathBuf {
    let override_dir = std::env::var("WOW_DATA_DIR").ok();
    data_root_from(override_dir.as_deref())
}

/// Session snapshot tree under the data root.
pub fn sessions_root() -> PathBuf {
    data_root().join("sessions")
}

fn config_dir_from(home_override: Option<&str>) -> PathBuf {
    if let Some(home) = home_override.filter(|d| !d.is_empty()) {
        return PathBuf::from(home).join("config");
    }
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join(format!("{APP_NAME}-config")))
}

/// Config dir: `<WOW_HOME>/config` when the install prefix is set, else the
/// XDG config directory.
pub fn config_dir() -> PathBuf {
    let home = std::env::var("WOW_HOME").ok();
    config_dir_from(home.as_deref())
}

pub fn settings_path() -> PathBuf {
    config_dir().join(SETTINGS_FILE)
}

pub fn rules_path() -> PathBuf {
    config_dir().join(RULES_FILE)
}

/// `WOW_DEBUG=1` forces debug-level logging.
pub fn debug_enabled() -> bool {
    std::env::var("WOW_DEBUG").is_ok_and(|v| v.trim() == "1")
}

/// Rendering style for operator-facing output (`WOW_MSG_FORMAT`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageFormat {
    #[default]
    Terminal,
    Json,
    Log,
    Plain,
}

impl std::str::FromStr for MessageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terminal" => Ok(MessageFormat::Terminal),
            "json" => Ok(MessageFormat::Json),
            "log" => Ok(MessageFormat::Log),
            "plain" => Ok(MessageFormat::Plain),
            other => Err(format!(
                "Invalid message format '{other}'. Valid values: terminal, json, log, plain"
            )),
        }
    }
}

/// Resolve `WOW_MSG_FORMAT`, defaulting to terminal on absence or garbage.
pub fn message_format() -> MessageFormat {
    std::env::var("WOW_MSG_FORMAT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

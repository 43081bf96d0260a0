//! Operator commands: bypass enable/disable and superadmin unlock.
//!
//! These act on the same logical session the hook invocations use, via the
//! `current` pointer under the sessions root, and persist immediately so
//! the next hook process sees the change.

use anyhow::{Context, Result};
use std::path::Path;

use wow_session::{BypassState, SessionState, open_current, snapshot};

fn persist(session: &SessionState, sessions_root: &Path) -> Result<()> {
    snapshot(session, sessions_root)
        .with_context(|| format!("persisting session {}", session.session_id))?;
    Ok(())
}

pub fn bypass_enable(
    sessions_root: &Path,
    initial_score: i64,
    duration: chrono::Duration,
) -> Result<String> {
    let mut session = open_current(sessions_root, initial_score);
    session.enable_bypass(duration);
    persist(&session, sessions_root)?;
    let until = match session.bypass {
        BypassState::Active { until } => until.to_rfc3339(),
        _ => "the configured deadline".to_string(),
    };
    Ok(format!(
        "Bypass enabled until {until}. Absolute blocks still apply."
    ))
}

pub fn bypass_disable(sessions_root: &Path, initial_score: i64) -> Result<String> {
    let mut session = open_current(sessions_root, initial_score);
    session.disable_bypass();
    persist(&session, sessions_root)?;
    Ok("Bypass disabled.".to_string())
}

pub fn superadmin_unlock(
    sessions_root: &Path,
    initial_score: i64,
    duration: chrono::Duration,
) -> Result<String> {
    let mut session = open_current(sessions_root, initial_score);
    session.unlock_superadmin(duration);
    persist(&session, sessions_root)?;
    let until = match session.bypass {
        BypassState::Superadmin { until } => until.to_rfc3339(),
        _ => "the configured deadline".to_string(),
    };
    Ok(format!("Superadmin elevation active until {until}."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wow_session::{BypassMode, load};

    fn current_session(root: &Path) -> wow_session::SessionState {
        let pointer = std::fs::read_to_string(root.join("current")).unwrap();
        load(root, pointer.trim()).unwrap()
    }

    #[test]
    fn test_bypass_enable_persists_for_next_process() {
        let dir = tempfile::tempdir().unwrap();
        let message = bypass_enable(dir.path(), 70, chrono::Duration::minutes(30)).unwrap();
        assert!(message.contains("Bypass enabled"));

        let session = current_session(dir.path());
        assert_eq!(session.bypass_mode(Utc::now()), BypassMode::Bypass);
    }

    #[test]
    fn test_bypass_disable_clears_state() {
        let dir = tempfile::tempdir().unwrap();
        bypass_enable(dir.path(), 70, chrono::Duration::minutes(30)).unwrap();
        bypass_disable(dir.path(), 70).unwrap();

        let session = current_session(dir.path());
        assert_eq!(session.bypass_mode(Utc::now()), BypassMode::None);
    }

    #[test]
    fn test_superadmin_unlock_persists() {
        let dir = tempfile::tempdir().unwrap();
        superadmin_unlock(dir.path(), 70, chrono::Duration::minutes(15)).unwrap();

        let session = current_session(dir.path());
        assert_eq!(session.bypass_mode(Utc::now()), BypassMode::Superadmin);
    }

    #[test]
    fn test_operator_actions_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        bypass_enable(dir.path(), 70, chrono::Duration::minutes(5)).unwrap();
        let session = current_session(dir.path());
        assert!(session.events().iter().any(|e| e.name == "bypass_enabled"));
    }
}

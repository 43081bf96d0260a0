//! The short-circuit allow test run before full handler dispatch.
//!
//! Deliberately tiny and deterministic: a command whose first token is in a
//! small safe set with no shell metacharacters, or a file operation rooted
//! in `/tmp`. Anything else falls through to the real handlers.

use wow_core::{Decision, ToolArgs, ToolRequest};

/// Commands safe to wave through when used without shell machinery.
const SAFE_COMMANDS: &[&str] = &["echo", "ls", "cat", "pwd", "date"];

/// Characters that turn a trivial command into shell machinery.
const SHELL_META: &[char] = &[
    ';', '|', '&', '<', '>', '`', '$', '(', ')', '{', '}', '\n',
];

fn is_trivial_command(command: &str) -> bool {
    if command.contains(SHELL_META) {
        return false;
    }
    let Some(first) = command.split_whitespace().next() else {
        return false;
    };
    // `/bin/echo` and friends count as their basename.
    let basename = first.rsplit('/').next().unwrap_or(first);
    SAFE_COMMANDS.contains(&basename)
}

fn is_tmp_path(path: &str) -> bool {
    let class = crate::tiers::classify_path(path);
    !class.traversal && class.normalized.starts_with("/tmp/")
}

/// Deterministic allow-list test. `Some(allow)` short-circuits the router.
pub fn fast_path(request: &ToolRequest) -> Option<Decision> {
    match &request.args {
        ToolArgs::Bash { command } if is_trivial_command(command) => Some(Decision::allow(
            "fast path: trivial command with no shell metacharacters",
        )),
        ToolArgs::Write { file_path, .. }
        | ToolArgs::Read { file_path }
        | ToolArgs::Edit { file_path, .. }
            if is_tmp_path(file_path) =>
        {
            Some(Decision::allow("fast path: path rooted in /tmp"))
        }
        _ => None,
    }
}

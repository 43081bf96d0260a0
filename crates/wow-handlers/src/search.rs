//! Glob and Grep validation.
//!
//! Neither tool mutates anything; the gateway polices where a search is
//! rooted and, for Grep, whether the pattern itself is hunting secrets.

use regex::Regex;
use std::sync::OnceLock;

use wow_core::{Decision, ToolArgs, ToolName, ToolRequest};

use crate::context::GatewayContext;
use crate::handler::ToolHandler;
use crate::tiers::{PathTier, classify_path};

/// Where the search is anchored: the explicit `path` argument, or the
/// pattern itself when it is absolute.
fn search_root<'a>(pattern: &'a str, path: &'a Option<String>) -> Option<&'a str> {
    if let Some(p) = path {
        return Some(p.as_str());
    }
    if pattern.starts_with('/') {
        // Stop at the first glob metacharacter; the fixed prefix is what
        // the tier table can judge.
        let end = pattern.find(['*', '?', '[']).unwrap_or(pattern.len());
        return Some(pattern[..end].trim_end_matches('/')).filter(|s| !s.is_empty());
    }
    None
}

fn check_search_root(root: &str, tool: &str) -> Option<Decision> {
    let class = classify_path(root);
    if class.traversal {
        return Some(Decision::block_absolute(format!(
            "CRITICAL: PATH_TRAVERSAL '..' escapes the working tree; {tool} is never allowed there"
        )));
    }
    match class.tier {
        PathTier::System => {
            let matched = class.matched_root.unwrap_or("a system directory");
            Some(Decision::block_absolute(format!(
                "CRITICAL: SYSTEM_FILE {tool} rooted at {matched} is never allowed"
            )))
        }
        PathTier::Sensitive => {
            let matched = class.matched_root.unwrap_or("a sensitive directory");
            Some(Decision::block_bypassable(format!(
                "SENSITIVE_PATH {tool} rooted at {matched} is blocked; an operator can bypass with `wow-guard bypass enable`"
            )))
        }
        PathTier::User => None,
    }
}

/// Grep patterns that are themselves shaped like secret hunts.
fn secret_query_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)ghp_|gho_|npm_[A-Za-z0-9]|sk-ant|sk-[A-Za-z0-9]{8}|AKIA|xox[baprs]|BEGIN.*PRIVATE KEY|api[_-]?key|client_secret|password\s*[=:]",
        )
        .ok()
    })
    .as_ref()
}

pub struct GlobHandler;

impl GlobHandler {
    pub fn new() -> GlobHandler {
        GlobHandler
    }
}

impl Default for GlobHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for GlobHandler {
    fn tool(&self) -> ToolName {
        ToolName::Glob
    }

    fn handle(&self, request: &ToolRequest, _cx: &mut GatewayContext) -> Decision {
        let ToolArgs::Glob { pattern, path } = &request.args else {
            return Decision::allow("not a Glob payload");
        };
        if let Some(root) = search_root(pattern, path)
            && let Some(decision) = check_search_root(root, "globbing")
        {
            return decision;
        }
        Decision::allow("glob pattern passed all checks")
    }
}

pub struct GrepHandler;

impl GrepHandler {
    pub fn new() -> GrepHandler {
        GrepHandler
    }
}

impl Default for GrepHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for GrepHandler {
    fn tool(&self) -> ToolName {
        ToolName::Grep
    }

    fn handle(&self, request: &ToolRequest, cx: &mut GatewayContext) -> Decision {
        let ToolArgs::Grep { pattern, path } = &request.args else {
            return Decision::allow("not a Grep payload");
        };
        if let Some(root) = path.as_deref()
            && let Some(decision) = check_search_root(root, "searching")
        {
            return decision;
        }
        if secret_query_regex().is_some_and(|re| re.is_match(pattern)) {
            cx.emit("secret_query", pattern.clone());
            return Decision::block_bypassable(
                "SECRET_QUERY the search pattern matches known credential shapes; \
                 searching for secrets is blocked (operator bypass available)",
            );
        }
        Decision::allow("search pattern passed all checks")
    }
}

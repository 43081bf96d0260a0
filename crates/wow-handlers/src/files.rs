//! Write, Edit, and NotebookEdit validation.
//!
//! All three run the same two gates: the path tier classifier, then a
//! content scan (credentials first, dangerous constructs second).

use wow_core::{Decision, ToolArgs, ToolName, ToolRequest};
use wow_secrets::redact;

use crate::content::scan_content;
use crate::context::GatewayContext;
use crate::handler::ToolHandler;
use crate::tiers::{PathTier, classify_path};

/// Tier and traversal gate shared by every file-touching handler.
/// `None` means the path is clean enough to continue to the content scan.
fn check_target_path(path: &str, operation: &str) -> Option<Decision> {
    let class = classify_path(path);
    if class.traversal {
        return Some(Decision::block_absolute(format!(
            "CRITICAL: PATH_TRAVERSAL '..' escapes the working tree; {operation} is never allowed"
        )));
    }
    match class.tier {
        PathTier::System => {
            let root = class.matched_root.unwrap_or("a system directory");
            Some(Decision::block_absolute(format!(
                "CRITICAL: SYSTEM_FILE {root} is a protected system directory; {operation} is never allowed"
            )))
        }
        PathTier::Sensitive => {
            let root = class.matched_root.unwrap_or("a sensitive directory");
            Some(Decision::block_bypassable(format!(
                "SENSITIVE_PATH {root} is a sensitive directory; an operator can bypass with `wow-guard bypass enable`"
            )))
        }
        PathTier::User => None,
    }
}

/// Credential and dangerous-pattern scan over content headed for disk.
fn check_content(content: &str, cx: &mut GatewayContext) -> Option<Decision> {
    let redaction = redact(content);
    if redaction.changed() {
        cx.record_credentials(&redaction);
        let kinds: Vec<String> = redaction
            .redacted_matches()
            .map(|m| m.kind.to_string())
            .collect();
        return Some(
            Decision::block_bypassable(format!(
                "CREDENTIAL {} detected in content and redacted; remove the secret or bypass",
                kinds.join(", ")
            ))
            .with_redacted_payload(redaction.redacted),
        );
    }

    let findings = scan_content(content);
    if let Some(finding) = findings.first() {
        return Some(Decision::block_bypassable(format!(
            "DANGEROUS_CONTENT {} in written content ({}…)",
            finding.kind, finding.excerpt
        )));
    }
    None
}

// ── Write ───────────────────────────────────────────────────────────

pub struct WriteHandler;

impl WriteHandler {
    pub fn new() -> WriteHandler {
        WriteHandler
    }
}

impl Default for WriteHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for WriteHandler {
    fn tool(&self) -> ToolName {
        ToolName::Write
    }

    fn handle(&self, request: &ToolRequest, cx: &mut GatewayContext) -> Decision {
        let ToolArgs::Write { file_path, content } = &request.args else {
            return Decision::allow("not a Write payload");
        };
        if let Some(decision) = check_target_path(file_path, "writing") {
            return decision;
        }
        if let Some(decision) = check_content(content, cx) {
            return decision;
        }
        Decision::allow("write target and content passed all checks")
    }
}

// ── Edit ────────────────────────────────────────────────────────────

pub struct EditHandler;

impl EditHandler {
    pub fn new() -> EditHandler {
        EditHandler
    }
}

impl Default for EditHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for EditHandler {
    fn tool(&self) -> ToolName {
        ToolName::Edit
    }

    fn handle(&self, request: &ToolRequest, cx: &mut GatewayContext) -> Decision {
        let ToolArgs::Edit {
            file_path,
            old_string,
            new_string,
            ..
        } = &request.args
        else {
            return Decision::allow("not an Edit payload");
        };

        if let Some(decision) = check_target_path(file_path, "editing") {
            return decision;
        }
        if old_string.is_empty() {
            return Decision::block_bypassable(
                "empty old_string matches nothing deterministically; \
                 provide the exact text to replace or bypass",
            );
        }
        if old_string == new_string {
            return Decision::block_bypassable(
                "old_string equals new_string; the edit is a no-op",
            );
        }
        if let Some(decision) = check_content(new_string, cx) {
            return decision;
        }
        Decision::allow("edit target and replacement passed all checks")
    }
}

// ── NotebookEdit ────────────────────────────────────────────────────

pub struct NotebookEditHandler;

impl NotebookEditHandler {
    pub fn new() -> NotebookEditHandler {
        NotebookEditHandler
    }

    /// First dangerous magic appearing at the start of a source line.
    /// The list is configuration, not code.
    fn dangerous_magic<'a>(source: &str, magics: &'a [String]) -> Option<&'a str> {
        for line in source.lines() {
            let line = line.trim_start();
            for magic in magics {
                if line.starts_with(magic.as_str()) {
                    return Some(magic);
                }
            }
        }
        None
    }
}

impl Default for NotebookEditHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for NotebookEditHandler {
    fn tool(&self) -> ToolName {
        ToolName::NotebookEdit
    }

    fn handle(&self, request: &ToolRequest, cx: &mut GatewayContext) -> Decision {
        let ToolArgs::NotebookEdit {
            notebook_path,
            new_source,
            cell_type,
        } = &request.args
        else {
            return Decision::allow("not a NotebookEdit payload");
        };

        if let Some(decision) = check_target_path(notebook_path, "editing") {
            return decision;
        }

        // Markdown cells cannot execute; magic checks apply to code cells
        // (and unspecified cell types, which default to code).
        let is_code = cell_type.as_deref().map(|t| t != "markdown").unwrap_or(true);
        if is_code {
            let magics = cx.config.notebook.dangerous_magics.clone();
            if let Some(magic) = Self::dangerous_magic(new_source, &magics) {
                return Decision::block_bypassable(format!(
                    "NOTEBOOK_MAGIC dangerous magic command '{magic}' in code cell; \
                     remove it or bypass"
                ));
            }
        }

        if let Some(decision) = check_content(new_source, cx) {
            return decision;
        }
        Decision::allow("notebook edit passed all checks")
    }
}

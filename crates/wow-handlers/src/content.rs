//! Dangerous-content scanning shared by the file-writing handlers.

use regex::Regex;
use std::sync::OnceLock;

/// One suspicious construct found in a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFinding {
    pub kind: &'static str,
    pub excerpt: String,
}

struct ContentPattern {
    kind: &'static str,
    regex: Regex,
}

fn build_patterns() -> Vec<ContentPattern> {
    let specs: &[(&str, &str)] = &[
        // Downloading and executing remote content in one breath.
        (
            "remote_exec",
            r"\b(?:curl|wget)\b[^\n|;]*\|\s*(?:sudo\s+)?(?:ba|z|da)?sh\b",
        ),
        ("remote_eval", r"\beval\s*[\(\s][^\n]*\$\(\s*(?:curl|wget)\b"),
        ("encoded_exec", r"\bbase64\s+(?:-d|--decode)\b[^\n]*\|\s*(?:ba|z|da)?sh\b"),
        // Command-injection shapes inside written content.
        ("command_injection", r#"[;&]\s*rm\s+-[a-zA-Z]*r[a-zA-Z]*f"#),
        ("command_injection", r"\$\(\s*rm\s"),
        // Authentication predicates rewritten to unconditional success.
        (
            "auth_backdoor",
            r"(?i)\b(?:is_admin|is_authenticated|is_authorized|check_password|verify_token|has_permission)\b\s*(?:=|==|:=)\s*(?:true|True|1)\b",
        ),
        (
            "auth_backdoor",
            r"(?i)\bdef\s+(?:check_password|authenticate|authorize)\w*\s*\([^)]*\)\s*:\s*\n?\s*return\s+True\b",
        ),
        (
            "auth_backdoor",
            r"(?i)\bfn\s+(?:is_admin|authenticate|authorize)\w*\s*\([^)]*\)[^{]*\{\s*(?:return\s+)?true\b",
        ),
    ];

    specs
        .iter()
        .filter_map(|(kind, pattern)| {
            Regex::new(pattern)
                .ok()
                .map(|regex| ContentPattern { kind, regex })
        })
        .collect()
}

fn patterns() -> &'static [ContentPattern] {
    static PATTERNS: OnceLock<Vec<ContentPattern>> = OnceLock::new();
    PATTERNS.get_or_init(build_patterns).as_slice()
}

fn excerpt_of(text: &str) -> String {
    const EXCERPT_LEN: usize = 60;
    let mut end = text.len().min(EXCERPT_LEN);
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    text[..end].to_string()
}

/// Scan `content` for dangerous constructs. Findings are deduplicated by
/// kind so a file full of the same trick reports once.
pub fn scan_content(content: &str) -> Vec<ContentFinding> {
    let mut findings: Vec<ContentFinding> = Vec::new();
    for pattern in patterns() {
        if findings.iter().any(|f| f.kind == pattern.kind) {
            continue;
        }
        if let Some(m) = pattern.regex.find(content) {
            findings.push(ContentFinding {
                kind: pattern.kind,
                excerpt: excerpt_of(m.as_str()),
            });
        }
    }
    findings
}

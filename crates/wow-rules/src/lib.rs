//! User-defined regex rules.
//!
//! Line-oriented `key: value` stanzas separated by blank lines; comments
//! begin with `#`. One rule is exactly one `rule` name, one `pattern`, and
//! optionally `action`, `severity`, `message` before the next `rule` or EOF.
//! Rules are evaluated in file order; the first match wins. A DSL `allow`
//! can short-circuit a handler, but the router never lets it override an
//! absolute built-in block.

use regex::Regex;
use std::fs;
use std::path::Path;

use wow_core::GatewayError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuleAction {
    Allow,
    #[default]
    Warn,
    Block,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Allow => "allow",
            RuleAction::Warn => "warn",
            RuleAction::Block => "block",
        }
    }

    fn parse(s: &str) -> Option<RuleAction> {
        match s {
            "allow" => Some(RuleAction::Allow),
            "warn" => Some(RuleAction::Warn),
            "block" => Some(RuleAction::Block),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleSeverity {
    Info,
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl RuleSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSeverity::Info => "info",
            RuleSeverity::Low => "low",
            RuleSeverity::Medium => "medium",
            RuleSeverity::High => "high",
            RuleSeverity::Critical => "critical",
        }
    }

    fn parse(s: &str) -> Option<RuleSeverity> {
        match s {
            "info" => Some(RuleSeverity::Info),
            "low" => Some(RuleSeverity::Low),
            "medium" => Some(RuleSeverity::Medium),
            "high" => Some(RuleSeverity::High),
            "critical" => Some(RuleSeverity::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub pattern: Regex,
    /// The pattern exactly as written, for lossless serialization.
    pub pattern_src: String,
    pub action: RuleAction,
    pub severity: RuleSeverity,
    pub message: String,
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.pattern_src == other.pattern_src
            && self.action == other.action
            && self.severity == other.severity
            && self.message == other.message
    }
}

/// Verdict from the first matching rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleVerdict {
    pub rule_name: String,
    pub action: RuleAction,
    pub severity: RuleSeverity,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

/// Incomplete stanza being assembled during the parse.
#[derive(Default)]
struct PendingRule {
    name: Option<String>,
    pattern: Option<String>,
    action: Option<RuleAction>,
    severity: Option<RuleSeverity>,
    message: Option<String>,
}

impl PendingRule {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.pattern.is_none()
            && self.action.is_none()
            && self.severity.is_none()
            && self.message.is_none()
    }

    fn finish(self, line_no: usize) -> Result<Rule, GatewayError> {
        let name = self.name.ok_or_else(|| {
            GatewayError::ConfigInvalid(format!("rule stanza ending at line {line_no} has no name"))
        })?;
        let pattern_src = self.pattern.ok_or_else(|| {
            GatewayError::ConfigInvalid(format!("rule '{name}' has no pattern"))
        })?;
        let pattern = Regex::new(&pattern_src).map_err(|e| {
            GatewayError::ConfigInvalid(format!("rule '{name}' pattern does not compile: {e}"))
        })?;
        Ok(Rule {
            name,
            pattern,
            pattern_src,
            action: self.action.unwrap_or_default(),
            severity: self.severity.unwrap_or_default(),
            message: self.message.unwrap_or_default(),
        })
    }
}

impl RuleSet {
    pub fn empty() -> RuleSet {
        RuleSet::default()
    }

    /// Parse the stanza format. Order is preserved.
    pub fn parse(text: &str) -> Result<RuleSet, GatewayError> {
        let mut rules = Vec::new();
        let mut pending = PendingRule::default();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.starts_with('#') {
                continue;
            }
            if line.is_empty() {
                if !pending.is_empty() {
                    rules.push(std::mem::take(&mut pending).finish(line_no)?);
                }
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                return Err(GatewayError::ConfigInvalid(format!(
                    "line {line_no}: expected 'key: value', got '{line}'"
                )));
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "rule" => {
                    // A new `rule` key ends the previous stanza even without
                    // a separating blank line.
                    if !pending.is_empty() {
                        rules.push(std::mem::take(&mut pending).finish(line_no)?);
                    }
                    if value.is_empty() {
                        return Err(GatewayError::ConfigInvalid(format!(
                            "line {line_no}: rule name is empty"
                        )));
                    }
                    pending.name = Some(value.to_string());
                }
                "pattern" => pending.pattern = Some(value.to_string()),
                "action" => {
                    pending.action = Some(RuleAction::parse(value).ok_or_else(|| {
                        GatewayError::ConfigInvalid(format!(
                            "line {line_no}: invalid action '{value}' (allow, warn, block)"
                        ))
                    })?);
                }
                "severity" => {
                    pending.severity = Some(RuleSeverity::parse(value).ok_or_else(|| {
                        GatewayError::ConfigInvalid(format!(
                            "line {line_no}: invalid severity '{value}' (info, low, medium, high, critical)"
                        ))
                    })?);
                }
                "message" => pending.message = Some(value.to_string()),
                other => {
                    return Err(GatewayError::ConfigInvalid(format!(
                        "line {line_no}: unknown key '{other}'"
                    )));
                }
            }
        }

        if !pending.is_empty() {
            let line_no = text.lines().count();
            rules.push(pending.finish(line_no)?);
        }

        Ok(RuleSet { rules })
    }

    /// Load from a file; a missing file is an empty rule set.
    pub fn load(path: &Path) -> Result<RuleSet, GatewayError> {
        if !path.exists() {
            return Ok(RuleSet::empty());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| GatewayError::ConfigInvalid(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Hot-path load: parse failures log and yield an empty set.
    pub fn load_or_empty(path: &Path) -> RuleSet {
        match Self::load(path) {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!("ignoring rule file: {e}");
                RuleSet::empty()
            }
        }
    }

    /// Serialize back to the stanza format, preserving order.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("rule: {}\n", rule.name));
            out.push_str(&format!("pattern: {}\n", rule.pattern_src));
            out.push_str(&format!("action: {}\n", rule.action.as_str()));
            out.push_str(&format!("severity: {}\n", rule.severity.as_str()));
            if !rule.message.is_empty() {
                out.push_str(&format!("message: {}\n", rule.message));
            }
        }
        out
    }

    /// First matching rule in registration order.
    pub fn evaluate(&self, text: &str) -> Option<RuleVerdict> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| RuleVerdict {
                rule_name: rule.name.clone(),
                action: rule.action,
                severity: rule.severity,
                message: if rule.message.is_empty() {
                    format!("matched rule '{}'", rule.name)
                } else {
                    rule.message.clone()
                },
            })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Deny anything touching the payments service
rule: no-payments
pattern: payments?/(prod|live)
action: block
severity: high
message: payments paths are off limits

rule: warn-docker
pattern: docker\\s+run
action: warn
severity: low

rule: allow-scratch
pattern: ^/tmp/scratch/
action: allow
severity: info
";

    #[test]
    fn test_parse_counts_and_order() {
        let set = RuleSet::parse(SAMPLE).unwrap();
        assert_eq!(set.len(), 3);
        let names: Vec<&str> = set.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["no-payments", "warn-docker", "allow-scratch"]);
    }

    #[test]
    fn test_parse_defaults() {
        let set = RuleSet::parse("rule: bare\npattern: x\n").unwrap();
        let rule = &set.rules()[0];
        assert_eq!(rule.action, RuleAction::Warn);
        assert_eq!(rule.severity, RuleSeverity::Medium);
        assert_eq!(rule.message, "");
    }

    #[test]
    fn test_first_match_wins() {
        let set = RuleSet::parse(
            "rule: first\npattern: abc\naction: warn\n\nrule: second\npattern: abc\naction: block\n",
        )
        .unwrap();
        let verdict = set.evaluate("xx abc yy").unwrap();
        assert_eq!(verdict.rule_name, "first");
        assert_eq!(verdict.action, RuleAction::Warn);
    }

    #[test]
    fn test_evaluate_no_match() {
        let set = RuleSet::parse(SAMPLE).unwrap();
        assert_eq!(set.evaluate("cargo build"), None);
    }

    #[test]
    fn test_evaluate_block() {
        let set = RuleSet::parse(SAMPLE).unwrap();
        let verdict = set.evaluate("curl payments/prod/charge").unwrap();
        assert_eq!(verdict.action, RuleAction::Block);
        assert_eq!(verdict.severity, RuleSeverity::High);
        assert_eq!(verdict.message, "payments paths are off limits");
    }

    #[test]
    fn test_default_message_names_the_rule() {
        let set = RuleSet::parse("rule: terse\npattern: zz\n").unwrap();
        let verdict = set.evaluate("zz").unwrap();
        assert_eq!(verdict.message, "matched rule 'terse'");
    }

    #[test]
    fn test_new_rule_key_ends_previous_stanza() {
        let set =
            RuleSet::parse("rule: a\npattern: one\nrule: b\npattern: two\n").unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_parse_rejects_bad_regex() {
        let err = RuleSet::parse("rule: broken\npattern: [unclosed\n").unwrap_err();
        assert!(err.to_string().contains("does not compile"));
    }

    #[test]
    fn test_parse_rejects_bad_action() {
        let err = RuleSet::parse("rule: r\npattern: x\naction: maybe\n").unwrap_err();
        assert!(err.to_string().contains("invalid action"));
    }

    #[test]
    fn test_parse_rejects_bad_severity() {
        let err = RuleSet::parse("rule: r\npattern: x\nseverity: extreme\n").unwrap_err();
        assert!(err.to_string().contains("invalid severity"));
    }

    #[test]
    fn test_parse_rejects_pattern_without_rule() {
        let err = RuleSet::parse("pattern: orphan\n").unwrap_err();
        assert!(err.to_string().contains("no name"));
    }

    #[test]
    fn test_parse_rejects_rule_without_pattern() {
        let err = RuleSet::parse("rule: nameless-pattern\naction: warn\n").unwrap_err();
        assert!(err.to_string().contains("no pattern"));
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        let err = RuleSet::parse("rule: r\npattern: x\npriority: 9\n").unwrap_err();
        assert!(err.to_string().contains("unknown key"));
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let set = RuleSet::parse("# leading\n\n# more\nrule: only\npattern: x\n\n# trailing\n")
            .unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_roundtrip_parse_serialize_parse() {
        let original = RuleSet::parse(SAMPLE).unwrap();
        let text = original.to_text();
        let reparsed = RuleSet::parse(&text).unwrap();
        assert_eq!(original, reparsed);
        assert_eq!(text, reparsed.to_text());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = RuleSet::load(&dir.path().join("rules.wow")).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_or_empty_swallows_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.wow");
        std::fs::write(&path, "rule: broken\npattern: [unclosed\n").unwrap();
        assert!(RuleSet::load_or_empty(&path).is_empty());
    }
}

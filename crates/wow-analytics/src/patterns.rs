//! Recurring-violation mining across sessions.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::collector::SessionRecord;

/// Stable prefix length used as the pattern signature.
const SIGNATURE_LEN: usize = 50;

/// Minimum cross-session occurrences before a pattern is reported.
const MIN_OCCURRENCES: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatternConfidence {
    Insufficient,
    Low,
    Medium,
    High,
    Critical,
}

impl PatternConfidence {
    fn from_occurrences(count: u64) -> PatternConfidence {
        match count {
            10.. => PatternConfidence::Critical,
            7.. => PatternConfidence::High,
            5.. => PatternConfidence::Medium,
            3.. => PatternConfidence::Low,
            _ => PatternConfidence::Insufficient,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternConfidence::Insufficient => "insufficient",
            PatternConfidence::Low => "low",
            PatternConfidence::Medium => "medium",
            PatternConfidence::High => "high",
            PatternConfidence::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationPattern {
    pub signature: String,
    pub occurrences: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub confidence: PatternConfidence,
    pub recommendation: String,
}

fn signature_of(detail: &str) -> String {
    let mut end = detail.len().min(SIGNATURE_LEN);
    while end < detail.len() && !detail.is_char_boundary(end) {
        end += 1;
    }
    detail[..end].to_string()
}

/// Canned guidance keyed on the signature's category keyword.
fn recommendation_for(signature: &str) -> String {
    let canned: &[(&str, &str)] = &[
        (
            "SYSTEM_FILE",
            "Work in the project tree instead of system directories; copy files out rather than editing in place.",
        ),
        (
            "WEBFETCH",
            "Fetch through public hostnames only; internal and metadata addresses are never reachable from the assistant.",
        ),
        (
            "CREDENTIAL",
            "Move secrets into environment variables or a secret manager; never inline them in commands or files.",
        ),
        (
            "PATH_TRAVERSAL",
            "Use absolute paths inside the working tree; '..' escapes are always blocked.",
        ),
        (
            "DANGEROUS_BASH",
            "Break destructive commands into reviewable steps and avoid piping downloads into a shell.",
        ),
    ];
    for (keyword, advice) in canned {
        if signature.contains(keyword) {
            return (*advice).to_string();
        }
    }
    "Review this recurring violation and adjust the workflow that triggers it.".to_string()
}

/// Mine violation events across all provided sessions. Patterns come back
/// ordered by occurrence count, most frequent first.
pub fn mine_patterns(records: &[SessionRecord]) -> Vec<ViolationPattern> {
    struct Accum {
        count: u64,
        first_seen: DateTime<Utc>,
        last_seen: DateTime<Utc>,
    }

    let mut by_signature: HashMap<String, Accum> = HashMap::new();
    for record in records {
        for event in &record.document.events {
            if event.name != "violation" {
                continue;
            }
            let signature = signature_of(&event.detail);
            let entry = by_signature.entry(signature).or_insert(Accum {
                count: 0,
                first_seen: event.timestamp,
                last_seen: event.timestamp,
            });
            entry.count += 1;
            entry.first_seen = entry.first_seen.min(event.timestamp);
            entry.last_seen = entry.last_seen.max(event.timestamp);
        }
    }

    let mut patterns: Vec<ViolationPattern> = by_signature
        .into_iter()
        .filter(|(_, accum)| accum.count >= MIN_OCCURRENCES)
        .map(|(signature, accum)| ViolationPattern {
            recommendation: recommendation_for(&signature),
            confidence: PatternConfidence::from_occurrences(accum.count),
            occurrences: accum.count,
            first_seen: accum.first_seen,
            last_seen: accum.last_seen,
            signature,
        })
        .collect();

    patterns.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| a.signature.cmp(&b.signature))
    });
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::SystemTime;
    use wow_session::{MetricsDocument, SessionState};

    fn session_with_violations(details: &[&str]) -> SessionRecord {
        let mut state = SessionState::new(70);
        for detail in details {
            state.track_event("violation", *detail);
        }
        SessionRecord {
            session_id: state.session_id.clone(),
            path: PathBuf::from("/nonexistent"),
            modified: SystemTime::UNIX_EPOCH,
            document: MetricsDocument::from_state(&state),
        }
    }

    const ETC_DETAIL: &str =
        "CRITICAL: SYSTEM_FILE /etc is a protected system directory; writing is never allowed";

    #[test]
    fn test_below_three_occurrences_is_not_a_pattern() {
        let records = vec![
            session_with_violations(&[ETC_DETAIL]),
            session_with_violations(&[ETC_DETAIL]),
        ];
        assert!(mine_patterns(&records).is_empty());
    }

    #[test]
    fn test_three_occurrences_is_low_confidence() {
        let records = vec![
            session_with_violations(&[ETC_DETAIL]),
            session_with_violations(&[ETC_DETAIL]),
            session_with_violations(&[ETC_DETAIL]),
        ];
        let patterns = mine_patterns(&records);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].occurrences, 3);
        assert_eq!(patterns[0].confidence, PatternConfidence::Low);
    }

    #[test]
    fn test_confidence_tiers() {
        for (count, expected) in [
            (3, PatternConfidence::Low),
            (4, PatternConfidence::Low),
            (5, PatternConfidence::Medium),
            (7, PatternConfidence::High),
            (9, PatternConfidence::High),
            (10, PatternConfidence::Critical),
        ] {
            assert_eq!(
                PatternConfidence::from_occurrences(count),
                expected,
                "count {count}"
            );
        }
    }

    #[test]
    fn test_signature_is_fifty_char_prefix() {
        let records = vec![
            session_with_violations(&[ETC_DETAIL]),
            session_with_violations(&[ETC_DETAIL]),
            session_with_violations(&[ETC_DETAIL]),
        ];
        let patterns = mine_patterns(&records);
        assert_eq!(patterns[0].signature.len(), 50);
        assert!(ETC_DETAIL.starts_with(&patterns[0].signature));
    }

    #[test]
    fn test_recommendations_by_keyword() {
        assert!(recommendation_for("CRITICAL: SYSTEM_FILE /etc …").contains("project tree"));
        assert!(recommendation_for("CRITICAL: WEBFETCH_SSRF http://…").contains("metadata"));
        assert!(recommendation_for("CREDENTIAL github_pat detected").contains("secret"));
        assert!(recommendation_for("CRITICAL: PATH_TRAVERSAL '..'").contains("'..'"));
        assert!(recommendation_for("CRITICAL: DANGEROUS_BASH fork bomb").contains("destructive"));
        assert_eq!(
            recommendation_for("something new entirely"),
            "Review this recurring violation and adjust the workflow that triggers it."
        );
    }

    #[test]
    fn test_patterns_ordered_by_frequency() {
        let bash_detail = "CRITICAL: DANGEROUS_BASH fork bomb is never allowed";
        let records = vec![
            session_with_violations(&[ETC_DETAIL, bash_detail]),
            session_with_violations(&[ETC_DETAIL, bash_detail]),
            session_with_violations(&[ETC_DETAIL, bash_detail]),
            session_with_violations(&[ETC_DETAIL]),
        ];
        let patterns = mine_patterns(&records);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].occurrences, 4);
        assert!(patterns[0].signature.contains("SYSTEM_FILE"));
        assert_eq!(patterns[1].occurrences, 3);
    }

    #[test]
    fn test_first_and_last_seen_span_sessions() {
        let records = vec![
            session_with_violations(&[ETC_DETAIL]),
            session_with_violations(&[ETC_DETAIL]),
            session_with_violations(&[ETC_DETAIL]),
        ];
        let pattern = &mine_patterns(&records)[0];
        assert!(pattern.first_seen <= pattern.last_seen);
    }

    #[test]
    fn test_non_violation_events_are_ignored() {
        let mut state = SessionState::new(70);
        for _ in 0..5 {
            state.track_event("tool_allowed", "Bash");
        }
        let record = SessionRecord {
            session_id: state.session_id.clone(),
            path: PathBuf::from("/nonexistent"),
            modified: SystemTime::UNIX_EPOCH,
            document: MetricsDocument::from_state(&state),
        };
        assert!(mine_patterns(&[record]).is_empty());
    }
}

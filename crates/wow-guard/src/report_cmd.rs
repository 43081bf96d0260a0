//! The cross-session report: session banner data, aggregate score
//! statistics, trend, comparison against history, and recurring violation
//! patterns with recommendations.

use anyhow::Result;
use chrono::{Duration, Utc};
use std::path::Path;

use wow_analytics::{
    Collector, Comparison, Trend, ViolationPattern, compare, mine_patterns, summarize, trend,
};
use wow_config::{GatewayConfig, MessageFormat};
use wow_session::{METRIC_WOW_SCORE, ScoreEngine, open_current};

/// Recent-deny window for the friction note, matching the frustration
/// capture default.
const FRICTION_WINDOW_SECS: i64 = 300;

/// Everything the report renders, collected once.
pub struct ReportData {
    pub session_id: String,
    pub score: i64,
    pub band: String,
    pub summary: Option<wow_analytics::MetricSummary>,
    pub trend: Trend,
    pub comparison: Option<Comparison>,
    pub patterns: Vec<ViolationPattern>,
    pub recent_denials: usize,
}

pub fn collect(sessions_root: &Path, config: &GatewayConfig) -> ReportData {
    let session = open_current(sessions_root, config.scoring.initial_score);
    let engine = ScoreEngine::new(config.scoring.clone());
    let score = session.metric(METRIC_WOW_SCORE, config.scoring.initial_score);

    let mut collector = Collector::new(sessions_root, config.limits.snapshot_cap);
    let records = collector.sessions();

    let cutoff = Utc::now() - Duration::seconds(FRICTION_WINDOW_SECS);
    let recent_denials = session
        .events()
        .iter()
        .filter(|e| e.name == "violation" && e.timestamp >= cutoff)
        .count();

    ReportData {
        session_id: session.session_id.clone(),
        score,
        band: engine.band(score).to_string(),
        summary: summarize(records, METRIC_WOW_SCORE),
        trend: trend(records, METRIC_WOW_SCORE),
        comparison: compare(records, METRIC_WOW_SCORE, score),
        patterns: mine_patterns(records),
        recent_denials,
    }
}

pub fn render(data: &ReportData, format: MessageFormat) -> String {
    match format {
        MessageFormat::Json => render_json(data),
        MessageFormat::Log => render_log(data),
        MessageFormat::Plain => render_plain(data),
        MessageFormat::Terminal => render_terminal(data),
    }
}

fn render_json(data: &ReportData) -> String {
    let patterns: Vec<serde_json::Value> = data
        .patterns
        .iter()
        .map(|p| {
            serde_json::json!({
                "signature": p.signature,
                "occurrences": p.occurrences,
                "confidence": p.confidence.as_str(),
                "recommendation": p.recommendation,
            })
        })
        .collect();
    let summary = data.summary.map(|s| {
        serde_json::json!({
            "mean": s.mean, "median": s.median, "min": s.min, "max": s.max,
            "p25": s.p25, "p75": s.p75, "p95": s.p95, "sessions": s.sessions,
        })
    });
    let document = serde_json::json!({
        "session_id": data.session_id,
        "score": data.score,
        "band": data.band,
        "trend": {
            "direction": data.trend.direction.as_str(),
            "slope": data.trend.slope,
            "confidence": data.trend.confidence.as_str(),
            "samples": data.trend.samples,
        },
        "summary": summary,
        "comparison": data.comparison.map(|c| c.render()),
        "patterns": patterns,
        "recent_denials": data.recent_denials,
    });
    serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string())
}

fn render_log(data: &ReportData) -> String {
    let mut lines = vec![format!(
        "score={} band={} trend={} slope={} confidence={} samples={}",
        data.score,
        data.band,
        data.trend.direction.as_str(),
        data.trend.slope,
        data.trend.confidence.as_str(),
        data.trend.samples
    )];
    if let Some(summary) = &data.summary {
        lines.push(format!(
            "mean={} median={} min={} max={} p95={} sessions={}",
            summary.mean, summary.median, summary.min, summary.max, summary.p95, summary.sessions
        ));
    }
    for pattern in &data.patterns {
        lines.push(format!(
            "pattern occurrences={} confidence={} signature={:?}",
            pattern.occurrences,
            pattern.confidence.as_str(),
            pattern.signature
        ));
    }
    lines.join("\n")
}

fn render_plain(data: &ReportData) -> String {
    let mut lines = vec![
        format!("Session {}", data.session_id),
        format!("Score {} ({})", data.score, data.band),
        format!(
            "Trend {} ({} over {} sessions, {} confidence)",
            data.trend.direction.as_str(),
            data.trend.slope,
            data.trend.samples,
            data.trend.confidence.as_str()
        ),
    ];
    if let Some(comparison) = &data.comparison {
        lines.push(comparison.render());
    }
    for pattern in &data.patterns {
        lines.push(format!(
            "Recurring ({}x, {}): {}",
            pattern.occurrences,
            pattern.confidence.as_str(),
            pattern.signature
        ));
        lines.push(format!("  -> {}", pattern.recommendation));
    }
    if data.recent_denials >= 3 {
        lines.push(format!(
            "Note: {} denials in the last five minutes. Consider `wow-guard report` guidance above.",
            data.recent_denials
        ));
    }
    lines.join("\n")
}

fn render_terminal(data: &ReportData) -> String {
    let mut lines = vec![
        format!("── wow-guard session {} ──", data.session_id),
        format!(
            "score {:>3} [{}]  trend {} {}",
            data.score,
            data.band,
            data.trend.direction.arrow(),
            data.trend.direction.as_str()
        ),
    ];
    if let Some(summary) = &data.summary {
        lines.push(format!(
            "history: mean {} · median {} · p95 {} · {} sessions",
            summary.mean, summary.median, summary.p95, summary.sessions
        ));
    }
    if let Some(comparison) = &data.comparison {
        lines.push(comparison.render());
    }
    if data.patterns.is_empty() {
        lines.push("no recurring violations".to_string());
    }
    for pattern in &data.patterns {
        lines.push(format!(
            "⚠ {}x [{}] {}",
            pattern.occurrences,
            pattern.confidence.as_str(),
            pattern.signature
        ));
        lines.push(format!("  ↳ {}", pattern.recommendation));
    }
    if data.recent_denials >= 3 {
        lines.push(format!(
            "⚠ {} denials in the last five minutes",
            data.recent_denials
        ));
    }
    lines.join("\n")
}

pub fn run(sessions_root: &Path, config: &GatewayConfig, format: MessageFormat) -> Result<String> {
    let data = collect(sessions_root, config);
    Ok(render(&data, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wow_session::{SessionState, snapshot};

    fn seed_history(root: &Path, scores: &[i64]) {
        for &score in scores {
            let state = SessionState::new(score);
            snapshot(&state, root).unwrap();
        }
    }

    #[test]
    fn test_collect_on_empty_root_creates_session() {
        let dir = tempfile::tempdir().unwrap();
        let data = collect(dir.path(), &GatewayConfig::default());
        assert_eq!(data.score, 70);
        assert_eq!(data.band, "good");
        // The freshly created current session is itself a snapshot.
        assert!(data.summary.is_some());
    }

    #[test]
    fn test_collect_with_history() {
        let dir = tempfile::tempdir().unwrap();
        seed_history(dir.path(), &[50, 60, 80, 90]);
        let data = collect(dir.path(), &GatewayConfig::default());
        let summary = data.summary.unwrap();
        assert_eq!(summary.sessions, 5, "history plus the current session");
        assert!(data.comparison.is_some());
    }

    #[test]
    fn test_render_json_is_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        seed_history(dir.path(), &[60, 70, 80]);
        let data = collect(dir.path(), &GatewayConfig::default());
        let rendered = render(&data, MessageFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert!(parsed["score"].is_i64() || parsed["score"].is_u64());
        assert!(parsed["trend"]["direction"].is_string());
    }

    #[test]
    fn test_render_plain_mentions_score_and_band() {
        let dir = tempfile::tempdir().unwrap();
        let data = collect(dir.path(), &GatewayConfig::default());
        let rendered = render(&data, MessageFormat::Plain);
        assert!(rendered.contains("Score 70 (good)"), "{rendered}");
    }

    #[test]
    fn test_render_log_is_key_value() {
        let dir = tempfile::tempdir().unwrap();
        let data = collect(dir.path(), &GatewayConfig::default());
        let rendered = render(&data, MessageFormat::Log);
        assert!(rendered.starts_with("score=70 band=good"), "{rendered}");
    }

    #[test]
    fn test_terminal_report_shows_patterns() {
        let dir = tempfile::tempdir().unwrap();
        for _ in 0..3 {
            let mut state = SessionState::new(70);
            state.track_event(
                "violation",
                "CRITICAL: SYSTEM_FILE /etc is a protected system directory; writing is never allowed",
            );
            snapshot(&state, dir.path()).unwrap();
        }
        let data = collect(dir.path(), &GatewayConfig::default());
        assert_eq!(data.patterns.len(), 1);
        let rendered = render(&data, MessageFormat::Terminal);
        assert!(rendered.contains("SYSTEM_FILE"), "{rendered}");
        assert!(rendered.contains("project tree"), "{rendered}");
    }
}

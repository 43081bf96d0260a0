//! Current-session comparison against history.

use crate::aggregate::{MetricSummary, metric_value, summarize};
use crate::collector::SessionRecord;

/// Deltas of a current value against historical statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    pub current: i64,
    pub delta_mean: i64,
    pub delta_median: i64,
    pub delta_max: i64,
    /// Percent of historical sessions at or below the current value.
    pub percentile_rank: u32,
    pub summary: MetricSummary,
}

/// Format a delta with its explicit sign: `+5`, `-3`, `±0`.
pub fn format_signed(delta: i64) -> String {
    match delta.signum() {
        1 => format!("+{delta}"),
        -1 => delta.to_string(),
        _ => "±0".to_string(),
    }
}

/// Compare `current` against the history of `metric`. `None` when there is
/// no history to compare against.
pub fn compare(records: &[SessionRecord], metric: &str, current: i64) -> Option<Comparison> {
    let summary = summarize(records, metric)?;
    let values: Vec<i64> = records
        .iter()
        .filter_map(|record| metric_value(record, metric))
        .collect();
    let at_or_below = values.iter().filter(|&&v| v <= current).count();
    let percentile_rank = ((at_or_below * 100) / values.len()) as u32;

    Some(Comparison {
        current,
        delta_mean: current - summary.mean,
        delta_median: current - summary.median,
        delta_max: current - summary.max,
        percentile_rank,
        summary,
    })
}

impl Comparison {
    /// One-line rendering used by banners and the report.
    pub fn render(&self) -> String {
        format!(
            "current {} (mean {}, median {}, max {}, p{} of history)",
            self.current,
            format_signed(self.delta_mean),
            format_signed(self.delta_median),
            format_signed(self.delta_max),
            self.percentile_rank
        )
    }
}

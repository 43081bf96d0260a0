//! Aggregate statistics per metric.

use std::collections::HashMap;

use crate::collector::{Collector, SessionRecord};

/// Summary statistics for one metric across sessions. Percentiles use
/// nearest-rank over the ascending values; the mean truncates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSummary {
    pub mean: i64,
    pub median: i64,
    pub min: i64,
    pub max: i64,
    pub p25: i64,
    pub p75: i64,
    pub p95: i64,
    pub sessions: usize,
}

/// Metric value for one snapshot: the metric map first, with the mandatory
/// top-level `wow_score` as fallback for that name.
pub fn metric_value(record: &SessionRecord, metric: &str) -> Option<i64> {
    record
        .document
        .metrics
        .get(metric)
        .copied()
        .or_else(|| (metric == "wow_score").then_some(record.document.wow_score))
}

/// Nearest-rank percentile: the `floor(n·p/100)+1`-th of the ascending
/// values, clamped to the last.
fn nearest_rank(sorted: &[i64], percentile: u32) -> i64 {
    let n = sorted.len();
    let index = ((n as u64 * percentile as u64) / 100) as usize;
    sorted[index.min(n - 1)]
}

/// Summarize `metric` over the given snapshots. `None` when no snapshot
/// carries the metric.
pub fn summarize(records: &[SessionRecord], metric: &str) -> Option<MetricSummary> {
    let mut values: Vec<i64> = records
        .iter()
        .filter_map(|record| metric_value(record, metric))
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();

    let n = values.len();
    let sum: i64 = values.iter().sum();
    Some(MetricSummary {
        mean: sum / n as i64,
        median: nearest_rank(&values, 50),
        min: values[0],
        max: values[n - 1],
        p25: nearest_rank(&values, 25),
        p75: nearest_rank(&values, 75),
        p95: nearest_rank(&values, 95),
        sessions: n,
    })
}

/// Cache keyed by metric name; invalidated together with the collector.
#[derive(Debug, Default)]
pub struct Aggregator {
    cache: HashMap<String, Option<MetricSummary>>,
}

impl Aggregator {
    pub fn new() -> Aggregator {
        Aggregator::default()
    }

    pub fn summarize(&mut self, collector: &mut Collector, metric: &str) -> Option<MetricSummary> {
        if let Some(cached) = self.cache.get(metric) {
            return *cached;
        }
        let summary = summarize(collector.sessions(), metric);
        self.cache.insert(metric.to_string(), summary);
        summary
    }

    /// Must accompany `Collector::invalidate`.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }
}

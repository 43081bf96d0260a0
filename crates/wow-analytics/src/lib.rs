//! Cross-session analytics over the snapshot tree: collection, aggregate
//! statistics, trend direction, comparison against history, and recurring
//! violation mining. Runs out-of-band from the decision pipeline; errors
//! here surface to the reporting caller only and never affect decisions.

pub mod aggregate;
pub mod collector;
pub mod compare;
pub mod patterns;
pub mod trends;

pub use aggregate::{Aggregator, MetricSummary, summarize};
pub use collector::{Collector, SessionRecord};
pub use compare::{Comparison, compare, format_signed};
pub use patterns::{PatternConfidence, ViolationPattern, mine_patterns};
pub use trends::{Trend, TrendConfidence, TrendDirection, trend};

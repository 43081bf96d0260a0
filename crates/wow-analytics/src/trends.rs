//! Trend direction over the most recent snapshots.

use crate::aggregate::metric_value;
use crate::collector::SessionRecord;

/// Snapshots considered for a trend.
pub const TREND_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
            TrendDirection::InsufficientData => "insufficient_data",
        }
    }

    /// Arrow glyph for terminal banners.
    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "↑",
            TrendDirection::Declining => "↓",
            TrendDirection::Stable => "→",
            TrendDirection::InsufficientData => "·",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendConfidence {
    Low,
    Medium,
    High,
}

impl TrendConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendConfidence::Low => "low",
            TrendConfidence::Medium => "medium",
            TrendConfidence::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trend {
    pub direction: TrendDirection,
    /// Last value minus first, over the chronological window.
    pub slope: i64,
    pub confidence: TrendConfidence,
    pub samples: usize,
}

/// Compute the trend for `metric` over the newest [`TREND_WINDOW`]
/// snapshots. `records` arrive newest-first (collector order); the slope is
/// chronological.
pub fn trend(records: &[SessionRecord], metric: &str) -> Trend {
    let mut values: Vec<i64> = records
        .iter()
        .take(TREND_WINDOW)
        .filter_map(|record| metric_value(record, metric))
        .collect();
    values.reverse(); // oldest first

    let samples = values.len();
    if samples < 3 {
        return Trend {
            direction: TrendDirection::InsufficientData,
            slope: 0,
            confidence: TrendConfidence::Low,
            samples,
        };
    }

    let slope = values[samples - 1] - values[0];
    let direction = if slope > 3 {
        TrendDirection::Improving
    } else if slope < -3 {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };
    let confidence = if samples >= 7 {
        TrendConfidence::High
    } else {
        TrendConfidence::Medium
    };

    Trend {
        direction,
        slope,
        confidence,
        samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::SystemTime;
    use wow_session::{MetricsDocument, SessionState};

    /// Newest-first records carrying the given chronological scores.
    fn chronological(scores: &[i64]) -> Vec<SessionRecord> {
        scores
            .iter()
            .rev()
            .map(|&score| {
                let state = SessionState::new(score);
                SessionRecord {
                    session_id: state.session_id.clone(),
                    path: PathBuf::from("/nonexistent"),
                    modified: SystemTime::UNIX_EPOCH,
                    document: MetricsDocument::from_state(&state),
                }
            })
            .collect()
    }

    #[test]
    fn test_spec_reference_series_improves_with_high_confidence() {
        let records = chronological(&[50, 55, 60, 65, 70, 75, 80, 85, 90, 95]);
        let trend = trend(&records, "wow_score");
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert_eq!(trend.confidence, TrendConfidence::High);
        assert_eq!(trend.slope, 45);
        assert_eq!(trend.samples, 10);
    }

    #[test]
    fn test_declining_series() {
        let trend = trend(&chronological(&[80, 75, 70, 60]), "wow_score");
        assert_eq!(trend.direction, TrendDirection::Declining);
        assert_eq!(trend.slope, -20);
    }

    #[test]
    fn test_stable_within_threshold() {
        for series in [&[70, 72, 73][..], &[70, 69, 68][..], &[70, 70, 70][..]] {
            let trend = trend(&chronological(series), "wow_score");
            assert_eq!(trend.direction, TrendDirection::Stable, "{series:?}");
        }
    }

    #[test]
    fn test_boundary_slopes() {
        // +3 is stable, +4 improves; -3 is stable, -4 declines.
        assert_eq!(
            trend(&chronological(&[70, 71, 73]), "wow_score").direction,
            TrendDirection::Stable
        );
        assert_eq!(
            trend(&chronological(&[70, 71, 74]), "wow_score").direction,
            TrendDirection::Improving
        );
        assert_eq!(
            trend(&chronological(&[70, 69, 67]), "wow_score").direction,
            TrendDirection::Stable
        );
        assert_eq!(
            trend(&chronological(&[70, 69, 66]), "wow_score").direction,
            TrendDirection::Declining
        );
    }

    #[test]
    fn test_fewer_than_three_is_insufficient() {
        assert_eq!(
            trend(&chronological(&[70, 90]), "wow_score").direction,
            TrendDirection::InsufficientData
        );
        assert_eq!(
            trend(&chronological(&[]), "wow_score").direction,
            TrendDirection::InsufficientData
        );
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(
            trend(&chronological(&[1, 2, 30]), "wow_score").confidence,
            TrendConfidence::Medium
        );
        assert_eq!(
            trend(&chronological(&[1, 2, 3, 4, 5, 6, 30]), "wow_score").confidence,
            TrendConfidence::High
        );
    }

    #[test]
    fn test_window_is_capped_at_ten() {
        // Twelve chronological values; only the newest ten count, so the
        // first two (5, 10) fall outside the window.
        let records = chronological(&[5, 10, 50, 55, 60, 65, 70, 75, 80, 85, 90, 95]);
        let trend = trend(&records, "wow_score");
        assert_eq!(trend.samples, 10);
        assert_eq!(trend.slope, 45, "oldest in-window value is 50");
    }
}

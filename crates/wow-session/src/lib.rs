//! Session state, reputation scoring, and the on-disk snapshot store.

pub mod frustration;
pub mod score;
pub mod state;
pub mod store;

pub use frustration::{FrustrationEvent, FrustrationWindow};
pub use score::{Penalty, Reward, ScoreBand, ScoreEngine};
pub use state::{
    BypassMode, BypassState, METRIC_BYPASSES_USED, METRIC_CREDENTIALS_DETECTED,
    METRIC_DECISION_TIMEOUTS, METRIC_SCORE_DECAYS, METRIC_TOOL_COUNT, METRIC_VIOLATIONS,
    METRIC_WEB_SEARCHES, METRIC_WOW_SCORE, SessionEvent, SessionState,
};
pub use store::{METRICS_FILE, MetricsDocument, load, load_document, open_current, session_dir, snapshot};

//! Run state machine.

use crate::core::StageKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a run is in the linear chain.
///
/// `Start → GateChecked → Copied → Cleaned → AnalyticsTriggered →
/// WatermarkUpdated`. Any failure moves to `Failed`; an authoritative
/// gate may move to `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Nothing has run yet.
    #[default]
    Start,
    /// The change detector reported its decision.
    GateChecked,
    /// Raw files were copied to the landing area.
    Copied,
    /// The processed tables were written.
    Cleaned,
    /// The external analytics job succeeded.
    AnalyticsTriggered,
    /// The watermark was advanced. Terminal success.
    WatermarkUpdated,
    /// The gate ended the run with nothing to do. Terminal.
    Skipped,
    /// A stage failed. Terminal.
    Failed,
}

impl RunState {
    /// Returns the state reached when a stage of `kind` succeeds from
    /// this state, or `None` if that stage is out of order.
    #[must_use]
    pub fn advance(self, kind: StageKind) -> Option<Self> {
        match (self, kind) {
            (Self::Start, StageKind::Gate) => Some(Self::GateChecked),
            (Self::GateChecked, StageKind::Ingest) => Some(Self::Copied),
            (Self::Copied, StageKind::Transform) => Some(Self::Cleaned),
            (Self::Cleaned, StageKind::Analytics) => Some(Self::AnalyticsTriggered),
            (Self::AnalyticsTriggered, StageKind::Commit) => Some(Self::WatermarkUpdated),
            _ => None,
        }
    }

    /// Returns true for `WatermarkUpdated`, `Skipped` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::WatermarkUpdated | Self::Skipped | Self::Failed)
    }

    /// Returns true for the terminal states that are not failures.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::WatermarkUpdated | Self::Skipped)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::GateChecked => "gate_checked",
            Self::Copied => "copied",
            Self::Cleaned => "cleaned",
            Self::AnalyticsTriggered => "analytics_triggered",
            Self::WatermarkUpdated => "watermark_updated",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_chain() {
        let mut state = RunState::Start;
        for kind in [
            StageKind::Gate,
            StageKind::Ingest,
            StageKind::Transform,
            StageKind::Analytics,
            StageKind::Commit,
        ] {
            assert!(!state.is_terminal());
            state = state.advance(kind).unwrap();
        }
        assert_eq!(state, RunState::WatermarkUpdated);
        assert!(state.is_terminal());
        assert!(state.is_success());
    }

    #[test]
    fn test_out_of_order_rejected() {
        assert_eq!(RunState::Start.advance(StageKind::Commit), None);
        assert_eq!(RunState::Copied.advance(StageKind::Analytics), None);
        assert_eq!(RunState::Failed.advance(StageKind::Gate), None);
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&RunState::AnalyticsTriggered).unwrap();
        assert_eq!(json, format!("\"{}\"", RunState::AnalyticsTriggered));
        assert!(!RunState::Failed.is_success());
    }
}

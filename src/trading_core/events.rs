//! Decision events emitted by the strategy engine

use serde::{Deserialize, Serialize};

use super::bars::AggregatedBar;
use super::position::ExitReason;
use super::reversal::Direction;

/// One observable state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EngineEvent {
    /// Raw bars folded into a new aggregated bar
    AggregateCompleted { bar: AggregatedBar },
    /// Direction flip raised a reversal candidate
    CandidateSet {
        direction: Direction,
        bar: AggregatedBar,
    },
    /// Breakout confirmed and entry order acknowledged
    EntryFilled {
        direction: Direction,
        quantity: u32,
        entry_price: f64,
        initial_stop: f64,
        candidate: AggregatedBar,
        order_id: Option<String>,
    },
    /// Entry order failed; candidates stay armed
    EntryRejected { direction: Direction, reason: String },
    /// First inside bar confirmed the previous bar as outside bar
    InsideSeriesStarted {
        confirmed_outside_bar: AggregatedBar,
        previous_stop: f64,
        new_stop: f64,
    },
    /// Inside bar within an existing series
    InsideBarContinued { stop: f64 },
    /// Bar broke out of the reference range and became the new reference
    NewOutsideBar { bar: AggregatedBar, stop: f64 },
    /// Stop moved in the favorable direction
    StopRatcheted { previous_stop: f64, new_stop: f64 },
    /// Position flattened
    ExitFilled {
        direction: Direction,
        reason: ExitReason,
        exit_price: f64,
        pnl_points: f64,
        order_id: Option<String>,
    },
    /// Exit order failed; position stays open
    ExitRejected { direction: Direction, reason: String },
}

impl EngineEvent {
    pub fn is_entry(&self) -> bool {
        matches!(self, Self::EntryFilled { .. })
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Self::ExitFilled { .. })
    }

    /// Short label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AggregateCompleted { .. } => "AGGREGATE",
            Self::CandidateSet { .. } => "CANDIDATE",
            Self::EntryFilled { .. } => "ENTRY",
            Self::EntryRejected { .. } => "ENTRY_REJECTED",
            Self::InsideSeriesStarted { .. } => "INSIDE_SERIES",
            Self::InsideBarContinued { .. } => "INSIDE",
            Self::NewOutsideBar { .. } => "OUTSIDE",
            Self::StopRatcheted { .. } => "STOP",
            Self::ExitFilled { .. } => "EXIT",
            Self::ExitRejected { .. } => "EXIT_REJECTED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_tag() {
        let event = EngineEvent::StopRatcheted {
            previous_stop: 8.0,
            new_stop: 9.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"StopRatcheted","previous_stop":8.0,"new_stop":9.0}"#);
        assert_eq!(event.kind(), "STOP");
    }
}

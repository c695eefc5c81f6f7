//! Reversal bar detection
//!
//! A reversal candidate is raised when an aggregated bar's body flips
//! direction against the previous aggregated bar:
//! - previous bullish, current bearish -> short candidate
//! - previous bearish, current bullish -> long candidate
//!
//! The candidate is confirmed by a later bar breaking its extreme (low for
//! shorts, high for longs). Candidates never expire on their own; they are
//! only cleared when an entry fires.

use serde::{Deserialize, Serialize};

use super::bars::{AggregatedBar, BarDirection};

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    /// Body direction the previous bar must have for a flip into this side
    fn prior_body(&self) -> BarDirection {
        match self {
            Self::Long => BarDirection::Bearish,
            Self::Short => BarDirection::Bullish,
        }
    }

    /// Body direction the current bar must have for a flip into this side
    fn flip_body(&self) -> BarDirection {
        match self {
            Self::Long => BarDirection::Bullish,
            Self::Short => BarDirection::Bearish,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Aggregated bar awaiting breakout confirmation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReversalCandidate {
    pub direction: Direction,
    pub bar: AggregatedBar,
}

impl ReversalCandidate {
    /// Price the next bars have to break through to confirm the reversal
    pub fn trigger_price(&self) -> f64 {
        match self.direction {
            Direction::Long => self.bar.high,
            Direction::Short => self.bar.low,
        }
    }

    /// Initial protective stop once the candidate is confirmed
    pub fn initial_stop(&self) -> f64 {
        match self.direction {
            Direction::Long => self.bar.low,
            Direction::Short => self.bar.high,
        }
    }

    /// Strict breakout beyond the trigger price plus `distance`
    pub fn is_confirmed_by(&self, current: &AggregatedBar, distance: f64) -> bool {
        match self.direction {
            Direction::Long => current.high > self.bar.high + distance,
            Direction::Short => current.low < self.bar.low - distance,
        }
    }
}

/// Confirmed breakout of a reversal candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    pub candidate: ReversalCandidate,
    pub trigger_bar: AggregatedBar,
}

impl EntrySignal {
    pub fn direction(&self) -> Direction {
        self.candidate.direction
    }
}

/// At most one outstanding candidate per side
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReversalCandidates {
    long: Option<ReversalCandidate>,
    short: Option<ReversalCandidate>,
}

impl ReversalCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, direction: Direction) -> Option<&ReversalCandidate> {
        match direction {
            Direction::Long => self.long.as_ref(),
            Direction::Short => self.short.as_ref(),
        }
    }

    pub fn long(&self) -> Option<&ReversalCandidate> {
        self.long.as_ref()
    }

    pub fn short(&self) -> Option<&ReversalCandidate> {
        self.short.as_ref()
    }

    fn slot(&mut self, direction: Direction) -> &mut Option<ReversalCandidate> {
        match direction {
            Direction::Long => &mut self.long,
            Direction::Short => &mut self.short,
        }
    }

    /// Raise a candidate for `direction` if the bodies of `previous` and
    /// `current` flip into that side and no candidate for it is outstanding.
    ///
    /// Returns the new candidate. The other side is left untouched.
    pub fn arm(
        &mut self,
        direction: Direction,
        previous: Option<&AggregatedBar>,
        current: &AggregatedBar,
    ) -> Option<ReversalCandidate> {
        if self.get(direction).is_some() {
            return None;
        }
        let previous = previous?;

        if previous.direction() == direction.prior_body() && current.direction() == direction.flip_body() {
            let candidate = ReversalCandidate {
                direction,
                bar: *current,
            };
            *self.slot(direction) = Some(candidate);
            Some(candidate)
        } else {
            None
        }
    }

    /// Check whether `current` confirms the outstanding candidate for `direction`
    pub fn confirm(
        &self,
        direction: Direction,
        current: &AggregatedBar,
        distance: f64,
    ) -> Option<EntrySignal> {
        let candidate = self.get(direction)?;
        if candidate.is_confirmed_by(current, distance) {
            Some(EntrySignal {
                candidate: *candidate,
                trigger_bar: *current,
            })
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.long = None;
        self.short = None;
    }

    pub fn is_empty(&self) -> bool {
        self.long.is_none() && self.short.is_none()
    }
}

//! Open position and trailing stop management
//!
//! While a position is open each aggregated bar is classified against the
//! pending outside bar:
//! - inside: open and close strictly within its range. The first inside bar
//!   of a series confirms the previous bar as outside bar and may reset the
//!   stop to that bar's extreme.
//! - outside: the bar becomes the new pending outside bar and the stop is
//!   ratcheted in the favorable direction only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bars::AggregatedBar;
use super::config::StopResetRule;
use super::reversal::{Direction, EntrySignal};

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Bar traded through the trailing stop
    TrailingStop,
    /// Bar closed beyond the confirmed outside bar
    OutsideBarClose,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrailingStop => write!(f, "TRAILING_STOP"),
            Self::OutsideBarClose => write!(f, "OUTSIDE_BAR_CLOSE"),
        }
    }
}

/// Result of classifying one bar against an open position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopUpdate {
    /// First inside bar of a series
    InsideSeriesStarted {
        confirmed_outside_bar: AggregatedBar,
        previous_stop: f64,
        new_stop: f64,
    },
    /// Further inside bar, stop unchanged
    InsideBarContinued { stop: f64 },
    /// Outside bar, now the reference; `previous_stop != new_stop` when ratcheted
    OutsideBar {
        bar: AggregatedBar,
        previous_stop: f64,
        new_stop: f64,
    },
}

/// The single open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub quantity: u32,
    pub entry_price: f64,
    pub trailing_stop: f64,
    /// Reference bar for inside/outside classification
    pub pending_outside_bar: AggregatedBar,
    /// Bar confirmed as outside bar by the first inside bar of a series
    pub confirmed_outside_bar: Option<AggregatedBar>,
    pub inside_series: bool,
    pub entry_bar: AggregatedBar,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Open a position from a confirmed entry signal.
    ///
    /// Entry price is the trigger bar's open; the initial stop is the
    /// opposite extreme of the reversal candidate.
    pub fn open(signal: &EntrySignal, quantity: u32) -> Self {
        let bar = signal.trigger_bar;
        Self {
            direction: signal.direction(),
            quantity,
            entry_price: bar.open,
            trailing_stop: signal.candidate.initial_stop(),
            pending_outside_bar: bar,
            confirmed_outside_bar: None,
            inside_series: false,
            entry_bar: bar,
            opened_at: bar.timestamp,
        }
    }

    /// Exit test, evaluated before any stop adjustment
    pub fn exit_signal(&self, current: &AggregatedBar, close_beyond_outside_bar: bool) -> Option<ExitReason> {
        let stop_breached = match self.direction {
            Direction::Long => current.low < self.trailing_stop,
            Direction::Short => current.high > self.trailing_stop,
        };
        if stop_breached {
            return Some(ExitReason::TrailingStop);
        }

        if close_beyond_outside_bar {
            if let Some(outside) = &self.confirmed_outside_bar {
                let closed_beyond = match self.direction {
                    Direction::Long => current.close < outside.low,
                    Direction::Short => current.close > outside.high,
                };
                if closed_beyond {
                    return Some(ExitReason::OutsideBarClose);
                }
            }
        }

        None
    }

    /// Estimated exit fill for a given exit reason
    pub fn exit_price(&self, reason: ExitReason, current: &AggregatedBar) -> f64 {
        match reason {
            ExitReason::TrailingStop => self.trailing_stop,
            ExitReason::OutsideBarClose => current.close,
        }
    }

    /// P&L in points (price difference times quantity)
    pub fn pnl_points(&self, exit_price: f64) -> f64 {
        let per_share = match self.direction {
            Direction::Long => exit_price - self.entry_price,
            Direction::Short => self.entry_price - exit_price,
        };
        per_share * self.quantity as f64
    }

    /// Inside/outside classification and stop maintenance for one bar.
    ///
    /// `previous` is the aggregated bar preceding `current`.
    pub fn update_stop(
        &mut self,
        current: &AggregatedBar,
        previous: &AggregatedBar,
        reset_rule: StopResetRule,
    ) -> StopUpdate {
        let previous_stop = self.trailing_stop;

        if current.is_inside(&self.pending_outside_bar) {
            if self.confirmed_outside_bar.is_some() {
                return StopUpdate::InsideBarContinued {
                    stop: self.trailing_stop,
                };
            }

            self.confirmed_outside_bar = Some(*previous);
            if reset_rule == StopResetRule::PriorBar {
                self.trailing_stop = match self.direction {
                    Direction::Long => previous.low,
                    Direction::Short => previous.high,
                };
            }
            self.inside_series = true;

            return StopUpdate::InsideSeriesStarted {
                confirmed_outside_bar: *previous,
                previous_stop,
                new_stop: self.trailing_stop,
            };
        }

        self.pending_outside_bar = *current;
        self.confirmed_outside_bar = None;
        self.inside_series = false;

        match self.direction {
            Direction::Long if current.low > self.trailing_stop => self.trailing_stop = current.low,
            Direction::Short if current.high < self.trailing_stop => self.trailing_stop = current.high,
            _ => {}
        }

        StopUpdate::OutsideBar {
            bar: *current,
            previous_stop,
            new_stop: self.trailing_stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading_core::reversal::ReversalCandidate;
    use chrono::Utc;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> AggregatedBar {
        AggregatedBar::new(Utc::now(), open, high, low, close)
    }

    fn long_position(stop: f64, reference: AggregatedBar) -> Position {
        let signal = EntrySignal {
            candidate: ReversalCandidate {
                direction: Direction::Long,
                bar: bar(9.0, 12.0, stop, 11.0),
            },
            trigger_bar: reference,
        };
        Position::open(&signal, 10)
    }

    #[test]
    fn test_open_long() {
        let trigger = bar(11.5, 13.0, 11.0, 12.5);
        let pos = long_position(8.0, trigger);

        assert_eq!(pos.entry_price, 11.5);
        assert_eq!(pos.trailing_stop, 8.0);
        assert_eq!(pos.pending_outside_bar, trigger);
        assert!(pos.confirmed_outside_bar.is_none());
        assert!(!pos.inside_series);
    }

    #[test]
    fn test_ratchet_never_lowers_long_stop() {
        let mut pos = long_position(8.0, bar(11.5, 13.0, 11.0, 12.5));
        let previous = pos.entry_bar;

        // Outside bar with a higher low raises the stop
        let up = bar(12.5, 14.0, 9.0, 13.9);
        let update = pos.update_stop(&up, &previous, StopResetRule::PriorBar);
        assert_eq!(
            update,
            StopUpdate::OutsideBar {
                bar: up,
                previous_stop: 8.0,
                new_stop: 9.0
            }
        );

        // Outside bar with a lower low leaves it
        let down = bar(13.9, 14.5, 7.0, 14.2);
        pos.update_stop(&down, &up, StopResetRule::PriorBar);
        assert_eq!(pos.trailing_stop, 9.0);
        assert_eq!(pos.pending_outside_bar, down);
    }

    #[test]
    fn test_short_ratchet() {
        let signal = EntrySignal {
            candidate: ReversalCandidate {
                direction: Direction::Short,
                bar: bar(11.5, 11.8, 10.0, 10.2),
            },
            trigger_bar: bar(10.2, 10.5, 9.5, 9.6),
        };
        let mut pos = Position::open(&signal, 5);
        assert_eq!(pos.trailing_stop, 11.8);

        let previous = pos.entry_bar;
        let lower = bar(9.6, 10.9, 9.0, 9.1);
        pos.update_stop(&lower, &previous, StopResetRule::PriorBar);
        assert_eq!(pos.trailing_stop, 10.9);

        let higher = bar(9.1, 11.5, 8.5, 8.7);
        pos.update_stop(&higher, &lower, StopResetRule::PriorBar);
        assert_eq!(pos.trailing_stop, 10.9);
    }

    #[test]
    fn test_inside_bar_resets_to_prior_bar() {
        let reference = bar(10.0, 15.0, 9.0, 14.5);
        let mut pos = long_position(8.0, reference);
        pos.trailing_stop = 12.0;

        let previous = bar(13.0, 15.0, 11.0, 14.0);
        let inside = bar(10.0, 14.8, 9.5, 14.0);
        let update = pos.update_stop(&inside, &previous, StopResetRule::PriorBar);

        assert_eq!(
            update,
            StopUpdate::InsideSeriesStarted {
                confirmed_outside_bar: previous,
                previous_stop: 12.0,
                new_stop: 11.0
            }
        );
        assert_eq!(pos.confirmed_outside_bar, Some(previous));
        assert!(pos.inside_series);

        // Second inside bar leaves everything alone
        let inside_again = bar(11.0, 14.0, 10.0, 12.0);
        let update = pos.update_stop(&inside_again, &inside, StopResetRule::PriorBar);
        assert_eq!(update, StopUpdate::InsideBarContinued { stop: 11.0 });
        assert_eq!(pos.confirmed_outside_bar, Some(previous));
    }

    #[test]
    fn test_inside_bar_keep_rule() {
        let reference = bar(10.0, 15.0, 9.0, 14.5);
        let mut pos = long_position(8.0, reference);
        pos.trailing_stop = 12.0;

        let previous = bar(13.0, 15.0, 11.0, 14.0);
        pos.update_stop(&bar(10.0, 14.8, 9.5, 14.0), &previous, StopResetRule::Keep);

        assert_eq!(pos.trailing_stop, 12.0);
        assert!(pos.inside_series);
    }

    #[test]
    fn test_exit_checks() {
        let mut pos = long_position(9.0, bar(10.0, 15.0, 9.5, 14.5));

        assert_eq!(pos.exit_signal(&bar(10.0, 11.0, 8.0, 10.5), false), Some(ExitReason::TrailingStop));
        // Touching the stop is not a breach
        assert_eq!(pos.exit_signal(&bar(10.0, 11.0, 9.0, 10.5), false), None);

        pos.confirmed_outside_bar = Some(bar(12.0, 14.0, 11.0, 13.0));
        let weak_close = bar(11.5, 12.0, 9.5, 10.0);
        assert_eq!(pos.exit_signal(&weak_close, false), None);
        assert_eq!(pos.exit_signal(&weak_close, true), Some(ExitReason::OutsideBarClose));
    }

    #[test]
    fn test_short_exit_and_inside_reset() {
        let signal = EntrySignal {
            candidate: ReversalCandidate {
                direction: Direction::Short,
                bar: bar(11.5, 11.8, 10.0, 10.2),
            },
            trigger_bar: bar(10.2, 10.5, 9.5, 9.6),
        };
        let mut pos = Position::open(&signal, 10);
        pos.trailing_stop = 10.0;

        // Touching the stop is not a breach
        assert_eq!(pos.exit_signal(&bar(9.6, 10.0, 9.4, 9.7), false), None);
        assert_eq!(pos.exit_signal(&bar(9.6, 10.1, 9.4, 9.7), false), Some(ExitReason::TrailingStop));

        // Inside the 9.5..10.5 entry bar: stop resets to the previous bar's high
        let previous = bar(9.9, 10.4, 9.0, 9.2);
        let update = pos.update_stop(&bar(9.7, 9.9, 9.6, 9.8), &previous, StopResetRule::PriorBar);
        assert_eq!(
            update,
            StopUpdate::InsideSeriesStarted {
                confirmed_outside_bar: previous,
                previous_stop: 10.0,
                new_stop: 10.4
            }
        );

        pos.confirmed_outside_bar = Some(bar(10.0, 10.3, 9.6, 9.7));
        let strong_close = bar(9.8, 10.35, 9.7, 10.32);
        assert_eq!(pos.exit_signal(&strong_close, true), Some(ExitReason::OutsideBarClose));
    }

    #[test]
    fn test_pnl_points() {
        let pos = long_position(9.0, bar(10.0, 15.0, 9.5, 14.5));
        assert_eq!(pos.pnl_points(12.0), 20.0); // (12 - 10) * 10
        assert_eq!(pos.pnl_points(9.0), -10.0);
    }
}

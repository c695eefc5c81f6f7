//! In-memory trade history and session P&L

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::position::{ExitReason, Position};
use super::reversal::Direction;

/// Completed round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub direction: Direction,
    pub quantity: u32,
    pub entry_price: f64,
    pub exit_price: f64,
    /// P&L in points (price difference times quantity)
    pub pnl_points: f64,
    pub exit_reason: ExitReason,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
}

/// Session P&L summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub trade_count: u32,
    pub wins: u32,
    pub losses: u32,
    pub gross_pnl: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Max drawdown in points from the session's P&L peak
    pub max_drawdown: f64,
    peak_pnl: f64,
}

impl SessionSummary {
    pub fn win_rate(&self) -> f64 {
        if self.trade_count == 0 {
            0.0
        } else {
            self.wins as f64 / self.trade_count as f64
        }
    }
}

/// Trade history, bounded to the most recent `max_history` records
#[derive(Debug)]
pub struct TradeLedger {
    trades: VecDeque<TradeRecord>,
    summary: SessionSummary,
    max_history: usize,
}

impl Default for TradeLedger {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl TradeLedger {
    pub fn new(max_history: usize) -> Self {
        Self {
            trades: VecDeque::new(),
            summary: SessionSummary::default(),
            max_history,
        }
    }

    /// Record a closed position
    pub fn record_exit(
        &mut self,
        position: &Position,
        exit_price: f64,
        exit_reason: ExitReason,
        exit_time: DateTime<Utc>,
    ) -> TradeRecord {
        let pnl_points = position.pnl_points(exit_price);

        let s = &mut self.summary;
        s.trade_count += 1;
        s.gross_pnl += pnl_points;
        if pnl_points > 0.0 {
            s.wins += 1;
            s.largest_win = s.largest_win.max(pnl_points);
        } else {
            s.losses += 1;
            s.largest_loss = s.largest_loss.min(pnl_points);
        }
        s.peak_pnl = s.peak_pnl.max(s.gross_pnl);
        s.max_drawdown = s.max_drawdown.max(s.peak_pnl - s.gross_pnl);

        let record = TradeRecord {
            direction: position.direction,
            quantity: position.quantity,
            entry_price: position.entry_price,
            exit_price,
            pnl_points,
            exit_reason,
            entry_time: position.opened_at,
            exit_time,
        };

        self.trades.push_back(record.clone());
        if self.trades.len() > self.max_history {
            self.trades.pop_front();
        }

        record
    }

    pub fn trades(&self) -> &VecDeque<TradeRecord> {
        &self.trades
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    pub fn stats_summary(&self) -> String {
        format!(
            "Trades: {} | W/L: {}/{} | WR: {:.1}% | P&L: {:+.2} pts | Max DD: {:.2} pts",
            self.summary.trade_count,
            self.summary.wins,
            self.summary.losses,
            self.summary.win_rate() * 100.0,
            self.summary.gross_pnl,
            self.summary.max_drawdown
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading_core::bars::AggregatedBar;

    fn position(direction: Direction, entry: f64, quantity: u32) -> Position {
        let bar = AggregatedBar::new(Utc::now(), entry, entry + 1.0, entry - 1.0, entry);
        Position {
            direction,
            quantity,
            entry_price: entry,
            trailing_stop: entry - 1.0,
            pending_outside_bar: bar,
            confirmed_outside_bar: None,
            inside_series: false,
            entry_bar: bar,
            opened_at: bar.timestamp,
        }
    }

    #[test]
    fn test_pnl_tracking() {
        let mut ledger = TradeLedger::default();

        let win = ledger.record_exit(&position(Direction::Long, 100.0, 10), 102.0, ExitReason::TrailingStop, Utc::now());
        assert_eq!(win.pnl_points, 20.0);

        let loss = ledger.record_exit(&position(Direction::Short, 100.0, 10), 103.0, ExitReason::TrailingStop, Utc::now());
        assert_eq!(loss.pnl_points, -30.0);

        let summary = ledger.summary();
        assert_eq!(summary.trade_count, 2);
        assert_eq!(summary.wins, 1);
        assert_eq!(summary.losses, 1);
        assert_eq!(summary.gross_pnl, -10.0);
        assert_eq!(summary.largest_win, 20.0);
        assert_eq!(summary.largest_loss, -30.0);
        assert_eq!(summary.max_drawdown, 30.0);
        assert_eq!(summary.win_rate(), 0.5);
    }

    #[test]
    fn test_history_bounded() {
        let mut ledger = TradeLedger::new(2);
        for i in 0..3 {
            ledger.record_exit(&position(Direction::Long, 100.0 + i as f64, 1), 101.0, ExitReason::TrailingStop, Utc::now());
        }
        assert_eq!(ledger.trades().len(), 2);
        assert_eq!(ledger.trades()[0].entry_price, 101.0);
        assert_eq!(ledger.summary().trade_count, 3);
    }
}

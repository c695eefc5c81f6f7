//! Folds fine bars into coarse bars

use std::collections::VecDeque;

use super::bars::{AggregatedBar, RawBar};

/// Aggregates a fixed count of raw bars into one OHLC bar.
///
/// The buffer is FIFO: once it holds `count` bars the oldest `count` are
/// drained into an aggregate and any surplus stays for the next one.
#[derive(Debug)]
pub struct BarAggregator {
    count: usize,
    buffer: VecDeque<RawBar>,
}

impl BarAggregator {
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "aggregation count must be at least 1");
        Self {
            count,
            buffer: VecDeque::with_capacity(count),
        }
    }

    /// Raw bars waiting for the next aggregate
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Append a raw bar and emit an aggregate when enough bars are buffered
    pub fn feed(&mut self, raw: RawBar) -> Option<AggregatedBar> {
        self.buffer.push_back(raw);

        if self.buffer.len() < self.count {
            return None;
        }

        let mut constituents = self.buffer.drain(..self.count);
        let first = constituents.next()?;
        let mut agg = first;
        for bar in constituents {
            agg.high = agg.high.max(bar.high);
            agg.low = agg.low.min(bar.low);
            agg.close = bar.close;
            agg.timestamp = bar.timestamp;
        }

        Some(agg)
    }

    /// Drop any partially collected bars
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn raw(minute: i64, open: f64, high: f64, low: f64, close: f64) -> RawBar {
        let base = Utc.with_ymd_and_hms(2025, 3, 3, 14, 30, 0).unwrap();
        RawBar::new(base + Duration::minutes(minute), open, high, low, close)
    }

    #[test]
    fn test_aggregate_ohlc() {
        let mut agg = BarAggregator::new(3);

        assert!(agg.feed(raw(0, 100.0, 101.0, 99.5, 100.5)).is_none());
        assert!(agg.feed(raw(1, 100.5, 103.0, 100.0, 102.0)).is_none());
        let bar = agg.feed(raw(2, 102.0, 102.5, 98.0, 99.0)).unwrap();

        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.high, 103.0);
        assert_eq!(bar.low, 98.0);
        assert_eq!(bar.close, 99.0);
        assert_eq!(bar.timestamp, raw(2, 0.0, 0.0, 0.0, 0.0).timestamp);
        assert_eq!(agg.pending(), 0);
    }

    #[test]
    fn test_count_of_one_passes_through() {
        let mut agg = BarAggregator::new(1);
        let input = raw(0, 10.0, 12.0, 9.0, 11.0);
        assert_eq!(agg.feed(input), Some(input));
    }

    #[test]
    fn test_consecutive_aggregates() {
        let mut agg = BarAggregator::new(2);
        let mut out = Vec::new();
        for i in 0..6 {
            let p = 100.0 + i as f64;
            if let Some(bar) = agg.feed(raw(i, p, p + 1.0, p - 1.0, p + 0.5)) {
                out.push(bar);
            }
        }

        assert_eq!(out.len(), 3);
        assert_eq!(out[1].open, 102.0);
        assert_eq!(out[1].close, 103.5);
        assert_eq!(out[1].high, 104.0);
        assert_eq!(out[1].low, 101.0);
    }

    #[test]
    fn test_out_of_order_timestamps_accepted() {
        let mut agg = BarAggregator::new(2);
        agg.feed(raw(5, 10.0, 11.0, 9.0, 10.5));
        let bar = agg.feed(raw(1, 10.5, 12.0, 10.0, 11.0)).unwrap();

        // Timestamp is simply the last constituent's
        assert_eq!(bar.timestamp, raw(1, 0.0, 0.0, 0.0, 0.0).timestamp);
    }
}

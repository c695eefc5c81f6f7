//! Bar types for trading core
//!
//! A single OHLC shape serves both the fine bars coming off the feed and the
//! coarse bars produced by the aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLC price summary over a fixed interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Fine-grained bar as delivered by the market data feed
pub type RawBar = Bar;

/// Coarse bar folded from `aggregation_count` raw bars
pub type AggregatedBar = Bar;

/// Body direction of a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    pub fn direction(&self) -> BarDirection {
        if self.close > self.open {
            BarDirection::Bullish
        } else if self.close < self.open {
            BarDirection::Bearish
        } else {
            BarDirection::Neutral
        }
    }

    /// True when both open and close lie strictly inside the reference range.
    /// Touching the reference high or low counts as outside.
    pub fn is_inside(&self, reference: &Bar) -> bool {
        let within = |price: f64| reference.low < price && price < reference.high;
        within(self.open) && within(self.close)
    }
}

impl std::fmt::Display for Bar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] O={:.2} H={:.2} L={:.2} C={:.2}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.open,
            self.high,
            self.low,
            self.close
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(Utc::now(), open, high, low, close)
    }

    #[test]
    fn test_direction() {
        assert_eq!(bar(10.0, 12.0, 9.0, 11.0).direction(), BarDirection::Bullish);
        assert_eq!(bar(10.0, 12.0, 8.0, 9.0).direction(), BarDirection::Bearish);
        assert_eq!(bar(10.0, 12.0, 8.0, 10.0).direction(), BarDirection::Neutral);
    }

    #[test]
    fn test_inside_bar_strict_bounds() {
        let reference = bar(10.0, 15.0, 9.0, 14.0);

        assert!(bar(10.0, 16.0, 8.0, 14.0).is_inside(&reference));

        // Open touches the reference low
        assert!(!bar(9.0, 14.0, 9.0, 12.0).is_inside(&reference));
        // Close touches the reference high
        assert!(!bar(10.0, 15.0, 10.0, 15.0).is_inside(&reference));
        // Close beyond the range
        assert!(!bar(10.0, 17.0, 10.0, 16.0).is_inside(&reference));
    }
}

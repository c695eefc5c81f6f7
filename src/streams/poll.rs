//! REST polling bar feed
//!
//! Alpaca publishes each minute bar shortly after the minute closes. The
//! poller asks for the latest bar every `poll_interval` and yields it once per
//! timestamp. Bars that were published while the poller slept are skipped,
//! not backfilled.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::feed::BarFeed;
use crate::alpaca::AlpacaClient;
use crate::trading_core::RawBar;

/// Consecutive failed polls before the feed gives up
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Yields a bar only when its timestamp is newer than the last one yielded
#[derive(Debug, Default)]
pub struct TimestampDedup {
    last: Option<DateTime<Utc>>,
}

impl TimestampDedup {
    pub fn accept(&mut self, bar: &RawBar) -> bool {
        match self.last {
            Some(last) if bar.timestamp <= last => false,
            _ => {
                self.last = Some(bar.timestamp);
                true
            }
        }
    }
}

/// Polls the latest minute bar for one symbol
pub struct AlpacaBarPoller {
    client: AlpacaClient,
    symbol: String,
    ticker: Interval,
    dedup: TimestampDedup,
    consecutive_errors: u32,
}

impl AlpacaBarPoller {
    pub fn new(client: AlpacaClient, symbol: impl Into<String>, poll_interval: Duration) -> Self {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            client,
            symbol: symbol.into(),
            ticker,
            dedup: TimestampDedup::default(),
            consecutive_errors: 0,
        }
    }
}

#[async_trait]
impl BarFeed for AlpacaBarPoller {
    async fn next_bar(&mut self) -> Result<Option<RawBar>> {
        loop {
            self.ticker.tick().await;

            match self.client.get_latest_bar(&self.symbol).await {
                Ok(bar) => {
                    self.consecutive_errors = 0;
                    let bar = RawBar::from(bar);
                    if self.dedup.accept(&bar) {
                        return Ok(Some(bar));
                    }
                    debug!("{} no new bar since {}", self.symbol, bar.timestamp);
                }
                Err(e) => {
                    self.consecutive_errors += 1;
                    if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        bail!(
                            "{} bar polling failed {} times in a row: {:#}",
                            self.symbol,
                            self.consecutive_errors,
                            e
                        );
                    }
                    warn!(
                        "{} bar poll failed ({}/{}): {:#}",
                        self.symbol, self.consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                    );
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!("Alpaca {} {} bars", self.client.data_feed(), self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar_at(minute: u32) -> RawBar {
        let ts = Utc.with_ymd_and_hms(2025, 3, 3, 14, minute, 0).unwrap();
        RawBar::new(ts, 1.0, 1.0, 1.0, 1.0)
    }

    #[test]
    fn test_dedup_by_timestamp() {
        let mut dedup = TimestampDedup::default();

        assert!(dedup.accept(&bar_at(31)));
        assert!(!dedup.accept(&bar_at(31)));
        assert!(dedup.accept(&bar_at(32)));
        // A stale bar after a newer one is dropped
        assert!(!dedup.accept(&bar_at(30)));
        assert!(dedup.accept(&bar_at(35)));
    }
}

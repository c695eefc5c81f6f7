//! Random-walk bar feed for demo runs without market data access

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::time::Duration;

use super::feed::BarFeed;
use crate::trading_core::RawBar;

/// Random walk configuration
#[derive(Debug, Clone)]
pub struct RandomWalkConfig {
    pub start_price: f64,
    /// Standard deviation of the close-to-close move
    pub volatility: f64,
    pub bar_interval: ChronoDuration,
    pub seed: u64,
    /// Stop after this many bars
    pub limit: Option<usize>,
    /// Real time between bars
    pub pace: Option<Duration>,
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            volatility: 0.15,
            bar_interval: ChronoDuration::minutes(1),
            seed: 7,
            limit: None,
            pace: None,
        }
    }
}

/// Deterministic random-walk bars for a given seed
pub struct RandomWalkFeed {
    rng: StdRng,
    step: Normal<f64>,
    wick: Normal<f64>,
    price: f64,
    timestamp: DateTime<Utc>,
    bar_interval: ChronoDuration,
    remaining: Option<usize>,
    pace: Option<Duration>,
}

impl RandomWalkFeed {
    pub fn new(config: RandomWalkConfig, start: DateTime<Utc>) -> Result<Self> {
        if !config.volatility.is_finite() || config.volatility <= 0.0 {
            bail!("Volatility must be a positive number, got {}", config.volatility);
        }

        let step = Normal::new(0.0, config.volatility)
            .map_err(|e| anyhow!("Invalid volatility {}: {}", config.volatility, e))?;
        let wick = Normal::new(0.0, config.volatility * 0.5)
            .map_err(|e| anyhow!("Invalid volatility {}: {}", config.volatility, e))?;

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            step,
            wick,
            price: config.start_price,
            timestamp: start,
            bar_interval: config.bar_interval,
            remaining: config.limit,
            pace: config.pace,
        })
    }

    fn generate(&mut self) -> RawBar {
        let open = self.price;
        let close = (open + self.step.sample(&mut self.rng)).max(0.01);
        let high = open.max(close) + self.wick.sample(&mut self.rng).abs();
        let low = (open.min(close) - self.wick.sample(&mut self.rng).abs()).max(0.01);

        self.timestamp += self.bar_interval;
        self.price = close;

        let round = |p: f64| (p * 100.0).round() / 100.0;
        RawBar::new(self.timestamp, round(open), round(high), round(low), round(close))
    }
}

#[async_trait]
impl BarFeed for RandomWalkFeed {
    async fn next_bar(&mut self) -> Result<Option<RawBar>> {
        match self.remaining {
            Some(0) => return Ok(None),
            Some(ref mut n) => *n -= 1,
            None => {}
        }

        if let Some(pace) = self.pace {
            tokio::time::sleep(pace).await;
        }

        Ok(Some(self.generate()))
    }

    fn describe(&self) -> String {
        "random walk demo".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 14, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_same_seed_same_bars() {
        let config = RandomWalkConfig {
            limit: Some(50),
            ..Default::default()
        };
        let mut a = RandomWalkFeed::new(config.clone(), start()).unwrap();
        let mut b = RandomWalkFeed::new(config, start()).unwrap();

        let mut count = 0;
        while let Some(bar) = a.next_bar().await.unwrap() {
            assert_eq!(Some(bar), b.next_bar().await.unwrap());
            assert!(bar.low <= bar.open.min(bar.close));
            assert!(bar.high >= bar.open.max(bar.close));
            count += 1;
        }
        assert_eq!(count, 50);
    }

    #[test]
    fn test_negative_volatility_rejected() {
        let config = RandomWalkConfig {
            volatility: -1.0,
            ..Default::default()
        };
        let err = RandomWalkFeed::new(config, start()).err().unwrap();
        assert!(err.to_string().contains("positive"));

        for volatility in [0.0, f64::NAN] {
            let config = RandomWalkConfig {
                volatility,
                ..Default::default()
            };
            assert!(RandomWalkFeed::new(config, start()).is_err());
        }
    }
}

//! CSV replay feed
//!
//! Reads recorded bars with the header `timestamp,open,high,low,close`
//! (RFC 3339 timestamps). Extra columns such as volume are ignored. Rows are
//! yielded in file order.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::feed::BarFeed;
use crate::trading_core::RawBar;

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Recorded bars replayed in order
pub struct CsvBarFeed {
    label: String,
    bars: VecDeque<RawBar>,
    pace: Option<Duration>,
}

impl CsvBarFeed {
    /// Load every bar from a CSV file
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
        let feed = Self::from_reader(BufReader::new(file), path.display().to_string())
            .with_context(|| format!("Failed to load bars from {:?}", path))?;

        info!("Loaded {} bars from {:?}", feed.remaining(), path);
        Ok(feed)
    }

    pub fn from_reader<R: Read>(reader: R, label: impl Into<String>) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut bars = VecDeque::new();

        for (line, result) in csv_reader.deserialize().enumerate() {
            let row: CsvRow = result.with_context(|| format!("Failed to parse CSV row {}", line + 1))?;
            bars.push_back(RawBar::new(row.timestamp, row.open, row.high, row.low, row.close));
        }

        Ok(Self {
            label: label.into(),
            bars,
            pace: None,
        })
    }

    /// Sleep between bars to mimic a live feed
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace).filter(|p| !p.is_zero());
        self
    }

    pub fn remaining(&self) -> usize {
        self.bars.len()
    }
}

#[async_trait]
impl BarFeed for CsvBarFeed {
    async fn next_bar(&mut self) -> Result<Option<RawBar>> {
        if let Some(pace) = self.pace {
            if !self.bars.is_empty() {
                tokio::time::sleep(pace).await;
            }
        }
        Ok(self.bars.pop_front())
    }

    fn describe(&self) -> String {
        format!("CSV replay {}", self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDED: &str = "\
timestamp,open,high,low,close,volume
2025-03-03T14:30:00Z,580.10,580.50,579.90,580.20,12034
2025-03-03T14:31:00Z,580.20,580.25,579.40,579.55,9822
2025-03-03T14:32:00Z,579.55,580.80,579.50,580.75,15010
";

    #[tokio::test]
    async fn test_parses_recorded_bars() {
        let mut feed = CsvBarFeed::from_reader(RECORDED.as_bytes(), "test").unwrap();
        assert_eq!(feed.remaining(), 3);

        let first = feed.next_bar().await.unwrap().unwrap();
        assert_eq!(first.open, 580.10);
        assert_eq!(first.low, 579.90);
        assert_eq!(first.timestamp.to_rfc3339(), "2025-03-03T14:30:00+00:00");

        feed.next_bar().await.unwrap();
        let last = feed.next_bar().await.unwrap().unwrap();
        assert_eq!(last.close, 580.75);
        assert!(feed.next_bar().await.unwrap().is_none());
    }

    #[test]
    fn test_bad_row_is_an_error() {
        let data = "timestamp,open,high,low,close\n2025-03-03T14:30:00Z,580.1,oops,579.9,580.2\n";
        let err = CsvBarFeed::from_reader(data.as_bytes(), "bad").err().unwrap();
        assert!(format!("{:#}", err).contains("row 1"));
    }
}

use anyhow::Result;
use async_trait::async_trait;

use crate::trading_core::RawBar;

/// Source of raw bars, in arrival order
#[async_trait]
pub trait BarFeed: Send {
    /// Next raw bar; `None` once the feed is exhausted
    async fn next_bar(&mut self) -> Result<Option<RawBar>>;

    /// Short label for logs
    fn describe(&self) -> String;
}

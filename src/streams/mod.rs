//! Bar feeds
//!
//! - [`AlpacaBarPoller`] - latest minute bar from the Alpaca data API
//! - [`CsvBarFeed`] - recorded bars for offline replay
//! - [`RandomWalkFeed`] - synthetic bars for demo runs

mod demo;
mod feed;
mod poll;
mod replay;

pub use demo::{RandomWalkConfig, RandomWalkFeed};
pub use feed::BarFeed;
pub use poll::{AlpacaBarPoller, TimestampDedup};
pub use replay::CsvBarFeed;

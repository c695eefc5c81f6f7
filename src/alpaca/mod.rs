//! Alpaca API Integration
//!
//! This module provides the broker side of live and paper trading through the
//! Alpaca REST API.
//!
//! # Components
//!
//! - [`client`] - HTTP client with key/secret header authentication
//! - [`models`] - Request/response data types
//! - [`executor`] - [`OrderGateway`](crate::execution::OrderGateway) implementation
//!
//! # Usage
//!
//! ```rust,ignore
//! use reversal_bars::alpaca::{AlpacaClient, AlpacaGateway};
//! use reversal_bars::execution::{ExecutionConfig, ExecutionMode};
//! use reversal_bars::trading_core::{StrategyConfig, StrategyEngine};
//!
//! let config = ExecutionConfig {
//!     mode: ExecutionMode::Paper,
//!     api_key: std::env::var("ALPACA_API_KEY")?,
//!     api_secret: std::env::var("ALPACA_API_SECRET")?,
//!     ..Default::default()
//! };
//! let client = AlpacaClient::from_config(&config)?;
//! let gateway = AlpacaGateway::new(client);
//! let mut engine = StrategyEngine::new(StrategyConfig::for_symbol("SPY"), gateway)?;
//! ```

pub mod client;
pub mod executor;
pub mod models;

// Re-export commonly used types
pub use client::AlpacaClient;
pub use executor::AlpacaGateway;
pub use models::{Order, Position, StockBar};

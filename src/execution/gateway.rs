//! Order gateway abstraction
//!
//! The strategy engine only talks to the broker through this trait. Every
//! call may fail; nothing is assumed to have happened without an explicit
//! acknowledgment.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Signed quantity change this side applies to a position
    pub fn signed(&self, quantity: u32) -> f64 {
        match self {
            Self::Buy => quantity as f64,
            Self::Sell => -(quantity as f64),
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Broker response to a market order submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub accepted: bool,
    pub order_id: Option<String>,
    pub error: Option<String>,
}

impl OrderAck {
    pub fn accepted(order_id: impl Into<String>) -> Self {
        Self {
            accepted: true,
            order_id: Some(order_id.into()),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            accepted: false,
            order_id: None,
            error: Some(error.into()),
        }
    }

    /// Treat an unaccepted order as an error
    pub fn into_result(self) -> Result<Self> {
        if self.accepted {
            Ok(self)
        } else {
            Err(anyhow!(
                "Order rejected: {}",
                self.error.unwrap_or_else(|| "no reason given".to_string())
            ))
        }
    }
}

/// Broker capability consumed by the strategy engine
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit a market order
    async fn submit_market_order(&self, symbol: &str, side: OrderSide, quantity: u32) -> Result<OrderAck>;

    /// Close whatever position the broker holds for `symbol`
    async fn close_position(&self, symbol: &str) -> Result<()>;

    /// Signed position size (positive long, negative short, 0 when flat)
    async fn get_position_size(&self, symbol: &str) -> Result<f64>;

    /// Last traded price
    async fn get_latest_price(&self, symbol: &str) -> Result<f64>;

    /// Observe a price from the feed. Real brokers have their own prices.
    fn mark_price(&self, _symbol: &str, _price: f64) {}
}

//! Alpaca API Data Models
//!
//! Request and response types for the Alpaca trading and market data APIs.
//! Alpaca encodes quantities and prices on the trading API as strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::execution::OrderSide;
use crate::trading_core::RawBar;

// ============================================================================
// Orders
// ============================================================================

/// Request body for `POST /v2/orders`
#[derive(Debug, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    /// Share count, sent as a string
    pub qty: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: String,
    pub time_in_force: String,
    pub client_order_id: String,
}

impl OrderRequest {
    /// Day market order
    pub fn market(symbol: &str, side: OrderSide, quantity: u32, client_order_id: String) -> Self {
        Self {
            symbol: symbol.to_string(),
            qty: quantity.to_string(),
            side,
            order_type: "market".to_string(),
            time_in_force: "day".to_string(),
            client_order_id,
        }
    }
}

/// Order as returned by the trading API
#[derive(Debug, Deserialize, Clone)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub client_order_id: String,
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub qty: Option<String>,
    #[serde(default)]
    pub filled_qty: Option<String>,
    #[serde(default)]
    pub filled_avg_price: Option<String>,
}

impl Order {
    /// Statuses that mean the broker will not execute the order
    pub fn is_rejected(&self) -> bool {
        matches!(self.status.as_str(), "rejected" | "canceled" | "expired" | "suspended")
    }
}

/// Error body returned with non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

// ============================================================================
// Positions
// ============================================================================

/// Open position for one symbol
#[derive(Debug, Deserialize, Clone)]
pub struct Position {
    pub symbol: String,
    /// Signed share count (negative for short positions)
    pub qty: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub avg_entry_price: Option<String>,
    #[serde(default)]
    pub unrealized_pl: Option<String>,
}

impl Position {
    pub fn signed_qty(&self) -> anyhow::Result<f64> {
        let qty: f64 = self
            .qty
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid position qty '{}': {}", self.qty, e))?;
        // Older responses report short positions with a positive qty
        if self.side == "short" && qty > 0.0 {
            Ok(-qty)
        } else {
            Ok(qty)
        }
    }
}

// ============================================================================
// Market Data
// ============================================================================

/// Single trade print
#[derive(Debug, Deserialize, Clone)]
pub struct Trade {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "p")]
    pub price: f64,
    #[serde(rename = "s", default)]
    pub size: f64,
}

/// Response from `GET /v2/stocks/{symbol}/trades/latest`
#[derive(Debug, Deserialize)]
pub struct LatestTradeResponse {
    pub symbol: Option<String>,
    pub trade: Trade,
}

/// Minute bar
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct StockBar {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v", default)]
    pub volume: f64,
}

impl From<StockBar> for RawBar {
    fn from(bar: StockBar) -> Self {
        RawBar::new(bar.timestamp, bar.open, bar.high, bar.low, bar.close)
    }
}

/// Response from `GET /v2/stocks/{symbol}/bars/latest`
#[derive(Debug, Deserialize)]
pub struct LatestBarResponse {
    pub symbol: Option<String>,
    pub bar: StockBar,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_request_serialization() {
        let request = OrderRequest::market("SPY", OrderSide::Sell, 10, "rb-1234".to_string());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["symbol"], "SPY");
        assert_eq!(json["qty"], "10");
        assert_eq!(json["side"], "sell");
        assert_eq!(json["type"], "market");
        assert_eq!(json["time_in_force"], "day");
        assert_eq!(json["client_order_id"], "rb-1234");
    }

    #[test]
    fn test_order_deserialization() {
        let json = r#"{
            "id": "61e69015-8549-4bfd-b9c3-01e75843f47d",
            "client_order_id": "rb-1234",
            "symbol": "SPY",
            "status": "accepted",
            "qty": "10",
            "filled_qty": "0",
            "filled_avg_price": null,
            "extended_hours": false
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, "accepted");
        assert!(!order.is_rejected());
        assert!(order.filled_avg_price.is_none());
    }

    #[test]
    fn test_short_position_qty() {
        let json = r#"{"symbol":"QQQ","qty":"-5","side":"short","avg_entry_price":"430.10"}"#;
        let position: Position = serde_json::from_str(json).unwrap();
        assert_eq!(position.signed_qty().unwrap(), -5.0);

        let legacy = Position {
            qty: "5".to_string(),
            ..position
        };
        assert_eq!(legacy.signed_qty().unwrap(), -5.0);
    }

    #[test]
    fn test_latest_bar_deserialization() {
        let json = r#"{
            "symbol": "SPY",
            "bar": {"t":"2025-03-03T14:31:00Z","o":580.1,"h":580.5,"l":579.9,"c":580.2,"v":12034,"n":211,"vw":580.21}
        }"#;
        let response: LatestBarResponse = serde_json::from_str(json).unwrap();
        let bar: RawBar = response.bar.into();

        assert_eq!(bar.high, 580.5);
        assert_eq!(bar.close, 580.2);
        assert_eq!(bar.timestamp.to_rfc3339(), "2025-03-03T14:31:00+00:00");
    }

    #[test]
    fn test_latest_trade_deserialization() {
        let json = r#"{"symbol":"SPY","trade":{"t":"2025-03-03T14:31:07.123Z","x":"V","p":580.17,"s":100,"c":["@"],"i":52983525029461,"z":"B"}}"#;
        let response: LatestTradeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.trade.price, 580.17);
    }
}

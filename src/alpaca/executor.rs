//! Alpaca order gateway
//!
//! Translates strategy engine order calls into Alpaca API requests.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use super::client::AlpacaClient;
use crate::execution::{OrderAck, OrderGateway, OrderSide};

/// [`OrderGateway`] backed by an Alpaca account
#[derive(Clone)]
pub struct AlpacaGateway {
    client: AlpacaClient,
}

impl AlpacaGateway {
    pub fn new(client: AlpacaClient) -> Self {
        Self { client }
    }

    /// Generate a unique client order ID
    fn generate_client_order_id() -> String {
        format!("rb-{}", Uuid::new_v4())
    }
}

#[async_trait]
impl OrderGateway for AlpacaGateway {
    async fn submit_market_order(&self, symbol: &str, side: OrderSide, quantity: u32) -> Result<OrderAck> {
        let order = self
            .client
            .place_market_order(symbol, side, quantity, Self::generate_client_order_id())
            .await?;

        if order.is_rejected() {
            warn!("Order {} for {} came back {}", order.id, symbol, order.status);
            return Ok(OrderAck {
                accepted: false,
                order_id: Some(order.id),
                error: Some(format!("order status {}", order.status)),
            });
        }

        Ok(OrderAck::accepted(order.id))
    }

    async fn close_position(&self, symbol: &str) -> Result<()> {
        self.client.close_position(symbol).await
    }

    async fn get_position_size(&self, symbol: &str) -> Result<f64> {
        match self.client.get_position(symbol).await? {
            Some(position) => position.signed_qty(),
            None => {
                debug!("No open {} position", symbol);
                Ok(0.0)
            }
        }
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<f64> {
        Ok(self.client.get_latest_trade(symbol).await?.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_order_ids_unique() {
        let a = AlpacaGateway::generate_client_order_id();
        let b = AlpacaGateway::generate_client_order_id();
        assert!(a.starts_with("rb-"));
        assert_ne!(a, b);
        // Alpaca caps client order IDs at 128 characters
        assert!(a.len() <= 128);
    }
}

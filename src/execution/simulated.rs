//! In-process gateway for simulation mode and tests
//!
//! Orders fill immediately at the last marked price. Failures, rejections
//! and latency can be injected to exercise the engine's recovery paths.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use super::gateway::{OrderAck, OrderGateway, OrderSide};

/// Filled simulated order
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedFill {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub price: Option<f64>,
}

#[derive(Debug, Default)]
struct SimState {
    positions: HashMap<String, f64>,
    last_prices: HashMap<String, f64>,
    fills: Vec<SimulatedFill>,
    order_counter: u64,
    queued_errors: u32,
    queued_rejections: u32,
}

/// Simulated broker. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    state: Arc<Mutex<SimState>>,
    latency: Option<Duration>,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every order call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SimState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("Simulated gateway state poisoned"))
    }

    /// Make the next `count` order calls fail with a transport error
    pub fn fail_next(&self, count: u32) {
        if let Ok(mut state) = self.lock() {
            state.queued_errors += count;
        }
    }

    /// Make the next `count` order submissions come back unaccepted
    pub fn reject_next(&self, count: u32) {
        if let Ok(mut state) = self.lock() {
            state.queued_rejections += count;
        }
    }

    /// All fills so far
    pub fn fills(&self) -> Vec<SimulatedFill> {
        self.lock().map(|s| s.fills.clone()).unwrap_or_default()
    }

    pub fn position(&self, symbol: &str) -> f64 {
        self.lock()
            .ok()
            .and_then(|s| s.positions.get(symbol).copied())
            .unwrap_or(0.0)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl OrderGateway for SimulatedGateway {
    async fn submit_market_order(&self, symbol: &str, side: OrderSide, quantity: u32) -> Result<OrderAck> {
        self.simulate_latency().await;

        let mut state = self.lock()?;
        if state.queued_errors > 0 {
            state.queued_errors -= 1;
            bail!("Simulated connection error");
        }
        if state.queued_rejections > 0 {
            state.queued_rejections -= 1;
            return Ok(OrderAck::rejected("Simulated rejection"));
        }

        state.order_counter += 1;
        let order_id = format!("SIM-{}", state.order_counter);
        let price = state.last_prices.get(symbol).copied();

        *state.positions.entry(symbol.to_string()).or_insert(0.0) += side.signed(quantity);
        state.fills.push(SimulatedFill {
            order_id: order_id.clone(),
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
        });

        info!(
            "[SIM] {} {} {} @ {}",
            side,
            quantity,
            symbol,
            price.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "MKT".to_string())
        );

        Ok(OrderAck::accepted(order_id))
    }

    async fn close_position(&self, symbol: &str) -> Result<()> {
        self.simulate_latency().await;

        let mut state = self.lock()?;
        if state.queued_errors > 0 {
            state.queued_errors -= 1;
            bail!("Simulated connection error");
        }
        let closed = state.positions.remove(symbol).unwrap_or(0.0);
        debug!("[SIM] Closed {} position of {}", symbol, closed);
        Ok(())
    }

    async fn get_position_size(&self, symbol: &str) -> Result<f64> {
        Ok(self.position(symbol))
    }

    async fn get_latest_price(&self, symbol: &str) -> Result<f64> {
        self.lock()?
            .last_prices
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow!("No price seen yet for {}", symbol))
    }

    fn mark_price(&self, symbol: &str, price: f64) {
        if let Ok(mut state) = self.lock() {
            state.last_prices.insert(symbol.to_string(), price);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fills_track_position() {
        let gateway = SimulatedGateway::new();
        gateway.mark_price("SPY", 500.0);

        let ack = gateway.submit_market_order("SPY", OrderSide::Sell, 10).await.unwrap();
        assert!(ack.accepted);
        assert_eq!(ack.order_id.as_deref(), Some("SIM-1"));
        assert_eq!(gateway.get_position_size("SPY").await.unwrap(), -10.0);
        assert_eq!(gateway.fills()[0].price, Some(500.0));

        gateway.submit_market_order("SPY", OrderSide::Buy, 10).await.unwrap();
        assert_eq!(gateway.get_position_size("SPY").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let gateway = SimulatedGateway::new();
        gateway.fail_next(1);
        gateway.reject_next(1);

        assert!(gateway.submit_market_order("SPY", OrderSide::Buy, 1).await.is_err());
        let ack = gateway.submit_market_order("SPY", OrderSide::Buy, 1).await.unwrap();
        assert!(!ack.accepted);
        assert!(gateway.submit_market_order("SPY", OrderSide::Buy, 1).await.unwrap().accepted);
        assert_eq!(gateway.fills().len(), 1);
    }

    #[tokio::test]
    async fn test_close_and_price() {
        let gateway = SimulatedGateway::new();
        assert!(gateway.get_latest_price("QQQ").await.is_err());

        gateway.mark_price("QQQ", 420.5);
        assert_eq!(gateway.get_latest_price("QQQ").await.unwrap(), 420.5);

        gateway.submit_market_order("QQQ", OrderSide::Buy, 3).await.unwrap();
        gateway.close_position("QQQ").await.unwrap();
        assert_eq!(gateway.position("QQQ"), 0.0);
    }
}

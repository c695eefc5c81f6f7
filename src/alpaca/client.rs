//! Alpaca API Client
//!
//! HTTP client for the Alpaca trading API (paper or live) and the market data
//! API, authenticated with key ID and secret headers.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use super::models::*;
use crate::execution::{ExecutionConfig, ExecutionMode, OrderSide};

/// Trading API base URL for paper accounts
pub const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";

/// Trading API base URL for live accounts
pub const LIVE_BASE_URL: &str = "https://api.alpaca.markets";

/// Market data API base URL
pub const DATA_BASE_URL: &str = "https://data.alpaca.markets";

/// Alpaca API client
#[derive(Clone)]
pub struct AlpacaClient {
    client: Client,
    base_url: String,
    data_url: String,
    api_key: String,
    api_secret: String,
    data_feed: String,
}

impl AlpacaClient {
    /// Create a client for the account selected by an execution config
    pub fn from_config(config: &ExecutionConfig) -> Result<Self> {
        config.validate()?;
        let base_url = match config.mode {
            ExecutionMode::Live => LIVE_BASE_URL,
            ExecutionMode::Paper | ExecutionMode::Simulation => PAPER_BASE_URL,
        };
        Self::new(
            config.api_key.clone(),
            config.api_secret.clone(),
            base_url.to_string(),
            config.data_feed.clone(),
        )
    }

    /// Create a new client with explicit credentials
    pub fn new(api_key: String, api_secret: String, base_url: String, data_feed: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            data_url: DATA_BASE_URL.to_string(),
            api_key,
            api_secret,
            data_feed,
        })
    }

    /// Override the market data base URL
    pub fn with_data_url(mut self, data_url: impl Into<String>) -> Self {
        self.data_url = data_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn data_feed(&self) -> &str {
        &self.data_feed
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
    }

    /// Turn a non-success response into an error carrying Alpaca's message
    async fn check(response: reqwest::Response, endpoint: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(anyhow!("Request to {} failed ({}): {}", endpoint, status, message))
    }

    /// Make an authenticated GET request against `base`
    async fn get<R: serde::de::DeserializeOwned>(&self, base: &str, endpoint: &str) -> Result<R> {
        let response = self
            .authorized(self.client.get(format!("{}{}", base, endpoint)))
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", endpoint))?;

        Self::check(response, endpoint)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", endpoint))
    }

    // ========================================================================
    // Order Methods
    // ========================================================================

    /// Submit a day market order
    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: u32,
        client_order_id: String,
    ) -> Result<Order> {
        debug!("Placing market order: {} {} {} @ MKT", side, quantity, symbol);

        let endpoint = "/v2/orders";
        let request = OrderRequest::market(symbol, side, quantity, client_order_id);

        let response = self
            .authorized(self.client.post(format!("{}{}", self.base_url, endpoint)))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", endpoint))?;

        let order: Order = Self::check(response, endpoint)
            .await?
            .json()
            .await
            .context("Failed to parse order response")?;

        info!("Order {} submitted: {} ({})", order.id, order.client_order_id, order.status);
        Ok(order)
    }

    // ========================================================================
    // Position Methods
    // ========================================================================

    /// Open position for `symbol`, `None` when flat
    pub async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        let endpoint = format!("/v2/positions/{}", symbol);

        let response = self
            .authorized(self.client.get(format!("{}{}", self.base_url, endpoint)))
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", endpoint))?;

        // Alpaca answers 404 for symbols without a position
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let position = Self::check(response, &endpoint)
            .await?
            .json()
            .await
            .context("Failed to parse position response")?;
        Ok(Some(position))
    }

    /// Liquidate the position for `symbol` at market
    pub async fn close_position(&self, symbol: &str) -> Result<()> {
        let endpoint = format!("/v2/positions/{}", symbol);

        let response = self
            .authorized(self.client.delete(format!("{}{}", self.base_url, endpoint)))
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", endpoint))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("No {} position to close", symbol);
            return Ok(());
        }

        Self::check(response, &endpoint).await?;
        info!("Closed {} position", symbol);
        Ok(())
    }

    // ========================================================================
    // Market Data Methods
    // ========================================================================

    /// Most recent trade print
    pub async fn get_latest_trade(&self, symbol: &str) -> Result<Trade> {
        let endpoint = format!("/v2/stocks/{}/trades/latest?feed={}", symbol, self.data_feed);
        let response: LatestTradeResponse = self.get(&self.data_url, &endpoint).await?;
        Ok(response.trade)
    }

    /// Most recent completed minute bar
    pub async fn get_latest_bar(&self, symbol: &str) -> Result<StockBar> {
        let endpoint = format!("/v2/stocks/{}/bars/latest?feed={}", symbol, self.data_feed);
        let response: LatestBarResponse = self.get(&self.data_url, &endpoint).await?;
        Ok(response.bar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_selects_endpoint() {
        let mut config = ExecutionConfig {
            mode: ExecutionMode::Paper,
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            ..Default::default()
        };
        let client = AlpacaClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), PAPER_BASE_URL);
        assert_eq!(client.data_feed(), "iex");

        config.mode = ExecutionMode::Live;
        let client = AlpacaClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), LIVE_BASE_URL);
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = ExecutionConfig {
            mode: ExecutionMode::Live,
            ..Default::default()
        };
        assert!(AlpacaClient::from_config(&config).is_err());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = AlpacaClient::new(
            "key".to_string(),
            "secret".to_string(),
            "https://paper-api.alpaca.markets/".to_string(),
            "sip".to_string(),
        )
        .unwrap()
        .with_data_url("http://localhost:9000/");
        assert_eq!(client.base_url(), PAPER_BASE_URL);
        assert_eq!(client.data_url, "http://localhost:9000");
    }
}

//! Strategy parameters

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens to the trailing stop on the first inside bar of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopResetRule {
    /// Reset the stop to the bar preceding the inside bar (low for longs,
    /// high for shorts), even if that loosens it
    PriorBar,
    /// Leave the ratcheted stop where it is
    Keep,
}

impl Default for StopResetRule {
    fn default() -> Self {
        Self::PriorBar
    }
}

impl std::str::FromStr for StopResetRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "prior-bar" | "prior_bar" | "prior" => Ok(Self::PriorBar),
            "keep" => Ok(Self::Keep),
            other => bail!("Unknown stop reset rule '{}' (expected prior-bar or keep)", other),
        }
    }
}

impl std::fmt::Display for StopResetRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PriorBar => write!(f, "prior-bar"),
            Self::Keep => write!(f, "keep"),
        }
    }
}

/// Configuration for one strategy engine (one symbol)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Symbol to trade (e.g., "SPY")
    pub symbol: String,

    /// Raw bars folded into one aggregated bar
    pub aggregation_count: usize,

    /// Shares per entry order
    pub order_quantity: u32,

    /// Extra distance beyond the candidate's extreme required to confirm a breakout
    pub confirmation_distance: f64,

    /// Stop handling on the first inside bar of a series
    pub stop_reset: StopResetRule,

    /// Also exit when a bar closes beyond the confirmed outside bar
    pub close_beyond_outside_bar: bool,

    /// Upper bound on each order gateway call
    pub gateway_timeout: Duration,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            symbol: "SPY".to_string(),
            aggregation_count: 10,
            order_quantity: 10,
            confirmation_distance: 0.0,
            stop_reset: StopResetRule::PriorBar,
            close_beyond_outside_bar: false,
            gateway_timeout: Duration::from_secs(10),
        }
    }
}

impl StrategyConfig {
    /// Default parameters for a given symbol
    pub fn for_symbol(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            bail!("Symbol must not be empty");
        }
        if self.aggregation_count == 0 {
            bail!("Aggregation count must be at least 1");
        }
        if self.order_quantity == 0 {
            bail!("Order quantity must be at least 1");
        }
        if !self.confirmation_distance.is_finite() || self.confirmation_distance < 0.0 {
            bail!(
                "Confirmation distance must be a non-negative number, got {}",
                self.confirmation_distance
            );
        }
        if self.gateway_timeout.is_zero() {
            bail!("Gateway timeout must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = StrategyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stop_reset, StopResetRule::PriorBar);
    }

    #[test]
    fn test_rejects_zero_aggregation() {
        let config = StrategyConfig {
            aggregation_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_distance() {
        let config = StrategyConfig {
            confirmation_distance: -0.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Confirmation distance"));
    }

    #[test]
    fn test_stop_reset_parse() {
        assert_eq!("prior-bar".parse::<StopResetRule>().unwrap(), StopResetRule::PriorBar);
        assert_eq!("KEEP".parse::<StopResetRule>().unwrap(), StopResetRule::Keep);
        assert!("loosen".parse::<StopResetRule>().is_err());
    }
}

//! Configuration for order execution

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Execution mode determines whether orders are simulated or sent to the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Simulated execution (no actual orders)
    Simulation,
    /// Paper trading account
    Paper,
    /// Live trading account
    Live,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Simulation
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulation => write!(f, "Simulation"),
            Self::Paper => write!(f, "Paper"),
            Self::Live => write!(f, "Live"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "simulation" | "sim" => Ok(Self::Simulation),
            "paper" => Ok(Self::Paper),
            "live" => Ok(Self::Live),
            other => bail!("Unknown execution mode '{}'", other),
        }
    }
}

impl ExecutionMode {
    /// Whether orders reach a real broker endpoint
    pub fn uses_broker(&self) -> bool {
        !matches!(self, Self::Simulation)
    }
}

/// Broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Execution mode (simulation, paper, or live)
    pub mode: ExecutionMode,

    /// Broker API key ID
    pub api_key: String,

    /// Broker API secret
    pub api_secret: String,

    /// Market data feed identifier ("iex" free, "sip" consolidated)
    pub data_feed: String,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Simulation,
            api_key: String::new(),
            api_secret: String::new(),
            data_feed: "iex".to_string(),
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.mode.uses_broker() && (self.api_key.is_empty() || self.api_secret.is_empty()) {
            bail!("{} mode requires broker API key and secret", self.mode);
        }
        if self.data_feed.trim().is_empty() {
            bail!("Data feed identifier must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("sim".parse::<ExecutionMode>().unwrap(), ExecutionMode::Simulation);
        assert_eq!("Paper".parse::<ExecutionMode>().unwrap(), ExecutionMode::Paper);
        assert_eq!("LIVE".parse::<ExecutionMode>().unwrap(), ExecutionMode::Live);
        assert!("backtest".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn test_broker_modes_need_credentials() {
        let config = ExecutionConfig {
            mode: ExecutionMode::Paper,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExecutionConfig {
            mode: ExecutionMode::Paper,
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        assert!(ExecutionConfig::default().validate().is_ok());
    }
}

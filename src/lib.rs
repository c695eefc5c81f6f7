// Library crate - reversal bar strategy engine, broker gateways and bar feeds

pub mod trading_core;
pub mod execution;
pub mod alpaca;
pub mod streams;
pub mod trading;

// Re-export commonly used types
pub use trading_core::{EngineEvent, StrategyConfig, StrategyEngine};
pub use trading::{run_session, run_session_until, SessionEnd, SessionOptions};

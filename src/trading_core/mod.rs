//! Trading Core - reversal bar strategy
//!
//! This module contains the strategy components:
//! - Aggregation of raw bars into fixed-count bars
//! - Reversal candidate detection and breakout confirmation
//! - Position and trailing stop management (inside/outside bars)
//! - Strategy engine driving entries and exits through an order gateway
//! - Trade ledger with session statistics

pub mod bars;
pub mod aggregator;
pub mod config;
pub mod reversal;
pub mod position;
pub mod events;
pub mod ledger;
pub mod engine;

// Re-export commonly used types
pub use bars::{AggregatedBar, Bar, BarDirection, RawBar};
pub use aggregator::BarAggregator;
pub use config::{StopResetRule, StrategyConfig};
pub use reversal::{Direction, EntrySignal, ReversalCandidate, ReversalCandidates};
pub use position::{ExitReason, Position, StopUpdate};
pub use events::EngineEvent;
pub use ledger::{SessionSummary, TradeLedger, TradeRecord};
pub use engine::{EnginePhase, EngineState, StrategyEngine};

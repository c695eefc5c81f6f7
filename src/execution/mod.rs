//! Order execution
//!
//! The strategy engine submits orders through the [`OrderGateway`] trait.
//! [`SimulatedGateway`] fills in-process; the Alpaca gateway lives in
//! [`crate::alpaca`].

mod config;
mod gateway;
mod simulated;

pub use config::{ExecutionConfig, ExecutionMode};
pub use gateway::{OrderAck, OrderGateway, OrderSide};
pub use simulated::{SimulatedFill, SimulatedGateway};

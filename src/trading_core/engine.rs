//! Strategy engine
//!
//! Owns all per-symbol state and exposes a single entry point,
//! [`StrategyEngine::apply`], which must be called with raw bars strictly in
//! arrival order. Flow per aggregated bar:
//! 1. FLAT - raise reversal candidates on body flips, enter on breakout
//! 2. IN POSITION - exit on stop breach, otherwise maintain the trailing stop
//!
//! Order gateway calls are bounded by the configured timeout. A failed call
//! leaves candidates and position untouched so the next bar re-evaluates the
//! same decision.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::execution::{OrderAck, OrderGateway, OrderSide};

use super::aggregator::BarAggregator;
use super::bars::{AggregatedBar, RawBar};
use super::config::StrategyConfig;
use super::events::EngineEvent;
use super::ledger::TradeLedger;
use super::position::{Position, StopUpdate};
use super::reversal::{Direction, EntrySignal, ReversalCandidate, ReversalCandidates};

/// Outer state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    /// No candidates, no position
    Flat,
    /// One or two reversal candidates waiting for a breakout
    CandidatePending,
    /// Position open
    PositionOpen {
        direction: Direction,
        inside_series: bool,
    },
}

impl std::fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "FLAT"),
            Self::CandidatePending => write!(f, "CANDIDATE"),
            Self::PositionOpen {
                direction,
                inside_series: true,
            } => write!(f, "{} (INSIDE SERIES)", direction),
            Self::PositionOpen { direction, .. } => write!(f, "{}", direction),
        }
    }
}

/// Everything the engine remembers between bars
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    pub previous_aggregate: Option<AggregatedBar>,
    pub candidates: ReversalCandidates,
    pub position: Option<Position>,
}

impl EngineState {
    pub fn candidate_long(&self) -> Option<&ReversalCandidate> {
        self.candidates.long()
    }

    pub fn candidate_short(&self) -> Option<&ReversalCandidate> {
        self.candidates.short()
    }

    pub fn phase(&self) -> EnginePhase {
        match &self.position {
            Some(pos) => EnginePhase::PositionOpen {
                direction: pos.direction,
                inside_series: pos.inside_series,
            },
            None if !self.candidates.is_empty() => EnginePhase::CandidatePending,
            None => EnginePhase::Flat,
        }
    }
}

fn entry_side(direction: Direction) -> OrderSide {
    match direction {
        Direction::Long => OrderSide::Buy,
        Direction::Short => OrderSide::Sell,
    }
}

/// Run a gateway call under a timeout, folding the timeout into the error
async fn bounded<T, F>(timeout: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("{} timed out after {:?}", operation, timeout)),
    }
}

/// Reversal-bar strategy for one symbol
pub struct StrategyEngine<G: OrderGateway> {
    config: StrategyConfig,
    aggregator: BarAggregator,
    state: EngineState,
    ledger: TradeLedger,
    gateway: G,
}

impl<G: OrderGateway> StrategyEngine<G> {
    /// Create an engine; fails if the configuration is invalid
    pub fn new(config: StrategyConfig, gateway: G) -> Result<Self> {
        config.validate()?;
        let aggregator = BarAggregator::new(config.aggregation_count);

        Ok(Self {
            config,
            aggregator,
            state: EngineState::default(),
            ledger: TradeLedger::default(),
            gateway,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn position(&self) -> Option<&Position> {
        self.state.position.as_ref()
    }

    pub fn is_flat(&self) -> bool {
        self.state.position.is_none()
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Feed one raw bar. Returns the decisions taken, if an aggregate completed.
    pub async fn apply(&mut self, raw: RawBar) -> Vec<EngineEvent> {
        debug!("{} raw bar {}", self.config.symbol, raw);
        self.gateway.mark_price(&self.config.symbol, raw.close);

        match self.aggregator.feed(raw) {
            Some(aggregate) => self.process_aggregate(aggregate).await,
            None => Vec::new(),
        }
    }

    /// Run the strategy on a completed aggregated bar
    pub async fn process_aggregate(&mut self, current: AggregatedBar) -> Vec<EngineEvent> {
        info!("{} aggregated bar {}", self.config.symbol, current);

        let mut events = vec![EngineEvent::AggregateCompleted { bar: current }];

        if self.state.position.is_none() {
            self.process_flat(current, &mut events).await;
        } else {
            self.process_in_position(current, &mut events).await;
        }

        events
    }

    async fn process_flat(&mut self, current: AggregatedBar, events: &mut Vec<EngineEvent>) {
        // Short is evaluated before long; an entry attempt ends the cycle
        for direction in [Direction::Short, Direction::Long] {
            if let Some(candidate) =
                self.state
                    .candidates
                    .arm(direction, self.state.previous_aggregate.as_ref(), &current)
            {
                info!(
                    "{} {} reversal candidate at {} - waiting for break of {:.2}",
                    self.config.symbol,
                    direction,
                    current.timestamp,
                    candidate.trigger_price()
                );
                events.push(EngineEvent::CandidateSet {
                    direction,
                    bar: candidate.bar,
                });
            }

            if let Some(signal) = self
                .state
                .candidates
                .confirm(direction, &current, self.config.confirmation_distance)
            {
                self.enter(signal, events).await;
                self.state.previous_aggregate = Some(current);
                return;
            }
        }

        self.state.previous_aggregate = Some(current);
    }

    async fn enter(&mut self, signal: EntrySignal, events: &mut Vec<EngineEvent>) {
        let direction = signal.direction();
        let quantity = self.config.order_quantity;

        info!(
            "{} {} entry triggered at {}: candidate {:.2} broken",
            self.config.symbol,
            direction,
            signal.trigger_bar.timestamp,
            signal.candidate.trigger_price()
        );

        match self.submit(entry_side(direction), quantity, "Entry order").await {
            Ok(ack) => {
                self.open_position(Position::open(&signal, quantity));
                self.state.candidates.clear();

                let initial_stop = signal.candidate.initial_stop();
                info!(
                    "{} ENTRY {} {} @ {:.2} | Stop: {:.2}",
                    self.config.symbol, direction, quantity, signal.trigger_bar.open, initial_stop
                );
                events.push(EngineEvent::EntryFilled {
                    direction,
                    quantity,
                    entry_price: signal.trigger_bar.open,
                    initial_stop,
                    candidate: signal.candidate.bar,
                    order_id: ack.order_id,
                });
            }
            Err(e) => {
                warn!(
                    "{} {} entry failed, candidate stays armed: {:#}",
                    self.config.symbol, direction, e
                );
                events.push(EngineEvent::EntryRejected {
                    direction,
                    reason: format!("{:#}", e),
                });
            }
        }
    }

    fn open_position(&mut self, position: Position) {
        if let Some(existing) = &self.state.position {
            panic!(
                "{}: attempted to open a {} position while a {} position is open",
                self.config.symbol, position.direction, existing.direction
            );
        }
        self.state.position = Some(position);
    }

    async fn process_in_position(&mut self, current: AggregatedBar, events: &mut Vec<EngineEvent>) {
        let Some(position) = self.state.position.as_ref() else {
            return;
        };

        if let Some(reason) = position.exit_signal(&current, self.config.close_beyond_outside_bar) {
            let direction = position.direction;
            let quantity = position.quantity;
            let exit_side = entry_side(direction).opposite();

            info!(
                "{} {} exit condition ({}) at {} | Stop: {:.2}",
                self.config.symbol, direction, reason, current.timestamp, position.trailing_stop
            );

            match self.submit(exit_side, quantity, "Exit order").await {
                Ok(ack) => {
                    if let Some(closed) = self.state.position.take() {
                        let exit_price = closed.exit_price(reason, &current);
                        let record = self.ledger.record_exit(&closed, exit_price, reason, current.timestamp);
                        info!(
                            "{} EXIT {} @ {:.2} | P&L: {:+.2} pts | {}",
                            self.config.symbol,
                            direction,
                            exit_price,
                            record.pnl_points,
                            self.ledger.stats_summary()
                        );
                        events.push(EngineEvent::ExitFilled {
                            direction,
                            reason,
                            exit_price,
                            pnl_points: record.pnl_points,
                            order_id: ack.order_id,
                        });
                    }
                }
                Err(e) => {
                    warn!(
                        "{} {} exit failed, position stays open: {:#}",
                        self.config.symbol, direction, e
                    );
                    events.push(EngineEvent::ExitRejected {
                        direction,
                        reason: format!("{:#}", e),
                    });
                }
            }

            self.state.previous_aggregate = Some(current);
            return;
        }

        self.update_stop(current, events);
        self.state.previous_aggregate = Some(current);
    }

    fn update_stop(&mut self, current: AggregatedBar, events: &mut Vec<EngineEvent>) {
        let reset_rule = self.config.stop_reset;
        let symbol = &self.config.symbol;
        let Some(position) = self.state.position.as_mut() else {
            return;
        };

        // Set on the entry bar, so always present once a position exists
        let previous = self.state.previous_aggregate.unwrap_or(position.entry_bar);

        match position.update_stop(&current, &previous, reset_rule) {
            StopUpdate::InsideSeriesStarted {
                confirmed_outside_bar,
                previous_stop,
                new_stop,
            } => {
                info!(
                    "{} first inside bar at {} - outside bar confirmed at {}, stop {:.2} -> {:.2}",
                    symbol, current.timestamp, confirmed_outside_bar.timestamp, previous_stop, new_stop
                );
                events.push(EngineEvent::InsideSeriesStarted {
                    confirmed_outside_bar,
                    previous_stop,
                    new_stop,
                });
            }
            StopUpdate::InsideBarContinued { stop } => {
                debug!("{} inside bar series continues, stop stays {:.2}", symbol, stop);
                events.push(EngineEvent::InsideBarContinued { stop });
            }
            StopUpdate::OutsideBar {
                bar,
                previous_stop,
                new_stop,
            } => {
                events.push(EngineEvent::NewOutsideBar { bar, stop: new_stop });
                if new_stop != previous_stop {
                    info!(
                        "{} new outside bar at {}, stop ratcheted {:.2} -> {:.2}",
                        symbol, bar.timestamp, previous_stop, new_stop
                    );
                    events.push(EngineEvent::StopRatcheted {
                        previous_stop,
                        new_stop,
                    });
                } else {
                    debug!("{} new outside bar at {}, stop stays {:.2}", symbol, bar.timestamp, new_stop);
                }
            }
        }
    }

    async fn submit(&self, side: OrderSide, quantity: u32, operation: &str) -> Result<OrderAck> {
        bounded(
            self.config.gateway_timeout,
            operation,
            self.gateway
                .submit_market_order(&self.config.symbol, side, quantity),
        )
        .await?
        .into_result()
    }

    /// Compare the broker's position with local state.
    ///
    /// Returns the broker's signed position size. A mismatch is logged but
    /// not corrected; the engine only manages positions it opened itself.
    pub async fn reconcile(&self) -> Result<f64> {
        let size = bounded(
            self.config.gateway_timeout,
            "Position query",
            self.gateway.get_position_size(&self.config.symbol),
        )
        .await?;

        let expected = self
            .state
            .position
            .as_ref()
            .map(|p| entry_side(p.direction).signed(p.quantity))
            .unwrap_or(0.0);

        if size != expected {
            warn!(
                "{} position mismatch: broker has {}, engine tracks {}",
                self.config.symbol, size, expected
            );
        } else {
            debug!("{} position in sync ({})", self.config.symbol, size);
        }

        Ok(size)
    }

    /// Unrealized P&L in points of the open position at the latest price
    pub async fn mark_to_market(&self) -> Result<Option<f64>> {
        let Some(position) = self.state.position.as_ref() else {
            return Ok(None);
        };

        let price = bounded(
            self.config.gateway_timeout,
            "Price query",
            self.gateway.get_latest_price(&self.config.symbol),
        )
        .await?;

        Ok(Some(position.pnl_points(price)))
    }

    /// Close the broker position and drop local position state
    pub async fn flatten(&mut self, reason: &str) -> Result<()> {
        info!("{} flattening: {}", self.config.symbol, reason);

        bounded(
            self.config.gateway_timeout,
            "Close position",
            self.gateway.close_position(&self.config.symbol),
        )
        .await?;

        self.state.position = None;
        self.state.candidates.clear();
        self.aggregator.clear();
        Ok(())
    }

    /// One-line status
    pub fn status(&self) -> String {
        let stop = self
            .state
            .position
            .as_ref()
            .map(|p| format!(" | Stop: {:.2}", p.trailing_stop))
            .unwrap_or_default();
        format!(
            "{} {}{} | {}",
            self.config.symbol,
            self.state.phase(),
            stop,
            self.ledger.stats_summary()
        )
    }
}

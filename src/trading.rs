//! Trading session runner
//!
//! Drives one engine from one feed until the feed ends or Ctrl-C arrives.
//! Each symbol gets its own session; sessions share nothing.

use anyhow::{Context, Result};
use std::future::Future;
use tracing::{debug, error, info, warn};

use crate::execution::OrderGateway;
use crate::streams::BarFeed;
use crate::trading_core::{EngineEvent, SessionSummary, StrategyEngine};

/// Session behaviour switches
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Log every engine event as a JSON line
    pub json_events: bool,
    /// Close any open position when the session ends
    pub flatten_on_exit: bool,
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    FeedExhausted,
    Interrupted,
}

fn log_event(symbol: &str, event: &EngineEvent, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(event).context("Failed to serialize engine event")?;
        info!(target: "reversal_bars::events", symbol = symbol, "{}", line);
    } else {
        debug!("{} event {}", symbol, event.kind());
    }
    Ok(())
}

/// Run `engine` on `feed` until exhaustion or Ctrl-C
pub async fn run_session<G, F>(
    engine: &mut StrategyEngine<G>,
    feed: &mut F,
    options: &SessionOptions,
) -> Result<(SessionEnd, SessionSummary)>
where
    G: OrderGateway,
    F: BarFeed + ?Sized,
{
    run_session_until(engine, feed, options, tokio::signal::ctrl_c()).await
}

/// Run `engine` on `feed` until exhaustion or until `shutdown` resolves.
///
/// `shutdown` is polled across the whole session, so a signal that lands
/// while a bar is being applied stops the session on the next turn.
pub async fn run_session_until<G, F, S>(
    engine: &mut StrategyEngine<G>,
    feed: &mut F,
    options: &SessionOptions,
    shutdown: S,
) -> Result<(SessionEnd, SessionSummary)>
where
    G: OrderGateway,
    F: BarFeed + ?Sized,
    S: Future,
{
    let symbol = engine.config().symbol.clone();
    info!("{} session started on {}", symbol, feed.describe());

    if let Err(e) = engine.reconcile().await {
        warn!("{} could not query broker position: {:#}", symbol, e);
    }

    tokio::pin!(shutdown);

    let end = loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("{} interrupted", symbol);
                break SessionEnd::Interrupted;
            }
            next = feed.next_bar() => {
                let Some(bar) = next.with_context(|| format!("{} feed failed", symbol))? else {
                    info!("{} feed exhausted", symbol);
                    break SessionEnd::FeedExhausted;
                };

                for event in engine.apply(bar).await {
                    log_event(&symbol, &event, options.json_events)?;
                    if event.is_exit() {
                        info!("{}", engine.status());
                    }
                }
            }
        }
    };

    if let Some(position) = engine.position() {
        match engine.mark_to_market().await {
            Ok(Some(pnl)) => info!(
                "{} still {} {} | unrealized {:+.2} pts",
                symbol, position.direction, position.quantity, pnl
            ),
            Ok(None) => {}
            Err(e) => warn!("{} could not mark open position: {:#}", symbol, e),
        }

        if options.flatten_on_exit {
            if let Err(e) = engine.flatten("session ended").await {
                error!("{} failed to flatten: {:#}", symbol, e);
            }
        }
    }

    info!("{} session ended ({:?}) | {}", symbol, end, engine.status());
    Ok((end, engine.ledger().summary().clone()))
}

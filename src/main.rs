use anyhow::{bail, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use reversal_bars::alpaca::{AlpacaClient, AlpacaGateway};
use reversal_bars::execution::{ExecutionConfig, ExecutionMode, OrderGateway, SimulatedGateway};
use reversal_bars::streams::{AlpacaBarPoller, BarFeed, CsvBarFeed, RandomWalkConfig, RandomWalkFeed};
use reversal_bars::trading_core::{SessionSummary, StopResetRule, StrategyConfig, StrategyEngine};
use reversal_bars::{run_session, SessionEnd, SessionOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Reversal bar trading engine")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Strategy parameters shared by all subcommands
#[derive(clap::Args, Debug, Clone)]
struct StrategyArgs {
    /// Raw bars folded into one aggregated bar
    #[arg(short = 'k', long, env = "AGGREGATION_COUNT", default_value = "10")]
    aggregation_count: usize,

    /// Shares per order
    #[arg(short, long, env = "ORDER_QUANTITY", default_value = "10")]
    quantity: u32,

    /// Extra distance beyond the candidate extreme required for a breakout
    #[arg(long, default_value = "0.0")]
    confirmation_distance: f64,

    /// Stop handling on the first inside bar (prior-bar or keep)
    #[arg(long, default_value = "prior-bar")]
    stop_reset: StopResetRule,

    /// Also exit when a bar closes beyond the confirmed outside bar
    #[arg(long)]
    close_beyond_outside_bar: bool,

    /// Timeout for each broker call in seconds
    #[arg(long, default_value = "10")]
    gateway_timeout_secs: u64,

    /// Log engine events as JSON lines
    #[arg(long)]
    json_events: bool,

    /// Close open positions when the session ends
    #[arg(long)]
    flatten_on_exit: bool,
}

impl StrategyArgs {
    fn config_for(&self, symbol: &str) -> Result<StrategyConfig> {
        let config = StrategyConfig {
            symbol: symbol.to_string(),
            aggregation_count: self.aggregation_count,
            order_quantity: self.quantity,
            confirmation_distance: self.confirmation_distance,
            stop_reset: self.stop_reset,
            close_beyond_outside_bar: self.close_beyond_outside_bar,
            gateway_timeout: Duration::from_secs(self.gateway_timeout_secs),
        };
        config
            .validate()
            .with_context(|| format!("Invalid strategy configuration for {}", symbol))?;
        Ok(config)
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            json_events: self.json_events,
            flatten_on_exit: self.flatten_on_exit,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trade live minute bars from Alpaca, one engine per symbol
    Live {
        /// Symbols to trade (comma-separated)
        #[arg(short, long, env = "SYMBOLS", default_value = "SPY")]
        symbols: String,

        /// Execution mode: simulation, paper, or live
        #[arg(short, long, env = "EXECUTION_MODE", default_value = "paper")]
        mode: ExecutionMode,

        /// Alpaca API key ID
        #[arg(long, env = "ALPACA_API_KEY", default_value = "", hide_env_values = true)]
        api_key: String,

        /// Alpaca API secret key
        #[arg(long, env = "ALPACA_API_SECRET", default_value = "", hide_env_values = true)]
        api_secret: String,

        /// Market data feed (iex or sip)
        #[arg(long, env = "ALPACA_DATA_FEED", default_value = "iex")]
        data_feed: String,

        /// Seconds between latest-bar polls
        #[arg(long, default_value = "5")]
        poll_interval_secs: u64,

        #[command(flatten)]
        strategy: StrategyArgs,
    },

    /// Replay recorded bars from a CSV file against the simulated gateway
    Replay {
        /// CSV with timestamp,open,high,low,close columns
        #[arg(short, long)]
        file: PathBuf,

        /// Symbol label for logs and orders
        #[arg(short, long, default_value = "SPY")]
        symbol: String,

        /// Milliseconds to wait between bars
        #[arg(long, default_value = "0")]
        pace_ms: u64,

        #[command(flatten)]
        strategy: StrategyArgs,
    },

    /// Run the engine on a seeded random walk against the simulated gateway
    Demo {
        /// Symbol label for logs and orders
        #[arg(short, long, default_value = "DEMO")]
        symbol: String,

        /// Random seed
        #[arg(long, default_value = "7")]
        seed: u64,

        /// Number of raw bars to generate
        #[arg(long, default_value = "2000")]
        bars: usize,

        /// Starting price
        #[arg(long, default_value = "100.0")]
        start_price: f64,

        /// Standard deviation of each bar's move
        #[arg(long, default_value = "0.15")]
        volatility: f64,

        /// Milliseconds to wait between bars
        #[arg(long, default_value = "0")]
        pace_ms: u64,

        #[command(flatten)]
        strategy: StrategyArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let directive = if args.verbose { "reversal_bars=debug" } else { "reversal_bars=info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    match args.command {
        Commands::Live {
            symbols,
            mode,
            api_key,
            api_secret,
            data_feed,
            poll_interval_secs,
            strategy,
        } => {
            let config = ExecutionConfig {
                mode,
                api_key,
                api_secret,
                data_feed,
            };
            run_live(config, &symbols, poll_interval_secs, &strategy).await
        }
        Commands::Replay {
            file,
            symbol,
            pace_ms,
            strategy,
        } => {
            info!("=== REPLAY {} ===", file.display());
            let feed = CsvBarFeed::open(&file)?.with_pace(Duration::from_millis(pace_ms));
            run_simulated(&symbol, Box::new(feed), &strategy).await
        }
        Commands::Demo {
            symbol,
            seed,
            bars,
            start_price,
            volatility,
            pace_ms,
            strategy,
        } => {
            info!("=== DEMO (seed {}) ===", seed);
            let walk = RandomWalkConfig {
                start_price,
                volatility,
                bar_interval: ChronoDuration::minutes(1),
                seed,
                limit: Some(bars),
                pace: Some(Duration::from_millis(pace_ms)).filter(|p| !p.is_zero()),
            };
            let feed = RandomWalkFeed::new(walk, Utc::now())?;
            run_simulated(&symbol, Box::new(feed), &strategy).await
        }
    }
}

/// Ask for explicit confirmation before trading real money
fn confirm_live_trading() -> Result<bool> {
    println!("\n⚠️  WARNING: LIVE TRADING MODE ⚠️");
    println!("This will execute real trades with real money.");
    println!("Type 'CONFIRM' to proceed or anything else to cancel:");

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == "CONFIRM")
}

async fn run_live(config: ExecutionConfig, symbols: &str, poll_interval_secs: u64, strategy: &StrategyArgs) -> Result<()> {
    info!("=== AUTOMATED TRADING ===");

    if config.mode == ExecutionMode::Live && !confirm_live_trading()? {
        println!("Live trading cancelled.");
        return Ok(());
    }
    if poll_interval_secs == 0 {
        bail!("Poll interval must be at least one second");
    }

    let symbols: Vec<String> = symbols
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        bail!("No symbols given");
    }

    // Market data always comes from Alpaca, so credentials are needed even when
    // orders are simulated
    let data_config = ExecutionConfig {
        mode: if config.mode.uses_broker() { config.mode } else { ExecutionMode::Paper },
        ..config.clone()
    };
    let client = AlpacaClient::from_config(&data_config)?;

    info!("Mode: {}", config.mode);
    info!("Symbols: {}", symbols.join(", "));
    info!("Data feed: {} (poll every {}s)", config.data_feed, poll_interval_secs);
    info!(
        "Aggregation: {} bars | Quantity: {} | Stop reset: {}",
        strategy.aggregation_count, strategy.quantity, strategy.stop_reset
    );

    let poll_interval = Duration::from_secs(poll_interval_secs);
    let mut sessions = Vec::new();
    for symbol in &symbols {
        let feed: Box<dyn BarFeed> = Box::new(AlpacaBarPoller::new(client.clone(), symbol.clone(), poll_interval));
        let handle = match config.mode {
            ExecutionMode::Simulation => spawn_session(symbol, SimulatedGateway::new(), feed, strategy)?,
            ExecutionMode::Paper | ExecutionMode::Live => {
                spawn_session(symbol, AlpacaGateway::new(client.clone()), feed, strategy)?
            }
        };
        sessions.push((symbol.clone(), handle));
    }

    wait_for_sessions(sessions).await
}

async fn run_simulated(symbol: &str, feed: Box<dyn BarFeed>, strategy: &StrategyArgs) -> Result<()> {
    let handle = spawn_session(symbol, SimulatedGateway::new(), feed, strategy)?;
    wait_for_sessions(vec![(symbol.to_string(), handle)]).await
}

type SessionHandle = JoinHandle<Result<(SessionEnd, SessionSummary)>>;

fn spawn_session<G>(symbol: &str, gateway: G, mut feed: Box<dyn BarFeed>, strategy: &StrategyArgs) -> Result<SessionHandle>
where
    G: OrderGateway + 'static,
{
    let mut engine = StrategyEngine::new(strategy.config_for(symbol)?, gateway)?;
    let options = strategy.session_options();

    Ok(tokio::spawn(async move {
        run_session(&mut engine, feed.as_mut(), &options).await
    }))
}

async fn wait_for_sessions(sessions: Vec<(String, SessionHandle)>) -> Result<()> {
    let mut failures = 0;

    for (symbol, handle) in sessions {
        match handle.await {
            Ok(Ok((end, summary))) => {
                info!(
                    "{} finished ({:?}): {} trades, {}W/{}L, P&L {:+.2} pts, win rate {:.1}%",
                    symbol,
                    end,
                    summary.trade_count,
                    summary.wins,
                    summary.losses,
                    summary.gross_pnl,
                    summary.win_rate() * 100.0
                );
            }
            Ok(Err(e)) => {
                error!("{} session failed: {:#}", symbol, e);
                failures += 1;
            }
            Err(e) => {
                error!("{} session task aborted: {}", symbol, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        warn!("{} session(s) ended with errors", failures);
        bail!("{} session(s) failed", failures);
    }
    Ok(())
}

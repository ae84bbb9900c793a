use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_decision_engine::application::persistence::JsonLinesRepository;
use futures_decision_engine::application::{Orchestrator, TradeOutcomeReconciler};
use futures_decision_engine::config::Config;
use futures_decision_engine::domain::market::Timeframe;
use futures_decision_engine::infrastructure::mock::{MockMarketDataSource, MockOrderSink, MockPredictor};
use futures_decision_engine::infrastructure::replay::{ReplayMarketDataSource, StubOrderSink};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "futures-decision-engine", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the live decision loop against a `MarketDataSource`/`OrderSink`
    /// pair (the bundled mock demo adapter, since a real exchange client is
    /// an out-of-scope collaborator).
    Run {
        /// Number of cycles to run before exiting; omit to loop forever.
        #[arg(long)]
        cycles: Option<u32>,
        /// Seconds between cycles.
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },
    /// Replay pre-recorded CSV candle series through the same pipeline,
    /// dispatching to a stub `OrderSink` instead of a real exchange.
    Backtest {
        /// Directory containing `<symbol>_<timeframe>.csv` files.
        #[arg(long)]
        data_dir: std::path::PathBuf,
        /// Number of cycles to replay.
        #[arg(long, default_value_t = 100)]
        cycles: u32,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return ExitCode::from(2);
        }
    };

    let result = runtime.block_on(async move {
        match cli.command {
            Command::Run { cycles, interval_secs } => run_live(config, cycles, interval_secs).await,
            Command::Backtest { data_dir, cycles } => run_backtest(config, data_dir, cycles).await,
        }
    });

    match result {
        Ok(()) => {
            info!("shutdown complete");
            ExitCode::from(0)
        }
        Err(e) => {
            error!(error = %e, "unrecoverable runtime error");
            ExitCode::from(2)
        }
    }
}

async fn run_live(config: Config, cycles: Option<u32>, interval_secs: u64) -> anyhow::Result<()> {
    let persistence_dir = config.persistence_dir.clone();
    let market_data = Arc::new(MockMarketDataSource);
    let predictor = Arc::new(MockPredictor);
    let order_sink = Arc::new(MockOrderSink::new());
    let repository = Arc::new(JsonLinesRepository::new(persistence_dir));
    let reconciler = Arc::new(TradeOutcomeReconciler::new());

    let orchestrator = Orchestrator::new(config, market_data, predictor, order_sink, repository, reconciler);

    let mut remaining = cycles;
    loop {
        orchestrator.run_cycle().await;
        if let Some(n) = remaining.as_mut() {
            *n -= 1;
            if *n == 0 {
                break;
            }
        }
        tokio::time::sleep(std::time::Duration::from_secs(interval_secs)).await;
    }
    Ok(())
}

async fn run_backtest(config: Config, data_dir: std::path::PathBuf, cycles: u32) -> anyhow::Result<()> {
    let persistence_dir = config.persistence_dir.clone();
    let mut replay = ReplayMarketDataSource::new();
    for symbol in &config.symbols {
        for tf in Timeframe::all() {
            let path = data_dir.join(format!("{symbol}_{}.csv", tf.as_str()));
            replay.load_csv(symbol, tf, &path)?;
        }
    }
    let market_data = Arc::new(replay);
    let predictor = Arc::new(MockPredictor);
    let order_sink = Arc::new(StubOrderSink::new());
    let repository = Arc::new(JsonLinesRepository::new(persistence_dir));
    let reconciler = Arc::new(TradeOutcomeReconciler::new());

    let orchestrator = Orchestrator::new(config, market_data, predictor, order_sink, repository, reconciler);

    for _ in 0..cycles {
        orchestrator.run_cycle().await;
    }
    Ok(())
}

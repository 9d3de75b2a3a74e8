use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::EnvFilter;

use backtest::{read_ohlc_path, simulate, BacktestOptions, BacktestTable};
use common::{Config, TIME_FORMAT};
use engine::{EodhdClient, Scheduler, Session, SessionConfig, SignalService};
use strategy::{parse_params, StrategyConfig, StrategyFileConfig, StrategyRegistry};
use telegram_ctrl::{start_bot, BotDeps, TelegramNotifier};

#[derive(Parser)]
#[command(
    name = "signalbot",
    version,
    about = "Technical-analysis signal bot with a backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live bot (default): scheduled evaluation plus Telegram commands
    Run,
    /// Simulate a CSV signal table with `close` and `signal` columns
    Backtest(BacktestArgs),
    /// Run a strategy over an OHLC CSV and print the signal series as CSV
    Signals(SignalsArgs),
}

#[derive(Args)]
struct BacktestArgs {
    /// Signal table to simulate
    #[arg(long)]
    csv: String,

    /// Round-trip trading cost as a fraction
    #[arg(long, default_value_t = 0.001)]
    fee: f64,

    /// Close a position still open at the end at the last close
    #[arg(long, default_value_t = false)]
    mark_to_market: bool,
}

#[derive(Args)]
struct SignalsArgs {
    /// OHLC history with a time column and at least `close`
    #[arg(long)]
    csv: String,

    #[arg(long, default_value = "sma")]
    strategy: String,

    /// Parameter override, repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,
}

/// One output row of `signals`; readable back by `backtest`.
#[derive(Serialize)]
struct SignalRecord {
    datetime: String,
    close: f64,
    signal: i8,
    position: i8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    // stderr keeps stdout clean for CSV output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run().await,
        Commands::Backtest(args) => backtest_csv(args),
        Commands::Signals(args) => signals_csv(args),
    }
}

async fn run() -> Result<()> {
    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("Failed to load configuration")?;
    let strategy = match &cfg.strategy_config_path {
        Some(path) => StrategyFileConfig::load(path)?.strategy,
        None => StrategyConfig::default(),
    };
    // Reject a bad strategy file before anything starts
    StrategyRegistry::from_config(&strategy)?;
    info!(
        symbol = %cfg.default_symbol,
        interval = %cfg.default_interval,
        strategy = %strategy,
        "SignalBot starting"
    );

    // ── Collaborators ─────────────────────────────────────────────────────────
    let mut market = EodhdClient::new(&cfg.eodhd_api_token)?;
    if let Some(url) = &cfg.eodhd_base_url {
        market = market.with_base_url(url);
    }
    let bot = Bot::new(&cfg.telegram_token);
    let notifier = TelegramNotifier::new(bot.clone(), &cfg.telegram_chat_ids);

    // ── Session + service ─────────────────────────────────────────────────────
    let session = Session::new(SessionConfig::from_config(&cfg, strategy));
    let service = Arc::new(SignalService::new(
        session,
        Arc::new(market),
        Arc::new(notifier),
    ));

    // ── Spawn tasks ───────────────────────────────────────────────────────────
    let period = Duration::from_secs(cfg.poll_interval_secs);
    let scheduler = tokio::spawn(Scheduler::new(service.clone()).run(period));

    let bot_deps = BotDeps {
        service,
        allowed_user_ids: Arc::new(cfg.telegram_allowed_user_ids.clone()),
    };
    let bot_task = tokio::spawn(start_bot(bot, bot_deps));

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received. Exiting.");
    scheduler.abort();
    bot_task.abort();
    Ok(())
}

fn backtest_csv(args: BacktestArgs) -> Result<()> {
    let table = BacktestTable::from_csv_path(&args.csv)
        .with_context(|| format!("Failed to read signal table '{}'", args.csv))?;
    let opts = BacktestOptions {
        fee_rate: args.fee,
        mark_to_market: args.mark_to_market,
    };
    let report = simulate(&table, &opts)?;
    println!("{}", report.summary(&args.csv));
    Ok(())
}

fn signals_csv(args: SignalsArgs) -> Result<()> {
    let params = parse_params(&args.strategy, args.params.iter().map(String::as_str))?;
    let strategy = StrategyRegistry::create(&args.strategy, &params)?;
    let series = read_ohlc_path(&args.csv)
        .with_context(|| format!("Failed to read OHLC history '{}'", args.csv))?;
    let signals = strategy.generate_signals(&series)?;

    let mut out = csv::Writer::from_writer(io::stdout().lock());
    for row in signals.rows() {
        out.serialize(SignalRecord {
            datetime: row.candle.timestamp.format(TIME_FORMAT).to_string(),
            close: row.candle.close,
            signal: row.signal.value(),
            position: row.position,
        })?;
    }
    out.flush()?;
    info!(strategy = strategy.name(), rows = signals.len(), "Signals written");
    Ok(())
}

// Engine main entry point: one evaluation cycle over CSV candles
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use engine::config::{load_user_configs, EngineSettings};
use engine::data::MarketDataStore;
use engine::filter::{FilterStateStore, JsonFileFilterStateStore, MemoryFilterStateStore, SignalGate};
use engine::services::SignalEngine;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "engine", about = "Confluence signal engine with anti-spam filtering")]
struct Args {
    /// Engine settings JSON; defaults are used when omitted
    #[arg(long)]
    settings: Option<PathBuf>,

    /// JSON array of user monitoring configs
    #[arg(long)]
    users: PathBuf,

    /// Directory of SYMBOL_TIMEFRAME.csv candle files
    #[arg(long)]
    candles: PathBuf,

    /// Filter state file, kept in memory when omitted
    #[arg(long)]
    state: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => EngineSettings::load(path).with_context(|| format!("loading settings from {}", path.display()))?,
        None => EngineSettings::default(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(settings.tracing_level())
        .init();

    info!("Starting signal engine...");

    let users = load_user_configs(&args.users)
        .with_context(|| format!("loading user configs from {}", args.users.display()))?;

    let mut market_data = MarketDataStore::new();
    market_data
        .load_dir(&args.candles)
        .with_context(|| format!("loading candles from {}", args.candles.display()))?;

    let store: Arc<dyn FilterStateStore> = match &args.state {
        Some(path) => Arc::new(
            JsonFileFilterStateStore::open(path)
                .with_context(|| format!("opening filter state {}", path.display()))?,
        ),
        None => Arc::new(MemoryFilterStateStore::new()),
    };

    let engine = SignalEngine::new(
        settings,
        users,
        Arc::new(RwLock::new(market_data)),
        Arc::new(SignalGate::new(store)),
    );
    let report = engine.run_cycle_report(Utc::now()).await;

    let mut out = std::io::stdout().lock();
    for record in report.records() {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    for delivery in report.deliveries() {
        writeln!(out, "{}", serde_json::to_string(delivery)?)?;
    }
    Ok(())
}

//! Runs a `SimpleSpreadStrategy` backtest from a JSON `BacktestConfig`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;

use sim_cli::common::{self, CommonArgs};
use sim_core::clock::Clock;
use sim_core::environment::Environment;
use sim_core::exchange::Exchange;
use sim_core::instrument::Instrument;
use sim_core::logging::init_logger;
use sim_core::parquet_source::ParquetDataSourceFactory;
use sim_core::world::World;
use sim_strategies::SimpleSpreadStrategy;

#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Spot instrument id, in `BASE-QUOTE` form (e.g. `BTC-USDT`).
    #[arg(long, default_value = "BTC-USDT")]
    inst_id: String,

    /// Tick size for the instrument's book.
    #[arg(long, default_value = "0.01")]
    tick_size: Decimal,

    /// Deviation from the rolling mid-price anchor, in basis points, that triggers a trade.
    #[arg(long, default_value = "50")]
    spread_bps: Decimal,

    /// Size of each market order, in base currency units.
    #[arg(long, default_value = "0.01")]
    order_size: Decimal,
}

fn split_inst_id(inst_id: &str) -> (String, String) {
    match inst_id.split_once('-') {
        Some((base, quote)) => (base.to_string(), quote.to_string()),
        None => (inst_id.to_string(), "USDT".to_string()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.common.log_level, args.common.json_logs);

    let config = args.common.load_config()?;
    let (base_ccy, quote_ccy) = split_inst_id(&args.inst_id);
    let instrument = Instrument::new_spot(args.inst_id.clone(), base_ccy, quote_ccy, args.tick_size);

    let mut exchanges = Vec::new();
    for name in &config.exchanges {
        let balances = config.initial_balance.get(name).cloned().unwrap_or_default();
        let factory = ParquetDataSourceFactory::new(&config.data_root);
        let exchange = Exchange::new(name.clone(), Box::new(factory), config.max_interval, config.mid_window, balances)
            .with_context(|| format!("constructing exchange {name}"))?;
        exchanges.push((name.clone(), exchange));
    }
    let environment = Environment::new(config.start, exchanges);

    let primary_exchange = config.exchanges.first().cloned().context("config.exchanges must be non-empty")?;
    let strategy = SimpleSpreadStrategy::new(primary_exchange, instrument, args.spread_bps, args.order_size, 1);

    let clock = Clock::new(config.start, config.end).context("constructing clock")?;
    let interrupted = Arc::new(AtomicBool::new(false));
    let ctrlc_flag = interrupted.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::warn!("received shutdown signal, finishing current tick then stopping");
        ctrlc_flag.store(true, Ordering::Release);
    }) {
        tracing::warn!("failed to set Ctrl-C handler: {e}; shutdown via backtest bounds only");
    }
    let stop_condition = Box::new(move |_: &Environment| interrupted.load(Ordering::Acquire));
    let world = World::new(clock, environment, Box::new(strategy), config.eval_step, config.hist_level, Some(stop_condition));

    let history = world.run()?;
    common::report(&history, args.common.output.as_ref())?;
    Ok(())
}

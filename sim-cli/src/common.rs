//! Shared CLI plumbing for the backtest binaries: argument parsing, config loading,
//! logging setup, and the final report.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sim_core::config::BacktestConfig;
use sim_core::history::History;

/// Arguments common to every backtest binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Path to a JSON `BacktestConfig`.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Where to write the resulting history JSON. Printed to stdout if omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log level, used only when `RUST_LOG` is unset.
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit structured JSON logs instead of plain text.
    #[arg(long)]
    pub json_logs: bool,
}

impl CommonArgs {
    pub fn load_config(&self) -> Result<BacktestConfig> {
        let raw = fs::read_to_string(&self.config)
            .with_context(|| format!("reading config file {}", self.config.display()))?;
        let config: BacktestConfig =
            serde_json::from_str(&raw).with_context(|| format!("parsing config file {}", self.config.display()))?;
        config.validate().context("config failed validation")?;
        Ok(config)
    }
}

/// Writes the finished `History` to `output`, or prints it to stdout.
pub fn report(history: &History, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            history.save(path).with_context(|| format!("writing history to {}", path.display()))?;
            tracing::info!(path = %path.display(), entries = history.len(), "backtest finished");
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&history.as_json())?);
        }
    }
    Ok(())
}

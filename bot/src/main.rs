use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod replay;

use commands::{BacktestArgs, GridArgs, IndicatorsArgs, PaperArgs, WalkforwardArgs};

#[derive(Parser)]
#[command(
    name = "quant-bot",
    version,
    about = "Score-based futures strategy: backtests, parameter search and paper trading",
    propagate_version = true
)]
struct Cli {
    /// JSON config file (defaults plus QUANT_* environment overrides when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest on a kline CSV
    Backtest(BacktestArgs),
    /// Simulate every combination of the parameter grid
    Grid(GridArgs),
    /// Walk-forward parameter selection
    Walkforward(WalkforwardArgs),
    /// Dump indicator and score columns as CSV
    Indicators(IndicatorsArgs),
    /// Drive the live trader against recorded klines
    Paper(PaperArgs),
    /// Print the effective configuration as JSON
    Config,
    /// Print build information
    Version,
}

/// Logs go to stderr so that report and CSV output on stdout stays clean
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        config: config_file,
        command,
        ..
    } = cli;
    let config_path = config_file.as_deref();

    match command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Config => {
            let config = config::load(config_path)?;
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
        Commands::Backtest(args) => commands::backtest::run(&config::load(config_path)?, &args),
        Commands::Grid(args) => commands::grid::run(&config::load(config_path)?, &args),
        Commands::Walkforward(args) => commands::walkforward::run(&config::load(config_path)?, &args),
        Commands::Indicators(args) => commands::indicators::run(&config::load(config_path)?, &args),
        Commands::Paper(args) => commands::paper::run(config::load(config_path)?, &args).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    if let Err(err) = run(cli).await {
        tracing::error!(error = %format!("{:#}", err), "command failed");
        eprintln!("[error] {:#}", err);
        std::process::exit(1);
    }
}

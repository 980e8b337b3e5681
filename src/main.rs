//! Implied volatility regime analytics - main entry point
//!
//! This binary provides two subcommands:
//! - analyze: Run the regime analysis and print a report
//! - export: Write the annualized IV and percentile series as CSV

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "iv-regime")]
#[command(about = "Implied volatility percentile, regime and breakpoint regression analysis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Where the bars come from and how to analyze them
#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// CSV file with date,open,high,low,close,volume columns
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Symbol; resolves to {data_dir}/{SYMBOL}_1d.csv when --input is omitted
    #[arg(short, long)]
    symbol: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<String>,

    /// Annualization factor (periods per year)
    #[arg(long)]
    annualization: Option<f64>,

    /// Rolling percentile window
    #[arg(long)]
    percentile_window: Option<usize>,

    /// Forward averaging window
    #[arg(long)]
    forward_window: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the volatility regime analysis
    Analyze {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the annualized IV and percentile series as CSV
    Export {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Keep stdout clean for piped CSV and JSON
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        // Same format without ANSI colors
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Analyze { json, .. } => ("analyze", *json),
        Commands::Export { output, .. } => ("export", output.is_none()),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Analyze { source, json } => commands::analyze::run(source, json).await,
        Commands::Export { source, output } => commands::export::run(source, output).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_console_and_file() {
        setup_logging(false, "test", false).unwrap();
        info!("console and file layers installed");
        assert!(PathBuf::from("logs").is_dir());
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "iv-regime",
            "analyze",
            "--input",
            "data/SPY_1d.csv",
            "--forward-window",
            "20",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze { source, json } => {
                assert!(json);
                assert_eq!(source.forward_window, Some(20));
                assert_eq!(source.input, Some(PathBuf::from("data/SPY_1d.csv")));
            }
            other => panic!("expected analyze, got {:?}", other),
        }
    }
}

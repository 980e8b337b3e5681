//! Subcommand implementations

pub mod analyze;
pub mod export;

use anyhow::{Context, Result};
use iv_regime::data::{self, BarRequest, BarSource, CsvBarSource};
use iv_regime::{Bar, Config, Symbol};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::SourceArgs;

/// Load configuration and apply command-line overrides
pub fn load_config(args: &SourceArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let config = Config::from_file(path)?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        None => {
            let mut config = Config::default();
            config.apply_env();
            config
        }
    };

    if let Some(factor) = args.annualization {
        info!("Overriding annualization factor to: {}", factor);
        config.analysis.annualization_factor = factor;
    }
    if let Some(window) = args.percentile_window {
        info!("Overriding percentile window to: {}", window);
        config.analysis.percentile_window = window;
    }
    if let Some(window) = args.forward_window {
        info!("Overriding forward window to: {}", window);
        config.analysis.forward_window = window;
    }

    config
        .analysis
        .validate()
        .context("Invalid analysis configuration")?;
    Ok(config)
}

/// Fetch bars for the requested symbol/file and date range
pub async fn load_bars(args: &SourceArgs, config: &Config) -> Result<(Symbol, Vec<Bar>)> {
    let start = args.start.as_deref().map(data::parse_date).transpose()?;
    let end = args.end.as_deref().map(data::parse_date).transpose()?;

    let (symbol, source): (Symbol, Arc<dyn BarSource>) = match (&args.input, &args.symbol) {
        (Some(path), symbol) => {
            let symbol = symbol.as_deref().map(Symbol::new).unwrap_or_else(|| {
                Symbol::new(
                    path.file_stem()
                        .and_then(|s| s.to_str())
                        .and_then(|s| s.split('_').next())
                        .unwrap_or("UNKNOWN"),
                )
            });
            (
                symbol,
                Arc::new(CsvBarSource::from_file(path)) as Arc<dyn BarSource>,
            )
        }
        (None, Some(symbol)) => (
            Symbol::new(symbol),
            Arc::new(CsvBarSource::from_dir(&config.data.data_dir)) as Arc<dyn BarSource>,
        ),
        (None, None) => anyhow::bail!("Either --input or --symbol is required"),
    };

    info!("Querying implied volatility for {}...", symbol);
    let request = BarRequest {
        symbol: symbol.clone(),
        start,
        end,
    };
    let timeout = Duration::from_secs(config.data.fetch_timeout_secs);
    let bars = data::fetch_with_timeout(source, request, timeout).await?;

    Ok((symbol, bars))
}

//! Export command implementation

use anyhow::{Context, Result};
use iv_regime::{data, pipeline};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

use crate::SourceArgs;

pub async fn run(source: SourceArgs, output: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(&source)?;
    let (symbol, bars) = super::load_bars(&source, &config).await?;

    let (vols, percentiles) = pipeline::transform(&bars, &config.analysis)
        .context(format!("No IV data available for {}", symbol))?;

    match output {
        Some(path) => {
            let file = File::create(&path)
                .context(format!("Failed to create {}", path.display()))?;
            data::write_series_csv(BufWriter::new(file), &vols, &percentiles)?;
            info!("Wrote {} rows for {} to {}", vols.len(), symbol, path.display());
        }
        None => {
            data::write_series_csv(std::io::stdout().lock(), &vols, &percentiles)?;
            info!("Wrote {} rows for {} to stdout", vols.len(), symbol);
        }
    }

    Ok(())
}

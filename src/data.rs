//! Data loading and export
//!
//! Loads daily implied-volatility bars from CSV files and runs bar sources
//! under a bounded wait. The analytics engine never calls into this module;
//! callers fetch bars here and hand the finished series to the pipeline.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::series::{PercentileSeries, VolatilitySeries};
use crate::{Bar, Symbol};

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Parse a bar date in any of the layouts data vendors emit
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| s.parse::<DateTime<Utc>>().map(|dt| dt.date_naive()))
        .context(format!("Failed to parse date: {}", s))
}

/// Load daily bars from a CSV file with `date,open,high,low,close,volume` columns
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .context(format!("Failed to open CSV file {}", path.as_ref().display()))?;

    let mut bars = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let date = parse_date(record.get(0).context("Missing date column")?)?;
        let open: f64 = field(&record, 1, "open")?;
        let high: f64 = field(&record, 2, "high")?;
        let low: f64 = field(&record, 3, "low")?;
        let close: f64 = field(&record, 4, "close")?;
        let volume: i64 = match record.get(5).map(str::trim) {
            None | Some("") => -1,
            Some(v) => v
                .parse::<f64>()
                .map(|v| v as i64)
                .context("Failed to parse volume")?,
        };

        let bar = Bar::new(date, open, high, low, close, volume)
            .context(format!("Invalid bar at row {} ({})", row_idx + 1, date))?;
        bars.push(bar);
    }

    ensure_ordered(&bars)?;
    Ok(bars)
}

fn field(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64> {
    record
        .get(idx)
        .context(format!("Missing {} column", name))?
        .trim()
        .parse()
        .context(format!("Failed to parse {}", name))
}

/// Dates must be strictly increasing
pub fn ensure_ordered(bars: &[Bar]) -> Result<()> {
    if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        anyhow::bail!(
            "Bars are not strictly increasing by date: {} followed by {}",
            pair[0].date,
            pair[1].date
        );
    }
    Ok(())
}

/// Keep bars inside an inclusive date range
pub fn filter_range(bars: Vec<Bar>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| start.map_or(true, |s| b.date >= s) && end.map_or(true, |e| b.date <= e))
        .collect()
}

/// Conventional file location for a symbol's daily bars
pub fn symbol_path(data_dir: impl AsRef<Path>, symbol: &Symbol) -> PathBuf {
    data_dir
        .as_ref()
        .join(format!("{}_1d.csv", symbol.as_str()))
}

// =============================================================================
// Bar Sources
// =============================================================================

/// What to fetch
#[derive(Debug, Clone, PartialEq)]
pub struct BarRequest {
    pub symbol: Symbol,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Anything that can produce an ordered series of daily bars
pub trait BarSource: Send + Sync {
    fn fetch(&self, request: &BarRequest) -> Result<Vec<Bar>>;
}

/// Bars read from a CSV file (or `{data_dir}/{SYMBOL}_1d.csv`)
pub struct CsvBarSource {
    path: Option<PathBuf>,
    data_dir: PathBuf,
}

impl CsvBarSource {
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            data_dir: PathBuf::new(),
        }
    }

    pub fn from_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: None,
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, symbol: &Symbol) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| symbol_path(&self.data_dir, symbol))
    }
}

impl BarSource for CsvBarSource {
    fn fetch(&self, request: &BarRequest) -> Result<Vec<Bar>> {
        let path = self.resolve(&request.symbol);
        let bars = load_csv(&path).context(format!("Failed to load data for {}", request.symbol))?;
        let total = bars.len();
        let bars = filter_range(bars, request.start, request.end);

        info!(
            "Loaded {} of {} bars for {} from {}",
            bars.len(),
            total,
            request.symbol,
            path.display()
        );
        Ok(bars)
    }
}

/// Run a source on its own thread, giving up after `timeout`.
///
/// A timeout or an empty result yields an empty series; the pipeline then
/// reports "insufficient data" instead of failing. A source still running
/// after the timeout is detached and does not hold up runtime shutdown.
pub async fn fetch_with_timeout(
    source: Arc<dyn BarSource>,
    request: BarRequest,
    timeout: Duration,
) -> Result<Vec<Bar>> {
    let symbol = request.symbol.clone();
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name(format!("fetch-{}", symbol))
        .spawn(move || {
            // Receiver is gone once the caller timed out
            let _ = tx.send(source.fetch(&request));
        })
        .context("Failed to spawn bar fetch thread")?;

    match tokio::time::timeout(timeout, rx).await {
        Ok(received) => {
            let bars = received.context("Bar fetch thread panicked")??;
            if bars.is_empty() {
                warn!("No IV data received for {}", symbol);
            } else if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
                info!(
                    "Received {} implied volatility bars for {}: {} to {}",
                    bars.len(),
                    symbol,
                    first.date,
                    last.date
                );
            }
            Ok(bars)
        }
        Err(_) => {
            warn!(
                "No IV data received for {} within {:?}, may not be available",
                symbol, timeout
            );
            Ok(Vec::new())
        }
    }
}

// =============================================================================
// Export
// =============================================================================

/// Write `date,implied_vol,iv_percentile` rows; the percentile is blank
/// during the warmup window
pub fn write_series_csv<W: Write>(
    writer: W,
    vols: &VolatilitySeries,
    percentiles: &PercentileSeries,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["date", "implied_vol", "iv_percentile"])?;

    for (vol, pct) in vols.points().iter().zip(percentiles.points()) {
        csv_writer.write_record([
            vol.date.format("%Y-%m-%d").to_string(),
            vol.vol.to_string(),
            pct.percentile.map(|p| p.to_string()).unwrap_or_default(),
        ])?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{annualize, rolling_percentile};
    use std::fs;

    fn temp_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("iv_regime_{}_{}.csv", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_date_formats() {
        let want = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15").unwrap(), want);
        assert_eq!(parse_date("20240315").unwrap(), want);
        assert_eq!(parse_date("2024-03-15 16:00:00").unwrap(), want);
        assert_eq!(parse_date("2024-03-15T16:00:00Z").unwrap(), want);
        assert!(parse_date("15/03/2024").is_err());
    }

    #[test]
    fn test_load_csv() {
        let path = temp_csv(
            "load",
            "date,open,high,low,close,volume\n\
             2024-01-02,0.010,0.012,0.009,0.011,-1\n\
             2024-01-03,0.011,0.013,0.010,0.012,\n",
        );
        let bars = load_csv(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 0.011);
        assert_eq!(bars[0].volume, -1);
        assert_eq!(bars[1].volume, -1);
    }

    #[test]
    fn test_load_csv_rejects_unsorted() {
        let path = temp_csv(
            "unsorted",
            "date,open,high,low,close,volume\n\
             2024-01-03,0.01,0.01,0.01,0.01,0\n\
             2024-01-02,0.01,0.01,0.01,0.01,0\n",
        );
        let result = load_csv(&path);
        fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_load_csv_rejects_invalid_bar() {
        let path = temp_csv(
            "invalid",
            "date,open,high,low,close,volume\n\
             2024-01-02,0.01,0.005,0.01,0.01,0\n",
        );
        let result = load_csv(&path);
        fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_range() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<Bar> = (0..10)
            .map(|i| Bar::from_close(start + chrono::Duration::days(i), 0.01))
            .collect();

        let from = NaiveDate::from_ymd_opt(2024, 1, 3);
        let to = NaiveDate::from_ymd_opt(2024, 1, 5);
        let filtered = filter_range(bars.clone(), from, to);
        assert_eq!(filtered.len(), 3);
        assert_eq!(filter_range(bars, None, None).len(), 10);
    }

    #[test]
    fn test_symbol_path() {
        let path = symbol_path("data", &Symbol::new("spy"));
        assert_eq!(path, PathBuf::from("data").join("SPY_1d.csv"));
    }

    #[test]
    fn test_write_series_csv() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<Bar> = (0..3)
            .map(|i| Bar::from_close(start + chrono::Duration::days(i), 0.01 * (i + 1) as f64))
            .collect();
        let vols = annualize(&bars, 1.0).unwrap();
        let pct = rolling_percentile(&vols, 2);

        let mut out = Vec::new();
        write_series_csv(&mut out, &vols, &pct).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "date,implied_vol,iv_percentile");
        assert_eq!(lines[1], "2024-01-01,0.01,");
        assert_eq!(lines[2], "2024-01-02,0.02,1");
        assert_eq!(lines.len(), 4);
    }

    struct SlowSource;

    impl BarSource for SlowSource {
        fn fetch(&self, _request: &BarRequest) -> Result<Vec<Bar>> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(vec![Bar::from_close(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                0.01,
            )])
        }
    }

    fn request() -> BarRequest {
        BarRequest {
            symbol: Symbol::new("SPY"),
            start: None,
            end: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout_yields_empty() {
        let bars = fetch_with_timeout(Arc::new(SlowSource), request(), Duration::from_millis(20))
            .await
            .unwrap();
        assert!(bars.is_empty());
    }

    struct StuckSource;

    impl BarSource for StuckSource {
        fn fetch(&self, _request: &BarRequest) -> Result<Vec<Bar>> {
            std::thread::sleep(Duration::from_secs(3));
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_fetch_timeout_does_not_block_shutdown() {
        let started = std::time::Instant::now();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let bars = runtime
            .block_on(fetch_with_timeout(
                Arc::new(StuckSource),
                request(),
                Duration::from_millis(50),
            ))
            .unwrap();
        drop(runtime);

        assert!(bars.is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    struct PanickingSource;

    impl BarSource for PanickingSource {
        fn fetch(&self, _request: &BarRequest) -> Result<Vec<Bar>> {
            panic!("source failed");
        }
    }

    #[tokio::test]
    async fn test_fetch_panic_is_error() {
        let result =
            fetch_with_timeout(Arc::new(PanickingSource), request(), Duration::from_secs(5)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_completes() {
        let bars = fetch_with_timeout(Arc::new(SlowSource), request(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(bars.len(), 1);
    }
}

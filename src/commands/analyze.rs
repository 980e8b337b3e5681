//! Analyze command implementation

use anyhow::Result;
use iv_regime::breakpoint::{BreakpointAnalysis, RegimeFit};
use iv_regime::regime::RegimeReading;
use iv_regime::regression::RegressionResult;
use iv_regime::report::RegressionOutcome;
use iv_regime::{pipeline, AnalysisError, Report};
use tracing::info;

use crate::SourceArgs;

pub async fn run(source: SourceArgs, json: bool) -> Result<()> {
    info!("Starting analysis");

    let config = super::load_config(&source)?;
    let (symbol, bars) = super::load_bars(&source, &config).await?;

    let report = match pipeline::run(&bars, &config.analysis) {
        Ok(report) => report.with_symbol(symbol),
        Err(AnalysisError::InsufficientData) => {
            anyhow::bail!("No IV data available for {}; fetch data before analyzing", symbol)
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    info!("Analysis completed successfully");
    Ok(())
}

fn print_report(report: &Report) {
    let current = &report.current;
    let title = match &report.symbol {
        Some(symbol) => format!("IMPLIED VOLATILITY ANALYSIS: {}", symbol),
        None => "IMPLIED VOLATILITY ANALYSIS".to_string(),
    };

    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
    println!(
        "Date Range:         {} to {} ({} bars)",
        current.first_date, current.date, current.observations
    );
    println!(
        "Current IV:         {:.4} ({:.2}%)",
        current.current_vol,
        current.current_vol * 100.0
    );
    println!(
        "Annualization:      sqrt({}) factor",
        current.annualization_factor
    );
    println!(
        "Statistics:         Min: {:.3} | Mean: {:.3} | Max: {:.3}",
        current.min_vol, current.mean_vol, current.max_vol
    );
    println!(
        "Quartiles:          25th: {:.3} | 75th: {:.3}",
        current.q25_vol, current.q75_vol
    );

    println!("{}", "-".repeat(60));
    match &report.regime {
        RegimeReading::Classified(c) => {
            println!("Regime:             {}", c.regime);
            println!("Percentile:         {:.1}%", c.percentile * 100.0);
            println!("Reversion:          {}", c.signal);
        }
        RegimeReading::NoData => {
            println!("Regime:             N/A");
            println!("Percentile:         N/A");
            println!("Reversion:          N/A");
        }
    }

    println!("{}", "-".repeat(60));
    match &report.regression {
        RegressionOutcome::Completed {
            rows,
            analysis,
            insights,
        } => {
            println!("Analysis rows:      {}", rows);
            print_analysis(analysis);
            println!("{}", "-".repeat(60));
            println!("INSIGHT: {}", insights.forward_message());
            println!("INSIGHT: {}", insights.diff_message());
        }
        RegressionOutcome::InsufficientHistory { rows, required } => {
            println!(
                "Insufficient IV data for analysis ({} rows, need {})",
                rows, required
            );
        }
        RegressionOutcome::Degenerate { rows } => {
            println!(
                "Regression unavailable: current IV is constant across {} rows",
                rows
            );
        }
    }
    println!("{}", "=".repeat(60));
}

fn print_fit(fit: &RegressionResult, indent: &str) {
    println!(
        "{}Slope: {:.4}, Intercept: {:.4}",
        indent, fit.slope, fit.intercept
    );
    println!(
        "{}R²: {:.4}, P-value: {:.4}, Std Err: {:.4}",
        indent,
        fit.r_squared(),
        fit.p_value,
        fit.std_err
    );
}

fn print_analysis(analysis: &BreakpointAnalysis) {
    println!("Regression 1 - Forward Vol on Current Vol:");
    print_fit(&analysis.unconditional, "  ");
    if analysis.used_fallback() {
        println!(
            "  Slope is 1; regime split at median Vol = {:.4}",
            analysis.breakpoint
        );
    } else {
        println!(
            "  Intersection with y=x at Vol = {:.4}",
            analysis.breakpoint
        );
    }

    println!("Regression 2 - Vol Difference on Current Vol:");
    print_fit(&analysis.diff, "  ");

    println!("Regime Analysis:");
    print_regime(
        &format!("HIGH VOL regime (Vol > {:.3})", analysis.breakpoint),
        "HIGH VOL regime",
        &analysis.high,
    );
    print_regime(
        &format!("LOW VOL regime (Vol <= {:.3})", analysis.breakpoint),
        "LOW VOL regime",
        &analysis.low,
    );
}

fn print_regime(heading: &str, name: &str, regime: &RegimeFit) {
    match regime {
        RegimeFit::Fitted {
            fit,
            min_vol,
            max_vol,
        } => {
            println!("  {}:", heading);
            print_fit(fit, "    ");
            println!(
                "    Data points: {} (Vol {:.3} - {:.3})",
                fit.sample_size, min_vol, max_vol
            );
            println!(
                "    Fitted diff: {:+.4} at {:.3}, {:+.4} at {:.3}",
                fit.predict(*min_vol),
                min_vol,
                fit.predict(*max_vol),
                max_vol
            );
        }
        RegimeFit::InsufficientData { rows, .. } => {
            println!("  {}: Insufficient data for regression ({} rows)", name, rows);
        }
        RegimeFit::Degenerate { rows } => {
            println!("  {}: Constant volatility, no regression ({} rows)", name, rows);
        }
    }
}

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tickerlens::prelude::*;
use time::macros::format_description;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Compares the CSV files (or directories of CSV files) given on the command line, or the
/// bundled fixtures if none are.
///
/// ```text
/// cargo run --example compare -- data/TCS.csv data/INFY.csv
/// cargo run --example compare -- data/
/// ```
fn main() -> Result<()> {
    let _guard = init_tracing()?;

    let config = match env::var("TICKERLENS_CONFIG") {
        Ok(path) => DashboardConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        Err(_) => DashboardConfig::default(),
    };

    let uploads = input_files()?
        .iter()
        .map(|p| Upload::from_path(p).with_context(|| format!("Failed to read {}", p.display())))
        .collect::<Result<Vec<_>>>()?;

    let mut batch = Batch::process(&uploads, &config)?;

    println!("\n--- Batch ---");
    for table in batch.tables() {
        println!(
            "{:<12} rows={:<5} close_rule={:<14} dropped={}",
            table.instrument().as_str(),
            table.row_count(),
            table.close_rule().to_string(),
            table.dropped_rows()
        );
    }
    for issue in batch.issues() {
        println!("skipped {}: {}", issue.file_name, issue.error);
    }

    let comparable: Vec<&str> = batch.comparison_set().iter().collect();
    println!("\nComparable columns: {comparable:?}");

    let panels = batch.default_panels()?;
    for panel in &panels {
        println!("\n[{}] {}", panel.kind, panel.title);
        for series in &panel.series {
            println!(
                "  {:<12} {} points, {} defined",
                series.instrument.as_str(),
                series.len(),
                series.defined()
            );
        }
    }

    println!("\n--- Summaries ---");
    for s in batch.summaries()? {
        let close = s.latest_close.map(Price).map_or("n/a".to_string(), |p| p.to_string());
        let mean = s.mean_return.map_or("n/a".to_string(), |r| format!("{:.4}%", r * 100.0));
        println!("{:<12} close={close:<10} mean_return={mean}", s.instrument.as_str());
    }

    let provider = HistoricalQuoteProvider::from_tables(batch.tables(), config.quote_suffix())?;
    println!("\n--- Live Quotes ---");
    for quote in batch.live_quotes(&provider) {
        println!("{:<16} {:?}", quote.symbol, quote.status);
    }

    if let Some(forecast) = batch.forecast_best(&LinearTrendForecaster) {
        let last = forecast.points.last().and_then(|p| p.value.map(|v| (p.date, v)));
        println!(
            "\nForecast for {} (r^2 = {:.3}): {:?}",
            forecast.instrument, forecast.r_squared, last
        );
    }

    println!("\n--- Links ---");
    for links in batch.links() {
        println!("{:<12} {} | {}", links.instrument.as_str(), links.quote_page, links.website);
    }

    let out_dir = env::temp_dir().join("tickerlens").join("reports");
    fs::create_dir_all(&out_dir)?;
    batch.export_csv(&out_dir)?;
    let panels_json = panels
        .iter()
        .map(ChartPanel::to_json)
        .collect::<TickerlensResult<Vec<_>>>()?;
    fs::write(
        out_dir.join("comparison_panels.json"),
        serde_json::to_string_pretty(&panels_json)?,
    )?;
    info!(dir = %out_dir.display(), "Reports written");

    drop(_guard);
    Ok(())
}

fn input_files() -> Result<Vec<PathBuf>> {
    let mut args: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    if args.is_empty() {
        args.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures"));
    }

    let mut files = Vec::new();
    for arg in args {
        if arg.is_dir() {
            files.extend(csv_files_in(&arg)?);
        } else {
            files.push(arg);
        }
    }
    Ok(files)
}

fn csv_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    files.retain(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")));
    files.sort();
    Ok(files)
}

// ================================================================================================
// Tracing Configuration
// ================================================================================================

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let app_name = "tickerlens";

    // Detect if running in container
    let in_container = env::var("CONTAINER").is_ok() || Path::new("/.dockerenv").exists();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if in_container {
        // Container mode: log to stdout
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!("Logging to stdout (container mode)");
        Ok(None)
    } else {
        // Local mode: log to file
        let log_dir = dirs::state_dir()
            .or_else(dirs::home_dir)
            .map(|mut p| {
                p.push(app_name);
                p.push("logs");
                p
            })
            .context("Failed to find a state or home directory")?;
        fs::create_dir_all(&log_dir)?;

        let timestamp = time::OffsetDateTime::now_utc()
            .format(&format_description!(
                "[year][month][day]-[hour][minute][second]"
            ))
            .context("Failed to format timestamp")?;
        let file_name = format!("{app_name}-{timestamp}.log");

        let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(non_blocking)
            .with_current_span(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!(log_file = %log_dir.join(file_name).display(), "Logging to file (local mode)");
        Ok(Some(guard))
    }
}

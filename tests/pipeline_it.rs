use tickerlens::prelude::*;

mod common;

use common::{approx, fixture, fixture_path};

#[test]
fn two_files_compare_on_close() {
    let uploads = [fixture("A.csv"), fixture("B.csv")];
    let batch = Batch::process(&uploads, &DashboardConfig::default())
        .expect("valid config");

    assert!(batch.issues().is_empty(), "both files must normalize");
    assert_eq!(batch.tables().len(), 2);

    let b = batch.table("B").expect("B is in the batch");
    assert_eq!(b.close_rule(), CloseRule::Last);
    assert_eq!(b.closes().expect("closes"), [Some(50.0), Some(49.0)]);

    let set: Vec<&str> = batch.comparison_set().iter().collect();
    assert_eq!(set, ["Close", "Date"]);

    let panels = batch.default_panels().expect("Close is comparable");
    assert_eq!(panels.len(), 1);
    assert_eq!(panels[0].title, "Close Comparison");
    let instruments: Vec<&str> = panels[0]
        .series
        .iter()
        .map(|s| s.instrument.as_str())
        .collect();
    assert_eq!(instruments, ["A", "B"]);
    assert!(panels[0].series.iter().all(|s| s.len() == 2));
}

#[test]
fn missing_date_column_skips_only_that_file() {
    let uploads = [fixture("A.csv"), fixture("nodate.csv"), fixture("B.csv")];
    let batch = Batch::process(&uploads, &DashboardConfig::default())
        .expect("valid config");

    assert_eq!(
        batch.instruments().map(Instrument::as_str).collect::<Vec<_>>(),
        ["A", "B"]
    );
    assert_eq!(batch.issues().len(), 1);
    assert_eq!(batch.issues()[0].file_name, "nodate.csv");
    assert!(matches!(
        batch.issues()[0].error,
        TickerlensError::Ingest(IngestError::MissingDateColumn(_))
    ));
}

#[test]
fn row_mean_close_from_ohlc_without_close() {
    let batch = Batch::process(&[fixture("TITAN.csv")], &DashboardConfig::default())
        .expect("valid config");
    let t = batch.table("titan").expect("TITAN is in the batch");

    assert_eq!(t.close_rule(), CloseRule::RowMean);
    let closes = t.closes().expect("closes");
    assert!(approx(closes[0], (3600.0 + 3650.0 + 3590.0) / 3.0));
    assert!(approx(closes[1], (3620.0 + 3600.0) / 2.0), "mean skips the gap");
    assert_eq!(
        t.numeric_values("High").expect("High"),
        [Some(3650.0), Some(3650.0), Some(3700.0)],
        "gap is forward-filled after the mean is taken"
    );
}

#[test]
fn exchange_export_with_prefixed_headers() {
    let config = DashboardConfig::default().with_strip_header_prefixes(true);
    let batch = Batch::process(&[fixture("nse/NIFTY50 RELIANCE.csv")], &config)
        .expect("valid config");
    assert!(batch.issues().is_empty(), "issues: {:?}", batch.issues());

    let t = batch.table("RELIANCE").expect("prefix is stripped from the file name");
    assert_eq!(t.close_rule(), CloseRule::Last);
    assert_eq!(t.row_count(), 4);
    assert_eq!(t.dropped_rows(), 1);
    assert_eq!(
        t.closes().expect("closes"),
        [Some(2575.55), Some(2585.95), Some(2590.0), Some(2610.4)]
    );
    assert!(t.is_numeric("Open"));
    assert!(!t.is_numeric("Series"));
    assert_eq!(
        t.numeric_values("Low").expect("Low")[2],
        Some(2566.0),
        "missing Low is carried forward"
    );

    let dates = t.dates().expect("dates");
    assert_eq!(dates[0].format("%Y-%m-%d").to_string(), "2024-01-02");
}

#[test]
fn prefixed_headers_still_find_the_date_column() {
    let batch = Batch::process(
        &[fixture("nse/NIFTY50 RELIANCE.csv")],
        &DashboardConfig::default(),
    )
    .expect("valid config");
    let t = batch.tables().first().expect("table survives without cleaning");

    assert_eq!(t.instrument().as_str(), "NIFTY50 RELIANCE");
    assert!(t.has_column("NIFTY50 Open"));
    assert_eq!(t.row_count(), 4);
}

#[test]
fn metrics_and_summaries_over_the_batch() {
    let config = DashboardConfig::default().with_volatility_window(2);
    let batch = Batch::process(&[fixture("A.csv"), fixture("B.csv")], &config)
        .expect("valid config");

    let a = batch.metrics("A").expect("metrics for A");
    let r = a.returns().expect("returns");
    assert_eq!(r[0], None);
    assert!(approx(r[1], 0.02));

    let v = a.volatility().expect("volatility");
    assert_eq!(v[0], None);
    assert!(approx(v[1], 2.0f64.sqrt()), "sample std of [100, 102]");

    let best = batch
        .best_performer()
        .expect("summaries")
        .expect("a best performer");
    assert_eq!(best.instrument.as_str(), "A");
}

#[test]
fn collaborators_do_not_affect_the_pipeline() {
    let config = DashboardConfig::default();
    let mut batch = Batch::process(&[fixture("A.csv"), fixture("B.csv")], &config)
        .expect("valid config");

    let provider = HistoricalQuoteProvider::from_tables(batch.tables(), config.quote_suffix())
        .expect("provider from tables");
    let quotes = batch.live_quotes(&provider);
    assert_eq!(quotes[0].symbol, "A.NS");
    assert_eq!(quotes[0].status, QuoteStatus::Price(102.0));
    assert_eq!(quotes[1].status, QuoteStatus::Price(49.0));

    let forecast = batch
        .forecast_best(&LinearTrendForecaster)
        .expect("two rows are enough to forecast");
    assert_eq!(forecast.instrument.as_str(), "A");
    assert_eq!(forecast.points.len(), 30);
    assert!(approx(forecast.points[0].value, 104.0));

    let links = batch.links();
    assert_eq!(links.len(), 2);
    assert!(links[0].live_chart.contains("symbol=A&"));
    assert_eq!(batch.tables().len(), 2);
}

#[test]
fn export_writes_tables_and_metrics() {
    let batch = Batch::process(&[fixture("A.csv")], &DashboardConfig::default())
        .expect("valid config");
    let dir = std::env::temp_dir().join("tickerlens-pipeline-it");
    let _ = std::fs::remove_dir_all(&dir);

    batch.export_csv(&dir).expect("export should succeed");

    assert!(dir.join("a_normalized.csv").exists());
    let metrics = std::fs::read_to_string(dir.join("a_metrics.csv")).expect("metrics csv");
    assert!(metrics.starts_with("Date,Close,Returns,Volatility"));

    let json = batch
        .table("A")
        .expect("A is in the batch")
        .to_json()
        .expect("table serializes");
    assert_eq!(json.as_array().map(Vec::len), Some(2));
}

#[test]
fn config_file_drives_processing() {
    let dir = std::env::temp_dir().join("tickerlens-config-it");
    std::fs::create_dir_all(&dir).expect("failed to create temp dir");
    let path = dir.join("dashboard.json");
    std::fs::write(
        &path,
        r#"{ "default_columns": ["Close", "Volume"], "chart_kind": "Scatter" }"#,
    )
    .expect("failed to write config");

    let config = DashboardConfig::from_json_file(&path).expect("config loads");
    let batch = Batch::process(&[fixture("A.csv")], &config)
        .expect("valid config");
    let panels = batch.default_panels().expect("panels");

    assert_eq!(panels.len(), 1, "Volume is not comparable and is dropped");
    assert_eq!(panels[0].kind, ChartKind::Scatter);
    assert!(fixture_path("A.csv").exists());
}

#[test]
fn zero_volatility_window_is_rejected_up_front() {
    let config = DashboardConfig::default().with_volatility_window(0);
    let err = Batch::process(&[fixture("A.csv")], &config).expect_err("window 0 is invalid");
    assert!(
        matches!(err, TickerlensError::Config(ConfigError::Invalid(_))),
        "unexpected error: {err:?}"
    );
}

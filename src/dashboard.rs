use std::path::Path;

use itertools::{Itertools, izip};
use tracing::{debug, info, warn};

use crate::{
    config::DashboardConfig,
    data::{
        column::CanonicalCol,
        comparison::ComparisonSet,
        domain::{Instrument, Upload},
        header::HeaderCleaner,
        metrics::{DerivedMetrics, InstrumentSummary, best_performer},
        normalize::{NormalizedTable, normalize},
        raw::RawTable,
    },
    error::{DataError, TickerlensError, TickerlensResult},
    provider::{
        forecast::{Forecast, Forecaster},
        link::{InstrumentLinks, LinkResolver},
        quote::{LiveQuote, LiveQuoteProvider, fetch_quote},
    },
    report::{
        chart::{ChartKind, ChartPanel, PlotSeries},
        io::ToCsv,
    },
};

/// A file that was left out of the batch, and why.
#[derive(Debug)]
pub struct BatchIssue {
    pub file_name: String,
    pub error: TickerlensError,
}

/// Everything derived from one set of uploads.
///
/// Built in one pass by [`Batch::process`]. Later uploads never change it; a new set of
/// files means a new batch. Tables keep upload order. Only collaborator failures
/// (see [`Batch::forecast_best`]) are appended to the issues afterwards.
#[derive(Debug)]
pub struct Batch {
    config: DashboardConfig,
    tables: Vec<NormalizedTable>,
    metrics: Vec<DerivedMetrics>,
    comparison: ComparisonSet,
    issues: Vec<BatchIssue>,
}

impl Batch {
    #[tracing::instrument(skip_all, fields(files = uploads.len()))]
    pub fn process(uploads: &[Upload], config: &DashboardConfig) -> TickerlensResult<Self> {
        config.validate()?;
        let mut issues = Vec::new();

        // === Ingest ===
        let cleaner = config.strip_header_prefixes().then_some(HeaderCleaner);
        let raw: Vec<RawTable> = uploads
            .iter()
            .filter_map(|upload| {
                let parsed = match &cleaner {
                    Some(c) => RawTable::from_upload_cleaned(upload, c),
                    None => RawTable::from_upload(upload),
                };
                parsed
                    .map_err(|error| {
                        warn!(file = upload.file_name(), %error, "Skipping upload");
                        issues.push(BatchIssue {
                            file_name: upload.file_name().to_string(),
                            error,
                        });
                    })
                    .ok()
            })
            .collect();

        // === Normalize ===
        let normalized = normalize(&raw);
        issues.extend(
            normalized
                .skipped
                .into_iter()
                .map(|(file_name, error)| BatchIssue { file_name, error }),
        );

        // === Derive ===
        let mut tables = Vec::with_capacity(normalized.tables.len());
        let mut metrics = Vec::with_capacity(normalized.tables.len());
        for table in normalized.tables {
            match DerivedMetrics::compute(&table, config.volatility_window()) {
                Ok(m) => {
                    tables.push(table);
                    metrics.push(m);
                }
                Err(error) => {
                    warn!(file = table.source_name(), %error, "Skipping table without metrics");
                    issues.push(BatchIssue {
                        file_name: table.source_name().to_string(),
                        error,
                    });
                }
            }
        }

        for dup in tables.iter().map(|t| t.instrument()).duplicates() {
            warn!(instrument = %dup, "Several files map to the same instrument");
        }

        let comparison = ComparisonSet::resolve(&tables);

        info!(
            tables = tables.len(),
            skipped = issues.len(),
            instruments = %tables.iter().map(|t| t.instrument()).join(", "),
            comparable = %comparison.iter().join(", "),
            "Batch processed"
        );

        Ok(Self {
            config: config.clone(),
            tables,
            metrics,
            comparison,
            issues,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn tables(&self) -> &[NormalizedTable] {
        &self.tables
    }

    pub fn issues(&self) -> &[BatchIssue] {
        &self.issues
    }

    pub fn comparison_set(&self) -> &ComparisonSet {
        &self.comparison
    }

    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.tables.iter().map(|t| t.instrument())
    }

    pub fn table(&self, instrument: &str) -> TickerlensResult<&NormalizedTable> {
        self.position(instrument).map(|i| &self.tables[i])
    }

    pub fn metrics(&self, instrument: &str) -> TickerlensResult<&DerivedMetrics> {
        self.position(instrument).map(|i| &self.metrics[i])
    }

    fn position(&self, instrument: &str) -> TickerlensResult<usize> {
        let wanted = Instrument::new(instrument);
        self.tables
            .iter()
            .position(|t| t.instrument() == &wanted)
            .ok_or_else(|| DataError::UnknownInstrument(wanted.to_string()).into())
    }
}

// ================================================================================================
// Charts
// ================================================================================================

impl Batch {
    /// One panel per selected column with one series per instrument, each on its own
    /// date axis.
    ///
    /// Columns outside the comparison set are rejected. A comparable column that is text
    /// in some table is left out for that table. Candlesticks cannot be overlaid, so they
    /// are drawn as lines here.
    pub fn comparison_panels<S: AsRef<str>>(
        &self,
        selection: &[S],
        kind: ChartKind,
    ) -> TickerlensResult<Vec<ChartPanel>> {
        let kind = match kind {
            ChartKind::Candlestick => {
                debug!("Candlestick comparison drawn as lines");
                ChartKind::Line
            }
            other => other,
        };

        selection
            .iter()
            .map(AsRef::as_ref)
            .unique()
            .map(|column| -> TickerlensResult<ChartPanel> {
                if !self.comparison.contains(column) {
                    return Err(DataError::UnknownColumn(column.to_string()).into());
                }
                let mut panel = ChartPanel::new(format!("{column} Comparison"), kind);
                for table in self.tables.iter().filter(|t| !t.is_empty()) {
                    if !table.is_numeric(column) {
                        warn!(
                            instrument = %table.instrument(),
                            column,
                            "Skipping non-numeric column"
                        );
                        continue;
                    }
                    panel = panel.with_series(PlotSeries::from_table(table, column)?);
                }
                Ok(panel)
            })
            .collect()
    }

    /// Comparison panels for the configured default columns and chart kind. Defaults that
    /// are not comparable in this batch are dropped.
    pub fn default_panels(&self) -> TickerlensResult<Vec<ChartPanel>> {
        let selection = self.comparison.select(self.config.default_columns());
        self.comparison_panels(&selection, self.config.chart_kind())
    }

    /// Panels for a single instrument. `Returns` and `Volatility` are always selectable.
    /// A candlestick request yields a single OHLC panel regardless of the selection.
    pub fn instrument_panels<S: AsRef<str>>(
        &self,
        instrument: &str,
        selection: &[S],
        kind: ChartKind,
    ) -> TickerlensResult<Vec<ChartPanel>> {
        let table = self.table(instrument)?;
        let metrics = self.metrics(instrument)?;

        if kind == ChartKind::Candlestick {
            return Ok(vec![ChartPanel::candlestick(table)?]);
        }

        let mut panels = Vec::with_capacity(selection.len());
        for column in selection.iter().map(AsRef::as_ref).unique() {
            let series = match column {
                "Returns" => PlotSeries::from_metrics(table, metrics, CanonicalCol::Returns)?,
                "Volatility" => {
                    PlotSeries::from_metrics(table, metrics, CanonicalCol::Volatility)?
                }
                _ if table.is_numeric(column) => PlotSeries::from_table(table, column)?,
                _ if table.has_column(column) => {
                    warn!(
                        instrument = %table.instrument(),
                        column,
                        "Skipping non-numeric column"
                    );
                    continue;
                }
                _ => return Err(DataError::UnknownColumn(column.to_string()).into()),
            };
            let title = format!("{} - {column} Over Time", table.instrument());
            panels.push(ChartPanel::new(title, kind).with_series(series));
        }
        Ok(panels)
    }
}

// ================================================================================================
// Summaries & Collaborators
// ================================================================================================

impl Batch {
    pub fn summaries(&self) -> TickerlensResult<Vec<InstrumentSummary>> {
        izip!(&self.tables, &self.metrics)
            .map(|(table, metrics)| InstrumentSummary::from_metrics(table, metrics))
            .collect()
    }

    /// The instrument with the highest mean return, if any has a defined return.
    pub fn best_performer(&self) -> TickerlensResult<Option<InstrumentSummary>> {
        let summaries = self.summaries()?;
        Ok(best_performer(&summaries).cloned())
    }

    /// One quote per table, using the configured ticker suffix. Provider failures end up
    /// in the quote status.
    pub fn live_quotes<P>(&self, provider: &P) -> Vec<LiveQuote>
    where
        P: LiveQuoteProvider + ?Sized,
    {
        let suffix = self.config.quote_suffix();
        self.instruments()
            .map(|instrument| fetch_quote(provider, instrument, suffix))
            .collect()
    }

    /// Forecasts the best performer over the configured horizon. A failing forecaster is
    /// recorded as an issue of this batch and yields `None`.
    pub fn forecast_best<F>(&mut self, forecaster: &F) -> Option<Forecast>
    where
        F: Forecaster + ?Sized,
    {
        let horizon = self.config.forecast_horizon();
        let best = match self.best_performer() {
            Ok(Some(best)) => best,
            Ok(None) => {
                debug!("No instrument has a defined return, nothing to forecast");
                return None;
            }
            Err(error) => {
                self.record("<batch>", error);
                return None;
            }
        };

        let result = self
            .table(best.instrument.as_str())
            .and_then(|table| forecaster.forecast(table, horizon).map(|f| (table, f)));
        match result {
            Ok((table, forecast)) => {
                info!(instrument = %best.instrument, horizon, "Forecast ready");
                debug!(r_squared = forecast.r_squared, rows = table.row_count());
                Some(forecast)
            }
            Err(error) => {
                let file_name = self
                    .table(best.instrument.as_str())
                    .map(|t| t.source_name().to_string())
                    .unwrap_or_else(|_| best.instrument.to_string());
                self.record(&file_name, error);
                None
            }
        }
    }

    pub fn links(&self) -> Vec<InstrumentLinks> {
        let resolver = LinkResolver::new(self.config.website_fallback());
        self.instruments().map(|i| resolver.resolve(i)).collect()
    }

    /// Writes every normalized table and its metrics as CSV into `dir`.
    pub fn export_csv(&self, dir: impl AsRef<Path>) -> TickerlensResult<()> {
        let dir = dir.as_ref();
        for (table, metrics) in izip!(&self.tables, &self.metrics) {
            table.to_csv(dir, None, None)?;
            metrics.to_csv(dir, None, None)?;
        }
        info!(dir = %dir.display(), tables = self.tables.len(), "Exported batch");
        Ok(())
    }

    fn record(&mut self, file_name: &str, error: TickerlensError) {
        warn!(file = file_name, %error, "Recording batch issue");
        self.issues.push(BatchIssue {
            file_name: file_name.to_string(),
            error,
        });
    }
}

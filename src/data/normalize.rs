use chrono::NaiveDateTime;
use polars::prelude::{
    BooleanChunked, Column, DataFrame, DataType, Expr, FillNullStrategy, IntoColumn, IntoLazy,
    NamedFrom, Series, SortMultipleOptions, TimeUnit, col,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::{debug, warn};

use crate::{
    data::{
        column::CanonicalCol,
        domain::Instrument,
        parse::{from_millis, is_missing, parse_number, parse_timestamp, to_millis},
        raw::RawTable,
    },
    error::{
        DataError, IngestError, TickerlensError, TickerlensResult, polars_to_tickerlens_error,
    },
    report::{
        io::{Report, ReportName},
        polars_ext::ExprExt,
    },
};

// ================================================================================================
// Close Resolution
// ================================================================================================

/// The rule that produced a table's `Close` column.
///
/// Rules are tried in [`CloseRule::PRIORITY`] order and exactly one fires. The last rule,
/// [`CloseRule::RowMean`], always applies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum CloseRule {
    /// The file already has a `Close` column.
    ExistingClose,
    /// `Close` is copied from `Last`.
    Last,
    /// `Close` is copied from `Prev Close`.
    PrevClose,
    /// `Close` is the row-wise mean of every numeric column.
    RowMean,
}

impl CloseRule {
    pub const PRIORITY: [CloseRule; 4] = [
        CloseRule::ExistingClose,
        CloseRule::Last,
        CloseRule::PrevClose,
        CloseRule::RowMean,
    ];

    /// The column this rule copies from, `None` for the synthetic row mean.
    pub fn source_column(&self) -> Option<CanonicalCol> {
        match self {
            CloseRule::ExistingClose => Some(CanonicalCol::Close),
            CloseRule::Last => Some(CanonicalCol::Last),
            CloseRule::PrevClose => Some(CanonicalCol::PrevClose),
            CloseRule::RowMean => None,
        }
    }

    /// Picks the first applicable rule for a set of (trimmed) headers.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> CloseRule {
        Self::PRIORITY
            .into_iter()
            .find(|rule| match rule.source_column() {
                Some(src) => headers.iter().any(|h| h.as_ref() == src.as_str()),
                None => true,
            })
            .unwrap_or(CloseRule::RowMean)
    }
}

/// Locates the date column: exact `Date`, then `date` in any case, then the first header
/// containing `date` in any case.
pub fn find_date_column<S: AsRef<str>>(headers: &[S]) -> Option<&str> {
    let date = CanonicalCol::Date.as_str();

    first_header(headers, |h| h == date)
        .or_else(|| first_header(headers, |h| h.eq_ignore_ascii_case(date)))
        .or_else(|| first_header(headers, |h| h.to_lowercase().contains("date")))
}

fn first_header<S: AsRef<str>>(headers: &[S], pred: impl Fn(&str) -> bool) -> Option<&str> {
    headers.iter().map(|h| h.as_ref()).find(|h| pred(*h))
}

// ================================================================================================
// Normalized Table
// ================================================================================================

/// A table with a canonical, sorted `Date` column and a gap-free `Close` column.
///
/// All columns share the same length. Rows whose date failed to parse are gone, and
/// every column was forward- then backward-filled after sorting.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    instrument: Instrument,
    source_name: String,
    close_rule: CloseRule,
    dropped_rows: usize,
    df: DataFrame,
}

impl NormalizedTable {
    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn close_rule(&self) -> CloseRule {
        self.close_rule
    }

    /// Rows removed because their date or close cell could not be parsed.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Every column name, `Date` first.
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Column names other than `Date` and `Close`, in file order.
    pub fn other_column_names(&self) -> Vec<String> {
        let date = CanonicalCol::Date.as_str();
        let close = CanonicalCol::Close.as_str();
        self.column_names()
            .into_iter()
            .filter(|name| name != date && name != close)
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.df
            .column(name)
            .map(|c| c.dtype() == &DataType::Float64)
            .unwrap_or(false)
    }

    pub fn dates(&self) -> TickerlensResult<Vec<NaiveDateTime>> {
        let ca = self
            .df
            .column(CanonicalCol::Date.as_str())
            .and_then(|c| c.datetime())
            .map_err(convert_err)?;

        ca.physical()
            .into_iter()
            .map(|ms| {
                ms.and_then(from_millis).ok_or_else(|| {
                    DataError::TimestampConversion(format!(
                        "invalid Date value {ms:?} in '{}'",
                        self.source_name
                    ))
                    .into()
                })
            })
            .collect()
    }

    pub fn closes(&self) -> TickerlensResult<Vec<Option<f64>>> {
        self.numeric_values(CanonicalCol::Close.as_str())
    }

    pub fn numeric_values(&self, name: &str) -> TickerlensResult<Vec<Option<f64>>> {
        let column = self
            .df
            .column(name)
            .map_err(|_| DataError::UnknownColumn(name.to_string()))?;
        let ca = column.f64().map_err(convert_err)?;
        Ok(ca.into_iter().collect())
    }

    pub fn last_close(&self) -> TickerlensResult<Option<f64>> {
        Ok(self.closes()?.into_iter().rev().flatten().next())
    }
}

impl Report for NormalizedTable {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

impl ReportName for NormalizedTable {
    fn base_name(&self) -> String {
        format!("{}_normalized", self.instrument.as_str().to_lowercase())
    }
}

// ================================================================================================
// Normalization
// ================================================================================================

/// Result of normalizing a batch: the tables that survived and the ones that were skipped.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub tables: Vec<NormalizedTable>,
    pub skipped: Vec<(String, TickerlensError)>,
}

/// Normalizes every table of a batch. A table that cannot be normalized is skipped and
/// does not affect the others.
pub fn normalize(batch: &[RawTable]) -> NormalizedBatch {
    let mut out = NormalizedBatch::default();
    for raw in batch {
        match normalize_table(raw) {
            Ok(table) => out.tables.push(table),
            Err(e) => {
                warn!(source = raw.source_name(), error = %e, "Skipping table");
                out.skipped.push((raw.source_name().to_string(), e));
            }
        }
    }
    out
}

/// Normalizes a single table, or signals that it must be skipped.
pub fn normalize_table(raw: &RawTable) -> TickerlensResult<NormalizedTable> {
    let headers = raw.column_names();
    let date_source = find_date_column(&headers)
        .ok_or_else(|| IngestError::MissingDateColumn(raw.source_name().to_string()))?
        .to_string();
    let close_rule = CloseRule::resolve(&headers);
    let close_source = close_rule.source_column().map(|c| c.as_str());

    let height = raw.row_count();
    let mut keep = vec![true; height];
    let mut columns: Vec<Column> = Vec::with_capacity(headers.len() + 1);
    let mut numeric: Vec<String> = Vec::new();

    // === Date ===
    let millis: Vec<Option<i64>> = text_cells(raw, &date_source)?
        .into_iter()
        .map(|cell| cell.as_deref().and_then(parse_timestamp).map(to_millis))
        .collect();
    for (k, ms) in keep.iter_mut().zip(&millis) {
        *k &= ms.is_some();
    }
    let date = Series::new(CanonicalCol::Date.name(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(convert_err)?;
    columns.push(date.into_column());

    // === Passthrough & close source ===
    for name in headers.iter().filter(|h| **h != date_source) {
        let cells = text_cells(raw, name)?;
        let parsed: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|cell| match cell {
                Some(s) => parse_number(s).ok(),
                None => Some(None),
            })
            .collect();

        let values = match parsed {
            Some(values) => values,
            None if close_source == Some(name.as_str()) => {
                // Unparseable close cells drop their row.
                cells
                    .iter()
                    .zip(keep.iter_mut())
                    .map(|(cell, k)| match cell.as_deref().map(parse_number) {
                        Some(Ok(v)) => v,
                        Some(Err(_)) => {
                            *k = false;
                            None
                        }
                        None => None,
                    })
                    .collect()
            }
            None => {
                let cells: Vec<Option<String>> = cells
                    .into_iter()
                    .map(|cell| cell.filter(|s| !is_missing(s)))
                    .collect();
                columns.push(Series::new(name.as_str().into(), cells).into_column());
                continue;
            }
        };
        numeric.push(name.clone());
        columns.push(Series::new(name.as_str().into(), values).into_column());
    }

    let df = DataFrame::new(columns).map_err(convert_err)?;
    let mask: BooleanChunked = keep.iter().copied().collect();
    let df = df.filter(&mask).map_err(convert_err)?;
    let dropped_rows = height - df.height();

    let fill_targets: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| name != CanonicalCol::Date.as_str())
        .chain(
            (close_rule != CloseRule::ExistingClose).then(|| CanonicalCol::Close.to_string()),
        )
        .collect();

    let df = df
        .lazy()
        .sort(
            [CanonicalCol::Date.as_str()],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .with_column(close_expr(close_rule, &numeric))
        .with_columns(
            fill_targets
                .iter()
                .map(|name| {
                    col(name.as_str())
                        .fill_null_with_strategy(FillNullStrategy::Forward(None))
                        .fill_null_with_strategy(FillNullStrategy::Backward(None))
                })
                .collect::<Vec<_>>(),
        )
        .collect()
        .map_err(convert_err)?;

    debug!(
        instrument = %raw.instrument(),
        rule = %close_rule,
        rows = df.height(),
        dropped_rows,
        "Normalized table"
    );

    Ok(NormalizedTable {
        instrument: raw.instrument().clone(),
        source_name: raw.source_name().to_string(),
        close_rule,
        dropped_rows,
        df,
    })
}

fn close_expr(rule: CloseRule, numeric: &[String]) -> Expr {
    let close = CanonicalCol::Close.as_str();
    match rule.source_column() {
        Some(src) => col(src.as_str()).cast(DataType::Float64).alias(close),
        None => row_mean_expr(numeric).alias(close),
    }
}

/// Mean of the non-missing numeric cells of each row, missing when a row has none.
fn row_mean_expr(numeric: &[String]) -> Expr {
    let cols: Vec<Expr> = numeric.iter().map(|name| col(name.as_str())).collect();
    Expr::row_mean(&cols)
}

fn text_cells(raw: &RawTable, name: &str) -> TickerlensResult<Vec<Option<String>>> {
    let column = raw
        .as_df()
        .column(name)
        .map_err(|_| DataError::UnknownColumn(name.to_string()))?;
    let text = column.cast(&DataType::String).map_err(convert_err)?;
    let ca = text.str().map_err(convert_err)?;
    Ok(ca.into_iter().map(|cell| cell.map(str::to_string)).collect())
}

fn convert_err(e: polars::error::PolarsError) -> TickerlensError {
    polars_to_tickerlens_error("normalizing table", e)
}

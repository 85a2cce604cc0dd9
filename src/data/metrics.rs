use chrono::NaiveDateTime;
use polars::prelude::{DataFrame, Expr, IntoLazy, RollingOptionsFixedWindow, col, lit};
use serde::{Deserialize, Serialize};

use crate::{
    data::{column::CanonicalCol, domain::Instrument, normalize::NormalizedTable},
    error::{
        ConfigError, DataError, TickerlensError, TickerlensResult, polars_to_tickerlens_error,
    },
    report::{
        io::{Report, ReportName},
        polars_ext::ExprExt,
    },
};

/// Rolling window used when no configuration says otherwise.
pub const DEFAULT_VOLATILITY_WINDOW: usize = 20;

/// Returns and volatility of one instrument, aligned row by row with its normalized table.
///
/// Columns: `Date`, `Close`, `Returns`, `Volatility`.
///
/// - `Returns[i] = (Close[i] - Close[i-1]) / Close[i-1]`, missing for the first row and
///   whenever the previous close is missing or zero.
/// - `Volatility[i]` is the rolling sample standard deviation (`ddof = 1`) of the last
///   `window` closes, missing until a full window is available.
#[derive(Debug, Clone)]
pub struct DerivedMetrics {
    instrument: Instrument,
    window: usize,
    df: DataFrame,
}

impl DerivedMetrics {
    pub fn compute(table: &NormalizedTable, window: usize) -> TickerlensResult<Self> {
        if window == 0 {
            return Err(ConfigError::Invalid("volatility_window must be > 0".to_string()).into());
        }
        let df = table
            .as_df()
            .clone()
            .lazy()
            .select([
                col(CanonicalCol::Date),
                col(CanonicalCol::Close),
                returns_expr().alias(CanonicalCol::Returns),
                volatility_expr(window).alias(CanonicalCol::Volatility),
            ])
            .collect()
            .map_err(convert_err)?;

        Ok(Self {
            instrument: table.instrument().clone(),
            window,
            df,
        })
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    pub fn returns(&self) -> TickerlensResult<Vec<Option<f64>>> {
        self.values(CanonicalCol::Returns)
    }

    pub fn volatility(&self) -> TickerlensResult<Vec<Option<f64>>> {
        self.values(CanonicalCol::Volatility)
    }

    /// Values of `Close`, `Returns` or `Volatility`.
    pub fn values(&self, column: CanonicalCol) -> TickerlensResult<Vec<Option<f64>>> {
        let ca = self
            .df
            .column(column.as_str())
            .map_err(|_| DataError::UnknownColumn(column.to_string()))?
            .f64()
            .map_err(convert_err)?;
        Ok(ca.into_iter().collect())
    }

    /// Mean of the defined returns, `None` when there are none.
    pub fn mean_return(&self) -> TickerlensResult<Option<f64>> {
        let defined: Vec<f64> = self.returns()?.into_iter().flatten().collect();
        if defined.is_empty() {
            return Ok(None);
        }
        Ok(Some(defined.iter().sum::<f64>() / defined.len() as f64))
    }
}

impl Report for DerivedMetrics {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

impl ReportName for DerivedMetrics {
    fn base_name(&self) -> String {
        format!("{}_metrics", self.instrument.as_str().to_lowercase())
    }
}

fn returns_expr() -> Expr {
    let prev = col(CanonicalCol::Close).shift(lit(1));
    (col(CanonicalCol::Close) - prev.clone()).safe_div(prev, None)
}

fn volatility_expr(window: usize) -> Expr {
    let options = RollingOptionsFixedWindow {
        window_size: window,
        min_periods: window, // Undefined until the window is full
        weights: None,
        center: false,
        fn_params: None, // ddof = 1
    };
    col(CanonicalCol::Close).rolling_std(options)
}

fn convert_err(e: polars::error::PolarsError) -> TickerlensError {
    polars_to_tickerlens_error("deriving metrics", e)
}

// ================================================================================================
// Summary
// ================================================================================================

/// Headline numbers of one instrument, used to rank a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSummary {
    pub instrument: Instrument,
    pub latest_close: Option<f64>,
    pub latest_date: Option<NaiveDateTime>,
    pub mean_return: Option<f64>,
    pub rows: usize,
}

impl InstrumentSummary {
    pub fn from_metrics(table: &NormalizedTable, metrics: &DerivedMetrics) -> TickerlensResult<Self> {
        Ok(Self {
            instrument: table.instrument().clone(),
            latest_close: table.last_close()?,
            latest_date: table.dates()?.last().copied(),
            mean_return: metrics.mean_return()?,
            rows: table.row_count(),
        })
    }
}

/// The summary with the highest mean return. Instruments without any defined return
/// never win; ties keep the earlier summary.
pub fn best_performer(summaries: &[InstrumentSummary]) -> Option<&InstrumentSummary> {
    summaries
        .iter()
        .filter_map(|s| s.mean_return.map(|r| (s, r)))
        .fold(None, |best: Option<(&InstrumentSummary, f64)>, (s, r)| match best {
            Some((_, b)) if b >= r => best,
            _ => Some((s, r)),
        })
        .map(|(s, _)| s)
}

#[cfg(test)]
mod tests {
    use polars::df;

    use crate::data::{normalize::normalize_table, raw::RawTable};

    use super::*;

    fn table(name: &str, closes: &[f64]) -> NormalizedTable {
        let dates: Vec<String> = (0..closes.len())
            .map(|i| format!("2024-01-{:02}", i + 1))
            .collect();
        let df = df![
            "Date" => dates,
            "Close" => closes.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
        ]
        .expect("failed to build frame");
        let raw = RawTable::from_df(name, df).expect("frame should wrap");
        normalize_table(&raw).expect("fixture should normalize")
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn simple_returns() {
        let m = DerivedMetrics::compute(&table("a.csv", &[100.0, 110.0, 99.0]), 20)
            .expect("metrics should compute");
        let r = m.returns().expect("returns");

        assert_eq!(r.len(), 3);
        assert_eq!(r[0], None, "first return is undefined");
        assert!(approx(r[1], 0.10), "got {:?}", r[1]);
        assert!(approx(r[2], -0.10), "got {:?}", r[2]);
    }

    #[test]
    fn zero_previous_close_gives_missing_return() {
        let m = DerivedMetrics::compute(&table("z.csv", &[0.0, 5.0]), 20)
            .expect("metrics should compute");
        assert_eq!(m.returns().expect("returns"), [None, None]);
    }

    #[test]
    fn volatility_needs_a_full_window() {
        let closes = vec![42.0; 20];
        let m = DerivedMetrics::compute(&table("flat.csv", &closes), 20)
            .expect("metrics should compute");
        let v = m.volatility().expect("volatility");

        assert!(v[..19].iter().all(Option::is_none), "undefined before the window fills");
        assert!(approx(v[19], 0.0), "flat series has zero volatility, got {:?}", v[19]);
    }

    #[test]
    fn volatility_is_sample_std() {
        let m = DerivedMetrics::compute(&table("s.csv", &[1.0, 2.0, 3.0, 4.0]), 4)
            .expect("metrics should compute");
        let v = m.volatility().expect("volatility");
        // var = 5/3 with ddof = 1
        assert!(approx(v[3], (5.0f64 / 3.0).sqrt()), "got {:?}", v[3]);
    }

    #[test]
    fn zero_window_is_a_config_error() {
        let err = DerivedMetrics::compute(&table("w.csv", &[1.0, 2.0]), 0)
            .expect_err("window 0 must be rejected");
        assert!(
            matches!(err, TickerlensError::Config(ConfigError::Invalid(_))),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn short_tables_have_no_volatility() {
        let closes: Vec<f64> = (1..=19).map(f64::from).collect();
        let m = DerivedMetrics::compute(&table("short.csv", &closes), DEFAULT_VOLATILITY_WINDOW)
            .expect("metrics should compute");
        assert!(m.volatility().expect("volatility").iter().all(Option::is_none));
    }

    #[test]
    fn tiny_tables_do_not_fail() {
        let one = DerivedMetrics::compute(&table("one.csv", &[10.0]), 20)
            .expect("single row should compute");
        assert_eq!(one.returns().expect("returns"), [None]);
        assert_eq!(one.mean_return().expect("mean"), None);

        let empty = normalize_table(
            &RawTable::from_df(
                "empty.csv",
                df!["Date" => ["nope"], "Close" => ["1"]].expect("failed to build frame"),
            )
            .expect("frame should wrap"),
        )
        .expect("should normalize");
        let m = DerivedMetrics::compute(&empty, 20).expect("empty table should compute");
        assert_eq!(m.row_count(), 0);
        assert!(m.returns().expect("returns").is_empty());
    }

    #[test]
    fn picks_highest_mean_return() {
        let rising = table("up.csv", &[100.0, 110.0, 121.0]);
        let falling = table("down.csv", &[100.0, 90.0]);
        let single = table("one.csv", &[5.0]);

        let summaries: Vec<InstrumentSummary> = [&rising, &falling, &single]
            .into_iter()
            .map(|t| {
                let m = DerivedMetrics::compute(t, 20).expect("metrics");
                InstrumentSummary::from_metrics(t, &m).expect("summary")
            })
            .collect();

        let best = best_performer(&summaries).expect("a best performer exists");
        assert_eq!(best.instrument.as_str(), "UP");
        assert!(approx(best.mean_return, 0.10));
        assert_eq!(best.latest_close, Some(121.0));
        assert_eq!(best.rows, 3);

        assert!(best_performer(&summaries[2..]).is_none(), "no returns, no winner");
    }
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    data::{
        column::CanonicalCol, domain::Instrument, metrics::DerivedMetrics,
        normalize::NormalizedTable,
    },
    error::{DataError, IoError, TickerlensResult},
};

/// How a panel is drawn by the presentation layer.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Scatter,
    Area,
    /// Needs `Open`, `High`, `Low` and `Close`.
    Candlestick,
}

impl ChartKind {
    /// Parses a chart-type name such as `Candlestick`, ignoring surrounding whitespace.
    pub fn parse(name: &str) -> TickerlensResult<Self> {
        Ok(name.trim().parse::<Self>().map_err(DataError::ParseEnum)?)
    }

    pub const CANDLESTICK_COLUMNS: [CanonicalCol; 4] = [
        CanonicalCol::Open,
        CanonicalCol::High,
        CanonicalCol::Low,
        CanonicalCol::Close,
    ];
}

/// One `(date, value)` sample. `value` is `None` where the series is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDateTime,
    pub value: Option<f64>,
}

/// A single column of a single instrument, on that instrument's own date axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSeries {
    pub instrument: Instrument,
    pub column: String,
    pub points: Vec<SeriesPoint>,
}

impl PlotSeries {
    /// Builds a series from a numeric column of a normalized table.
    pub fn from_table(table: &NormalizedTable, column: &str) -> TickerlensResult<Self> {
        let values = table.numeric_values(column)?;
        Ok(Self::zip(table.instrument(), column, table.dates()?, values))
    }

    /// Builds a series from `Close`, `Returns` or `Volatility`.
    pub fn from_metrics(
        table: &NormalizedTable,
        metrics: &DerivedMetrics,
        column: CanonicalCol,
    ) -> TickerlensResult<Self> {
        let values = metrics.values(column)?;
        Ok(Self::zip(
            table.instrument(),
            column.as_str(),
            table.dates()?,
            values,
        ))
    }

    fn zip(
        instrument: &Instrument,
        column: &str,
        dates: Vec<NaiveDateTime>,
        values: Vec<Option<f64>>,
    ) -> Self {
        Self {
            instrument: instrument.clone(),
            column: column.to_string(),
            points: dates
                .into_iter()
                .zip(values)
                .map(|(date, value)| SeriesPoint { date, value })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points carrying a value.
    pub fn defined(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }
}

/// One chart: a title, a drawing style and the series drawn on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPanel {
    pub title: String,
    pub kind: ChartKind,
    pub series: Vec<PlotSeries>,
}

impl ChartPanel {
    pub fn new(title: impl Into<String>, kind: ChartKind) -> Self {
        Self {
            title: title.into(),
            kind,
            series: Vec::new(),
        }
    }

    pub fn with_series(mut self, series: PlotSeries) -> Self {
        self.series.push(series);
        self
    }

    /// Series for one instrument, in insertion order.
    pub fn series_of<'a>(
        &'a self,
        instrument: &'a Instrument,
    ) -> impl Iterator<Item = &'a PlotSeries> {
        self.series
            .iter()
            .filter(move |s| &s.instrument == instrument)
    }

    /// Candlestick panel of one instrument. Fails if any OHLC column is missing or text.
    pub fn candlestick(table: &NormalizedTable) -> TickerlensResult<Self> {
        let title = format!("{} OHLC", table.instrument());
        ChartKind::CANDLESTICK_COLUMNS
            .iter()
            .try_fold(Self::new(title, ChartKind::Candlestick), |panel, col| -> TickerlensResult<Self> {
                if !table.is_numeric(col.as_str()) {
                    return Err(DataError::UnknownColumn(col.to_string()).into());
                }
                Ok(panel.with_series(PlotSeries::from_table(table, col.as_str())?))
            })
    }

    pub fn to_json(&self) -> TickerlensResult<serde_json::Value> {
        Ok(serde_json::to_value(self).map_err(IoError::Json)?)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::data::{domain::Upload, normalize::normalize_table, raw::RawTable};

    use super::*;

    fn table(name: &str, body: &str) -> NormalizedTable {
        let raw = RawTable::from_upload(&Upload::new(name, body.to_string().into_bytes()))
            .expect("fixture csv should parse");
        normalize_table(&raw).expect("fixture should normalize")
    }

    #[test]
    fn chart_kind_names() {
        assert_eq!(ChartKind::default(), ChartKind::Line);
        assert_eq!(
            ChartKind::from_str("Candlestick").expect("should parse"),
            ChartKind::Candlestick
        );
        assert_eq!(ChartKind::parse(" Bar ").expect("should parse"), ChartKind::Bar);
        assert!(ChartKind::parse("Pie").is_err());
        assert_eq!(
            serde_json::to_value(ChartKind::Area).expect("should serialize"),
            serde_json::json!("Area")
        );
    }

    #[test]
    fn series_carries_own_date_axis() {
        let t = table("a.csv", "Date,Close\n2024-01-02,2\n2024-01-01,1\n");
        let s = PlotSeries::from_table(&t, "Close").expect("series");

        assert_eq!(s.instrument.as_str(), "A");
        assert_eq!(s.len(), 2);
        assert!(s.points[0].date < s.points[1].date);
        assert_eq!(s.points[0].value, Some(1.0));
    }

    #[test]
    fn unknown_column_is_an_error() {
        let t = table("a.csv", "Date,Close\n2024-01-01,1\n");
        assert!(PlotSeries::from_table(&t, "Volume").is_err());
    }

    #[test]
    fn candlestick_requires_ohlc() {
        let full = table("c.csv", "Date,Open,High,Low,Close\n2024-01-01,1,3,0.5,2\n");
        let panel = ChartPanel::candlestick(&full).expect("OHLC present");
        assert_eq!(panel.kind, ChartKind::Candlestick);
        assert_eq!(
            panel.series.iter().map(|s| s.column.as_str()).collect::<Vec<_>>(),
            ["Open", "High", "Low", "Close"]
        );

        let partial = table("d.csv", "Date,Open,Close\n2024-01-01,1,2\n");
        assert!(ChartPanel::candlestick(&partial).is_err());
    }

    #[test]
    fn panel_serializes_points() {
        let t = table("a.csv", "Date,Close\n2024-01-01,1\n");
        let panel = ChartPanel::new("Close", ChartKind::Line)
            .with_series(PlotSeries::from_table(&t, "Close").expect("series"));

        let json = panel.to_json().expect("panel serializes");
        assert_eq!(json["kind"], serde_json::json!("Line"));
        assert_eq!(json["series"][0]["points"][0]["value"], serde_json::json!(1.0));
        assert_eq!(panel.series_of(&Instrument::new("a")).count(), 1);
    }
}

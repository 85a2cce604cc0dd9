use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{
    data::{domain::Instrument, normalize::NormalizedTable},
    error::{ProviderError, TickerlensError, TickerlensResult},
    report::chart::{PlotSeries, SeriesPoint},
};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Predicts future closes of one instrument from its history.
pub trait Forecaster {
    fn forecast(&self, table: &NormalizedTable, horizon: usize) -> TickerlensResult<Forecast>;
}

/// Predicted daily closes following the last observed date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub instrument: Instrument,
    pub points: Vec<SeriesPoint>,
    /// Goodness of fit on the history, in `[0, 1]` for a least-squares line.
    pub r_squared: f64,
}

impl Forecast {
    pub fn to_series(&self) -> PlotSeries {
        PlotSeries {
            instrument: self.instrument.clone(),
            column: "Forecast".to_string(),
            points: self.points.clone(),
        }
    }
}

/// Ordinary least squares of `Close` on days since the first date, projected forward.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrendForecaster;

impl Forecaster for LinearTrendForecaster {
    fn forecast(&self, table: &NormalizedTable, horizon: usize) -> TickerlensResult<Forecast> {
        let dates = table.dates()?;
        let closes = table.closes()?;

        let Some(&start) = dates.first() else {
            return Err(forecast_err(table, "no rows"));
        };
        let samples: Vec<(f64, f64)> = dates
            .iter()
            .zip(closes)
            .filter_map(|(d, c)| c.map(|c| (days_between(start, *d), c)))
            .collect();
        if samples.len() < 2 {
            return Err(forecast_err(table, "need at least two closes"));
        }

        let fit = LinearFit::new(&samples)
            .ok_or_else(|| forecast_err(table, "all closes share one date"))?;

        let last = dates.last().copied().unwrap_or(start);
        let points = (1..=horizon)
            .map(|k| {
                let date = last + Duration::days(k as i64);
                SeriesPoint {
                    date,
                    value: Some(fit.predict(days_between(start, date))),
                }
            })
            .collect();

        Ok(Forecast {
            instrument: table.instrument().clone(),
            points,
            r_squared: fit.r_squared(&samples),
        })
    }
}

struct LinearFit {
    slope: f64,
    intercept: f64,
}

impl LinearFit {
    fn new(samples: &[(f64, f64)]) -> Option<Self> {
        let n = samples.len() as f64;
        let mean_x = samples.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;

        let (sxy, sxx) = samples.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = x - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });
        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// R^2 = 1 - (Sum of Squared Residuals / Total Sum of Squares)
    fn r_squared(&self, samples: &[(f64, f64)]) -> f64 {
        let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / samples.len() as f64;
        let ss_res: f64 = samples
            .iter()
            .map(|(x, y)| (y - self.predict(*x)).powi(2))
            .sum();
        let ss_tot: f64 = samples.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
        if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot }
    }
}

fn days_between(start: NaiveDateTime, date: NaiveDateTime) -> f64 {
    (date - start).num_milliseconds() as f64 / MILLIS_PER_DAY
}

fn forecast_err(table: &NormalizedTable, msg: &str) -> TickerlensError {
    ProviderError::Forecast(format!("{}: {msg}", table.instrument())).into()
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    data::{domain::Instrument, normalize::NormalizedTable},
    error::{ProviderError, TickerlensResult},
};

/// Source of the most recent closing price of a listed symbol (e.g. `TCS.NS`).
///
/// `Ok(None)` means the provider answered but has no data for the symbol.
pub trait LiveQuoteProvider {
    fn latest_close(&self, symbol: &str) -> TickerlensResult<Option<f64>>;
}

/// Outcome of a single quote lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuoteStatus {
    Price(f64),
    NoData,
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveQuote {
    pub instrument: Instrument,
    pub symbol: String,
    pub status: QuoteStatus,
}

impl LiveQuote {
    pub fn price(&self) -> Option<f64> {
        match self.status {
            QuoteStatus::Price(p) => Some(p),
            _ => None,
        }
    }
}

/// Looks up one instrument. Provider failures are logged and reported in the status,
/// never returned.
pub fn fetch_quote<P>(provider: &P, instrument: &Instrument, suffix: &str) -> LiveQuote
where
    P: LiveQuoteProvider + ?Sized,
{
    let symbol = instrument.quote_symbol(suffix);
    let status = match provider.latest_close(&symbol) {
        Ok(Some(price)) => QuoteStatus::Price(price),
        Ok(None) => {
            debug!(%symbol, "No live data");
            QuoteStatus::NoData
        }
        Err(e) => {
            warn!(%symbol, error = %e, "Live quote unavailable");
            QuoteStatus::Unavailable(e.to_string())
        }
    };
    LiveQuote {
        instrument: instrument.clone(),
        symbol,
        status,
    }
}

// ================================================================================================
// Providers
// ================================================================================================

/// Answers from a fixed table. Symbols registered as failing return an error.
#[derive(Debug, Clone, Default)]
pub struct StaticQuoteProvider {
    prices: HashMap<String, f64>,
    failures: HashMap<String, String>,
}

impl StaticQuoteProvider {
    pub fn with_price(mut self, symbol: impl Into<String>, price: f64) -> Self {
        self.prices.insert(symbol.into(), price);
        self
    }

    pub fn with_failure(mut self, symbol: impl Into<String>, msg: impl Into<String>) -> Self {
        self.failures.insert(symbol.into(), msg.into());
        self
    }
}

impl LiveQuoteProvider for StaticQuoteProvider {
    fn latest_close(&self, symbol: &str) -> TickerlensResult<Option<f64>> {
        if let Some(msg) = self.failures.get(symbol) {
            return Err(ProviderError::LiveDataUnavailable {
                symbol: symbol.to_string(),
                msg: msg.clone(),
            }
            .into());
        }
        Ok(self.prices.get(symbol).copied())
    }
}

/// Answers with the last close of each uploaded table, as an offline stand-in for a
/// market-data service.
#[derive(Debug, Clone, Default)]
pub struct HistoricalQuoteProvider {
    prices: HashMap<String, Option<f64>>,
}

impl HistoricalQuoteProvider {
    pub fn from_tables<'a, I>(tables: I, suffix: &str) -> TickerlensResult<Self>
    where
        I: IntoIterator<Item = &'a NormalizedTable>,
    {
        let prices = tables
            .into_iter()
            .map(|t| Ok((t.instrument().quote_symbol(suffix), t.last_close()?)))
            .collect::<TickerlensResult<HashMap<_, _>>>()?;
        Ok(Self { prices })
    }
}

impl LiveQuoteProvider for HistoricalQuoteProvider {
    fn latest_close(&self, symbol: &str) -> TickerlensResult<Option<f64>> {
        Ok(self.prices.get(symbol).copied().flatten())
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    data::column::CanonicalCol,
    error::{ConfigError, IoError, TickerlensResult},
    provider::link::WebsiteFallback,
    report::chart::ChartKind,
};

/// Configuration of a dashboard session.
///
/// Every field has a default matching the behaviour of the interactive dashboards, so
/// `DashboardConfig::default()` is a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Number of trailing samples in the rolling volatility window.
    volatility_window: usize,

    /// Number of future points requested from the forecaster.
    forecast_horizon: usize,

    /// Exchange suffix appended to an instrument when asking for a live quote (e.g. `.NS`).
    quote_suffix: String,

    /// Columns selected for comparison before the user picks any.
    default_columns: Vec<String>,

    /// How comparison panels are rendered.
    chart_kind: ChartKind,

    /// Strip `NIFTY50 `, `NIFTY100 ` and `NIFTY ` prefixes from headers on ingestion.
    strip_header_prefixes: bool,

    /// Link produced for instruments missing from the static website table.
    website_fallback: WebsiteFallback,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            volatility_window: 20,
            forecast_horizon: 30,
            quote_suffix: ".NS".to_string(),
            default_columns: vec![CanonicalCol::Close.to_string()],
            chart_kind: ChartKind::default(),
            strip_header_prefixes: false,
            website_fallback: WebsiteFallback::default(),
        }
    }
}

// ================================================================================================
// Builder Methods
// ================================================================================================

impl DashboardConfig {
    pub fn with_volatility_window(self, volatility_window: usize) -> Self {
        Self {
            volatility_window,
            ..self
        }
    }

    pub fn with_forecast_horizon(self, forecast_horizon: usize) -> Self {
        Self {
            forecast_horizon,
            ..self
        }
    }

    pub fn with_quote_suffix(self, quote_suffix: impl Into<String>) -> Self {
        Self {
            quote_suffix: quote_suffix.into(),
            ..self
        }
    }

    pub fn with_default_columns<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            default_columns: columns.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn with_chart_kind(self, chart_kind: ChartKind) -> Self {
        Self { chart_kind, ..self }
    }

    pub fn with_strip_header_prefixes(self, strip_header_prefixes: bool) -> Self {
        Self {
            strip_header_prefixes,
            ..self
        }
    }

    pub fn with_website_fallback(self, website_fallback: WebsiteFallback) -> Self {
        Self {
            website_fallback,
            ..self
        }
    }
}

// ================================================================================================
// Accessors
// ================================================================================================

impl DashboardConfig {
    pub fn volatility_window(&self) -> usize {
        self.volatility_window
    }

    pub fn forecast_horizon(&self) -> usize {
        self.forecast_horizon
    }

    pub fn quote_suffix(&self) -> &str {
        &self.quote_suffix
    }

    pub fn default_columns(&self) -> &[String] {
        &self.default_columns
    }

    pub fn chart_kind(&self) -> ChartKind {
        self.chart_kind
    }

    pub fn strip_header_prefixes(&self) -> bool {
        self.strip_header_prefixes
    }

    pub fn website_fallback(&self) -> WebsiteFallback {
        self.website_fallback
    }
}

// ================================================================================================
// Loading & Validation
// ================================================================================================

impl DashboardConfig {
    /// Reads a JSON configuration file. Missing fields fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> TickerlensResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(IoError::Io)?;
        let cfg: Self = serde_json::from_str(&contents).map_err(IoError::Json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> TickerlensResult<()> {
        if self.volatility_window == 0 {
            return Err(ConfigError::Invalid("volatility_window must be > 0".to_string()).into());
        }
        if self.forecast_horizon == 0 {
            return Err(ConfigError::Invalid("forecast_horizon must be > 0".to_string()).into());
        }
        Ok(())
    }
}

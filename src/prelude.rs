// 1. Traits
pub use crate::provider::{forecast::Forecaster, quote::LiveQuoteProvider};
pub use crate::report::io::{Report, ReportName, ToCsv, ToJson};

// 2. The Pipeline
pub use crate::dashboard::{Batch, BatchIssue};
pub use crate::data::comparison::ComparisonSet;
pub use crate::data::metrics::{DerivedMetrics, InstrumentSummary};
pub use crate::data::normalize::{CloseRule, NormalizedBatch, NormalizedTable, normalize};
pub use crate::data::raw::RawTable;

// 3. Domain Types
pub use crate::data::column::CanonicalCol;
pub use crate::data::domain::{Instrument, Price, Upload};
pub use crate::report::chart::{ChartKind, ChartPanel, PlotSeries, SeriesPoint};

// 4. Collaborators
pub use crate::provider::forecast::{Forecast, LinearTrendForecaster};
pub use crate::provider::link::{InstrumentLinks, LinkResolver, WebsiteFallback};
pub use crate::provider::quote::{
    HistoricalQuoteProvider, LiveQuote, QuoteStatus, StaticQuoteProvider,
};

// 5. Errors
pub use crate::error::{
    ConfigError, DataError, IngestError, IoError, ProviderError, TickerlensError,
    TickerlensResult,
};

// 6. Configs
pub use crate::config::DashboardConfig;

use thiserror::Error;

pub type TickerlensResult<T> = Result<T, TickerlensError>;

#[derive(Debug, Error)]
pub enum TickerlensError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while turning an upload into a table. All of them skip a single file,
/// never the whole batch.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("'{0}' contains no rows")]
    EmptyInput(String),

    #[error("'{0}' has no date column")]
    MissingDateColumn(String),

    #[error("Failed to read '{source_name}': {msg}")]
    UnreadableUpload { source_name: String, msg: String },

    #[error("'{source_name}' declares column '{column}' more than once")]
    DuplicateColumn { source_name: String, column: String },
}

/// Errors related to data frames, cell parsing and column lookup.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Failed timestamp conversion: {0}")]
    TimestampConversion(String),

    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    #[error("Unknown instrument: '{0}'")]
    UnknownInstrument(String),

    #[error("Failed to parse enum: {0}")]
    ParseEnum(#[from] strum::ParseError),
}

/// Errors reported by external collaborators (live quotes, forecasting).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Live data unavailable for '{symbol}': {msg}")]
    LiveDataUnavailable { symbol: String, msg: String },

    #[error("Forecast failed: {0}")]
    Forecast(String),
}

/// Errors related to file I/O and serialization.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed")]
    Json(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Failed to write data: {0}")]
    WriteFailed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid dashboard configuration: {0}")]
    Invalid(String),
}

pub(crate) fn polars_to_tickerlens_error(
    context: &str,
    e: polars::error::PolarsError,
) -> TickerlensError {
    TickerlensError::Data(DataError::DataFrame(format!("Error while {context}: {e}")))
}

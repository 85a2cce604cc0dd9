use std::{collections::HashSet, io::Cursor};

use polars::prelude::{Column, CsvReadOptions, DataFrame, PlSmallStr, SerReader};

use crate::{
    data::{
        domain::{Instrument, Upload},
        header::{HeaderCleaner, trim_header},
    },
    error::{IngestError, TickerlensError, TickerlensResult, polars_to_tickerlens_error},
};

/// One uploaded file, parsed but not yet typed.
///
/// Every column is read as text so the normalizer decides how each one is typed.
/// Headers are already trimmed (and optionally cleaned of index prefixes).
#[derive(Debug, Clone)]
pub struct RawTable {
    source_name: String,
    instrument: Instrument,
    df: DataFrame,
}

impl RawTable {
    /// Parses an upload, trimming headers.
    pub fn from_upload(upload: &Upload) -> TickerlensResult<Self> {
        Self::read(upload, None)
    }

    /// Parses an upload and strips index-export prefixes from headers and the file name.
    pub fn from_upload_cleaned(upload: &Upload, cleaner: &HeaderCleaner) -> TickerlensResult<Self> {
        Self::read(upload, Some(cleaner))
    }

    fn read(upload: &Upload, cleaner: Option<&HeaderCleaner>) -> TickerlensResult<Self> {
        let source_name = upload.file_name().to_string();
        let instrument = match cleaner {
            Some(c) => Instrument::from_file_name(&c.clean_file_name(&source_name)),
            None => upload.instrument(),
        };

        if upload.payload().iter().all(u8::is_ascii_whitespace) {
            return Err(IngestError::EmptyInput(source_name).into());
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(upload.payload().clone()))
            .finish()
            .map_err(|e| IngestError::UnreadableUpload {
                source_name: source_name.clone(),
                msg: e.to_string(),
            })?;

        let df = rename_headers(df, &source_name, cleaner)?;

        if df.height() == 0 {
            return Err(IngestError::EmptyInput(source_name).into());
        }

        Ok(Self {
            source_name,
            instrument,
            df,
        })
    }

    /// Wraps an existing frame. Headers are trimmed like an upload's.
    pub fn from_df(source_name: impl Into<String>, df: DataFrame) -> TickerlensResult<Self> {
        let source_name = source_name.into();
        let df = rename_headers(df, &source_name, None)?;
        Ok(Self {
            instrument: Instrument::from_file_name(&source_name),
            source_name,
            df,
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    /// Column names in original file order.
    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

fn rename_headers(
    df: DataFrame,
    source_name: &str,
    cleaner: Option<&HeaderCleaner>,
) -> TickerlensResult<DataFrame> {
    let mut seen = HashSet::with_capacity(df.width());
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let name = match cleaner {
            Some(c) => c.clean_header(column.name()),
            None => trim_header(column.name()),
        };
        if !seen.insert(name.clone()) {
            return Err(IngestError::DuplicateColumn {
                source_name: source_name.to_string(),
                column: name,
            }
            .into());
        }
        columns.push(column.clone().with_name(PlSmallStr::from(name)));
    }

    DataFrame::new(columns).map_err(|e| to_err(source_name, e))
}

fn to_err(source_name: &str, e: polars::error::PolarsError) -> TickerlensError {
    polars_to_tickerlens_error(&format!("reading headers of '{source_name}'"), e)
}

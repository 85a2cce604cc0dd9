use std::{fs, path::Path};

use polars::{
    frame::DataFrame,
    prelude::{CsvWriterOptions, IntoLazy, PlPath, SinkOptions, SinkTarget},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::{DataError, IoError, TickerlensResult},
    report::polars_ext::DataFrameExt,
};

// ================================================================================================
// Traits
// ================================================================================================

/// Common interface of every frame-backed output (normalized tables, derived metrics).
pub trait Report {
    /// Access the underlying DataFrame.
    fn as_df(&self) -> &DataFrame;
}

pub trait ReportName {
    fn base_name(&self) -> String;

    fn filename(&self, ext: FileExtension) -> String {
        format!("{}.{}", self.base_name(), ext)
    }
}

pub trait ToJson {
    /// Serializes the report to a generic JSON Value.
    /// Returns a `Value::Array` containing row objects.
    fn to_json(&self) -> TickerlensResult<serde_json::Value>;
}

pub trait ToCsv {
    /// Writes the report to a CSV file in the target directory.
    ///
    /// # Arguments
    /// - `dir`: Target directory. Created if it doesn't exist.
    /// - `opts`: CSV writing options (delimiter, headers, etc.).
    ///
    /// # Side Effects
    /// - Creates the directory if missing.
    /// - Overwrites the file if it exists.
    fn to_csv(
        &self,
        dir: impl AsRef<Path>,
        opts: Option<&CsvWriterOptions>,
        sink_opts: Option<&SinkOptions>,
    ) -> TickerlensResult<()>;
}

// ================================================================================================
// Blanket Implementations
// ================================================================================================

impl<T> ToJson for T
where
    T: Report,
{
    fn to_json(&self) -> TickerlensResult<serde_json::Value> {
        let rows = self.as_df().to_json_rows()?;
        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }
}

impl<T> ToCsv for T
where
    T: Report + ReportName,
{
    fn to_csv(
        &self,
        dir: impl AsRef<Path>,
        opts: Option<&CsvWriterOptions>,
        sink_opts: Option<&SinkOptions>,
    ) -> TickerlensResult<()> {
        let dir = dir.as_ref();
        let file_path = dir.join(self.filename(FileExtension::Csv));

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                IoError::FileSystem(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let uri = file_path.to_str().ok_or_else(|| {
            IoError::FileSystem(format!(
                "Path contains invalid UTF-8 characters: {}",
                file_path.display()
            ))
        })?;
        let target = SinkTarget::Path(PlPath::new(uri));
        let options = opts.cloned().unwrap_or_default();
        let sink_opts = sink_opts.cloned().unwrap_or_default();

        let lf = self.as_df().clone().lazy();

        let sink_plan = lf
            .sink_csv(target, options, None, sink_opts)
            .map_err(|e| DataError::DataFrame(format!("Failed to build CSV sink plan: {e}")))?;

        let _ = sink_plan.collect().map_err(|e| {
            IoError::WriteFailed(format!("CSV to '{}': {e}", file_path.display()))
        })?;

        Ok(())
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum FileExtension {
    Csv,
    Json,
}

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ================================================================================================
// Domain Strong Types (NewTypes)
// ================================================================================================

/// Identifies a single stock represented by one uploaded table (e.g. `TCS`).
///
/// Derived from the upload's file name: the `.csv` suffix is removed, surrounding
/// whitespace trimmed and the rest upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instrument(String);

impl Instrument {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_uppercase())
    }

    pub fn from_file_name(file_name: &str) -> Self {
        let trimmed = file_name.trim();
        let stem = trimmed
            .len()
            .checked_sub(4)
            .filter(|&idx| trimmed.is_char_boundary(idx))
            .filter(|&idx| trimmed[idx..].eq_ignore_ascii_case(".csv"))
            .map_or(trimmed, |idx| &trimmed[..idx]);
        Self::new(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The symbol used when asking a live-data provider, e.g. `TCS` + `.NS` -> `TCS.NS`.
    pub fn quote_symbol(&self, suffix: &str) -> String {
        format!("{}{}", self.0, suffix)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Instrument {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Represents a price level in the quote currency.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Price(pub f64);

impl From<f64> for Price {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ================================================================================================
// Upload
// ================================================================================================

/// A single file delivered by the upload surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    file_name: String,
    payload: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            payload: payload.into(),
        }
    }

    /// Reads an upload from the local file system, keeping only the file name.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let payload = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, payload))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn instrument(&self) -> Instrument {
        Instrument::from_file_name(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_from_file_name_strips_suffix_and_uppercases() {
        assert_eq!(Instrument::from_file_name("tcs.csv").as_str(), "TCS");
        assert_eq!(Instrument::from_file_name(" infy.CSV ").as_str(), "INFY");
        assert_eq!(Instrument::from_file_name("Tata Steel.csv").as_str(), "TATA STEEL");
        assert_eq!(
            Instrument::from_file_name("prices").as_str(),
            "PRICES",
            "names without the suffix are kept whole"
        );
    }

    #[test]
    fn quote_symbol_appends_suffix() {
        let id = Instrument::new("reliance");
        assert_eq!(id.quote_symbol(".NS"), "RELIANCE.NS");
        assert_eq!(id.quote_symbol(""), "RELIANCE");
    }

    #[test]
    fn upload_derives_instrument() {
        let upload = Upload::new("a.csv", "Date,Close\n");
        assert_eq!(upload.instrument(), Instrument::new("A"));
        assert_eq!(upload.payload().as_ref(), b"Date,Close\n");
    }
}

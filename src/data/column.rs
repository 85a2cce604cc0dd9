use polars::prelude::PlSmallStr;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Column names the normalizer recognizes or produces.
///
/// Every other header is passed through untouched.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    PartialOrd,
    Ord,
    EnumIter,
    IntoStaticStr,
)]
pub enum CanonicalCol {
    // === Time ===
    /// Parsed calendar date/time of the row. Always present after normalization.
    Date,

    // === Prices ===
    /// Opening price of the session.
    Open,
    /// Highest traded price of the session.
    High,
    /// Lowest traded price of the session.
    Low,
    /// Closing price. Always present after normalization, possibly synthesized.
    Close,
    /// Last traded price, the first fallback for a missing `Close`.
    Last,
    /// Previous session's close, the second fallback for a missing `Close`.
    #[strum(serialize = "Prev Close")]
    #[serde(rename = "Prev Close")]
    PrevClose,

    // === Derived metrics ===
    /// Simple percentage change of `Close` against the previous row.
    Returns,
    /// Rolling standard deviation of `Close`.
    Volatility,
}

impl From<CanonicalCol> for PlSmallStr {
    fn from(value: CanonicalCol) -> Self {
        value.as_str().into()
    }
}

impl CanonicalCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

use polars::prelude::{DataFrame, DataType, Expr, JsonFormat, JsonWriter, Null, SerWriter, lit, when};
use serde_json::Value;

use crate::error::{DataError, IoError, TickerlensResult};

pub trait ExprExt {
    /// Safely divides two expressions, protecting against division-by-zero.
    ///
    /// If the denominator is zero, returns `fallback` (default: missing).
    ///
    /// # Parameters
    /// - `other`: The `Expr` for the denominator.
    /// - `fallback`: Optional value to use if denominator == 0.
    ///   If `None`, the result is null.
    fn safe_div(self, other: Expr, fallback: Option<f64>) -> Expr;

    /// Mean of the non-null values across `exprs`, row by row. Null when every input is null.
    fn row_mean(exprs: &[Expr]) -> Expr;
}

impl ExprExt for Expr {
    fn safe_div(self, other: Expr, fallback: Option<f64>) -> Expr {
        let fallback_val = match fallback {
            Some(v) => lit(v),
            None => lit(Null {}).cast(DataType::Float64),
        };
        when(other.clone().eq(lit(0.0)))
            .then(fallback_val)
            .otherwise(self / other)
    }

    fn row_mean(exprs: &[Expr]) -> Expr {
        let sum = exprs
            .iter()
            .map(|e| e.clone().fill_null(lit(0.0)))
            .reduce(|acc, e| acc + e);
        let count = exprs
            .iter()
            .map(|e| e.clone().is_not_null().cast(DataType::Float64))
            .reduce(|acc, e| acc + e);

        match (sum, count) {
            (Some(sum), Some(count)) => sum.safe_div(count, None),
            _ => lit(Null {}).cast(DataType::Float64),
        }
    }
}

pub trait DataFrameExt {
    fn to_json_rows(&self) -> TickerlensResult<Vec<serde_json::Map<String, Value>>>;
}

impl DataFrameExt for DataFrame {
    fn to_json_rows(&self) -> TickerlensResult<Vec<serde_json::Map<String, Value>>> {
        let height = self.height();
        if height == 0 {
            return Ok(Vec::new());
        }

        // 1. Pre-allocate buffer (Heuristic: approx 2^6 bytes per row)
        let estimated_row_size = self.width() * (1 << 6);
        let mut buf = Vec::with_capacity(height * estimated_row_size);

        // 2. Serialize to memory
        JsonWriter::new(&mut buf)
            .with_json_format(JsonFormat::Json)
            .finish(&mut self.clone())
            .map_err(|e| DataError::DataFrame(e.to_string()))?;

        // 3. Parse back to Value
        let json_val: Value = serde_json::from_slice(&buf).map_err(IoError::Json)?;

        match json_val {
            Value::Array(rows) => Ok(rows
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            _ => {
                Err(DataError::DataFrame("Polars JSON output was not an array".to_string()).into())
            }
        }
    }
}

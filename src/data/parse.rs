use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Cell contents treated as a missing value rather than a parse failure.
const MISSING_TOKENS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "None", "-"];

/// Date-time layouts tried before the date-only layouts.
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts. Numeric day and month are read month-first for both separators,
/// falling back to day-first only when the leading number cannot be a month.
const DATE_FORMATS: [&str; 11] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y%m%d",
];

pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    MISSING_TOKENS.contains(&cell)
}

/// Parses a numeric cell.
///
/// Returns `Ok(None)` for missing cells. Thousands separators (`1,234.5`) are accepted.
pub fn parse_number(cell: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    if is_missing(cell) {
        return Ok(None);
    }
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().map(Some)
}

/// Parses a calendar date or date-time. Returns `None` for missing or unparseable cells.
pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    if is_missing(cell) {
        return None;
    }
    let cell = cell.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(cell, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn to_millis(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

pub fn from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn missing_tokens_are_not_failures() {
        for token in ["", "  ", "NA", "NaN", "null", "-"] {
            assert_eq!(
                parse_number(token).expect("missing is not an error"),
                None,
                "token {token:?} should be missing"
            );
        }
    }

    #[test]
    fn numbers_with_thousands_separators() {
        assert_eq!(parse_number("1,234.5").expect("valid"), Some(1234.5));
        assert_eq!(parse_number(" 42 ").expect("valid"), Some(42.0));
        assert!(parse_number("EQ").is_err());
    }

    #[test]
    fn common_date_layouts() {
        assert_eq!(parse_timestamp("2024-01-02"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_timestamp("2024/01/02"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_timestamp("01/02/2024"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_timestamp("01-02-2024"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_timestamp("02-Jan-2024"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_timestamp("Jan 02, 2024"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_timestamp("20240102"), Some(ymd(2024, 1, 2)));
    }

    #[test]
    fn date_times_keep_their_time() {
        let ts = parse_timestamp("2024-01-02 15:30:00").expect("should parse");
        assert_eq!(ts.format("%H:%M").to_string(), "15:30");

        let ts = parse_timestamp("2024-01-02T09:15:00Z").expect("rfc3339 should parse");
        assert_eq!(ts.format("%Y-%m-%d %H:%M").to_string(), "2024-01-02 09:15");
    }

    #[test]
    fn dash_and_slash_dates_agree() {
        assert_eq!(parse_timestamp("03-04-2024"), Some(ymd(2024, 3, 4)));
        assert_eq!(parse_timestamp("03-04-2024"), parse_timestamp("03/04/2024"));
        assert_eq!(
            parse_timestamp("25-12-2024"),
            Some(ymd(2024, 12, 25)),
            "day-first only when the month would be out of range"
        );
    }

    #[test]
    fn offsets_keep_the_local_wall_clock() {
        let ts = parse_timestamp("2024-01-02T01:00:00+05:30").expect("rfc3339 should parse");
        assert_eq!(ts.format("%Y-%m-%d %H:%M").to_string(), "2024-01-02 01:00");
    }

    #[test]
    fn garbage_is_unparseable() {
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn millis_round_trip() {
        let ts = ymd(2024, 1, 2);
        assert_eq!(from_millis(to_millis(ts)), Some(ts));
    }
}

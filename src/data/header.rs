use std::sync::LazyLock;

use regex::Regex;

/// Index-export prefixes such as `NIFTY50 `, `NIFTY100 ` or `NIFTY 2 `.
static INDEX_HEADER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(NIFTY50|NIFTY100|NIFTY)\s*\d*\s*").expect("index header prefix is a valid regex")
});

/// Same as [`INDEX_HEADER_PREFIX`], plus the `YR` prefix found on exported file names.
static INDEX_FILE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(NIFTY50|NIFTY100|NIFTY|YR)\s*\d*\s*").expect("index file prefix is a valid regex")
});

/// Removes surrounding whitespace from a header. Applied before any column matching.
pub fn trim_header(header: &str) -> String {
    header.trim().to_string()
}

/// Strips index-export prefixes from headers and file names.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderCleaner;

impl HeaderCleaner {
    /// Cleans a header, falling back to the trimmed original if nothing would be left.
    pub fn clean_header(&self, header: &str) -> String {
        strip(&INDEX_HEADER_PREFIX, header)
    }

    pub fn clean_file_name(&self, file_name: &str) -> String {
        strip(&INDEX_FILE_PREFIX, file_name)
    }
}

fn strip(pattern: &Regex, value: &str) -> String {
    let trimmed = value.trim();
    let stripped = pattern.replace(trimmed, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        trimmed.to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace() {
        assert_eq!(trim_header("  Close "), "Close");
        assert_eq!(trim_header("Prev Close"), "Prev Close");
    }

    #[test]
    fn strips_index_prefixes_from_headers() {
        let cleaner = HeaderCleaner;
        assert_eq!(cleaner.clean_header("NIFTY50 Close"), "Close");
        assert_eq!(cleaner.clean_header("NIFTY100 Open"), "Open");
        assert_eq!(cleaner.clean_header("NIFTY 50 High"), "High");
        assert_eq!(cleaner.clean_header("Date"), "Date");
    }

    #[test]
    fn keeps_header_that_is_only_a_prefix() {
        assert_eq!(HeaderCleaner.clean_header("NIFTY"), "NIFTY");
    }

    #[test]
    fn strips_year_prefix_from_file_names() {
        let cleaner = HeaderCleaner;
        assert_eq!(cleaner.clean_file_name("YR 2020 TCS.csv"), "TCS.csv");
        assert_eq!(cleaner.clean_file_name("NIFTY50 INFY.csv"), "INFY.csv");
        assert_eq!(cleaner.clean_file_name("TCS.csv"), "TCS.csv");
    }
}

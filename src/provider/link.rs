use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use url::form_urlencoded;

use crate::data::domain::Instrument;

/// Known quote pages, keyed by instrument.
const QUOTE_PAGES: &[(&str, &str)] = &[
    ("TCS", "https://finance.yahoo.com/quote/TCS.NS"),
    ("TATASTEEL", "https://finance.yahoo.com/quote/TATASTEEL.NS"),
    ("RELIANCE", "https://finance.yahoo.com/quote/RELIANCE.NS"),
    ("INFY", "https://finance.yahoo.com/quote/INFY.NS"),
    ("TECHM", "https://finance.yahoo.com/quote/TECHM.NS"),
    ("TITAN", "https://finance.yahoo.com/quote/TITAN.NS"),
    ("TATAMOTORS", "https://finance.yahoo.com/quote/TATAMOTORS.NS"),
];

/// Known official websites, keyed by instrument.
const WEBSITES: &[(&str, &str)] = &[
    ("TCS", "https://www.tcs.com"),
    ("TITAN", "https://www.titancompany.in"),
    ("TATASTEEL", "https://www.tatasteel.com"),
    ("TECHM", "https://www.techmahindra.com"),
    ("AAPL", "https://www.apple.com/investor-relations/"),
    ("GOOGL", "https://abc.xyz/investor/"),
    ("MSFT", "https://www.microsoft.com/investor/"),
];

const SEARCH_URL: &str = "https://www.google.com/search?q=";
const TRADINGVIEW_WIDGET_URL: &str = "https://s.tradingview.com/widgetembed/";

/// What to link when an instrument has no known website.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
pub enum WebsiteFallback {
    /// A web search for the instrument's official website.
    #[default]
    Search,
    /// A guessed `https://www.<instrument>.com` address.
    Guess,
}

/// The informational links shown next to an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentLinks {
    pub instrument: Instrument,
    pub quote_page: String,
    pub website: String,
    pub live_chart: String,
}

/// Resolves an instrument to quote-page, website and live-chart URLs.
///
/// Purely informational. Nothing here touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkResolver {
    fallback: WebsiteFallback,
}

impl LinkResolver {
    pub fn new(fallback: WebsiteFallback) -> Self {
        Self { fallback }
    }

    pub fn quote_page(&self, instrument: &Instrument) -> String {
        lookup(QUOTE_PAGES, instrument)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{SEARCH_URL}{}+stock", search_term(instrument)))
    }

    pub fn website(&self, instrument: &Instrument) -> String {
        if let Some(url) = lookup(WEBSITES, instrument) {
            return url.to_string();
        }
        match self.fallback {
            WebsiteFallback::Search => {
                format!("{SEARCH_URL}{}+official+website", search_term(instrument))
            }
            WebsiteFallback::Guess => guess_website(instrument.as_str()),
        }
    }

    /// Embeddable daily chart for a TradingView symbol such as `TCS` or `NSE:TCS`.
    pub fn live_chart(&self, symbol: &str) -> String {
        format!(
            "{TRADINGVIEW_WIDGET_URL}?symbol={}&interval=D&hidesidetoolbar=1&theme=dark",
            symbol.trim().to_uppercase()
        )
    }

    pub fn resolve(&self, instrument: &Instrument) -> InstrumentLinks {
        InstrumentLinks {
            instrument: instrument.clone(),
            quote_page: self.quote_page(instrument),
            website: self.website(instrument),
            live_chart: self.live_chart(instrument.as_str()),
        }
    }
}

/// `https://www.` + lower-cased name without spaces + `.com`.
pub fn guess_website(name: &str) -> String {
    let host: String = name
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!("https://www.{host}.com")
}

fn lookup(table: &[(&str, &'static str)], instrument: &Instrument) -> Option<&'static str> {
    table
        .iter()
        .find(|(key, _)| *key == instrument.as_str())
        .map(|(_, url)| *url)
}

/// Query-string form of the instrument: spaces become `+`, reserved characters are escaped.
fn search_term(instrument: &Instrument) -> String {
    let words = instrument.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
    form_urlencoded::byte_serialize(words.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_quote_pages() {
        let r = LinkResolver::default();
        assert_eq!(
            r.quote_page(&Instrument::new("tcs")),
            "https://finance.yahoo.com/quote/TCS.NS"
        );
        assert_eq!(
            r.quote_page(&Instrument::new("XYZ")),
            "https://www.google.com/search?q=XYZ+stock"
        );
    }

    #[test]
    fn websites_with_each_fallback() {
        let search = LinkResolver::new(WebsiteFallback::Search);
        let guess = LinkResolver::new(WebsiteFallback::Guess);

        assert_eq!(search.website(&Instrument::new("TITAN")), "https://www.titancompany.in");
        assert_eq!(guess.website(&Instrument::new("MSFT")), "https://www.microsoft.com/investor/");

        assert_eq!(
            search.website(&Instrument::new("Acme Corp")),
            "https://www.google.com/search?q=ACME+CORP+official+website"
        );
        assert_eq!(guess.website(&Instrument::new("Acme Corp")), "https://www.acmecorp.com");
    }

    #[test]
    fn search_links_escape_reserved_characters() {
        let r = LinkResolver::default();
        assert_eq!(
            r.quote_page(&Instrument::new("M&M")),
            "https://www.google.com/search?q=M%26M+stock"
        );
        assert_eq!(
            r.website(&Instrument::new("A#B C")),
            "https://www.google.com/search?q=A%23B+C+official+website"
        );
    }

    #[test]
    fn tradingview_widget() {
        let r = LinkResolver::default();
        assert_eq!(
            r.live_chart(" nse:tcs "),
            "https://s.tradingview.com/widgetembed/?symbol=NSE:TCS&interval=D&hidesidetoolbar=1&theme=dark"
        );

        let links = r.resolve(&Instrument::new("INFY"));
        assert_eq!(links.quote_page, "https://finance.yahoo.com/quote/INFY.NS");
        assert!(links.live_chart.contains("symbol=INFY&"));
    }
}

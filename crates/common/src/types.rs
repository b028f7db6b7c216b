use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use super::error::Error;

/// A tradable currency or asset symbol, e.g. `USD` or `BTC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(symbol: impl Into<String>) -> Self {
        Currency(symbol.into())
    }
}

impl From<&str> for Currency {
    fn from(symbol: &str) -> Self {
        Currency::new(symbol)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A traded instrument: `base` is bought or sold, priced in `quote`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    pub fn new(base: impl Into<Currency>, quote: impl Into<Currency>) -> Self {
        CurrencyPair {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = Error;

    /// Parses the `BASE/QUOTE` notation used by tickers and replay files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::MalformedInstrument(s.to_string());

        let (base, quote) = s.split_once('/').ok_or_else(malformed)?;
        let (base, quote) = (base.trim(), quote.trim());
        if base.is_empty() || quote.is_empty() || quote.contains('/') || base == quote {
            return Err(malformed());
        }
        Ok(CurrencyPair::new(base, quote))
    }
}

/// Top of book for one instrument as delivered by the market data feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub instrument: CurrencyPair,
    pub ask: f64,
    pub bid: f64,
}

impl Ticker {
    pub fn new(instrument: CurrencyPair, ask: f64, bid: f64) -> Self {
        Ticker {
            instrument,
            ask,
            bid,
        }
    }
}

/// Point-in-time view of one conversion edge: 1 `from` buys `price` `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub from: Currency,
    pub to: Currency,
    pub price: f64,
}

impl fmt::Display for RateQuote {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {} {}", self.from, self.price, self.to)
    }
}

/// An arbitrage loop found while searching from `source`.
///
/// `cycle` is a closed walk starting at its entry currency; `enter_path`
/// leads from `source` to that entry and is empty when the loop cannot be
/// reached from `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arbitrage {
    pub source: Currency,
    pub cycle: Vec<RateQuote>,
    pub enter_path: Vec<RateQuote>,
}

impl Arbitrage {
    /// Returns the profit multiplier (∏ price_i) for one pass around the loop.
    pub fn product_rate(&self) -> f64 {
        self.cycle.iter().map(|rate| rate.price).product()
    }

    /// Returns ∑ -ln(price_i); negative for a profitable loop.
    ///
    /// ```text
    /// prices [2.0, 3.0, 4.0] → ∏ = 24.0
    /// log_rate_sum = -ln(24.0) ≈ -3.178
    /// ```
    pub fn log_rate_sum(&self) -> f64 {
        self.cycle.iter().map(|rate| -rate.price.ln()).sum()
    }

    /// Returns true if the cycle is profitable (product_rate > 1.0).
    pub fn is_profitable(&self) -> bool {
        self.product_rate() > 1.0
    }

    /// Currency the loop starts and ends at.
    pub fn entry(&self) -> Option<&Currency> {
        self.cycle.first().map(|rate| &rate.from)
    }
}

impl fmt::Display for Arbitrage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let render = |rates: &[RateQuote]| {
            rates
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        write!(f, "{}", render(&self.cycle))?;
        if !self.enter_path.is_empty() {
            write!(f, " (enter via {})", render(&self.enter_path))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(from: &str, to: &str, price: f64) -> RateQuote {
        RateQuote {
            from: from.into(),
            to: to.into(),
            price,
        }
    }

    fn sample() -> Arbitrage {
        Arbitrage {
            source: "USD".into(),
            cycle: vec![
                rate("GBP", "USD", 1.521),
                rate("USD", "EUR", 0.741),
                rate("EUR", "GBP", 0.888),
            ],
            enter_path: vec![rate("USD", "GBP", 0.657)],
        }
    }

    #[test]
    fn parse_currency_pair() {
        let pair: CurrencyPair = "BTC/USD".parse().unwrap();
        assert_eq!(pair, CurrencyPair::new("BTC", "USD"));
        assert_eq!(pair.to_string(), "BTC/USD");

        let padded: CurrencyPair = " ETH / BTC ".parse().unwrap();
        assert_eq!(padded, CurrencyPair::new("ETH", "BTC"));
    }

    #[test]
    fn parse_currency_pair_rejects_malformed() {
        for raw in ["BTCUSD", "/USD", "BTC/", "A/B/C", "USD/USD", ""] {
            assert_eq!(
                raw.parse::<CurrencyPair>(),
                Err(Error::MalformedInstrument(raw.to_string())),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn product_rate_and_log_sum_agree() {
        let arbitrage = sample();
        let product = 1.521 * 0.741 * 0.888;

        assert!((arbitrage.product_rate() - product).abs() < 1e-12);
        assert!((arbitrage.log_rate_sum() + product.ln()).abs() < 1e-12);
        assert!(arbitrage.is_profitable());
        assert!(arbitrage.log_rate_sum() < 0.0);
    }

    #[test]
    fn unprofitable_loop() {
        let arbitrage = Arbitrage {
            source: "USD".into(),
            cycle: vec![rate("USD", "EUR", 0.9), rate("EUR", "USD", 1.1)],
            enter_path: vec![],
        };
        assert!(!arbitrage.is_profitable());
        assert!(arbitrage.log_rate_sum() > 0.0);
    }

    #[test]
    fn entry_is_first_cycle_currency() {
        assert_eq!(sample().entry(), Some(&Currency::from("GBP")));
    }

    #[test]
    fn render_opportunity() {
        assert_eq!(
            sample().to_string(),
            "GBP -> 1.521 USD, USD -> 0.741 EUR, EUR -> 0.888 GBP (enter via USD -> 0.657 GBP)"
        );
    }
}

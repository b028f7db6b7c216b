use parking_lot::RwLock;

use super::traits::{Edge, PricedEdge, WeightedEdge};
use common::error::Error;
use common::numeric_kernel::{price_to_weight, validate_price};
use common::types::{Currency, RateQuote};

/// A validated `(price, weight)` pair with `weight == -ln(price)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    price: f64,
    weight: f64,
}

impl Quote {
    /// # Errors
    /// Returns `Error::InvalidPrice` for a non-finite or non-positive price.
    pub fn new(price: f64) -> Result<Self, Error> {
        let price = validate_price(price)?;
        Ok(Quote {
            price,
            weight: price_to_weight(price)?,
        })
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// Conversion edge: 1 unit of `from_currency` buys `price` units of `to_currency`.
///
/// The endpoints are fixed for the lifetime of the edge. The quote is
/// replaced as a whole under the edge's own lock, so readers never see a
/// price paired with a weight computed from a different price.
#[derive(Debug)]
pub struct ExchangeRate {
    from_currency: Currency,
    to_currency: Currency,
    from: usize,
    to: usize,
    quote: RwLock<Quote>,
}

impl ExchangeRate {
    pub fn new(
        from_currency: Currency,
        to_currency: Currency,
        from: usize,
        to: usize,
        price: f64,
    ) -> Result<Self, Error> {
        Ok(ExchangeRate {
            from_currency,
            to_currency,
            from,
            to,
            quote: RwLock::new(Quote::new(price)?),
        })
    }

    pub fn from_currency(&self) -> &Currency {
        &self.from_currency
    }

    pub fn to_currency(&self) -> &Currency {
        &self.to_currency
    }

    /// Consistent copy of the current `(price, weight)` pair.
    pub fn quote(&self) -> Quote {
        *self.quote.read()
    }

    /// Replaces the price and its weight in one step.
    ///
    /// # Errors
    /// Returns `Error::InvalidPrice` for a non-finite or non-positive price;
    /// the previous quote is kept.
    pub fn update_price(&self, price: f64) -> Result<(), Error> {
        let quote = Quote::new(price)?;
        self.commit(quote);
        Ok(())
    }

    /// Stores a quote built by [`Quote::new`].
    pub fn commit(&self, quote: Quote) {
        *self.quote.write() = quote;
    }

    pub fn snapshot(&self) -> RateQuote {
        RateQuote {
            from: self.from_currency.clone(),
            to: self.to_currency.clone(),
            price: self.quote().price(),
        }
    }
}

impl Edge for ExchangeRate {
    fn from(&self) -> usize {
        self.from
    }

    fn to(&self) -> usize {
        self.to
    }
}

impl WeightedEdge for ExchangeRate {
    fn weight(&self) -> f64 {
        self.quote.read().weight
    }
}

impl PricedEdge for ExchangeRate {
    fn price(&self) -> f64 {
        self.quote.read().price
    }
}

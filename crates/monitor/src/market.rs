use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{MarketGraph, MarketListener};
use arb_core::{ExchangeRate, Quote, SymbolGraph};
use common::error::Error;
use common::numeric_kernel::invert_price;
use common::types::{CurrencyPair, Ticker};

/// What `Market::update` did with a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The instrument is outside the configured universe.
    Ignored,
}

/// The two directed edges of one instrument.
#[derive(Debug, Clone)]
struct ExchangeRates {
    /// quote -> base, priced at 1 / ask.
    ask: Arc<ExchangeRate>,
    /// base -> quote, priced at bid.
    bid: Arc<ExchangeRate>,
}

/// Owns the live currency graph and applies ticker updates to it.
pub struct Market {
    graph: Arc<MarketGraph>,
    index: HashMap<CurrencyPair, ExchangeRates>,
    listener: Option<Arc<dyn MarketListener>>,
}

impl Market {
    pub fn graph(&self) -> &Arc<MarketGraph> {
        &self.graph
    }

    pub fn instruments(&self) -> impl Iterator<Item = &CurrencyPair> {
        self.index.keys()
    }

    /// Ask and bid edges of `instrument`.
    ///
    /// # Errors
    /// Returns `Error::UnknownInstrument` if the instrument is not indexed.
    pub fn rates_of(
        &self,
        instrument: &CurrencyPair,
    ) -> Result<(&ExchangeRate, &ExchangeRate), Error> {
        self.index
            .get(instrument)
            .map(|rates| (rates.ask.as_ref(), rates.bid.as_ref()))
            .ok_or_else(|| Error::UnknownInstrument(instrument.to_string()))
    }

    /// Applies `ticker` to both edges of its instrument, then notifies the listener.
    ///
    /// Both prices are validated before either edge changes, so an invalid
    /// ticker leaves the instrument untouched.
    ///
    /// # Errors
    /// Returns `Error::InvalidPrice` if the ask or bid is not a finite positive number.
    pub fn update(&self, ticker: &Ticker) -> Result<UpdateOutcome, Error> {
        let (ask_edge, bid_edge) = match self.rates_of(&ticker.instrument) {
            Ok(edges) => edges,
            Err(e) => {
                warn!(error = %e, "Received update for unknown instrument");
                return Ok(UpdateOutcome::Ignored);
            }
        };

        let ask = Quote::new(invert_price(ticker.ask)?)?;
        let bid = Quote::new(ticker.bid)?;

        ask_edge.commit(ask);
        bid_edge.commit(bid);
        debug!(
            instrument = %ticker.instrument,
            ask = ticker.ask,
            bid = ticker.bid,
            "Applied market update"
        );

        if let Some(listener) = &self.listener {
            listener.on_market_update(&self.graph);
        }
        Ok(UpdateOutcome::Applied)
    }
}

/// Builds a [`Market`] from an instrument catalog and an opening snapshot.
pub struct MarketBuilder {
    graph: MarketGraph,
    catalog: Vec<CurrencyPair>,
    index: HashMap<CurrencyPair, ExchangeRates>,
    listener: Option<Arc<dyn MarketListener>>,
}

impl MarketBuilder {
    /// The vertex set is every base and quote currency of `instruments`.
    pub fn of<I>(instruments: I) -> Self
    where
        I: IntoIterator<Item = CurrencyPair>,
    {
        let catalog: Vec<CurrencyPair> = instruments.into_iter().collect();
        let symbols = catalog
            .iter()
            .flat_map(|pair| [pair.base.clone(), pair.quote.clone()]);

        MarketBuilder {
            graph: SymbolGraph::from_symbols(symbols),
            catalog,
            index: HashMap::new(),
            listener: None,
        }
    }

    /// Creates the ask and bid edges of every catalog instrument in `tickers`.
    ///
    /// Tickers outside the catalog are skipped; a repeated ticker re-prices
    /// the edges created by the first one.
    ///
    /// # Errors
    /// Returns `Error::InvalidPrice` if a snapshot price is invalid.
    pub fn with_tickers<I>(mut self, tickers: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Ticker>,
    {
        for ticker in tickers {
            if !self.catalog.contains(&ticker.instrument) {
                let e = Error::UnknownInstrument(ticker.instrument.to_string());
                warn!(error = %e, "Skipping snapshot ticker");
                continue;
            }

            if let Some(rates) = self.index.get(&ticker.instrument) {
                let ask = Quote::new(invert_price(ticker.ask)?)?;
                let bid = Quote::new(ticker.bid)?;
                rates.ask.commit(ask);
                rates.bid.commit(bid);
                continue;
            }

            let rates = self.exchange_rates(&ticker)?;
            self.graph.add_edge(Arc::clone(&rates.ask))?;
            self.graph.add_edge(Arc::clone(&rates.bid))?;
            self.index.insert(ticker.instrument, rates);
        }

        Ok(self)
    }

    fn exchange_rates(&self, ticker: &Ticker) -> Result<ExchangeRates, Error> {
        let pair = &ticker.instrument;
        let base = self.graph.require_index(&pair.base)?;
        let quote = self.graph.require_index(&pair.quote)?;

        let ask = ExchangeRate::new(
            pair.quote.clone(),
            pair.base.clone(),
            quote,
            base,
            invert_price(ticker.ask)?,
        )?;
        let bid = ExchangeRate::new(
            pair.base.clone(),
            pair.quote.clone(),
            base,
            quote,
            ticker.bid,
        )?;

        Ok(ExchangeRates {
            ask: Arc::new(ask),
            bid: Arc::new(bid),
        })
    }

    pub fn with_listener(mut self, listener: Arc<dyn MarketListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn build(self) -> Market {
        Market {
            graph: Arc::new(self.graph),
            index: self.index,
            listener: self.listener,
        }
    }
}

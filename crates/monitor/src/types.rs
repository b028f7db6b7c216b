use std::sync::Arc;
use tokio::sync::mpsc::Sender;

use super::error::Error;
use arb_core::{ExchangeRate, SymbolGraph};
use common::types::{Arbitrage, Currency, Ticker};

/// The live currency graph shared between the market and detection tasks.
pub type MarketGraph = SymbolGraph<Currency, Arc<ExchangeRate>>;

/// A trait defining the contract for any source that generates and streams
/// ticker batches into the market pipeline.
///
/// This decouples the Producer task from the specific data source (e.g. a
/// replay file vs. simulated quotes).
///
/// The trait bounds (`Send`, `Sync`, `'static`) are mandatory to ensure the
/// implementation can be safely executed by the multi-threaded runtime.
#[async_trait::async_trait]
pub trait TickerStreamer: Send + Sync + 'static {
    async fn run_stream(self, sender: Sender<Vec<Ticker>>) -> Result<(), Error>;
}

/// Notified synchronously after every applied market update.
pub trait MarketListener: Send + Sync {
    fn on_market_update(&self, graph: &Arc<MarketGraph>);
}

/// Receives every arbitrage found by a detection run.
pub trait ArbitrageListener: Send + Sync + 'static {
    fn on_arbitrage_found(&self, arbitrage: Arbitrage);
}

/// Where ticker updates come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Sim,
    Csv(String),
}

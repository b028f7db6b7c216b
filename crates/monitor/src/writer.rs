use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::error::Error;
use super::market::{Market, UpdateOutcome};
use common::types::Ticker;

/// Async consumer that applies ticker batches to the market.
pub struct Writer {
    market: Arc<Market>,
    receiver: Receiver<Vec<Ticker>>,
    shutdown: watch::Receiver<()>, // signal for graceful shutdown
}

impl Writer {
    pub fn new(
        market: Arc<Market>,
        receiver: Receiver<Vec<Ticker>>,
        shutdown: watch::Receiver<()>,
    ) -> Self {
        Self {
            market,
            receiver,
            shutdown,
        }
    }

    /// Run the writer asynchronously.
    ///
    /// Applies every ticker of every batch in order. A rejected ticker is
    /// logged and skipped; the rest of its batch still applies.
    /// Exits gracefully when the receiver is closed or shutdown signal is
    /// received, returning the number of applied tickers.
    pub async fn process_updates(mut self) -> Result<usize, Error> {
        info!("Writer ready.");
        let mut applied = 0;

        loop {
            select! {
                batch = self.receiver.recv() => {
                    let Some(batch) = batch else {
                        info!("Receiver closed, shutting down writer.");
                        break;
                    };
                    applied += self.apply(&batch);
                }

                _ = self.shutdown.changed() => {
                    info!("Shutdown signal received, stopping writer.");
                    break;
                }
            }
        }

        Ok(applied)
    }

    fn apply(&self, batch: &[Ticker]) -> usize {
        let mut applied = 0;
        for ticker in batch {
            match self.market.update(ticker) {
                Ok(UpdateOutcome::Applied) => applied += 1,
                Ok(UpdateOutcome::Ignored) => {}
                Err(e) => warn!(instrument = %ticker.instrument, error = %e, "Rejected ticker"),
            }
        }
        debug!(received = batch.len(), applied, "Applied ticker batch");
        applied
    }

    /// Public method that spawns the Writer task onto the Tokio runtime.
    pub fn spawn_task(self) -> tokio::task::JoinHandle<Result<usize, Error>> {
        tokio::spawn(self.process_updates())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketBuilder;
    use arb_core::traits::PricedEdge;
    use common::types::CurrencyPair;
    use tokio::sync::mpsc;

    fn eur_usd() -> CurrencyPair {
        CurrencyPair::new("EUR", "USD")
    }

    fn market() -> Arc<Market> {
        let market = MarketBuilder::of([eur_usd()])
            .with_tickers([Ticker::new(eur_usd(), 1.1, 1.0)])
            .unwrap()
            .build();
        Arc::new(market)
    }

    #[tokio::test]
    async fn applies_batches_until_channel_closes() {
        let market = market();
        let (tx, rx) = mpsc::channel(4);
        let (_shutdown_tx, shutdown_rx) = watch::channel(());
        let handle = Writer::new(Arc::clone(&market), rx, shutdown_rx).spawn_task();

        tx.send(vec![
            Ticker::new(eur_usd(), 1.25, 1.2),
            Ticker::new(eur_usd(), -1.0, 1.0),
            Ticker::new(CurrencyPair::new("JPY", "USD"), 0.007, 0.006),
        ])
        .await
        .unwrap();
        tx.send(vec![Ticker::new(eur_usd(), 2.0, 1.9)]).await.unwrap();
        drop(tx);

        let applied = handle.await.unwrap().unwrap();
        assert_eq!(applied, 2);

        let (ask, bid) = market.rates_of(&eur_usd()).unwrap();
        assert_eq!(ask.price(), 0.5);
        assert_eq!(bid.price(), 1.9);
    }

    #[tokio::test]
    async fn stops_on_shutdown_signal() {
        let (_tx, rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let handle = Writer::new(market(), rx, shutdown_rx).spawn_task();

        shutdown_tx.send(()).unwrap();
        assert_eq!(handle.await.unwrap().unwrap(), 0);
    }
}

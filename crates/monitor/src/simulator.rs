use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc::Sender;
use tokio::time::{self, Duration};
use tracing::{debug, info};

use super::config::{InstrumentConfig, SimulatorConfig};
use super::error::Error;
use super::types::TickerStreamer;
use common::types::{CurrencyPair, Ticker};

const BPS: f64 = 10_000.0;

/// Produces synthetic tickers by random-walking the mid price of each instrument.
///
/// Every tick emits `batch_size` tickers for randomly chosen instruments. The
/// chosen mid moves by up to `fluctuation_bps` and is quoted with a fixed
/// `spread_bps` around it.
pub struct SimulatorStreamer {
    mids: Vec<(CurrencyPair, f64)>,
    config: SimulatorConfig,
    batch_size: usize,
    rng: SmallRng,
}

impl SimulatorStreamer {
    pub fn new(
        instruments: &[InstrumentConfig],
        config: SimulatorConfig,
        batch_size: usize,
    ) -> Self {
        let mids = instruments
            .iter()
            .map(|i| (i.pair(), (i.ask + i.bid) / 2.0))
            .collect();
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        SimulatorStreamer {
            mids,
            config,
            batch_size,
            rng,
        }
    }

    fn next_batch(&mut self) -> Vec<Ticker> {
        if self.mids.is_empty() {
            return Vec::new();
        }

        let fluctuation = self.config.fluctuation_bps / BPS;
        let half_spread = self.config.spread_bps / BPS / 2.0;

        (0..self.batch_size)
            .map(|_| {
                let idx = self.rng.random_range(0..self.mids.len());
                let step = if fluctuation > 0.0 {
                    self.rng.random_range(-fluctuation..=fluctuation)
                } else {
                    0.0
                };

                let (pair, mid) = &mut self.mids[idx];
                *mid *= 1.0 + step;
                Ticker::new(pair.clone(), *mid * (1.0 + half_spread), *mid * (1.0 - half_spread))
            })
            .collect()
    }
}

#[async_trait]
impl TickerStreamer for SimulatorStreamer {
    /// Runs the simulation asynchronously.
    ///
    /// Backpressure is handled naturally via awaiting on `sender.send()`.
    /// Exits if the receiver is dropped.
    async fn run_stream(mut self, sender: Sender<Vec<Ticker>>) -> Result<(), Error> {
        let mut interval = time::interval(Duration::from_millis(self.config.interval_ms));
        info!(instruments = self.mids.len(), "Simulator started");

        loop {
            interval.tick().await;

            let batch = self.next_batch();
            debug!(tickers = batch.len(), "Simulator sent batch");
            if sender.send(batch).await.is_err() {
                info!("Simulator shutting down: writer receiver dropped.");
                return Err(Error::ChannelSendFailed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::{Duration, timeout};

    fn instruments() -> Vec<InstrumentConfig> {
        vec![
            InstrumentConfig {
                base: "EUR".into(),
                quote: "USD".into(),
                ask: 1.1002,
                bid: 1.0998,
            },
            InstrumentConfig {
                base: "GBP".into(),
                quote: "USD".into(),
                ask: 1.2602,
                bid: 1.2598,
            },
        ]
    }

    fn sim_config(seed: Option<u64>) -> SimulatorConfig {
        SimulatorConfig {
            interval_ms: 10,
            fluctuation_bps: 5.0,
            spread_bps: 2.0,
            seed,
        }
    }

    /// SimulatorStreamer generates correct number of tickers in a batch.
    #[tokio::test]
    async fn test_batch_size() {
        let sim = SimulatorStreamer::new(&instruments(), sim_config(None), 5);
        let (tx, mut rx) = mpsc::channel(10);

        tokio::spawn(async move {
            let _ = sim.run_stream(tx).await;
        });

        let tickers = timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("Did not receive batch")
            .expect("Channel closed");

        assert_eq!(tickers.len(), 5);
    }

    #[test]
    fn tickers_stay_in_catalog_with_positive_spread() {
        let mut sim = SimulatorStreamer::new(&instruments(), sim_config(Some(7)), 50);
        let catalog: Vec<_> = instruments().iter().map(InstrumentConfig::pair).collect();

        for ticker in sim.next_batch() {
            assert!(catalog.contains(&ticker.instrument));
            assert!(ticker.bid > 0.0);
            assert!(ticker.ask > ticker.bid);
        }
    }

    #[test]
    fn single_step_moves_mid_within_fluctuation() {
        let eur_usd = &instruments()[..1];
        let mut sim = SimulatorStreamer::new(eur_usd, sim_config(Some(1)), 1);

        let ticker = &sim.next_batch()[0];
        let mid = (ticker.ask + ticker.bid) / 2.0;
        let max_move = 1.1 * 5.0 / BPS;
        assert!((mid - 1.1).abs() <= max_move + 1e-12, "mid moved to {}", mid);
    }

    #[test]
    fn seeded_simulators_are_reproducible() {
        let mut a = SimulatorStreamer::new(&instruments(), sim_config(Some(42)), 20);
        let mut b = SimulatorStreamer::new(&instruments(), sim_config(Some(42)), 20);

        assert_eq!(a.next_batch(), b.next_batch());
        assert_eq!(a.next_batch(), b.next_batch());
    }

    #[test]
    fn empty_catalog_yields_empty_batches() {
        let mut sim = SimulatorStreamer::new(&[], sim_config(Some(3)), 4);
        assert!(sim.next_batch().is_empty());
    }
}

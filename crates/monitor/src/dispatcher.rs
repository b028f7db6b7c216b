use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use super::types::{ArbitrageListener, MarketGraph, MarketListener};
use arb_core::traits::GraphSolver;
use common::error::Error;
use common::types::{Arbitrage, Currency};

/// A source currency and whether a detection from it is waiting to start.
struct SourceSlot {
    currency: Currency,
    queued: Arc<AtomicBool>,
}

/// Runs one detection per source currency after every market update.
///
/// Detections run on the blocking pool; the semaphore caps how many are in
/// flight at once to the number of sources. Updates are coalesced per
/// source: while a detection is still waiting for a permit, further updates
/// schedule nothing, since that detection reads the live graph once it starts.
pub struct ArbitrageDispatcher<S, L> {
    sources: Vec<SourceSlot>,
    solver: Arc<S>,
    listener: Arc<L>,
    workers: Arc<Semaphore>,
    in_flight: Mutex<JoinSet<()>>,
    runtime: Handle,
}

impl<S, L> ArbitrageDispatcher<S, L>
where
    S: GraphSolver + Send + Sync + 'static,
    L: ArbitrageListener,
{
    pub fn new(sources: Vec<Currency>, solver: S, listener: L, runtime: Handle) -> Self {
        let workers = Arc::new(Semaphore::new(sources.len().max(1)));
        let sources = sources
            .into_iter()
            .map(|currency| SourceSlot {
                currency,
                queued: Arc::new(AtomicBool::new(false)),
            })
            .collect();

        ArbitrageDispatcher {
            sources,
            solver: Arc::new(solver),
            listener: Arc::new(listener),
            workers,
            in_flight: Mutex::new(JoinSet::new()),
            runtime,
        }
    }

    /// Schedules a detection against `graph` from every source that has none
    /// waiting, and returns how many were scheduled.
    pub fn dispatch(&self, graph: &Arc<MarketGraph>) -> usize {
        let mut in_flight = self.in_flight.lock();
        while let Some(result) = in_flight.try_join_next() {
            log_join_error(result);
        }

        let mut scheduled = 0;
        for slot in &self.sources {
            if slot.queued.swap(true, Ordering::AcqRel) {
                continue;
            }

            let source = slot.currency.clone();
            let queued = Arc::clone(&slot.queued);
            let graph = Arc::clone(graph);
            let solver = Arc::clone(&self.solver);
            let listener = Arc::clone(&self.listener);
            let workers = Arc::clone(&self.workers);

            let task = async move {
                let Ok(_permit) = workers.acquire_owned().await else {
                    queued.store(false, Ordering::Release);
                    return;
                };
                queued.store(false, Ordering::Release);

                let detection = tokio::task::spawn_blocking(move || {
                    report(solver.as_ref(), listener.as_ref(), &graph, &source)
                });
                log_join_error(detection.await);
            };
            in_flight.spawn_on(task, &self.runtime);
            scheduled += 1;
        }

        scheduled
    }

    /// Waits until every scheduled detection has finished and reported.
    pub async fn drain(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.in_flight.lock());
            if tasks.is_empty() {
                break;
            }
            while let Some(result) = tasks.join_next().await {
                log_join_error(result);
            }
        }
    }
}

impl<S, L> MarketListener for ArbitrageDispatcher<S, L>
where
    S: GraphSolver + Send + Sync + 'static,
    L: ArbitrageListener,
{
    fn on_market_update(&self, graph: &Arc<MarketGraph>) {
        self.dispatch(graph);
    }
}

fn log_join_error(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Arbitrage detection task failed");
    }
}

fn report<S, L>(solver: &S, listener: &L, graph: &MarketGraph, source: &Currency)
where
    S: GraphSolver,
    L: ArbitrageListener,
{
    debug!(%source, "Checking for arbitrage");
    let started = Instant::now();
    let result = detect(solver, graph, source);
    debug!(
        %source,
        found = matches!(result, Ok(Some(_))),
        elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
        "Arbitrage check finished"
    );

    match result {
        Ok(Some(arbitrage)) => listener.on_arbitrage_found(arbitrage),
        Ok(None) => {}
        Err(e) => warn!(%source, error = %e, "Arbitrage check failed"),
    }
}

/// Runs `solver` from `source` and snapshots the found cycle into an [`Arbitrage`].
///
/// # Errors
/// Returns `Error::UnknownSymbol` if `source` is not a vertex of `graph`.
pub fn detect<S: GraphSolver>(
    solver: &S,
    graph: &MarketGraph,
    source: &Currency,
) -> Result<Option<Arbitrage>, Error> {
    let index = graph.require_index(source)?;
    let Some(routed) = solver.find_arbitrage(graph.graph(), index)? else {
        return Ok(None);
    };

    Ok(Some(Arbitrage {
        source: source.clone(),
        cycle: routed.cycle.iter().map(|rate| rate.snapshot()).collect(),
        enter_path: routed.enter_path.iter().map(|rate| rate.snapshot()).collect(),
    }))
}

/// Logs every arbitrage at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArbitrageLogger;

impl ArbitrageListener for ArbitrageLogger {
    fn on_arbitrage_found(&self, arbitrage: Arbitrage) {
        info!(
            source = %arbitrage.source,
            rate = arbitrage.product_rate(),
            "Arbitrage found: {}",
            arbitrage
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketBuilder;
    use crate::writer::Writer;
    use arb_core::{ExchangeRate, SpfaSolver, SymbolGraph};
    use common::types::{CurrencyPair, Ticker};
    use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
    use tokio::time::{Duration, timeout};

    struct ChannelListener(UnboundedSender<Arbitrage>);

    impl ArbitrageListener for ChannelListener {
        fn on_arbitrage_found(&self, arbitrage: Arbitrage) {
            let _ = self.0.send(arbitrage);
        }
    }

    fn channel_listener() -> (ChannelListener, UnboundedReceiver<Arbitrage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelListener(tx), rx)
    }

    fn cross_rate_graph() -> Arc<MarketGraph> {
        let rates = [
            ("USD", "EUR", 0.741),
            ("USD", "GBP", 0.657),
            ("USD", "CHF", 1.061),
            ("USD", "CAD", 1.005),
            ("EUR", "USD", 1.349),
            ("EUR", "GBP", 0.888),
            ("EUR", "CHF", 1.433),
            ("EUR", "CAD", 1.366),
            ("GBP", "USD", 1.521),
            ("GBP", "EUR", 1.126),
            ("GBP", "CHF", 1.614),
            ("GBP", "CAD", 1.538),
            ("CHF", "USD", 0.942),
            ("CHF", "EUR", 0.698),
            ("CHF", "GBP", 0.619),
            ("CHF", "CAD", 0.953),
            ("CAD", "USD", 0.995),
            ("CAD", "EUR", 0.732),
            ("CAD", "GBP", 0.650),
            ("CAD", "CHF", 0.049),
        ];

        let mut graph: MarketGraph =
            SymbolGraph::from_symbols(["USD", "EUR", "GBP", "CHF", "CAD"].map(Currency::from));
        for (from, to, price) in rates {
            let (from, to) = (Currency::from(from), Currency::from(to));
            let (i, j) = (graph.index_of(&from).unwrap(), graph.index_of(&to).unwrap());
            let rate = ExchangeRate::new(from, to, i, j, price).unwrap();
            graph.add_edge(Arc::new(rate)).unwrap();
        }
        Arc::new(graph)
    }

    #[test]
    fn detect_snapshots_routed_cycle() {
        let graph = cross_rate_graph();

        let arbitrage = detect(&SpfaSolver, &graph, &"USD".into())
            .unwrap()
            .expect("arbitrage expected");

        assert_eq!(
            arbitrage.to_string(),
            "GBP -> 1.521 USD, USD -> 0.741 EUR, EUR -> 0.888 GBP (enter via USD -> 0.657 GBP)"
        );
        assert!(arbitrage.is_profitable());
    }

    #[test]
    fn detect_from_unknown_source_is_an_error() {
        let graph = cross_rate_graph();
        assert_eq!(
            detect(&SpfaSolver, &graph, &"JPY".into()),
            Err(Error::UnknownSymbol("JPY".to_string()))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dispatch_reports_once_per_profitable_source() {
        let (listener, mut rx) = channel_listener();
        let sources = vec!["USD".into(), "EUR".into(), "JPY".into()];
        let dispatcher = ArbitrageDispatcher::new(sources, SpfaSolver, listener, Handle::current());

        assert_eq!(dispatcher.dispatch(&cross_rate_graph()), 3);
        dispatcher.drain().await;

        let mut reported = Vec::new();
        while let Ok(arbitrage) = rx.try_recv() {
            reported.push(arbitrage);
        }
        // JPY is not a vertex, so only two detections report.
        assert_eq!(reported.len(), 2);
        let mut sources: Vec<_> = reported.iter().map(|a| a.source.to_string()).collect();
        sources.sort();
        assert_eq!(sources, vec!["EUR", "USD"]);
        assert!(reported.iter().all(Arbitrage::is_profitable));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn crossed_book_update_is_reported_through_market() {
        let (listener, mut rx) = channel_listener();
        let dispatcher =
            ArbitrageDispatcher::new(vec!["USD".into()], SpfaSolver, listener, Handle::current());
        let btc_usd = CurrencyPair::new("BTC", "USD");

        let market = MarketBuilder::of([btc_usd.clone()])
            .with_tickers([Ticker::new(btc_usd.clone(), 1.1, 1.0)])
            .unwrap()
            .with_listener(Arc::new(dispatcher))
            .build();

        // Buy at 1.0, sell at 1.1.
        market.update(&Ticker::new(btc_usd, 1.0, 1.1)).unwrap();

        let arbitrage = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no arbitrage reported")
            .expect("channel closed");

        assert_eq!(arbitrage.source, Currency::from("USD"));
        assert_eq!(arbitrage.cycle.len(), 2);
        assert!((arbitrage.product_rate() - 1.1).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn balanced_book_reports_nothing() {
        let (listener, mut rx) = channel_listener();
        let dispatcher =
            ArbitrageDispatcher::new(vec!["USD".into()], SpfaSolver, listener, Handle::current());
        let btc_usd = CurrencyPair::new("BTC", "USD");

        let market = MarketBuilder::of([btc_usd.clone()])
            .with_tickers([Ticker::new(btc_usd, 1.1, 1.0)])
            .unwrap()
            .build();

        dispatcher.dispatch(market.graph());
        dispatcher.drain().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn waiting_detection_absorbs_later_updates() {
        let (listener, mut rx) = channel_listener();
        let dispatcher =
            ArbitrageDispatcher::new(vec!["USD".into()], SpfaSolver, listener, Handle::current());
        let graph = cross_rate_graph();

        // Hold the only permit so the first detection cannot start.
        let permit = Arc::clone(&dispatcher.workers).try_acquire_owned().unwrap();
        assert_eq!(dispatcher.dispatch(&graph), 1);
        for _ in 0..9 {
            assert_eq!(dispatcher.dispatch(&graph), 0);
        }

        drop(permit);
        dispatcher.drain().await;

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.dispatch(&graph), 1);
        dispatcher.drain().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn detections_report_after_feed_closes() {
        let (listener, mut rx) = channel_listener();
        let dispatcher = Arc::new(ArbitrageDispatcher::new(
            vec!["USD".into(), "EUR".into()],
            SpfaSolver,
            listener,
            Handle::current(),
        ));
        let eur_usd = CurrencyPair::new("EUR", "USD");
        let market = MarketBuilder::of([eur_usd.clone()])
            .with_tickers([Ticker::new(eur_usd.clone(), 1.1, 1.0)])
            .unwrap()
            .with_listener(dispatcher.clone())
            .build();

        let (tx, feed) = tokio::sync::mpsc::channel(8);
        let (_shutdown_tx, shutdown) = tokio::sync::watch::channel(());
        let writer = Writer::new(Arc::new(market), feed, shutdown).spawn_task();

        for _ in 0..30 {
            tx.send(vec![Ticker::new(eur_usd.clone(), 1.0, 1.1); 10])
                .await
                .unwrap();
        }
        drop(tx);
        assert_eq!(writer.await.unwrap().unwrap(), 300);

        dispatcher.drain().await;

        let mut sources = Vec::new();
        while let Ok(arbitrage) = rx.try_recv() {
            assert!(arbitrage.is_profitable());
            sources.push(arbitrage.source.to_string());
        }
        assert!(sources.contains(&"USD".to_string()));
        assert!(sources.contains(&"EUR".to_string()));
    }
}

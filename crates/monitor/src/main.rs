use std::env;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, mpsc::Sender, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use arb_core::SpfaSolver;
use arb_monitor::config::{self, Config, InstrumentConfig};
use arb_monitor::csv_streamer::CsvStreamer;
use arb_monitor::error::Error;
use arb_monitor::producer::Producer;
use arb_monitor::simulator::SimulatorStreamer;
use arb_monitor::types::{DataSource, MarketListener};
use arb_monitor::writer::Writer;
use arb_monitor::{ArbitrageDispatcher, ArbitrageLogger, Market, MarketBuilder};
use common::types::Ticker;

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arb_monitor=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let source = parse_args();
    if let Err(e) = run(source).await {
        error!(error = %e, "Monitor failed");
        std::process::exit(1);
    }
}

async fn run(source: DataSource) -> Result<(), Error> {
    let config = config::load_config()?;
    let dispatcher = Arc::new(ArbitrageDispatcher::new(
        config.arbitrage.sources.clone(),
        SpfaSolver,
        ArbitrageLogger,
        Handle::current(),
    ));
    let market = Arc::new(build_market(&config, dispatcher.clone())?);
    info!(
        currencies = market.graph().vertex_count(),
        instruments = market.instruments().count(),
        "Market ready"
    );

    let (sender, receiver) = mpsc::channel::<Vec<Ticker>>(config.feed.buffer_size);
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let producer_handle = spawn_producer(&source, sender, &config);
    let writer_handle = Writer::new(market, receiver, shutdown_rx).spawn_task();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down.");
            let _ = shutdown_tx.send(());
        }
        result = producer_handle => {
            if let Ok(Err(e)) = result {
                error!(error = %e, "Producer stopped");
            }
        }
    }

    let applied = match writer_handle.await {
        Ok(Ok(applied)) => applied,
        Ok(Err(e)) => {
            error!(error = %e, "Writer failed");
            0
        }
        Err(e) => {
            error!(error = %e, "Writer task panicked");
            0
        }
    };

    // Detections scheduled by the last updates still have to report.
    dispatcher.drain().await;
    info!(applied, "Pipeline shut down.");
    Ok(())
}

fn build_market(config: &Config, listener: Arc<dyn MarketListener>) -> Result<Market, Error> {
    let instruments = &config.market.instruments;
    let market = MarketBuilder::of(instruments.iter().map(InstrumentConfig::pair))
        .with_tickers(instruments.iter().map(InstrumentConfig::ticker))?
        .with_listener(listener)
        .build();
    Ok(market)
}

/// Parse command-line arguments to determine data source
fn parse_args() -> DataSource {
    let args: Vec<String> = env::args().collect();
    let source = args
        .get(1)
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "sim".to_string());

    match (source.as_str(), args.get(2)) {
        ("sim", _) => DataSource::Sim,
        ("csv", Some(path)) => DataSource::Csv(path.clone()),
        _ => {
            eprintln!(
                "Usage: arb-monitor <sim|csv> [path_to_csv]\n  \
                 - sim: run simulated ticker stream\n  \
                 - csv: replay tickers from a CSV file"
            );
            std::process::exit(2);
        }
    }
}

fn spawn_producer(
    source: &DataSource,
    sender: Sender<Vec<Ticker>>,
    config: &Config,
) -> JoinHandle<Result<(), Error>> {
    match source {
        DataSource::Sim => {
            info!("Starting SimulatorStreamer producer task...");
            let streamer = SimulatorStreamer::new(
                &config.market.instruments,
                config.simulator.clone(),
                config.feed.batch_size,
            );
            Producer::new(streamer).run(sender)
        }
        DataSource::Csv(path) => {
            info!(%path, "Starting CsvStreamer producer task...");
            let streamer = CsvStreamer::new(path.clone(), config.feed.batch_size);
            Producer::new(streamer).run(sender)
        }
    }
}

use tokio::sync::mpsc::Sender;
use tracing::info;

use super::{error::Error, types::TickerStreamer};
use common::types::Ticker;

pub struct Producer<S: TickerStreamer> {
    streamer: S,
}

impl<S> Producer<S>
where
    S: TickerStreamer,
{
    pub fn new(streamer: S) -> Self {
        Producer { streamer }
    }

    pub fn run(self, sender: Sender<Vec<Ticker>>) -> tokio::task::JoinHandle<Result<(), Error>> {
        info!("Producer ready.");
        tokio::spawn(async move { self.streamer.run_stream(sender).await })
    }
}

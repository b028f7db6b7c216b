use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use tokio::sync::mpsc::Sender;
use tracing::{error, info};

use super::error::Error;
use super::types::TickerStreamer;
use common::types::{CurrencyPair, Ticker};

/// One replayed quote: `instrument,ask,bid`, instrument written as `BASE/QUOTE`.
#[derive(Debug, Deserialize)]
pub struct CsvRecord {
    pub instrument: String,
    pub ask: f64,
    pub bid: f64,
}

impl TryFrom<CsvRecord> for Ticker {
    type Error = Error;

    fn try_from(record: CsvRecord) -> Result<Self, Self::Error> {
        let instrument: CurrencyPair = record.instrument.parse()?;
        Ok(Ticker::new(instrument, record.ask, record.bid))
    }
}

/// Replays tickers recorded in a CSV file, in file order.
pub struct CsvStreamer {
    path: String,
    batch_size: usize,
}

impl CsvStreamer {
    pub fn new(path: String, batch_size: usize) -> Self {
        CsvStreamer { path, batch_size }
    }

    fn parse_csv_to_tickers(&self) -> Result<Vec<Ticker>, Error> {
        let file = File::open(&self.path).map_err(|e| {
            error!(path = %self.path, error = %e, "Failed to read file");
            Error::IoError(e)
        })?;

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        rdr.deserialize::<CsvRecord>()
            .map(|record| Ticker::try_from(record?))
            .collect()
    }
}

#[async_trait::async_trait]
impl TickerStreamer for CsvStreamer {
    async fn run_stream(self, sender: Sender<Vec<Ticker>>) -> Result<(), Error> {
        let all_tickers = self.parse_csv_to_tickers()?;
        info!(total = all_tickers.len(), "CsvStreamer: starting replay");

        let mut tickers_sent = 0;
        for chunk in all_tickers.chunks(self.batch_size.max(1)) {
            if let Err(e) = sender.send(chunk.to_vec()).await {
                error!(error = %e, "CsvStreamer shutting down: writer receiver dropped");
                return Err(Error::ChannelSendFailed);
            }
            tickers_sent += chunk.len();
        }

        info!(sent = tickers_sent, "CsvStreamer: replay finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::sync::mpsc;

    const MOCK_CSV_CONTENT: &str = "\
instrument,ask,bid
EUR/USD,1.0842,1.0840
GBP/USD, 1.2631, 1.2629
EUR/GBP,0.8585,0.8583
";

    const BATCH_SIZE: usize = 2;

    fn mock_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        temp_file
            .write_all(content.as_bytes())
            .expect("Failed to write mock content");
        temp_file
    }

    fn streamer(file: &NamedTempFile) -> CsvStreamer {
        let path = file.path().to_str().expect("Failed to get path string");
        CsvStreamer::new(path.to_string(), BATCH_SIZE)
    }

    #[test]
    fn test_parse_csv_to_tickers_success() {
        let file = mock_file(MOCK_CSV_CONTENT);
        let tickers = streamer(&file).parse_csv_to_tickers().unwrap();

        assert_eq!(
            tickers,
            vec![
                Ticker::new(CurrencyPair::new("EUR", "USD"), 1.0842, 1.0840),
                Ticker::new(CurrencyPair::new("GBP", "USD"), 1.2631, 1.2629),
                Ticker::new(CurrencyPair::new("EUR", "GBP"), 0.8585, 0.8583),
            ]
        );
    }

    #[test]
    fn test_malformed_instrument_is_rejected() {
        let file = mock_file("instrument,ask,bid\nEURUSD,1.1,1.0\n");
        let result = streamer(&file).parse_csv_to_tickers();
        assert!(matches!(result, Err(Error::Market(_))));
    }

    #[test]
    fn test_parse_csv_to_tickers_file_not_found() {
        let streamer = CsvStreamer::new("non_existent_file.csv".to_string(), BATCH_SIZE);
        let result = streamer.parse_csv_to_tickers();

        if let Err(Error::IoError(e)) = result {
            assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
        } else {
            panic!("Expected IoError, got: {:?}", result);
        }
    }

    #[tokio::test]
    async fn test_stream_sends_file_in_batches() {
        let file = mock_file(MOCK_CSV_CONTENT);
        let (tx, mut rx) = mpsc::channel(4);

        streamer(&file).run_stream(tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().len(), 2);
        assert_eq!(rx.recv().await.unwrap().len(), 1);
        assert!(rx.recv().await.is_none());
    }
}

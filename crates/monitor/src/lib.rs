pub mod config;
pub mod csv_streamer;
pub mod dispatcher;
pub mod error;
pub mod market;
pub mod producer;
pub mod simulator;
pub mod types;
pub mod writer;

pub use dispatcher::{ArbitrageDispatcher, ArbitrageLogger};
pub use market::{Market, MarketBuilder, UpdateOutcome};

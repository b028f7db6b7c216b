use config::{Config as ConfigLoader, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use super::error::Error;
use common::types::{Currency, CurrencyPair, Ticker};

/// One tradable instrument and its opening quote.
#[derive(Debug, Deserialize, Clone)]
pub struct InstrumentConfig {
    pub base: Currency,
    pub quote: Currency,
    pub ask: f64,
    pub bid: f64,
}

impl InstrumentConfig {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.base.clone(), self.quote.clone())
    }

    pub fn ticker(&self) -> Ticker {
        Ticker::new(self.pair(), self.ask, self.bid)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketConfig {
    pub instruments: Vec<InstrumentConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArbitrageConfig {
    /// Currencies every detection starts from.
    pub sources: Vec<Currency>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub buffer_size: usize,
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorConfig {
    pub interval_ms: u64,
    pub fluctuation_bps: f64,
    pub spread_bps: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub market: MarketConfig,
    pub arbitrage: ArbitrageConfig,
    pub feed: FeedConfig,
    pub simulator: SimulatorConfig,
}

impl Config {
    /// Rejects settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.market.instruments.is_empty() {
            return Err(invalid("market.instruments must not be empty"));
        }
        for instrument in &self.market.instruments {
            if instrument.base == instrument.quote {
                return Err(invalid(format!(
                    "instrument {} trades a currency against itself",
                    instrument.pair()
                )));
            }
        }

        if self.arbitrage.sources.is_empty() {
            return Err(invalid("arbitrage.sources must not be empty"));
        }
        for source in &self.arbitrage.sources {
            let listed = self
                .market
                .instruments
                .iter()
                .any(|i| &i.base == source || &i.quote == source);
            if !listed {
                return Err(invalid(format!(
                    "source {} is not traded by any instrument",
                    source
                )));
            }
        }

        if self.feed.buffer_size == 0 || self.feed.batch_size == 0 {
            return Err(invalid("feed.buffer_size and feed.batch_size must be positive"));
        }
        if self.simulator.interval_ms == 0 {
            return Err(invalid("simulator.interval_ms must be positive"));
        }
        if !(self.simulator.fluctuation_bps >= 0.0 && self.simulator.spread_bps >= 0.0) {
            return Err(invalid("simulator bps settings must be non-negative"));
        }

        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::ConfigLoadError(reason.into())
}

/// Loads `crates/monitor/Config.toml` relative to the working directory,
/// overlaid with `MONITOR__*` environment variables.
pub fn load_config() -> Result<Config, Error> {
    let base_path = env::current_dir().map_err(|e| {
        Error::ConfigLoadError(format!("Failed to determine current directory: {}", e))
    })?;

    let config_file_path: PathBuf = base_path
        .join("crates")
        .join("monitor")
        .join("Config.toml");

    load_config_from(&config_file_path)
}

/// Loads and validates the TOML file at `path`, overlaid with environment variables.
pub fn load_config_from(path: &Path) -> Result<Config, Error> {
    if !path.exists() {
        return Err(Error::ConfigLoadError(format!(
            "Configuration file not found at calculated path: {}",
            path.display()
        )));
    }

    let s = ConfigLoader::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(true))
        .add_source(
            Environment::with_prefix("MONITOR")
                .try_parsing(true)
                .separator("__"),
        )
        .build()
        .map_err(|e| Error::ConfigLoadError(e.to_string()))?;

    let app_config: Config = s
        .try_deserialize()
        .map_err(|e| Error::ConfigLoadError(format!("Failed to deserialize config: {}", e)))?;

    app_config.validate()?;
    Ok(app_config)
}

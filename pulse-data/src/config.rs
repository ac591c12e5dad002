//! Runtime configuration for the engine and its components.

use crate::{stream::StreamConfig, universe::UniversePolicy};
use std::time::Duration;

/// Rows per snapshot page, fixed by the provider.
pub const SNAPSHOT_PAGE_SIZE: u32 = 250;

/// Endpoints and limits for the snapshot / candle clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Market snapshot provider base URL.
    pub markets_api: String,
    /// Exchange metadata and candle provider base URL.
    pub exchange_api: String,
    /// Snapshot pages fetched per refresh; one page covers the candidate
    /// pool the universe filter needs.
    pub snapshot_pages: u32,
    /// Candles requested per RSI input series.
    pub kline_limit: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            markets_api: "https://api.coingecko.com/api/v3".to_string(),
            exchange_api: "https://api.binance.com/api/v3".to_string(),
            snapshot_pages: 1,
            kline_limit: 300,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub client: ClientConfig,
    pub universe: UniversePolicy,
    pub stream: StreamConfig,
    /// RSI look-back window.
    pub rsi_period: usize,
    /// Cadence of the per-asset indicator recompute.
    pub indicator_refresh: Duration,
    /// Cadence of the global-stats refresh.
    pub stats_refresh: Duration,
    /// Assets recomputed concurrently within one cycle.
    pub fetch_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            universe: UniversePolicy::default(),
            stream: StreamConfig::default(),
            rsi_period: crate::indicator::DEFAULT_PERIOD,
            indicator_refresh: Duration::from_secs(300),
            stats_refresh: Duration::from_secs(60),
            fetch_concurrency: 8,
        }
    }
}

impl EngineConfig {
    /// Default configuration with endpoint overrides taken from the
    /// environment (`PULSE_MARKETS_API`, `PULSE_EXCHANGE_API`,
    /// `PULSE_STREAM_ENDPOINT`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var("PULSE_MARKETS_API") {
            config.client.markets_api = value;
        }
        if let Ok(value) = std::env::var("PULSE_EXCHANGE_API") {
            config.client.exchange_api = value;
        }
        if let Ok(value) = std::env::var("PULSE_STREAM_ENDPOINT") {
            config.stream.endpoint = value;
        }
        config
    }

    pub fn with_indicator_refresh(mut self, cadence: Duration) -> Self {
        self.indicator_refresh = cadence;
        self
    }

    pub fn with_stats_refresh(mut self, cadence: Duration) -> Self {
        self.stats_refresh = cadence;
        self
    }

    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency;
        self
    }
}

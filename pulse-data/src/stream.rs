//! Live trade feed reconciler.
//!
//! A single supervising task owns the connection lifecycle
//! (`Disconnected -> Connecting -> Connected -> Disconnected`), publishes
//! status on a watch channel, and patches incoming trade prices into the
//! store. The subscription list is re-derived from the store's present
//! universe on every connect attempt, so a reconnect can never carry a
//! stale pair set, and the loop structure itself guarantees at most one
//! live connection.

use crate::{de, store::MarketStore};
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

/// Connection lifecycle states for the trade stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Trade stream configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Combined-stream endpoint, e.g. `wss://stream.binance.com:9443`.
    pub endpoint: String,
    /// Fixed delay before any reconnect attempt.
    pub reconnect_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://stream.binance.com:9443".to_string(),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl StreamConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Combined-stream envelope: `{"stream": "...", "data": {...}}`.
#[derive(Debug, Deserialize)]
struct StreamEnvelope {
    data: TradeTick,
}

/// One inbound live trade update.
#[derive(Debug, Deserialize)]
struct TradeTick {
    #[serde(rename = "s")]
    pair: String,
    #[serde(rename = "p", deserialize_with = "de::de_str")]
    price: f64,
}

/// Spawn the trade feed supervisor.
///
/// Runs until aborted; every disconnect or failed connect schedules the
/// next attempt after the fixed delay, with no cap on attempts.
pub fn spawn_trade_feed(
    config: StreamConfig,
    store: MarketStore,
    status_tx: watch::Sender<StreamStatus>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(endpoint = %config.endpoint, "starting trade feed supervisor");

        loop {
            let pairs = store.subscribed_pairs();
            if pairs.is_empty() {
                debug!("no tradable pairs in the universe yet, retrying shortly");
                tokio::time::sleep(config.reconnect_delay).await;
                continue;
            }

            let url = match subscription_url(&config.endpoint, &pairs) {
                Ok(url) => url,
                Err(e) => {
                    error!(error = %e, "invalid stream endpoint, retrying");
                    tokio::time::sleep(config.reconnect_delay).await;
                    continue;
                }
            };

            let _ = status_tx.send(StreamStatus::Connecting);

            match connect_async(url.as_str()).await {
                Ok((ws_stream, _)) => {
                    info!(pairs = pairs.len(), "trade stream connected");
                    let _ = status_tx.send(StreamStatus::Connected);

                    let (_, mut read) = ws_stream.split();

                    while let Some(msg) = read.next().await {
                        match msg {
                            Ok(Message::Text(text)) => {
                                match serde_json::from_str::<StreamEnvelope>(&text) {
                                    Ok(envelope) => {
                                        // Unknown pairs and unchanged prices are
                                        // silently absorbed by the store.
                                        let tick = envelope.data;
                                        store.apply_tick(&tick.pair, tick.price);
                                    }
                                    Err(e) => {
                                        debug!(error = %e, "unparseable stream message");
                                    }
                                }
                            }
                            Ok(Message::Close(_)) => {
                                warn!("trade stream closed by server");
                                break;
                            }
                            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                                // Heartbeat - handled automatically
                            }
                            Err(e) => {
                                error!(error = %e, "trade stream error");
                                break;
                            }
                            _ => {}
                        }
                    }

                    let _ = status_tx.send(StreamStatus::Disconnected);
                }
                Err(e) => {
                    error!(endpoint = %config.endpoint, error = %e, "failed to connect trade stream");
                    let _ = status_tx.send(StreamStatus::Disconnected);
                }
            }

            debug!(delay = ?config.reconnect_delay, "waiting before reconnecting trade stream");
            tokio::time::sleep(config.reconnect_delay).await;
        }
    })
}

/// Build the combined-stream URL: `<pair>@trade` tokens joined by `/`.
fn subscription_url(endpoint: &str, pairs: &[String]) -> Result<Url, url::ParseError> {
    let streams = pairs
        .iter()
        .map(|pair| format!("{}@trade", pair.to_lowercase()))
        .collect::<Vec<_>>()
        .join("/");
    Url::parse(&format!("{endpoint}/stream?streams={streams}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Asset, RsiSet};

    #[test]
    fn test_subscription_url_format() {
        let pairs = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()];
        let url = subscription_url("wss://stream.binance.com:9443", &pairs).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://stream.binance.com:9443/stream?streams=btcusdt@trade/ethusdt@trade"
        );
    }

    #[test]
    fn test_envelope_deserialization() {
        let envelope: StreamEnvelope = serde_json::from_str(
            r#"{
                "stream": "btcusdt@trade",
                "data": {
                    "e": "trade",
                    "s": "BTCUSDT",
                    "t": 12345,
                    "p": "97123.45",
                    "q": "0.002",
                    "T": 1690000000123
                }
            }"#,
        )
        .unwrap();

        assert_eq!(envelope.data.pair, "BTCUSDT");
        assert_eq!(envelope.data.price, 97123.45);
    }

    #[test]
    fn test_tick_flows_into_store() {
        let store = MarketStore::new();
        store.replace_universe(vec![Asset {
            id: "bitcoin".to_string(),
            symbol: "btc".to_string(),
            name: "Bitcoin".to_string(),
            image: String::new(),
            current_price: 97_000.0,
            market_cap: 0.0,
            total_volume: 0.0,
            price_change_percentage_24h: 0.0,
            exchange_pair: Some("BTCUSDT".to_string()),
            rsi: RsiSet::default(),
        }]);

        let envelope: StreamEnvelope = serde_json::from_str(
            r#"{"stream": "btcusdt@trade", "data": {"s": "BTCUSDT", "p": "97123.45"}}"#,
        )
        .unwrap();
        let tick = envelope.data;

        assert!(store.apply_tick(&tick.pair, tick.price));
        assert_eq!(store.snapshot().assets["bitcoin"].current_price, 97123.45);
    }
}

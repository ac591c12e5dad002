//! Read-only snapshot, metadata, and candle retrieval from the external
//! market data providers.
//!
//! Three independent concerns share one HTTP client: the full-market
//! snapshot and dominance stats (snapshot provider), the tradable-pair list
//! (exchange metadata), and historical candles for indicator input. Every
//! call is side-effect free and retried naturally by the next scheduled
//! cycle, never by the client itself.

use crate::{
    config::{ClientConfig, SNAPSHOT_PAGE_SIZE},
    error::FetchError,
    types::{Asset, GlobalStats, RsiSet, Timeframe},
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// One row of the paged `/coins/markets` snapshot.
///
/// Numeric fields are nullable upstream (dead or freshly listed assets), so
/// they stay optional here and default to zero when a row is promoted into a
/// tracked [`Asset`].
#[derive(Debug, Clone, Deserialize)]
pub struct MarketRow {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

impl MarketRow {
    /// Promote an accepted snapshot row into a tracked asset with its
    /// derived exchange pair.
    pub(crate) fn into_asset(self, exchange_pair: String) -> Asset {
        Asset {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            image: self.image.unwrap_or_default(),
            current_price: self.current_price.unwrap_or(0.0),
            market_cap: self.market_cap.unwrap_or(0.0),
            total_volume: self.total_volume.unwrap_or(0.0),
            price_change_percentage_24h: self.price_change_percentage_24h.unwrap_or(0.0),
            exchange_pair: Some(exchange_pair),
            rsi: RsiSet::default(),
        }
    }
}

/// `/global` response envelope.
#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    market_cap_percentage: HashMap<String, f64>,
}

/// `/exchangeInfo` response: the tradable-pair list with trading status.
#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolStatus>,
}

#[derive(Debug, Deserialize)]
struct SymbolStatus {
    symbol: String,
    status: String,
}

/// Candle record from the `/klines` endpoint.
#[derive(Debug, Deserialize)]
struct Kline(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    i64,    // 8: Number of trades
    String, // 9: Taker buy base asset volume
    String, // 10: Taker buy quote asset volume
    String, // 11: Ignore
);

/// HTTP client over the snapshot, exchange-metadata, and candle providers.
#[derive(Debug)]
pub struct MarketClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl MarketClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Full-market snapshot, market-cap descending, up to the configured
    /// page count. Stops early on a short page.
    pub async fn markets(&self) -> Result<Vec<MarketRow>, FetchError> {
        let mut rows = Vec::new();
        for page in 1..=self.config.snapshot_pages.max(1) {
            let url = format!(
                "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page={}&page={}&sparkline=false",
                self.config.markets_api, SNAPSHOT_PAGE_SIZE, page,
            );
            let response = self
                .http
                .get(&url)
                .timeout(self.config.request_timeout)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(FetchError::Status(response.status()));
            }
            let page_rows: Vec<MarketRow> = response.json().await?;
            let short_page = (page_rows.len() as u32) < SNAPSHOT_PAGE_SIZE;
            rows.extend(page_rows);
            if short_page {
                break;
            }
        }
        Ok(rows)
    }

    /// Global dominance statistics for the two reference assets.
    pub async fn global_stats(&self) -> Result<GlobalStats, FetchError> {
        let url = format!("{}/global", self.config.markets_api);
        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        let global: GlobalResponse = response.json().await?;
        let dominance = &global.data.market_cap_percentage;
        let btc = dominance
            .get("btc")
            .copied()
            .ok_or_else(|| FetchError::Payload("missing btc dominance".to_string()))?;
        let usdt = dominance
            .get("usdt")
            .copied()
            .ok_or_else(|| FetchError::Payload("missing usdt dominance".to_string()))?;
        Ok(GlobalStats {
            btc_dominance: btc,
            stablecoin_dominance: usdt,
        })
    }

    /// Pairs currently accepting orders on the live-feed exchange.
    pub async fn tradable_pairs(&self) -> Result<HashSet<String>, FetchError> {
        let url = format!("{}/exchangeInfo", self.config.exchange_api);
        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        let info: ExchangeInfo = response.json().await?;
        Ok(trading_symbols(info))
    }

    /// Closing prices for one pair and timeframe, oldest first.
    ///
    /// `Ok(None)` means the pair is not listed for this interval -- common
    /// for long-tail candidates, so it stays quiet. Transport faults remain
    /// errors and are only distinguished for logging upstream.
    pub async fn closes(
        &self,
        pair: &str,
        timeframe: Timeframe,
    ) -> Result<Option<Vec<f64>>, FetchError> {
        let url = format!(
            "{}/klines?symbol={}&interval={}&limit={}",
            self.config.exchange_api,
            pair,
            timeframe.interval(),
            self.config.kline_limit,
        );
        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            debug!(
                %pair,
                interval = timeframe.interval(),
                status = %response.status(),
                "pair not available for klines"
            );
            return Ok(None);
        }
        let klines: Vec<Kline> = response.json().await?;
        Ok(Some(close_series(klines)))
    }
}

fn trading_symbols(info: ExchangeInfo) -> HashSet<String> {
    info.symbols
        .into_iter()
        .filter(|s| s.status == "TRADING")
        .map(|s| s.symbol)
        .collect()
}

fn close_series(klines: Vec<Kline>) -> Vec<f64> {
    klines
        .iter()
        .filter_map(|k| k.4.parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_row_tolerates_null_fields() {
        let row: MarketRow = serde_json::from_str(
            r#"{
                "id": "bitcoin",
                "symbol": "btc",
                "name": "Bitcoin",
                "image": "https://assets.example/btc.png",
                "current_price": 97000.5,
                "market_cap": null,
                "total_volume": 31000000000.0,
                "price_change_percentage_24h": null
            }"#,
        )
        .unwrap();

        let asset = row.into_asset("BTCUSDT".to_string());
        assert_eq!(asset.current_price, 97000.5);
        assert_eq!(asset.market_cap, 0.0);
        assert_eq!(asset.price_change_percentage_24h, 0.0);
        assert_eq!(asset.exchange_pair.as_deref(), Some("BTCUSDT"));
        assert_eq!(asset.rsi, RsiSet::default());
    }

    #[test]
    fn test_exchange_info_keeps_only_trading_pairs() {
        let info: ExchangeInfo = serde_json::from_str(
            r#"{
                "symbols": [
                    {"symbol": "BTCUSDT", "status": "TRADING"},
                    {"symbol": "LUNAUSDT", "status": "BREAK"},
                    {"symbol": "ETHUSDT", "status": "TRADING"}
                ]
            }"#,
        )
        .unwrap();

        let pairs = trading_symbols(info);
        assert!(pairs.contains("BTCUSDT"));
        assert!(pairs.contains("ETHUSDT"));
        assert!(!pairs.contains("LUNAUSDT"));
    }

    #[test]
    fn test_close_series_reads_fifth_field() {
        let klines: Vec<Kline> = serde_json::from_str(
            r#"[
                [1690000000000, "100.0", "105.0", "99.0", "104.0", "12.5",
                 1690000299999, "1300.0", 42, "6.0", "620.0", "0"],
                [1690000300000, "104.0", "106.0", "103.0", "105.5", "8.1",
                 1690000599999, "851.0", 17, "4.2", "440.0", "0"]
            ]"#,
        )
        .unwrap();

        assert_eq!(close_series(klines), vec![104.0, 105.5]);
    }

    #[test]
    fn test_global_response_dominance_map() {
        let global: GlobalResponse = serde_json::from_str(
            r#"{"data": {"market_cap_percentage": {"btc": 52.3, "eth": 17.1, "usdt": 4.9}}}"#,
        )
        .unwrap();
        assert_eq!(global.data.market_cap_percentage["btc"], 52.3);
        assert_eq!(global.data.market_cap_percentage["usdt"], 4.9);
    }
}

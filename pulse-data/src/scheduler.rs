//! Recurring refresh tasks: indicator recompute and global-stats refresh.
//!
//! Both timers run on independent cadences and are owned (and aborted)
//! together by the engine. Failures never propagate: a failed cycle leaves
//! the model as it was and the next tick retries naturally.

use crate::{
    client::MarketClient,
    error::FetchError,
    indicator,
    store::MarketStore,
    types::{GlobalStats, RsiSet, Timeframe},
};
use futures::{stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawn the indicator recompute timer. The first pass runs immediately;
/// subsequent passes follow the cadence.
pub fn spawn_indicator_refresh(
    client: Arc<MarketClient>,
    store: MarketStore,
    cadence: Duration,
    period: usize,
    concurrency: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(cadence);
        loop {
            timer.tick().await;

            let targets = store.indicator_targets();
            if targets.is_empty() {
                debug!("no tracked assets with a pair, skipping recompute");
                continue;
            }

            info!(assets = targets.len(), "starting indicator recompute cycle");
            stream::iter(targets)
                .for_each_concurrent(concurrency, |(id, pair)| {
                    let client = Arc::clone(&client);
                    let store = store.clone();
                    async move {
                        let batch = compute_batch(&client, &pair, period).await;
                        if !store.apply_rsi_batch(&id, batch) {
                            debug!(%id, "asset left the universe before its batch landed");
                        }
                    }
                })
                .await;
            debug!("indicator recompute cycle complete");
        }
    })
}

/// Spawn the global-stats refresh timer.
pub fn spawn_stats_refresh(
    client: Arc<MarketClient>,
    store: MarketStore,
    cadence: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(cadence);
        loop {
            timer.tick().await;
            apply_stats(&store, client.global_stats().await);
        }
    })
}

/// Wholesale stats replacement; a failed fetch keeps the previous value so
/// the view never regresses to empty over a transient fault.
fn apply_stats(store: &MarketStore, result: Result<GlobalStats, FetchError>) {
    match result {
        Ok(stats) => store.replace_stats(stats),
        Err(error) => warn!(%error, "global stats refresh failed, keeping previous value"),
    }
}

/// Recompute the six timeframe readings for one pair, concurrently.
///
/// Per-timeframe failures degrade to `None` for that slot alone; the batch
/// itself always comes back whole so the store can apply it atomically.
async fn compute_batch(client: &MarketClient, pair: &str, period: usize) -> RsiSet {
    let (m5, m15, h1, h4, d1, w1) = tokio::join!(
        fetch_rsi(client, pair, Timeframe::M5, period),
        fetch_rsi(client, pair, Timeframe::M15, period),
        fetch_rsi(client, pair, Timeframe::H1, period),
        fetch_rsi(client, pair, Timeframe::H4, period),
        fetch_rsi(client, pair, Timeframe::D1, period),
        fetch_rsi(client, pair, Timeframe::W1, period),
    );

    let mut batch = RsiSet::default();
    batch.set(Timeframe::M5, m5);
    batch.set(Timeframe::M15, m15);
    batch.set(Timeframe::H1, h1);
    batch.set(Timeframe::H4, h4);
    batch.set(Timeframe::D1, d1);
    batch.set(Timeframe::W1, w1);
    batch
}

async fn fetch_rsi(
    client: &MarketClient,
    pair: &str,
    timeframe: Timeframe,
    period: usize,
) -> Option<f64> {
    match client.closes(pair, timeframe).await {
        Ok(Some(closes)) => indicator::rsi(&closes, period),
        // Pair not listed for this interval; expected and quiet.
        Ok(None) => None,
        Err(error) => {
            warn!(%pair, interval = timeframe.interval(), %error, "candle fetch failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_stats_refresh_keeps_previous_value() {
        let store = MarketStore::new();
        apply_stats(
            &store,
            Ok(GlobalStats {
                btc_dominance: 52.0,
                stablecoin_dominance: 5.1,
            }),
        );

        apply_stats(&store, Err(FetchError::Status(reqwest::StatusCode::BAD_GATEWAY)));

        let stats = store.snapshot().stats.unwrap();
        assert_eq!(stats.btc_dominance, 52.0);
        assert_eq!(stats.stablecoin_dominance, 5.1);
    }

    #[test]
    fn test_stats_refresh_replaces_wholesale() {
        let store = MarketStore::new();
        apply_stats(
            &store,
            Ok(GlobalStats {
                btc_dominance: 52.0,
                stablecoin_dominance: 5.1,
            }),
        );
        apply_stats(
            &store,
            Ok(GlobalStats {
                btc_dominance: 49.7,
                stablecoin_dominance: 5.4,
            }),
        );

        let stats = store.snapshot().stats.unwrap();
        assert_eq!(stats.btc_dominance, 49.7);
        assert_eq!(stats.stablecoin_dominance, 5.4);
    }
}

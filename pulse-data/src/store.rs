//! Shared in-memory market data model.
//!
//! One store per process, handed by handle to every component. Each writer
//! class owns exactly one update operation: the live stream patches prices,
//! the scheduler applies indicator batches and stats, and universe
//! (re)selection swaps the tracked set wholesale. Updates replace whole
//! entries or whole field groups under the write lock, so readers cloning a
//! snapshot can never observe a torn asset.

use crate::types::{Asset, GlobalStats, RsiSet};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Point-in-time copy of the full data model.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    /// Tracked assets keyed by id.
    pub assets: HashMap<String, Asset>,
    /// Universe rank order (market-cap descending at selection time).
    pub order: Vec<String>,
    /// Dominance stats; `None` only before the first successful fetch.
    pub stats: Option<GlobalStats>,
    /// True until the initial universe lands.
    pub loading: bool,
}

#[derive(Debug)]
struct StoreInner {
    assets: HashMap<String, Asset>,
    order: Vec<String>,
    by_pair: HashMap<String, String>,
    stats: Option<GlobalStats>,
    loading: bool,
    /// Set once the first live tick lands; from then on streamed prices win
    /// over snapshot prices during a universe swap.
    streaming_live: bool,
}

/// Handle to the process-wide data model. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MarketStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MarketStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                assets: HashMap::new(),
                order: Vec::new(),
                by_pair: HashMap::new(),
                stats: None,
                loading: true,
                streaming_live: false,
            })),
        }
    }

    /// Swap in a freshly selected universe.
    ///
    /// Exclusive whole-model operation: membership, rank order, and the
    /// pair index are rebuilt together. For ids that survive the swap the
    /// existing indicator readings are carried over, and so is the streamed
    /// price once the live feed has taken over, so the view never regresses
    /// between refresh cycles.
    pub fn replace_universe(&self, assets: Vec<Asset>) {
        let mut inner = self.inner.write();
        let mut map = HashMap::with_capacity(assets.len());
        let mut order = Vec::with_capacity(assets.len());
        let mut by_pair = HashMap::with_capacity(assets.len());

        for mut asset in assets {
            if let Some(existing) = inner.assets.get(&asset.id) {
                asset.rsi = existing.rsi;
                if inner.streaming_live {
                    asset.current_price = existing.current_price;
                }
            }
            if let Some(pair) = &asset.exchange_pair {
                by_pair.insert(pair.clone(), asset.id.clone());
            }
            order.push(asset.id.clone());
            map.insert(asset.id.clone(), asset);
        }

        inner.assets = map;
        inner.order = order;
        inner.by_pair = by_pair;
        inner.loading = false;
    }

    /// Apply one live trade tick.
    ///
    /// Returns `false` when the pair is not tracked (the tick belongs to an
    /// asset outside the universe) or the price is unchanged; both are
    /// no-ops, not errors, and leave the model untouched.
    pub fn apply_tick(&self, pair: &str, price: f64) -> bool {
        let mut inner = self.inner.write();
        let Some(id) = inner.by_pair.get(pair).cloned() else {
            return false;
        };
        let Some(asset) = inner.assets.get(&id) else {
            return false;
        };
        if asset.current_price == price {
            return false;
        }

        let mut updated = asset.clone();
        updated.current_price = price;
        inner.assets.insert(id, updated);
        inner.streaming_live = true;
        true
    }

    /// Replace the six indicator readings of one asset as a single batch.
    ///
    /// Returns `false` when the id is no longer tracked -- the accepted
    /// outcome for a fetch that outlived a universe swap.
    pub fn apply_rsi_batch(&self, id: &str, batch: RsiSet) -> bool {
        let mut inner = self.inner.write();
        let Some(asset) = inner.assets.get(id) else {
            return false;
        };
        let mut updated = asset.clone();
        updated.rsi = batch;
        inner.assets.insert(id.to_string(), updated);
        true
    }

    /// Wholesale replacement of the dominance stats.
    pub fn replace_stats(&self, stats: GlobalStats) {
        self.inner.write().stats = Some(stats);
    }

    /// Clone out the current model for a reader.
    pub fn snapshot(&self) -> MarketSnapshot {
        let inner = self.inner.read();
        MarketSnapshot {
            assets: inner.assets.clone(),
            order: inner.order.clone(),
            stats: inner.stats,
            loading: inner.loading,
        }
    }

    /// Exchange pairs of the current universe in rank order, for stream
    /// subscription.
    pub fn subscribed_pairs(&self) -> Vec<String> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.assets.get(id))
            .filter_map(|asset| asset.exchange_pair.clone())
            .collect()
    }

    /// `(id, pair)` recompute targets: every tracked asset with a known
    /// pair, in rank order. Assets without a pair keep their readings
    /// untouched by staying off this list.
    pub fn indicator_targets(&self) -> Vec<(String, String)> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.assets.get(id))
            .filter_map(|asset| {
                asset
                    .exchange_pair
                    .as_ref()
                    .map(|pair| (asset.id.clone(), pair.clone()))
            })
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().loading
    }

    /// Number of tracked assets.
    pub fn tracked_len(&self) -> usize {
        self.inner.read().order.len()
    }
}

impl Default for MarketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timeframe;

    fn asset(id: &str, pair: &str, price: f64) -> Asset {
        Asset {
            id: id.to_string(),
            symbol: id.to_string(),
            name: id.to_uppercase(),
            image: String::new(),
            current_price: price,
            market_cap: 1_000_000.0,
            total_volume: 10_000.0,
            price_change_percentage_24h: 0.0,
            exchange_pair: Some(pair.to_string()),
            rsi: RsiSet::default(),
        }
    }

    #[test]
    fn test_tick_with_equal_price_is_a_no_op() {
        let store = MarketStore::new();
        store.replace_universe(vec![asset("bitcoin", "BTCUSDT", 97_000.0)]);

        assert!(!store.apply_tick("BTCUSDT", 97_000.0));
        assert!(store.apply_tick("BTCUSDT", 97_001.0));
        assert_eq!(
            store.snapshot().assets["bitcoin"].current_price,
            97_001.0
        );
    }

    #[test]
    fn test_tick_for_unknown_pair_is_dropped() {
        let store = MarketStore::new();
        store.replace_universe(vec![asset("bitcoin", "BTCUSDT", 97_000.0)]);

        assert!(!store.apply_tick("DOGEUSDT", 0.4));
        assert_eq!(store.snapshot().assets["bitcoin"].current_price, 97_000.0);
    }

    #[test]
    fn test_partial_rsi_batch_applies_wholesale() {
        let store = MarketStore::new();
        store.replace_universe(vec![asset("solana", "SOLUSDT", 150.0)]);

        // First cycle: all six available.
        let mut full = RsiSet::default();
        for timeframe in Timeframe::ALL {
            full.set(timeframe, Some(60.0));
        }
        assert!(store.apply_rsi_batch("solana", full));

        // Second cycle: two timeframes unavailable. The whole batch lands,
        // including the unavailable slots -- no mix of cycles survives.
        let mut partial = RsiSet::default();
        partial.set(Timeframe::M5, Some(41.0));
        partial.set(Timeframe::M15, Some(42.0));
        partial.set(Timeframe::H1, Some(43.0));
        partial.set(Timeframe::H4, Some(44.0));
        assert!(store.apply_rsi_batch("solana", partial));

        let rsi = store.snapshot().assets["solana"].rsi;
        assert_eq!(rsi.get(Timeframe::M5), Some(41.0));
        assert_eq!(rsi.get(Timeframe::H4), Some(44.0));
        assert_eq!(rsi.get(Timeframe::D1), None);
        assert_eq!(rsi.get(Timeframe::W1), None);
    }

    #[test]
    fn test_rsi_batch_for_departed_asset_is_dropped() {
        let store = MarketStore::new();
        store.replace_universe(vec![asset("solana", "SOLUSDT", 150.0)]);
        store.replace_universe(vec![asset("bitcoin", "BTCUSDT", 97_000.0)]);

        let mut batch = RsiSet::default();
        batch.set(Timeframe::H1, Some(70.0));
        assert!(!store.apply_rsi_batch("solana", batch));
    }

    #[test]
    fn test_universe_swap_preserves_streamed_price_and_rsi() {
        let store = MarketStore::new();
        store.replace_universe(vec![asset("bitcoin", "BTCUSDT", 97_000.0)]);

        let mut batch = RsiSet::default();
        batch.set(Timeframe::D1, Some(58.0));
        store.apply_rsi_batch("bitcoin", batch);
        store.apply_tick("BTCUSDT", 97_500.0);

        // Re-selection delivers a fresh snapshot row with a stale price.
        store.replace_universe(vec![asset("bitcoin", "BTCUSDT", 96_800.0)]);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.assets["bitcoin"].current_price, 97_500.0);
        assert_eq!(snapshot.assets["bitcoin"].rsi.get(Timeframe::D1), Some(58.0));
    }

    #[test]
    fn test_snapshot_price_wins_before_streaming_takes_over() {
        let store = MarketStore::new();
        store.replace_universe(vec![asset("bitcoin", "BTCUSDT", 97_000.0)]);
        // No tick applied yet: a swap refreshes the price from the snapshot.
        store.replace_universe(vec![asset("bitcoin", "BTCUSDT", 96_800.0)]);
        assert_eq!(store.snapshot().assets["bitcoin"].current_price, 96_800.0);
    }

    #[test]
    fn test_loading_clears_on_first_universe() {
        let store = MarketStore::new();
        assert!(store.is_loading());
        store.replace_universe(vec![asset("bitcoin", "BTCUSDT", 97_000.0)]);
        assert!(!store.is_loading());
    }

    #[test]
    fn test_stats_survive_universe_swap() {
        let store = MarketStore::new();
        store.replace_stats(GlobalStats {
            btc_dominance: 52.0,
            stablecoin_dominance: 5.0,
        });
        store.replace_universe(vec![asset("bitcoin", "BTCUSDT", 97_000.0)]);

        let stats = store.snapshot().stats.unwrap();
        assert_eq!(stats.btc_dominance, 52.0);
    }

    #[test]
    fn test_indicator_targets_skip_pairless_assets() {
        let store = MarketStore::new();
        let mut orphan = asset("orphan", "ORPHANUSDT", 1.0);
        orphan.exchange_pair = None;
        store.replace_universe(vec![asset("bitcoin", "BTCUSDT", 97_000.0), orphan]);

        let targets = store.indicator_targets();
        assert_eq!(
            targets,
            vec![("bitcoin".to_string(), "BTCUSDT".to_string())]
        );
    }
}

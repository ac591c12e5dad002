//! Engine bootstrap and task lifecycle.
//!
//! The engine owns every background task of one running pipeline: the trade
//! feed supervisor and both refresh timers. They start only after the
//! initial universe is established and are aborted together on shutdown.

use crate::{
    client::MarketClient,
    config::EngineConfig,
    error::FetchError,
    scheduler,
    store::MarketStore,
    stream::{self, StreamStatus},
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A running pipeline and its background tasks.
pub struct Engine {
    config: EngineConfig,
    client: Arc<MarketClient>,
    store: MarketStore,
    status_tx: watch::Sender<StreamStatus>,
    status_rx: watch::Receiver<StreamStatus>,
    feed: JoinHandle<()>,
    timers: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Bootstrap the pipeline.
    ///
    /// Fetches the tradable-pair list and the market snapshot concurrently,
    /// selects the tracked universe, seeds the store, then spawns the live
    /// feed and both refresh timers. An error here means the initial
    /// snapshot could not be established; the caller decides whether to
    /// retry.
    pub async fn start(config: EngineConfig, store: MarketStore) -> Result<Self, FetchError> {
        let client = Arc::new(MarketClient::new(config.client.clone()));

        let (tradable, rows) = tokio::join!(client.tradable_pairs(), client.markets());
        let assets = config.universe.select(rows?, &tradable?);
        info!(tracked = assets.len(), "selected tracked universe");
        store.replace_universe(assets);

        // Seed the dominance stats; a miss here is recovered by the first
        // refresh tick.
        match client.global_stats().await {
            Ok(stats) => store.replace_stats(stats),
            Err(error) => warn!(%error, "initial global stats fetch failed"),
        }

        let (status_tx, status_rx) = watch::channel(StreamStatus::Disconnected);
        let feed = stream::spawn_trade_feed(config.stream.clone(), store.clone(), status_tx.clone());
        let timers = vec![
            scheduler::spawn_indicator_refresh(
                Arc::clone(&client),
                store.clone(),
                config.indicator_refresh,
                config.rsi_period,
                config.fetch_concurrency,
            ),
            scheduler::spawn_stats_refresh(
                Arc::clone(&client),
                store.clone(),
                config.stats_refresh,
            ),
        ];

        Ok(Self {
            config,
            client,
            store,
            status_tx,
            status_rx,
            feed,
            timers,
        })
    }

    /// Latest connection state of the live feed.
    pub fn stream_status(&self) -> StreamStatus {
        *self.status_rx.borrow()
    }

    pub fn store(&self) -> &MarketStore {
        &self.store
    }

    /// Re-run universe selection and swap the tracked set wholesale.
    ///
    /// The feed task is replaced so its subscription list is rebuilt from
    /// the new universe instead of drifting stale; the old connection dies
    /// with the aborted task before the new supervisor connects.
    pub async fn reselect(&mut self) -> Result<(), FetchError> {
        let (tradable, rows) = tokio::join!(self.client.tradable_pairs(), self.client.markets());
        let assets = self.config.universe.select(rows?, &tradable?);
        info!(tracked = assets.len(), "reselected tracked universe");

        self.feed.abort();
        self.store.replace_universe(assets);
        self.feed = stream::spawn_trade_feed(
            self.config.stream.clone(),
            self.store.clone(),
            self.status_tx.clone(),
        );
        Ok(())
    }

    /// Stop the feed and both refresh timers together.
    pub fn shutdown(self) {
        self.feed.abort();
        for timer in &self.timers {
            timer.abort();
        }
        info!("engine tasks stopped");
    }
}

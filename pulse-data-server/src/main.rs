//! View server: runs the aggregation engine and pushes read-only view
//! frames to local WebSocket clients.
//!
//! Each client gets the current model snapshot on a fixed cadence, ordered
//! by its own sort selection; inbound messages can only toggle that
//! selection, never mutate core data.

use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use pulse_data::{
    view, Asset, Engine, EngineConfig, GlobalStats, MarketSnapshot, MarketStore, SortField,
    SortSpec,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Cadence of view frames pushed to each client.
const FRAME_INTERVAL: Duration = Duration::from_secs(2);

/// Delay between bootstrap attempts when the providers are unreachable.
const BOOTSTRAP_RETRY: Duration = Duration::from_secs(10);

/// One frame of the read-only view.
#[derive(Debug, Serialize)]
struct ViewFrame<'a> {
    generated_at: DateTime<Utc>,
    loading: bool,
    stats: Option<GlobalStats>,
    sort: SortSpec,
    /// Tracked assets in the client's display order.
    assets: Vec<&'a Asset>,
}

/// Write-only client request: toggle the sort column for this connection.
#[derive(Debug, Deserialize)]
struct SortRequest {
    sort: SortField,
}

#[tokio::main]
async fn main() {
    init_logging();

    info!("starting pulse-data view server");

    let config = EngineConfig::from_env();
    let store = MarketStore::new();

    // A provider outage delays startup but never kills the process.
    let engine = loop {
        match Engine::start(config.clone(), store.clone()).await {
            Ok(engine) => break engine,
            Err(error) => {
                warn!(%error, retry = ?BOOTSTRAP_RETRY, "bootstrap failed, retrying");
                tokio::time::sleep(BOOTSTRAP_RETRY).await;
            }
        }
    };
    info!(tracked = store.tracked_len(), "engine running");

    let addr = view_addr();
    let view_store = store.clone();
    tokio::spawn(async move {
        run_view_server(addr, view_store).await;
    });
    info!("view server listening on ws://{}", addr);

    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
    engine.shutdown();
}

/// View server address, configurable via `PULSE_VIEW_ADDR`.
fn view_addr() -> SocketAddr {
    let addr = std::env::var("PULSE_VIEW_ADDR").unwrap_or_else(|_| "127.0.0.1:9010".to_string());
    addr.parse::<SocketAddr>()
        .unwrap_or_else(|_| "127.0.0.1:9010".parse().expect("default address is valid"))
}

/// Accept loop for view clients.
async fn run_view_server(addr: SocketAddr, store: MarketStore) {
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(error) => {
            error!(%addr, %error, "failed to bind view server");
            return;
        }
    };

    while let Ok((stream, peer_addr)) = listener.accept().await {
        info!(%peer_addr, "new view client");
        let store = store.clone();
        tokio::spawn(handle_client(stream, peer_addr, store));
    }
}

/// Serve one view client: periodic sorted frames out, sort toggles in.
async fn handle_client(stream: TcpStream, peer_addr: SocketAddr, store: MarketStore) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(error) => {
            error!(%peer_addr, %error, "view handshake failed");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let welcome = serde_json::json!({
        "type": "welcome",
        "message": "Connected to pulse-data view feed",
        "timestamp": Utc::now(),
    });
    if let Ok(msg) = serde_json::to_string(&welcome) {
        let _ = ws_sender.send(Message::Text(msg.into())).await;
    }

    let mut sort = SortSpec::default();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let snapshot = store.snapshot();
                let frame = render_frame(&snapshot, &sort);
                match serde_json::to_string(&frame) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        error!(%peer_addr, %error, "failed to serialize view frame");
                    }
                }
            }
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<SortRequest>(&text) {
                        Ok(request) => {
                            sort.toggle(request.sort);
                            debug!(%peer_addr, ?sort, "sort selection updated");
                        }
                        Err(error) => {
                            debug!(%peer_addr, %error, "ignoring unrecognised client message");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // Heartbeat - handled automatically
                }
                Some(Err(error)) => {
                    error!(%peer_addr, %error, "view client socket error");
                    break;
                }
                _ => {}
            }
        }
    }

    info!(%peer_addr, "view client disconnected");
}

fn render_frame<'a>(snapshot: &'a MarketSnapshot, sort: &SortSpec) -> ViewFrame<'a> {
    let order = view::project(snapshot, sort);
    let assets = order
        .iter()
        .filter_map(|id| snapshot.assets.get(id))
        .collect();
    ViewFrame {
        generated_at: Utc::now(),
        loading: snapshot.loading,
        stats: snapshot.stats,
        sort: *sort,
        assets,
    }
}

/// Initialize logging
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

//! Core data types for the tracked market model.
//!
//! These are the shapes every component reads and writes through the store;
//! wire-format types stay next to the code that parses them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Candle granularities tracked per asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    M5,
    M15,
    H1,
    H4,
    D1,
    W1,
}

impl Timeframe {
    /// Every tracked granularity, in recompute order.
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
    ];

    /// Interval token understood by the candle provider.
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interval())
    }
}

/// Per-asset indicator readings, one slot per tracked timeframe.
///
/// A recompute batch always replaces the whole set; `None` marks a reading
/// that is unavailable (pair unlisted for that interval, or insufficient
/// history) and is an expected steady-state value, not a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RsiSet {
    #[serde(rename = "rsi_5m")]
    pub m5: Option<f64>,
    #[serde(rename = "rsi_15m")]
    pub m15: Option<f64>,
    #[serde(rename = "rsi_1h")]
    pub h1: Option<f64>,
    #[serde(rename = "rsi_4h")]
    pub h4: Option<f64>,
    #[serde(rename = "rsi_1d")]
    pub d1: Option<f64>,
    #[serde(rename = "rsi_1w")]
    pub w1: Option<f64>,
}

impl RsiSet {
    /// Reading for one timeframe.
    pub fn get(&self, timeframe: Timeframe) -> Option<f64> {
        match timeframe {
            Timeframe::M5 => self.m5,
            Timeframe::M15 => self.m15,
            Timeframe::H1 => self.h1,
            Timeframe::H4 => self.h4,
            Timeframe::D1 => self.d1,
            Timeframe::W1 => self.w1,
        }
    }

    /// Set the reading for one timeframe while assembling a batch.
    pub fn set(&mut self, timeframe: Timeframe, value: Option<f64>) {
        match timeframe {
            Timeframe::M5 => self.m5 = value,
            Timeframe::M15 => self.m15 = value,
            Timeframe::H1 => self.h1 = value,
            Timeframe::H4 => self.h4 = value,
            Timeframe::D1 => self.d1 = value,
            Timeframe::W1 => self.w1 = value,
        }
    }
}

/// One tracked asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Provider-global identifier; unique and stable for the session.
    pub id: String,
    /// Ticker symbol, lowercase as delivered by the snapshot provider.
    pub symbol: String,
    pub name: String,
    /// Display image reference (URL), passed through untouched.
    pub image: String,
    /// Latest known price; patched in place by the live stream.
    pub current_price: f64,
    pub market_cap: f64,
    pub total_volume: f64,
    pub price_change_percentage_24h: f64,
    /// Trading pair on the live-feed exchange, present only when the asset
    /// is listed there. Immutable outside universe re-selection.
    pub exchange_pair: Option<String>,
    /// Indicator readings, replaced wholesale per recompute cycle.
    #[serde(flatten)]
    pub rsi: RsiSet,
}

/// Market-cap dominance percentages for the two reference assets.
///
/// Independent lifecycle from per-asset data: replaced wholesale on each
/// refresh, never merged field by field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub btc_dominance: f64,
    pub stablecoin_dominance: f64,
}

//! View-side projection: sort requests and display ordering.
//!
//! Sorting is presentation state only. A sort request changes how one
//! reader orders its copy of the model; it never feeds back into the core
//! data.

use crate::{
    store::MarketSnapshot,
    types::{Asset, Timeframe},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Column a client can order the tracked universe by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Symbol, alphabetical.
    Asset,
    Price,
    Change24h,
    MarketCap,
    Volume,
    /// One of the six indicator columns.
    Rsi(Timeframe),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Current sort selection for one view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::MarketCap,
            direction: SortDirection::Descending,
        }
    }
}

impl SortSpec {
    /// Apply a column selection: re-selecting the active column flips the
    /// direction; a new column starts descending, except the asset column
    /// which reads naturally ascending.
    pub fn toggle(&mut self, field: SortField) {
        if self.field == field {
            self.direction = match self.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Ascending,
            };
        } else {
            self.field = field;
            self.direction = if field == SortField::Asset {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
        }
    }
}

/// Order the snapshot's tracked ids for display.
///
/// Assets missing the sorted value go last regardless of direction, so a
/// column of mostly-unavailable readings stays readable.
pub fn project(snapshot: &MarketSnapshot, spec: &SortSpec) -> Vec<String> {
    let mut ids = snapshot.order.clone();
    ids.sort_by(|a, b| {
        match (snapshot.assets.get(a), snapshot.assets.get(b)) {
            (Some(a), Some(b)) => compare_assets(a, b, spec),
            _ => Ordering::Equal,
        }
    });
    ids
}

fn compare_assets(a: &Asset, b: &Asset, spec: &SortSpec) -> Ordering {
    if spec.field == SortField::Asset {
        let ordering = a.symbol.cmp(&b.symbol);
        return match spec.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
    }

    match (sort_value(a, spec.field), sort_value(b, spec.field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ordering = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match spec.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
    }
}

fn sort_value(asset: &Asset, field: SortField) -> Option<f64> {
    match field {
        SortField::Asset => None,
        SortField::Price => Some(asset.current_price),
        SortField::Change24h => Some(asset.price_change_percentage_24h),
        SortField::MarketCap => Some(asset.market_cap),
        SortField::Volume => Some(asset.total_volume),
        SortField::Rsi(timeframe) => asset.rsi.get(timeframe),
    }
}

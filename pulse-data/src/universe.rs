//! Universe selection: which assets the pipeline tracks.
//!
//! The policy is deliberately plain data -- denylist, marker word, prefix
//! rule, allow-list -- rather than inline conditionals, because the
//! wrapped-token rule is a naming heuristic that is expected to misclassify
//! occasionally. Known false positives are patched by extending the
//! allow-list, not by reshaping the rule.

use crate::{client::MarketRow, types::Asset};
use std::collections::HashSet;

/// Stable-value assets excluded from tracking, matched case-insensitively
/// on symbol.
const STABLE_SYMBOLS: [&str; 13] = [
    "usdt", "usdc", "busd", "dai", "tusd", "ustc", "usdp", "ust", "frax", "lusd", "gusd", "usdn",
    "fdusd",
];

/// Symbols that trip the wrapped-token heuristic but are not wrapped tokens.
const WRAPPED_EXCEPTIONS: [&str; 2] = ["woo", "waves"];

/// Filter pipeline applied to ranked snapshot candidates.
#[derive(Debug, Clone)]
pub struct UniversePolicy {
    /// Quote currency suffix forming the exchange pair (`SYMBOL + quote`).
    pub quote_asset: String,
    /// Stable-value denylist, lowercase symbols.
    pub stable_denylist: HashSet<String>,
    /// Name prefix marking a wrapped token.
    pub wrapped_name_marker: String,
    /// Symbol prefix letter of the wrapped heuristic; only symbols longer
    /// than three characters are suspect.
    pub wrapped_prefix: char,
    /// Lowercase symbols exempt from the wrapped heuristic.
    pub allow_list: HashSet<String>,
    /// Maximum universe size after filtering.
    pub max_assets: usize,
}

impl Default for UniversePolicy {
    fn default() -> Self {
        Self {
            quote_asset: "USDT".to_string(),
            stable_denylist: STABLE_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            wrapped_name_marker: "wrapped".to_string(),
            wrapped_prefix: 'w',
            allow_list: WRAPPED_EXCEPTIONS.iter().map(|s| s.to_string()).collect(),
            max_assets: 100,
        }
    }
}

impl UniversePolicy {
    /// Exchange pair derived for a candidate symbol.
    pub fn pair_for(&self, symbol: &str) -> String {
        format!("{}{}", symbol.to_uppercase(), self.quote_asset)
    }

    fn is_stable(&self, symbol: &str) -> bool {
        self.stable_denylist.contains(&symbol.to_lowercase())
    }

    /// Wrapped-token heuristic: marker word at the start of the name, or the
    /// prefix letter on a symbol longer than three characters. The
    /// allow-list is consulted first and overrides both rules.
    fn looks_wrapped(&self, name: &str, symbol: &str) -> bool {
        let symbol = symbol.to_lowercase();
        if self.allow_list.contains(&symbol) {
            return false;
        }
        name.to_lowercase().starts_with(&self.wrapped_name_marker)
            || (symbol.starts_with(self.wrapped_prefix) && symbol.len() > 3)
    }

    /// Run the filter pipeline over market-cap-ranked candidates.
    ///
    /// Order of checks per candidate: tradable pair, stable denylist,
    /// wrapped heuristic; then the rank-ordered survivors are truncated to
    /// `max_assets`. Input rank order is preserved.
    pub fn select(&self, candidates: Vec<MarketRow>, tradable: &HashSet<String>) -> Vec<Asset> {
        candidates
            .into_iter()
            .filter_map(|row| {
                let pair = self.pair_for(&row.symbol);
                if !tradable.contains(&pair) {
                    return None;
                }
                if self.is_stable(&row.symbol) {
                    return None;
                }
                if self.looks_wrapped(&row.name, &row.symbol) {
                    return None;
                }
                Some(row.into_asset(pair))
            })
            .take(self.max_assets)
            .collect()
    }
}

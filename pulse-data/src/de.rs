//! Deserialization helpers for string-encoded provider payload fields.

use serde::{Deserialize, Deserializer};
use std::{fmt, str::FromStr};

/// Deserialize a value from its string representation, e.g. `"16578.50"`
/// into an `f64`. The live-feed and candle providers encode most numeric
/// fields this way.
pub fn de_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let data = String::deserialize(deserializer)?;
    data.parse::<T>().map_err(serde::de::Error::custom)
}

//! Relative Strength Index over an ordered close series.

/// Default look-back window length.
pub const DEFAULT_PERIOD: usize = 14;

/// Wilder-smoothed RSI of an ordered close series (oldest first).
///
/// Returns `None` when fewer than `period + 1` closes are supplied; that is
/// the expected steady state for newly listed or thinly traded pairs, not an
/// error. A zero average loss yields exactly `100.0`, which guards the
/// division for assets in an uninterrupted rally (or a flat series with no
/// deltas at all).
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, window) in closes.windows(2).enumerate() {
        let delta = window[1] - window[0];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        if i < period {
            // Seed phase: simple mean of the first `period` deltas.
            avg_gain += gain;
            avg_loss += loss;
            if i == period - 1 {
                avg_gain /= period as f64;
                avg_loss /= period as f64;
            }
        } else {
            // Wilder smoothing for every delta after the seed window.
            avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
            avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        }
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_rise_is_pinned_at_100() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&closes, DEFAULT_PERIOD), Some(100.0));
    }

    #[test]
    fn test_constant_series_is_pinned_at_100() {
        let closes = vec![42.0; 20];
        assert_eq!(rsi(&closes, DEFAULT_PERIOD), Some(100.0));
    }

    #[test]
    fn test_short_series_is_unavailable_for_every_period() {
        for period in 1..=30 {
            // One close short of the period + 1 minimum.
            let closes: Vec<f64> = (0..period).map(|i| 100.0 + i as f64).collect();
            assert_eq!(rsi(&closes, period), None, "period {period}");
            // And exactly at the minimum it becomes available.
            let closes: Vec<f64> = (0..=period).map(|i| 100.0 + i as f64).collect();
            assert!(rsi(&closes, period).is_some(), "period {period}");
        }
    }

    #[test]
    fn test_monotonic_fall_approaches_zero() {
        let closes: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let value = rsi(&closes, DEFAULT_PERIOD).unwrap();
        assert!(value < 1.0, "got {value}");
    }

    #[test]
    fn test_value_stays_bounded_on_choppy_series() {
        let closes: Vec<f64> = (0..60)
            .map(|i| {
                if i % 2 == 0 {
                    100.0 + i as f64
                } else {
                    100.0 - i as f64 * 0.5
                }
            })
            .collect();
        let value = rsi(&closes, DEFAULT_PERIOD).unwrap();
        assert!((0.0..=100.0).contains(&value), "got {value}");
    }

    #[test]
    fn test_smoothing_converges_on_repeated_deltas() {
        // Once the recurrence has converged on a repeating delta pattern,
        // extending the series with more of the same pattern must not move
        // the reading.
        let pattern = [103.0, 101.0]; // +2 / -1 around a rising base
        let series = |cycles: usize| -> Vec<f64> {
            let mut closes = vec![100.0];
            for i in 0..cycles {
                let base = i as f64;
                closes.push(pattern[0] + base);
                closes.push(pattern[1] + base);
            }
            closes
        };

        let short = rsi(&series(100), DEFAULT_PERIOD).unwrap();
        let long = rsi(&series(200), DEFAULT_PERIOD).unwrap();
        assert!((short - long).abs() < 1e-3, "short {short} vs long {long}");
    }
}

//! Trailing-window candle aggregation

use crate::fixed_point::{decode_field, decode_integer};
use crate::types::RawCandle;

/// Candle bucket width used for the trailing window
pub const CANDLE_INTERVAL: &str = "5_minutes";

/// Length of the trailing window
pub const WINDOW_HOURS: i64 = 24;

/// Upstream candle series id for a market.
pub fn candle_id(market_id: &str) -> String {
    format!("trades_candle_{}_{}", CANDLE_INTERVAL, market_id)
}

/// Time range of a candle query, nanoseconds since the epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandleWindow {
    pub from_nanos: i64,
    pub to_nanos: i64,
}

impl CandleWindow {
    /// The [`WINDOW_HOURS`] ending at `now_millis`.
    pub fn trailing(now_millis: i64) -> Self {
        let from_millis = now_millis - WINDOW_HOURS * 3_600_000;
        Self {
            from_nanos: from_millis.saturating_mul(1_000_000),
            to_nanos: now_millis.saturating_mul(1_000_000),
        }
    }
}

/// 24h summary of a market's candles
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CandleSummary {
    pub high: f64,
    pub low: f64,
    pub base_volume: f64,
    pub target_volume: f64,
}

/// Aggregate candles into high/low and traded volumes.
///
/// A running high or low of `0` counts as unset, so the first non-zero
/// value seeds it and an empty window yields zeros. Volume and notional are
/// summed as integers and decoded once: base volume with the position
/// decimals, target volume with `decimal_places + position_decimal_places`.
pub fn summarize(candles: &[RawCandle], decimal_places: u64, position_decimal_places: u64) -> CandleSummary {
    let mut high = 0.0_f64;
    let mut low = 0.0_f64;
    let mut volume: u128 = 0;
    let mut notional: u128 = 0;

    for candle in candles {
        let h = decode_field(&candle.high, decimal_places, "candle_high");
        let l = decode_field(&candle.low, decimal_places, "candle_low");
        if high == 0.0 || h > high {
            high = h;
        }
        if low == 0.0 || l < low {
            low = l;
        }
        volume += u128::from(candle.volume);
        notional += u128::from(candle.notional);
    }

    CandleSummary {
        high,
        low,
        base_volume: decode_integer(volume, position_decimal_places),
        target_volume: decode_integer(
            notional,
            decimal_places.saturating_add(position_decimal_places),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: &str, low: &str, volume: u64, notional: u64) -> RawCandle {
        RawCandle {
            start: 0,
            high: high.to_string(),
            low: low.to_string(),
            volume,
            notional,
        }
    }

    #[test]
    fn test_summarize_two_candles() {
        let candles = vec![candle("100", "90", 1, 1000), candle("110", "80", 2, 500)];
        let summary = summarize(&candles, 0, 0);

        assert_eq!(summary.high, 110.0);
        assert_eq!(summary.low, 80.0);
        assert_eq!(summary.base_volume, 3.0);
        assert_eq!(summary.target_volume, 1500.0);
    }

    #[test]
    fn test_empty_window_is_zero() {
        assert_eq!(summarize(&[], 5, 3), CandleSummary::default());
    }

    #[test]
    fn test_zero_candles_do_not_pin_low() {
        let candles = vec![candle("0", "0", 0, 0), candle("250", "200", 4, 9000)];
        let summary = summarize(&candles, 1, 0);

        assert_eq!(summary.high, 25.0);
        assert_eq!(summary.low, 20.0);
    }

    #[test]
    fn test_volume_scales() {
        // dp = 2, pdp = 3: volume / 10^3, notional / 10^5
        let candles = vec![candle("100", "100", 1500, 250_000), candle("100", "100", 500, 50_000)];
        let summary = summarize(&candles, 2, 3);

        assert_eq!(summary.base_volume, 2.0);
        assert_eq!(summary.target_volume, 3.0);
    }

    #[test]
    fn test_integer_sum_does_not_overflow() {
        let candles = vec![candle("1", "1", u64::MAX, u64::MAX), candle("1", "1", u64::MAX, 1)];
        let summary = summarize(&candles, 0, 0);

        let expected: f64 = "36893488147419103230".parse().unwrap();
        assert_eq!(summary.base_volume, expected);
    }

    #[test]
    fn test_window_and_candle_id() {
        let window = CandleWindow::trailing(86_400_000 * 2);
        assert_eq!(window.from_nanos, 86_400_000 * 1_000_000);
        assert_eq!(window.to_nanos, 2 * 86_400_000 * 1_000_000);
        assert_eq!(candle_id("abc"), "trades_candle_5_minutes_abc");
    }
}

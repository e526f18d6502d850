//! Order book normalization

use crate::fixed_point::{decode_field, decode_integer};
use crate::types::{BookLevel, OrderBookSnapshot, RawPriceLevel};

/// Decode raw depth into `[quantity, price]` pairs.
///
/// Quantities use the position decimals, prices the market decimals. Level
/// order is kept exactly as received.
pub fn normalize_order_book(
    ticker_id: &str,
    bids: &[RawPriceLevel],
    asks: &[RawPriceLevel],
    decimal_places: u64,
    position_decimal_places: u64,
) -> OrderBookSnapshot {
    OrderBookSnapshot {
        ticker_id: ticker_id.to_string(),
        bids: decode_levels(bids, decimal_places, position_decimal_places),
        asks: decode_levels(asks, decimal_places, position_decimal_places),
    }
}

fn decode_levels(levels: &[RawPriceLevel], decimal_places: u64, position_decimal_places: u64) -> Vec<BookLevel> {
    levels
        .iter()
        .map(|level| {
            [
                decode_integer(u128::from(level.volume), position_decimal_places),
                decode_field(&level.price, decimal_places, "book_price"),
            ]
        })
        .collect()
}

//! Product normalization
//!
//! Turns one raw market plus its latest data, pricing asset, trailing
//! candles and the upstream clock into a [`NormalizedMarket`]. Never fails:
//! missing or unparsable inputs become zero values.

use crate::candles::summarize;
use crate::fixed_point::{decode_field, decode_integer};
use crate::tags::InstrumentTags;
use crate::types::{FundingSchedule, NormalizedMarket, Product, RawAsset, RawCandle, RawMarket, RawMarketData};
use chrono::DateTime;
use observability::record_parse_failure;
use tracing::debug;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Every normalized market is a vanilla contract priced at its last trade.
pub const CONTRACT_TYPE: &str = "Vanilla";

/// Seconds until the next funding trigger.
///
/// `every - ((now_s - initial) mod every)`, with truncating division and a
/// remainder that keeps the sign of the dividend. `None` when the schedule
/// has no positive interval.
pub fn seconds_to_funding(schedule: &FundingSchedule, upstream_time_nanos: i64) -> Option<i64> {
    if schedule.every <= 0 {
        return None;
    }
    let now_seconds = upstream_time_nanos / NANOS_PER_SECOND;
    Some(schedule.every - (now_seconds - schedule.initial) % schedule.every)
}

/// Next funding time in epoch milliseconds, aligned to a whole second.
pub fn next_funding_millis(schedule: Option<&FundingSchedule>, upstream_time_nanos: i64) -> i64 {
    let Some(seconds) = schedule.and_then(|s| seconds_to_funding(s, upstream_time_nanos)) else {
        return 0;
    };
    let next_nanos = upstream_time_nanos.saturating_add(seconds.saturating_mul(NANOS_PER_SECOND));
    (next_nanos / NANOS_PER_SECOND).saturating_mul(1000)
}

/// RFC3339 to epoch milliseconds; empty or invalid input is `0`.
fn rfc3339_millis(value: &str, field: &'static str) -> i64 {
    if value.is_empty() {
        return 0;
    }
    match DateTime::parse_from_rfc3339(value) {
        Ok(time) => time.timestamp_millis(),
        Err(e) => {
            debug!(field, value, error = %e, "Unparsable timestamp, using 0");
            record_parse_failure(field);
            0
        }
    }
}

fn parse_rate(value: &str) -> f64 {
    let value = value.trim();
    if value.is_empty() {
        return 0.0;
    }
    value.parse().unwrap_or_else(|_| {
        debug!(value, "Unparsable funding rate, using 0");
        record_parse_failure("funding_rate");
        0.0
    })
}

pub fn normalize_market(
    market: &RawMarket,
    data: &RawMarketData,
    candles: &[RawCandle],
    asset: &RawAsset,
    upstream_time_nanos: i64,
) -> NormalizedMarket {
    let dp = market.decimal_places;
    let pdp = market.position_decimal_places;
    let tags = InstrumentTags::parse(&market.tags);
    let summary = summarize(candles, dp, pdp);

    let last_price = decode_field(&data.last_traded_price, dp, "last_price");
    let open_interest = decode_integer(u128::from(data.open_interest), pdp);

    let mut normalized = NormalizedMarket {
        ticker_id: market.ticker_id(),
        last_price,
        base_volume: summary.base_volume,
        target_volume: summary.target_volume,
        bid: decode_field(&data.best_bid_price, dp, "bid"),
        ask: decode_field(&data.best_offer_price, dp, "ask"),
        high: summary.high,
        low: summary.low,
        product_type: market
            .product
            .as_ref()
            .map(Product::label)
            .unwrap_or_default()
            .to_string(),
        open_interest,
        open_interest_usd: open_interest * last_price,
        contract_type: CONTRACT_TYPE.to_string(),
        contract_price: last_price,
        contract_price_currency: tags.quote.clone(),
        ..NormalizedMarket::default()
    };

    match &market.product {
        Some(Product::Future { .. }) => {
            let start = rfc3339_millis(&tags.enactment, "enactment");
            let expiry = rfc3339_millis(&tags.settlement, "settlement");
            normalized.start_timestamp = start;
            normalized.creation_timestamp = start;
            normalized.expiry_timestamp = expiry;
            normalized.end_timestamp = expiry;
        }
        Some(Product::Perpetual { funding_schedule, .. }) => {
            let perpetual = data.perpetual.clone().unwrap_or_default();
            let start = rfc3339_millis(&tags.enactment, "enactment");
            let next_funding = next_funding_millis(funding_schedule.as_ref(), upstream_time_nanos);
            let funding_rate = parse_rate(&perpetual.funding_rate);

            normalized.index_price = decode_field(&perpetual.external_twap, asset.decimals, "index_price");
            normalized.funding_rate = funding_rate;
            normalized.next_funding_rate = funding_rate;
            normalized.index_name = tags.base.clone();
            normalized.index_currency = tags.quote.clone();
            normalized.start_timestamp = start;
            normalized.creation_timestamp = start;
            normalized.next_funding_rate_timestamp = next_funding;
            normalized.end_timestamp = next_funding;
            normalized.expiry_timestamp = next_funding;
        }
        Some(Product::Spot { .. }) | None => {}
    }

    normalized.base_currency = tags.base;
    normalized.target_currency = tags.quote;
    normalized
}

//! Shared types for Market Data
//!
//! `Raw*` types are upstream records after transport decoding; numeric
//! values that carry a decimal scale stay as the integer strings the data
//! node sends. `NormalizedMarket` and `OrderBookSnapshot` are the public
//! records served over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trading state of a market. Only `Active` markets are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketState {
    Proposed,
    Pending,
    Active,
    Suspended,
    Closed,
    Settled,
    #[serde(other)]
    Other,
}

impl MarketState {
    /// Map the data node's `STATE_*` enum names.
    pub fn from_wire(value: &str) -> Self {
        match value.trim_start_matches("STATE_") {
            "PROPOSED" => Self::Proposed,
            "PENDING" => Self::Pending,
            "ACTIVE" => Self::Active,
            "SUSPENDED" | "SUSPENDED_VIA_GOVERNANCE" => Self::Suspended,
            "CLOSED" | "TRADING_TERMINATED" => Self::Closed,
            "SETTLED" => Self::Settled,
            _ => Self::Other,
        }
    }
}

/// Periodic funding trigger of a perpetual, in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingSchedule {
    #[serde(default)]
    pub initial: i64,
    pub every: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Product {
    Future {
        settlement_asset: String,
        #[serde(default)]
        quote_name: String,
    },
    Spot {
        #[serde(default)]
        base_asset: String,
        quote_asset: String,
    },
    Perpetual {
        settlement_asset: String,
        #[serde(default)]
        quote_name: String,
        #[serde(default)]
        funding_schedule: Option<FundingSchedule>,
    },
}

impl Product {
    /// Label used in `product_type`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Future { .. } => "Futures",
            Self::Spot { .. } => "Spot",
            Self::Perpetual { .. } => "Perpetual",
        }
    }

    /// Asset whose decimals price the product: the settlement asset for
    /// derivatives, the quote asset for spot.
    pub fn pricing_asset_id(&self) -> &str {
        match self {
            Self::Future { settlement_asset, .. } => settlement_asset,
            Self::Spot { quote_asset, .. } => quote_asset,
            Self::Perpetual { settlement_asset, .. } => settlement_asset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMarket {
    pub id: String,
    /// Display code, e.g. `BTC/USDT-PERP`
    pub code: String,
    #[serde(default)]
    pub decimal_places: u64,
    #[serde(default)]
    pub position_decimal_places: u64,
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub state: MarketState,
}

impl RawMarket {
    /// Public ticker: the display code without `/`.
    pub fn ticker_id(&self) -> String {
        self.code.replace('/', "")
    }

    /// Asset id needed to normalize this market; empty when unknown.
    pub fn pricing_asset_id(&self) -> &str {
        self.product
            .as_ref()
            .map(Product::pricing_asset_id)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpetualData {
    #[serde(default)]
    pub external_twap: String,
    /// Plain decimal string, not fixed-point encoded
    #[serde(default)]
    pub funding_rate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMarketData {
    #[serde(default)]
    pub last_traded_price: String,
    #[serde(default)]
    pub best_bid_price: String,
    #[serde(default)]
    pub best_offer_price: String,
    #[serde(default)]
    pub open_interest: u64,
    #[serde(default)]
    pub perpetual: Option<PerpetualData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAsset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandle {
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub high: String,
    #[serde(default)]
    pub low: String,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub notional: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPriceLevel {
    pub price: String,
    pub volume: u64,
    #[serde(default)]
    pub number_of_orders: u64,
}

/// Latest depth of one market; `buy` is the bid side, `sell` the ask side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDepth {
    #[serde(default)]
    pub buy: Vec<RawPriceLevel>,
    #[serde(default)]
    pub sell: Vec<RawPriceLevel>,
}

/// Public market summary. Field order is the serialized order.
///
/// Fields that do not apply to a product type are zero or empty, never
/// omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMarket {
    pub ticker_id: String,
    pub base_currency: String,
    pub target_currency: String,
    pub last_price: f64,
    pub base_volume: f64,
    pub target_volume: f64,
    pub bid: f64,
    pub ask: f64,
    pub high: f64,
    pub low: f64,
    pub product_type: String,
    pub open_interest: f64,
    pub open_interest_usd: f64,
    pub index_price: f64,
    pub index_name: String,
    pub index_currency: String,
    pub creation_timestamp: i64,
    pub start_timestamp: i64,
    pub expiry_timestamp: i64,
    pub end_timestamp: i64,
    pub funding_rate: f64,
    pub next_funding_rate: f64,
    pub next_funding_rate_timestamp: i64,
    pub contract_type: String,
    pub contract_price: f64,
    pub contract_price_currency: String,
}

/// `[quantity, price]`
pub type BookLevel = [f64; 2];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub ticker_id: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// One consistent published view of every market and order book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Upstream listing order
    pub markets: Vec<NormalizedMarket>,
    pub order_books: HashMap<String, OrderBookSnapshot>,
    /// Upstream clock used for funding times, nanoseconds
    pub upstream_time_nanos: i64,
    /// `None` until the first refresh publishes
    pub published_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn order_book(&self, ticker_id: &str) -> Option<&OrderBookSnapshot> {
        self.order_books.get(ticker_id)
    }
}

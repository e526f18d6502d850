//! Data node REST v2 response shapes
//!
//! The data node encodes 64-bit integers as JSON strings and omits empty
//! fields. Integer fields accept either form; absent, null or empty values
//! read as `0`. A value that is present but unusable (non-numeric text, a
//! negative count, an overflow) also reads as `0` and is counted as a parse
//! failure, so one bad field never drops the rest of a listing.

use observability::record_parse_failure;
use serde::de::{Deserializer, IgnoredAny};
use serde::Deserialize;
use tracing::debug;

use crate::types::{
    FundingSchedule, MarketState, PerpetualData, Product, RawAsset, RawCandle, RawDepth, RawMarket,
    RawMarketData, RawPriceLevel,
};

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Unsigned(u64),
    Signed(i64),
    Text(String),
    Other(IgnoredAny),
}

impl Lenient {
    /// Resolve to an integer of type `T`, `None` when the value is unusable.
    fn resolve<T>(self) -> Option<T>
    where
        T: TryFrom<u64> + TryFrom<i64> + std::str::FromStr + Default,
    {
        match self {
            Self::Unsigned(v) => <T as TryFrom<u64>>::try_from(v).ok(),
            Self::Signed(v) => <T as TryFrom<i64>>::try_from(v).ok(),
            Self::Text(s) if s.trim().is_empty() => Some(T::default()),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + TryFrom<i64> + std::str::FromStr + Default,
{
    let Some(value) = Option::<Lenient>::deserialize(deserializer)? else {
        return Ok(T::default());
    };
    Ok(value.resolve().unwrap_or_else(|| {
        debug!(target_type = std::any::type_name::<T>(), "Unusable wire integer, using 0");
        record_parse_failure("wire_integer");
        T::default()
    }))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    lenient(deserializer)
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    lenient(deserializer)
}

/// GraphQL-style connection wrapper used by list endpoints
#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

impl<T> Connection<T> {
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }
}

// ----------------------------------------------------------------------------
// Markets
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MarketsResponse {
    pub markets: Connection<WireMarket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMarket {
    pub id: String,
    #[serde(default)]
    pub tradable_instrument: WireTradableInstrument,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub decimal_places: u64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub position_decimal_places: i64,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireTradableInstrument {
    #[serde(default)]
    pub instrument: WireInstrument,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireInstrument {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub metadata: WireMetadata,
    pub future: Option<WireFuture>,
    pub spot: Option<WireSpot>,
    pub perpetual: Option<WirePerpetual>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFuture {
    #[serde(default)]
    pub settlement_asset: String,
    #[serde(default)]
    pub quote_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSpot {
    #[serde(default)]
    pub base_asset: String,
    #[serde(default)]
    pub quote_asset: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePerpetual {
    #[serde(default)]
    pub settlement_asset: String,
    #[serde(default)]
    pub quote_name: String,
    pub data_source_spec_for_settlement_schedule: Option<WireDataSourceSpec>,
}

#[derive(Debug, Deserialize)]
pub struct WireDataSourceSpec {
    pub data: Option<WireDataSourceDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct WireDataSourceDefinition {
    pub internal: Option<WireInternalSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInternalSource {
    pub time_trigger: Option<WireTimeTrigger>,
}

#[derive(Debug, Deserialize)]
pub struct WireTimeTrigger {
    #[serde(default)]
    pub triggers: Vec<WireTrigger>,
}

#[derive(Debug, Deserialize)]
pub struct WireTrigger {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub initial: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub every: i64,
}

impl WirePerpetual {
    /// First time trigger of the settlement schedule, if any.
    fn funding_schedule(&self) -> Option<FundingSchedule> {
        let trigger = self
            .data_source_spec_for_settlement_schedule
            .as_ref()?
            .data
            .as_ref()?
            .internal
            .as_ref()?
            .time_trigger
            .as_ref()?
            .triggers
            .first()?;
        Some(FundingSchedule {
            initial: trigger.initial,
            every: trigger.every,
        })
    }
}

impl From<WireMarket> for RawMarket {
    fn from(wire: WireMarket) -> Self {
        let instrument = wire.tradable_instrument.instrument;
        let product = if let Some(future) = instrument.future {
            Some(Product::Future {
                settlement_asset: future.settlement_asset,
                quote_name: future.quote_name,
            })
        } else if let Some(spot) = instrument.spot {
            Some(Product::Spot {
                base_asset: spot.base_asset,
                quote_asset: spot.quote_asset,
            })
        } else {
            instrument.perpetual.map(|perp| Product::Perpetual {
                funding_schedule: perp.funding_schedule(),
                settlement_asset: perp.settlement_asset,
                quote_name: perp.quote_name,
            })
        };

        RawMarket {
            id: wire.id,
            code: instrument.code,
            decimal_places: wire.decimal_places,
            position_decimal_places: u64::try_from(wire.position_decimal_places).unwrap_or(0),
            product,
            tags: instrument.metadata.tags,
            state: MarketState::from_wire(&wire.state),
        }
    }
}

// ----------------------------------------------------------------------------
// Market data
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataResponse {
    pub market_data: WireMarketData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMarketData {
    #[serde(default)]
    pub last_traded_price: String,
    #[serde(default)]
    pub best_bid_price: String,
    #[serde(default)]
    pub best_offer_price: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub open_interest: u64,
    pub product_data: Option<WireProductData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProductData {
    pub perpetual_data: Option<WirePerpetualData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePerpetualData {
    #[serde(default)]
    pub external_twap: String,
    #[serde(default)]
    pub funding_rate: String,
}

impl From<WireMarketData> for RawMarketData {
    fn from(wire: WireMarketData) -> Self {
        RawMarketData {
            last_traded_price: wire.last_traded_price,
            best_bid_price: wire.best_bid_price,
            best_offer_price: wire.best_offer_price,
            open_interest: wire.open_interest,
            perpetual: wire
                .product_data
                .and_then(|p| p.perpetual_data)
                .map(|p| PerpetualData {
                    external_twap: p.external_twap,
                    funding_rate: p.funding_rate,
                }),
        }
    }
}

// ----------------------------------------------------------------------------
// Assets, time, candles, depth
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AssetResponse {
    pub asset: WireAsset,
}

#[derive(Debug, Deserialize)]
pub struct WireAsset {
    pub id: String,
    #[serde(default)]
    pub details: WireAssetDetails,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireAssetDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub decimals: u64,
}

impl From<WireAsset> for RawAsset {
    fn from(wire: WireAsset) -> Self {
        RawAsset {
            id: wire.id,
            name: wire.details.name,
            symbol: wire.details.symbol,
            decimals: wire.details.decimals,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TimeResponse {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub timestamp: i64,
}

#[derive(Debug, Deserialize)]
pub struct CandlesResponse {
    pub candles: Connection<WireCandle>,
}

#[derive(Debug, Deserialize)]
pub struct WireCandle {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub start: i64,
    #[serde(default)]
    pub high: String,
    #[serde(default)]
    pub low: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub volume: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub notional: u64,
}

impl From<WireCandle> for RawCandle {
    fn from(wire: WireCandle) -> Self {
        RawCandle {
            start: wire.start,
            high: wire.high,
            low: wire.low,
            volume: wire.volume,
            notional: wire.notional,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DepthResponse {
    #[serde(default)]
    pub buy: Vec<WirePriceLevel>,
    #[serde(default)]
    pub sell: Vec<WirePriceLevel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePriceLevel {
    #[serde(default)]
    pub price: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub volume: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub number_of_orders: u64,
}

impl From<DepthResponse> for RawDepth {
    fn from(wire: DepthResponse) -> Self {
        let convert = |levels: Vec<WirePriceLevel>| {
            levels
                .into_iter()
                .map(|l| RawPriceLevel {
                    price: l.price,
                    volume: l.volume,
                    number_of_orders: l.number_of_orders,
                })
                .collect()
        };
        RawDepth {
            buy: convert(wire.buy),
            sell: convert(wire.sell),
        }
    }
}

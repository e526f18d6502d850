//! Upstream market source trait

use async_trait::async_trait;

use crate::types::{RawAsset, RawCandle, RawDepth, RawMarket, RawMarketData};
use crate::Result;

/// Read-only view of the trading network's data node.
///
/// Implementations return records already decoded from the transport but
/// with fixed-point values untouched. The refresher decides how each
/// failure degrades.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Markets currently in the active state, in upstream order.
    async fn list_active_markets(&self) -> Result<Vec<RawMarket>>;

    /// Latest trading data of one market.
    async fn market_data(&self, market_id: &str) -> Result<RawMarketData>;

    async fn asset(&self, asset_id: &str) -> Result<RawAsset>;

    /// Network clock, nanoseconds since the epoch.
    async fn network_time(&self) -> Result<i64>;

    /// Candles of one series with `from_nanos <= start <= to_nanos`.
    async fn candles(&self, candle_id: &str, from_nanos: i64, to_nanos: i64) -> Result<Vec<RawCandle>>;

    /// Latest aggregated depth of one market.
    async fn market_depth(&self, market_id: &str) -> Result<RawDepth>;
}

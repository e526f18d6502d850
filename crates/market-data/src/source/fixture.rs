//! In-memory market source loaded from a JSON fixture
//!
//! Serves canned upstream records for offline runs and tests. Candle
//! windows are ignored: a fixture is static, so every candle stored for a
//! series is returned.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::MarketDataError;
use crate::source::traits::MarketSource;
use crate::types::{MarketState, RawAsset, RawCandle, RawDepth, RawMarket, RawMarketData};
use crate::Result;

/// Upstream state held by a [`FixtureSource`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureData {
    pub network_time_nanos: i64,
    /// Every market, in listing order, whatever its state
    pub markets: Vec<RawMarket>,
    /// Keyed by market id
    pub market_data: HashMap<String, RawMarketData>,
    /// Keyed by asset id
    pub assets: HashMap<String, RawAsset>,
    /// Keyed by candle series id
    pub candles: HashMap<String, Vec<RawCandle>>,
    /// Keyed by market id
    pub depth: HashMap<String, RawDepth>,
}

#[derive(Debug, Default)]
pub struct FixtureSource {
    data: RwLock<FixtureData>,
}

impl FixtureSource {
    pub fn new(data: FixtureData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Load a fixture from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MarketDataError::Fixture(format!("{}: {}", path.display(), e)))?;
        let data: FixtureData = serde_json::from_str(&content)
            .map_err(|e| MarketDataError::Fixture(format!("{}: {}", path.display(), e)))?;

        info!(
            path = %path.display(),
            markets = data.markets.len(),
            "Loaded market fixture"
        );
        Ok(Self::new(data))
    }

    /// Mutate the served state in place.
    pub fn update<F: FnOnce(&mut FixtureData)>(&self, f: F) {
        f(&mut self.data.write());
    }
}

#[async_trait]
impl MarketSource for FixtureSource {
    async fn list_active_markets(&self) -> Result<Vec<RawMarket>> {
        Ok(self
            .data
            .read()
            .markets
            .iter()
            .filter(|m| m.state == MarketState::Active)
            .cloned()
            .collect())
    }

    async fn market_data(&self, market_id: &str) -> Result<RawMarketData> {
        self.data
            .read()
            .market_data
            .get(market_id)
            .cloned()
            .ok_or_else(|| MarketDataError::DataNotAvailable(format!("market data for {}", market_id)))
    }

    async fn asset(&self, asset_id: &str) -> Result<RawAsset> {
        self.data
            .read()
            .assets
            .get(asset_id)
            .cloned()
            .ok_or_else(|| MarketDataError::DataNotAvailable(format!("asset {}", asset_id)))
    }

    async fn network_time(&self) -> Result<i64> {
        Ok(self.data.read().network_time_nanos)
    }

    async fn candles(&self, candle_id: &str, _from_nanos: i64, _to_nanos: i64) -> Result<Vec<RawCandle>> {
        Ok(self.data.read().candles.get(candle_id).cloned().unwrap_or_default())
    }

    async fn market_depth(&self, market_id: &str) -> Result<RawDepth> {
        Ok(self.data.read().depth.get(market_id).cloned().unwrap_or_default())
    }
}

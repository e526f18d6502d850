//! Data node REST client

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::MarketDataError;
use crate::source::traits::MarketSource;
use crate::source::wire::{
    AssetResponse, CandlesResponse, DepthResponse, MarketDataResponse, MarketsResponse, TimeResponse,
};
use crate::types::{MarketState, RawAsset, RawCandle, RawDepth, RawMarket, RawMarketData};
use crate::Result;

/// [`MarketSource`] backed by a data node's REST v2 API
#[derive(Debug, Clone)]
pub struct DataNodeClient {
    client: Client,
    base_url: String,
}

impl DataNodeClient {
    /// Create a client; `timeout` bounds every request end to end.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mdapi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketDataError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%url, status = status.as_u16(), %body, "Data node request failed");
            return Err(MarketDataError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MarketSource for DataNodeClient {
    async fn list_active_markets(&self) -> Result<Vec<RawMarket>> {
        let response: MarketsResponse = self.get("/api/v2/markets", &[]).await?;
        Ok(response
            .markets
            .into_nodes()
            .into_iter()
            .map(RawMarket::from)
            .filter(|m| m.state == MarketState::Active)
            .collect())
    }

    async fn market_data(&self, market_id: &str) -> Result<RawMarketData> {
        let response: MarketDataResponse = self
            .get(&format!("/api/v2/market/data/{}/latest", market_id), &[])
            .await?;
        Ok(response.market_data.into())
    }

    async fn asset(&self, asset_id: &str) -> Result<RawAsset> {
        let response: AssetResponse = self.get(&format!("/api/v2/asset/{}", asset_id), &[]).await?;
        Ok(response.asset.into())
    }

    async fn network_time(&self) -> Result<i64> {
        let response: TimeResponse = self.get("/api/v2/vega/time", &[]).await?;
        Ok(response.timestamp)
    }

    async fn candles(&self, candle_id: &str, from_nanos: i64, to_nanos: i64) -> Result<Vec<RawCandle>> {
        let query = [
            ("candleId", candle_id.to_string()),
            ("fromTimestamp", from_nanos.to_string()),
            ("toTimestamp", to_nanos.to_string()),
        ];
        let response: CandlesResponse = self.get("/api/v2/candle", &query).await?;
        Ok(response.candles.into_nodes().into_iter().map(RawCandle::from).collect())
    }

    async fn market_depth(&self, market_id: &str) -> Result<RawDepth> {
        let response: DepthResponse = self
            .get(&format!("/api/v2/market/depth/{}/latest", market_id), &[])
            .await?;
        Ok(response.into())
    }
}

//! HTTP API handlers
//!
//! Handlers only read the published snapshot; they never reach upstream.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::cache::SnapshotCache;
use crate::types::{OrderBookSnapshot, Snapshot};

#[derive(Clone)]
pub struct MarketApiState {
    pub cache: Arc<SnapshotCache>,
}

impl MarketApiState {
    pub fn new(cache: Arc<SnapshotCache>) -> Self {
        Self { cache }
    }
}

/// Serializes the markets of a held snapshot without copying them.
pub struct Contracts(Arc<Snapshot>);

impl Serialize for Contracts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.markets.serialize(serializer)
    }
}

/// `GET /contracts`
pub async fn list_contracts(State(state): State<MarketApiState>) -> Json<Contracts> {
    Json(Contracts(state.cache.load()))
}

/// `GET /orderbook/:ticker`: 404 with a `null` body for unknown tickers.
pub async fn get_order_book(
    State(state): State<MarketApiState>,
    Path(ticker): Path<String>,
) -> Result<Json<OrderBookSnapshot>, (StatusCode, Json<Value>)> {
    match state.cache.order_book(&ticker) {
        Some(book) => Ok(Json(book)),
        None => {
            debug!(%ticker, "Order book not found");
            Err((StatusCode::NOT_FOUND, Json(Value::Null)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::market_routes;
    use crate::types::NormalizedMarket;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn state() -> MarketApiState {
        let cache = Arc::new(SnapshotCache::new());
        let book = OrderBookSnapshot {
            ticker_id: "BTCUSDT".to_string(),
            bids: vec![[1.5, 65000.0]],
            asks: vec![[0.25, 65100.0]],
        };
        cache.publish(Snapshot {
            markets: vec![
                NormalizedMarket {
                    ticker_id: "BTCUSDT".to_string(),
                    last_price: 65000.0,
                    contract_type: "Vanilla".to_string(),
                    ..NormalizedMarket::default()
                },
                NormalizedMarket {
                    ticker_id: "ETHUSDT".to_string(),
                    ..NormalizedMarket::default()
                },
            ],
            order_books: HashMap::from([("BTCUSDT".to_string(), book)]),
            upstream_time_nanos: 0,
            published_at: Some(Utc::now()),
        });
        MarketApiState::new(cache)
    }

    async fn get(state: MarketApiState, uri: &str) -> (StatusCode, Value) {
        let response = market_routes(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_contracts() {
        let (status, body) = get(state(), "/contracts").await;

        assert_eq!(status, StatusCode::OK);
        let markets = body.as_array().unwrap();
        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0]["ticker_id"], "BTCUSDT");
        assert_eq!(markets[0]["last_price"], 65000.0);
        assert_eq!(markets[0]["contract_type"], "Vanilla");
        assert_eq!(markets[1]["index_name"], "");
    }

    #[tokio::test]
    async fn test_contracts_before_first_refresh() {
        let (status, body) = get(MarketApiState::new(Arc::new(SnapshotCache::new())), "/contracts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_order_book() {
        let (status, body) = get(state(), "/orderbook/BTCUSDT").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({
                "ticker_id": "BTCUSDT",
                "bids": [[1.5, 65000.0]],
                "asks": [[0.25, 65100.0]]
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_404_null() {
        let (status, body) = get(state(), "/orderbook/NOPE").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_null());

        // Listed market without a stored book
        let (status, _) = get(state(), "/orderbook/ETHUSDT").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

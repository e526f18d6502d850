//! HTTP routes for the market summary API

use axum::{routing::get, Router};

use super::handlers::*;

/// Create the market summary router
///
/// Routes:
/// - GET /contracts          - Every normalized market
/// - GET /orderbook/:ticker  - Order book of one ticker
pub fn market_routes(state: MarketApiState) -> Router {
    Router::new()
        .route("/contracts", get(list_contracts))
        .route("/orderbook/:ticker", get(get_order_book))
        .with_state(state)
}

//! Public HTTP API for market summaries

pub mod handlers;
pub mod routes;

pub use handlers::MarketApiState;
pub use routes::market_routes;

//! Market Data for the market summary API
//!
//! This crate polls a trading network's data node, normalizes every active
//! market into a flat summary record and serves the latest consistent
//! snapshot to HTTP readers.
//!
//! # Core Components
//!
//! - [`source`] - Upstream data node client and fixture source
//! - [`fixed_point`] - Integer-string decimal decoding
//! - [`tags`] - Instrument metadata tag parsing
//! - [`candles`] - Trailing 24h candle aggregation
//! - [`normalizer`] - Per-product market normalization
//! - [`order_book`] - Depth to `[quantity, price]` levels
//! - [`cache`] - Atomically replaced snapshot
//! - [`refresher`] - Periodic refresh pipeline
//! - [`api`] - `/contracts` and `/orderbook/:ticker` handlers
//!
//! # Key Invariants
//!
//! - Readers never see a partially built snapshot
//! - HTTP handlers never call upstream
//! - Unparsable upstream values become zero, never errors
//! - Markets whose pricing asset cannot be resolved are left out

#[cfg(feature = "api")]
pub mod api;
pub mod cache;
pub mod candles;
pub mod error;
pub mod fixed_point;
pub mod normalizer;
pub mod order_book;
pub mod refresher;
pub mod source;
pub mod tags;
pub mod types;

pub use cache::SnapshotCache;
pub use error::MarketDataError;
pub use refresher::{RefreshOutcome, RefreshSettings, Refresher};
pub use source::{create_source, DataNodeClient, FixtureData, FixtureSource, MarketSource};
pub use types::{NormalizedMarket, OrderBookSnapshot, Snapshot};

pub type Result<T> = std::result::Result<T, MarketDataError>;

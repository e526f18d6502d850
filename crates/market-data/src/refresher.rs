//! Refresh pipeline
//!
//! One cycle lists the active markets, fetches everything needed to
//! normalize each of them, builds a complete [`Snapshot`] privately and
//! publishes it in one swap. Upstream failures degrade per call; only a
//! failed market listing aborts a cycle, leaving the previous snapshot in
//! place.

use chrono::Utc;
use config::MasterConfig;
use futures::stream::{self, StreamExt};
use observability::RefreshMetrics;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::SnapshotCache;
use crate::candles::{candle_id, CandleWindow};
use crate::error::MarketDataError;
use crate::normalizer::normalize_market;
use crate::order_book::normalize_order_book;
use crate::source::MarketSource;
use crate::types::{NormalizedMarket, OrderBookSnapshot, RawMarket, RawMarketData, Snapshot};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Time between cycles
    pub interval: Duration,
    /// Deadline for each upstream call
    pub request_timeout: Duration,
    /// Markets processed concurrently; `1` is strictly sequential
    pub fetch_concurrency: usize,
    /// Run a cycle as soon as [`Refresher::run`] starts
    pub run_on_startup: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self::from_config(&MasterConfig::default())
    }
}

impl RefreshSettings {
    pub fn from_config(config: &MasterConfig) -> Self {
        Self {
            interval: config.refresh.interval(),
            request_timeout: config.upstream.request_timeout(),
            fetch_concurrency: config.refresh.fetch_concurrency.max(1),
            run_on_startup: config.refresh.run_on_startup,
        }
    }
}

/// Result of one call to [`Refresher::refresh_cycle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published { markets: usize, excluded: usize },
    /// Another cycle was still running
    Skipped,
}

pub struct Refresher {
    source: Arc<dyn MarketSource>,
    cache: Arc<SnapshotCache>,
    settings: RefreshSettings,
    metrics: RefreshMetrics,
    cycle_lock: Mutex<()>,
}

impl Refresher {
    pub fn new(source: Arc<dyn MarketSource>, cache: Arc<SnapshotCache>, settings: RefreshSettings) -> Self {
        Self {
            source,
            cache,
            settings,
            metrics: RefreshMetrics::new(),
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    /// Run one refresh cycle and publish its snapshot.
    ///
    /// Returns [`RefreshOutcome::Skipped`] without touching upstream when a
    /// cycle is already in progress.
    #[instrument(skip(self))]
    pub async fn refresh_cycle(&self) -> Result<RefreshOutcome> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            warn!("Refresh cycle still running, skipping");
            self.metrics.cycle_skipped();
            return Ok(RefreshOutcome::Skipped);
        };
        let started = Instant::now();

        let markets = match self.call("list_markets", self.source.list_active_markets()).await {
            Ok(markets) => markets,
            Err(e) => {
                error!(error = %e, "Failed to list markets, keeping previous snapshot");
                self.metrics.cycle_failed();
                return Err(e);
            }
        };

        let upstream_time_nanos = self
            .call("network_time", self.source.network_time())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to fetch network time, using 0");
                0
            });
        let window = CandleWindow::trailing(Utc::now().timestamp_millis());

        // Owned markets keep the buffered future `Send` for `tokio::spawn`.
        let processed: Vec<Option<(NormalizedMarket, OrderBookSnapshot)>> = stream::iter(markets)
            .map(move |market| async move { self.process_market(&market, upstream_time_nanos, window).await })
            .buffered(self.settings.fetch_concurrency.max(1))
            .collect()
            .await;

        let mut snapshot = Snapshot {
            markets: Vec::with_capacity(processed.len()),
            order_books: HashMap::with_capacity(processed.len()),
            upstream_time_nanos,
            published_at: Some(Utc::now()),
        };
        let mut excluded = 0;
        for entry in processed {
            match entry {
                Some((market, book)) => {
                    snapshot.order_books.insert(book.ticker_id.clone(), book);
                    snapshot.markets.push(market);
                }
                None => excluded += 1,
            }
        }

        let published = snapshot.markets.len();
        self.cache.publish(snapshot);

        let elapsed = started.elapsed();
        self.metrics.cycle_published(elapsed, published, excluded);
        info!(
            markets = published,
            excluded,
            elapsed_ms = elapsed.as_millis() as u64,
            "Refresh cycle published"
        );

        Ok(RefreshOutcome::Published {
            markets: published,
            excluded,
        })
    }

    /// Refresh on the configured interval until `shutdown` is cancelled.
    ///
    /// The first cycle runs immediately when `run_on_startup` is set.
    /// Failed cycles are logged and retried on the next tick.
    pub async fn run(&self, shutdown: CancellationToken) {
        // `interval_at` panics on a zero period.
        let period = self.settings.interval.max(Duration::from_millis(1));
        let start = if self.settings.run_on_startup {
            tokio::time::Instant::now()
        } else {
            tokio::time::Instant::now() + period
        };
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = period.as_secs(), "Refresher started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Refresher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    // An in-flight cycle is dropped on shutdown; it has not published yet.
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            info!("Refresher shutting down, abandoning in-flight cycle");
                            break;
                        }
                        result = self.refresh_cycle() => {
                            if let Err(e) = result {
                                warn!(error = %e, "Refresh cycle failed");
                            }
                        }
                    }
                }
            }
        }
    }

    /// Fetch and normalize one market. `None` excludes it from the snapshot.
    async fn process_market(
        &self,
        market: &RawMarket,
        upstream_time_nanos: i64,
        window: CandleWindow,
    ) -> Option<(NormalizedMarket, OrderBookSnapshot)> {
        let ticker_id = market.ticker_id();

        let data = self
            .call("market_data", self.source.market_data(&market.id))
            .await
            .unwrap_or_else(|e| {
                warn!(market_id = %market.id, error = %e, "Failed to fetch market data, using zeros");
                RawMarketData::default()
            });

        let asset_id = market.pricing_asset_id();
        if asset_id.is_empty() {
            warn!(market_id = %market.id, ticker_id = %ticker_id, "Market has no pricing asset, excluding");
            return None;
        }
        let asset = match self.call("asset", self.source.asset(asset_id)).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!(market_id = %market.id, asset_id, error = %e, "Failed to resolve asset, excluding market");
                return None;
            }
        };

        let candles = self
            .call(
                "candles",
                self.source
                    .candles(&candle_id(&market.id), window.from_nanos, window.to_nanos),
            )
            .await
            .unwrap_or_else(|e| {
                warn!(market_id = %market.id, error = %e, "Failed to fetch candles");
                Vec::new()
            });

        let depth = self
            .call("market_depth", self.source.market_depth(&market.id))
            .await
            .unwrap_or_else(|e| {
                warn!(market_id = %market.id, error = %e, "Failed to fetch market depth");
                Default::default()
            });

        debug!(
            market_id = %market.id,
            ticker_id = %ticker_id,
            candles = candles.len(),
            bids = depth.buy.len(),
            asks = depth.sell.len(),
            "Market fetched"
        );

        let normalized = normalize_market(market, &data, &candles, &asset, upstream_time_nanos);
        let book = normalize_order_book(
            &ticker_id,
            &depth.buy,
            &depth.sell,
            market.decimal_places,
            market.position_decimal_places,
        );
        Some((normalized, book))
    }

    /// Await an upstream call under the per-call deadline.
    async fn call<T, F>(&self, call: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let after = self.settings.request_timeout;
        let result = match tokio::time::timeout(after, fut).await {
            Ok(result) => result,
            Err(_) => Err(MarketDataError::Timeout { call, after }),
        };
        if result.is_err() {
            self.metrics.upstream_error(call);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FixtureData, FixtureSource, MockMarketSource};
    use crate::types::{
        FundingSchedule, MarketState, PerpetualData, Product, RawAsset, RawCandle, RawDepth, RawPriceLevel,
    };
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn spot(id: &str, code: &str, quote_asset: &str) -> RawMarket {
        RawMarket {
            id: id.to_string(),
            code: code.to_string(),
            decimal_places: 2,
            position_decimal_places: 1,
            product: Some(Product::Spot {
                base_asset: "base".to_string(),
                quote_asset: quote_asset.to_string(),
            }),
            tags: vec!["base:BTC".to_string(), "quote:USDT".to_string()],
            state: MarketState::Active,
        }
    }

    fn fixture() -> FixtureData {
        let mut data = FixtureData {
            network_time_nanos: 1_700_000_000_000_000_000,
            markets: vec![
                spot("m1", "BTC/USDT", "usdt"),
                spot("m2", "ETH/USDT", "usdt"),
                RawMarket {
                    state: MarketState::Closed,
                    ..spot("m3", "OLD/USDT", "usdt")
                },
            ],
            ..FixtureData::default()
        };
        data.assets.insert(
            "usdt".to_string(),
            RawAsset {
                id: "usdt".to_string(),
                decimals: 6,
                ..RawAsset::default()
            },
        );
        data.market_data.insert(
            "m1".to_string(),
            RawMarketData {
                last_traded_price: "6500000".to_string(),
                ..RawMarketData::default()
            },
        );
        data.candles.insert(
            candle_id("m1"),
            vec![RawCandle {
                high: "6600000".to_string(),
                low: "6400000".to_string(),
                volume: 20,
                ..RawCandle::default()
            }],
        );
        data.depth.insert(
            "m1".to_string(),
            RawDepth {
                buy: vec![RawPriceLevel {
                    price: "6499000".to_string(),
                    volume: 15,
                    number_of_orders: 1,
                }],
                sell: vec![],
            },
        );
        data
    }

    fn refresher(source: Arc<dyn MarketSource>) -> Refresher {
        Refresher::new(source, Arc::new(SnapshotCache::new()), RefreshSettings::default())
    }

    #[tokio::test]
    async fn test_cycle_publishes_active_markets() {
        let refresher = refresher(Arc::new(FixtureSource::new(fixture())));

        let outcome = refresher.refresh_cycle().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Published { markets: 2, excluded: 0 });

        let snapshot = refresher.cache().load();
        let tickers: Vec<&str> = snapshot.markets.iter().map(|m| m.ticker_id.as_str()).collect();
        assert_eq!(tickers, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(snapshot.upstream_time_nanos, 1_700_000_000_000_000_000);

        let btc = &snapshot.markets[0];
        assert_eq!(btc.last_price, 65000.0);
        assert_eq!(btc.high, 66000.0);
        assert_eq!(btc.base_volume, 2.0);

        // m2 has no market data upstream: zeros, still listed
        assert_eq!(snapshot.markets[1].last_price, 0.0);

        let book = snapshot.order_book("BTCUSDT").unwrap();
        assert_eq!(book.bids, vec![[1.5, 64990.0]]);
        assert!(snapshot.order_book("ETHUSDT").unwrap().bids.is_empty());
    }

    /// `fixture()` plus an hourly perpetual settled in USDT.
    fn fixture_with_perpetual(network_time_nanos: i64) -> FixtureData {
        let mut data = fixture();
        data.network_time_nanos = network_time_nanos;
        data.markets.push(RawMarket {
            product: Some(Product::Perpetual {
                settlement_asset: "usdt".to_string(),
                quote_name: "USDT".to_string(),
                funding_schedule: Some(FundingSchedule { initial: 0, every: 3600 }),
            }),
            ..spot("p1", "BTC/USDT-PERP", "usdt")
        });
        data.market_data.insert(
            "p1".to_string(),
            RawMarketData {
                last_traded_price: "6500000".to_string(),
                perpetual: Some(PerpetualData {
                    external_twap: "6490000".to_string(),
                    funding_rate: "0.0001".to_string(),
                }),
                ..RawMarketData::default()
            },
        );
        data
    }

    #[tokio::test]
    async fn test_cycle_is_idempotent() {
        let source = FixtureSource::new(fixture_with_perpetual(3661 * 1_000_000_000));
        let refresher = refresher(Arc::new(source));

        refresher.refresh_cycle().await.unwrap();
        let first = refresher.cache().load();
        refresher.refresh_cycle().await.unwrap();
        let second = refresher.cache().load();

        assert_eq!(first.markets.len(), 3);
        assert_eq!(first.markets, second.markets);
        assert_eq!(first.order_books, second.order_books);
    }

    #[tokio::test]
    async fn test_next_funding_follows_network_time() {
        let source = Arc::new(FixtureSource::new(fixture_with_perpetual(3661 * 1_000_000_000)));
        let refresher = refresher(source.clone());

        refresher.refresh_cycle().await.unwrap();
        let perp = refresher.cache().load().markets[2].clone();
        assert_eq!(perp.ticker_id, "BTCUSDT-PERP");
        assert_eq!(perp.next_funding_rate_timestamp, 7_200_000);
        assert_eq!(perp.funding_rate, 0.0001);
        assert_eq!(perp.index_price, 6.49);

        // Past the 7200s trigger: the next one is an hour later
        source.update(|data| data.network_time_nanos = 7300 * 1_000_000_000);
        refresher.refresh_cycle().await.unwrap();
        let perp = refresher.cache().load().markets[2].clone();
        assert_eq!(perp.next_funding_rate_timestamp, 10_800_000);
        assert_eq!(perp.expiry_timestamp, 10_800_000);
        assert_eq!(refresher.cache().load().upstream_time_nanos, 7300 * 1_000_000_000);

        // Spot markets carry no funding time in either cycle
        assert_eq!(refresher.cache().load().markets[0].next_funding_rate_timestamp, 0);
    }

    #[tokio::test]
    async fn test_unresolvable_asset_excludes_market() {
        let mut source = MockMarketSource::new();
        source.expect_list_active_markets().returning(|| {
            Ok(vec![
                spot("m1", "BTC/USDT", "usdt"),
                spot("m2", "ETH/DAI", "dai"),
                spot("m3", "SOL/USDT", ""),
            ])
        });
        source.expect_network_time().returning(|| Ok(0));
        source
            .expect_market_data()
            .returning(|_| Ok(RawMarketData::default()));
        source.expect_asset().returning(|id| {
            if id == "usdt" {
                Ok(RawAsset {
                    id: id.to_string(),
                    decimals: 6,
                    ..RawAsset::default()
                })
            } else {
                Err(MarketDataError::DataNotAvailable(id.to_string()))
            }
        });
        source.expect_candles().returning(|_, _, _| Ok(vec![]));
        // Excluded markets never reach the depth fetch
        source
            .expect_market_depth()
            .times(1)
            .returning(|_| Ok(RawDepth::default()));

        let refresher = refresher(Arc::new(source));
        let outcome = refresher.refresh_cycle().await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Published { markets: 1, excluded: 2 });
        let snapshot = refresher.cache().load();
        assert_eq!(snapshot.markets[0].ticker_id, "BTCUSDT");
        assert!(snapshot.order_book("ETHDAI").is_none());
        assert!(snapshot.order_book("SOLUSDT").is_none());
    }

    #[tokio::test]
    async fn test_excluded_market_loses_previous_entry() {
        let source = Arc::new(FixtureSource::new(fixture()));
        let refresher = refresher(source.clone());
        refresher.refresh_cycle().await.unwrap();
        assert!(refresher.cache().order_book("ETHUSDT").is_some());

        source.update(|data| data.markets[1] = spot("m2", "ETH/USDT", "missing"));
        refresher.refresh_cycle().await.unwrap();

        let snapshot = refresher.cache().load();
        assert_eq!(snapshot.markets.len(), 1);
        assert!(snapshot.order_book("ETHUSDT").is_none());
    }

    #[tokio::test]
    async fn test_listing_failure_keeps_previous_snapshot() {
        let mut source = MockMarketSource::new();
        source
            .expect_list_active_markets()
            .returning(|| Err(MarketDataError::Connection("refused".to_string())));

        let cache = Arc::new(SnapshotCache::new());
        cache.publish(Snapshot {
            markets: vec![NormalizedMarket {
                ticker_id: "KEEP".to_string(),
                ..NormalizedMarket::default()
            }],
            ..Snapshot::default()
        });

        let refresher = Refresher::new(Arc::new(source), cache.clone(), RefreshSettings::default());
        assert_matches!(refresher.refresh_cycle().await, Err(MarketDataError::Connection(_)));
        assert_eq!(cache.markets()[0].ticker_id, "KEEP");
    }

    #[tokio::test]
    async fn test_network_time_failure_uses_zero() {
        let mut source = MockMarketSource::new();
        source.expect_list_active_markets().returning(|| Ok(vec![]));
        source
            .expect_network_time()
            .returning(|| Err(MarketDataError::Upstream { status: 503, body: String::new() }));

        let refresher = refresher(Arc::new(source));
        refresher.refresh_cycle().await.unwrap();
        assert_eq!(refresher.cache().load().upstream_time_nanos, 0);
        assert!(refresher.cache().is_populated());
    }

    /// Holds `list_active_markets` open until released.
    struct GatedSource {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl MarketSource for GatedSource {
        async fn list_active_markets(&self) -> Result<Vec<RawMarket>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![])
        }
        async fn market_data(&self, _: &str) -> Result<RawMarketData> {
            Ok(RawMarketData::default())
        }
        async fn asset(&self, id: &str) -> Result<RawAsset> {
            Err(MarketDataError::DataNotAvailable(id.to_string()))
        }
        async fn network_time(&self) -> Result<i64> {
            Ok(0)
        }
        async fn candles(&self, _: &str, _: i64, _: i64) -> Result<Vec<RawCandle>> {
            Ok(vec![])
        }
        async fn market_depth(&self, _: &str) -> Result<RawDepth> {
            Ok(RawDepth::default())
        }
    }

    #[tokio::test]
    async fn test_overlapping_cycle_is_skipped() {
        let source = Arc::new(GatedSource {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let refresher = Arc::new(refresher(source.clone()));

        let running = {
            let refresher = refresher.clone();
            tokio::spawn(async move { refresher.refresh_cycle().await })
        };
        source.entered.notified().await;

        assert_eq!(refresher.refresh_cycle().await.unwrap(), RefreshOutcome::Skipped);

        source.release.notify_one();
        assert_matches!(running.await.unwrap(), Ok(RefreshOutcome::Published { markets: 0, .. }));
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let source = Arc::new(GatedSource {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let settings = RefreshSettings {
            request_timeout: Duration::from_millis(20),
            ..RefreshSettings::default()
        };
        let refresher = Refresher::new(source, Arc::new(SnapshotCache::new()), settings);

        assert_matches!(
            refresher.refresh_cycle().await,
            Err(MarketDataError::Timeout { call: "list_markets", .. })
        );
        assert!(!refresher.cache().is_populated());
    }

    #[tokio::test]
    async fn test_concurrent_fetch_keeps_listing_order() {
        let mut data = fixture();
        data.markets = (0..8).map(|i| spot(&format!("m{i}"), &format!("T{i}/USDT"), "usdt")).collect();
        let settings = RefreshSettings {
            fetch_concurrency: 4,
            ..RefreshSettings::default()
        };
        let refresher = Refresher::new(
            Arc::new(FixtureSource::new(data)),
            Arc::new(SnapshotCache::new()),
            settings,
        );

        refresher.refresh_cycle().await.unwrap();
        let tickers: Vec<String> = refresher.cache().markets().into_iter().map(|m| m.ticker_id).collect();
        let expected: Vec<String> = (0..8).map(|i| format!("T{i}USDT")).collect();
        assert_eq!(tickers, expected);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let refresher = Arc::new(refresher(Arc::new(FixtureSource::new(fixture()))));
        let shutdown = CancellationToken::new();

        let handle = {
            let refresher = refresher.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { refresher.run(shutdown).await })
        };

        // run_on_startup publishes without waiting a full interval
        for _ in 0..100 {
            if refresher.cache().is_populated() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refresher.cache().is_populated());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_stalled_cycle() {
        let source = Arc::new(GatedSource {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let settings = RefreshSettings {
            request_timeout: Duration::from_secs(30),
            run_on_startup: true,
            ..RefreshSettings::default()
        };
        let refresher = Arc::new(Refresher::new(source.clone(), Arc::new(SnapshotCache::new()), settings));
        let shutdown = CancellationToken::new();

        let handle = {
            let refresher = refresher.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { refresher.run(shutdown).await })
        };

        // The listing never returns on its own
        source.entered.notified().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();

        let stopped = tokio::time::timeout(Duration::from_millis(500), handle).await;
        assert_matches!(stopped, Ok(Ok(())));
        assert!(!refresher.cache().is_populated());
    }
}

//! Published snapshot cache
//!
//! Holds the latest [`Snapshot`] behind one pointer. Readers clone the
//! `Arc` and never observe a half-built refresh; the refresher swaps the
//! pointer once per cycle.

use crate::types::{NormalizedMarket, OrderBookSnapshot, Snapshot};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Last-writer-wins holder of the current snapshot
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotCache {
    /// Empty cache: no markets, no order books.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot and return the one just published.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(snapshot);
        let previous = {
            let mut current = self.current.write();
            std::mem::replace(&mut *current, Arc::clone(&next))
        };
        debug!(
            markets = next.markets.len(),
            order_books = next.order_books.len(),
            replaced = previous.markets.len(),
            "Snapshot published"
        );
        // `previous` may be the last reference; drop it outside the lock.
        drop(previous);
        next
    }

    /// The current snapshot.
    pub fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn markets(&self) -> Vec<NormalizedMarket> {
        self.load().markets.clone()
    }

    pub fn order_book(&self, ticker_id: &str) -> Option<OrderBookSnapshot> {
        self.load().order_book(ticker_id).cloned()
    }

    /// Whether any refresh has published yet.
    pub fn is_populated(&self) -> bool {
        self.current.read().published_at.is_some()
    }
}

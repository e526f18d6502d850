//! Upstream market sources
//!
//! [`MarketSource`] is the seam between the refresh pipeline and the data
//! node. [`DataNodeClient`] talks to a live node over REST; [`FixtureSource`]
//! serves a static JSON document.

mod data_node;
mod fixture;
mod traits;
pub mod wire;

pub use data_node::DataNodeClient;
pub use fixture::{FixtureData, FixtureSource};
pub use traits::*;

use config::{UpstreamConfig, UpstreamKind};
use std::sync::Arc;
use tracing::info;

use crate::error::MarketDataError;
use crate::Result;

/// Create the source selected by `upstream.kind`.
pub fn create_source(config: &UpstreamConfig) -> Result<Arc<dyn MarketSource>> {
    match config.kind {
        UpstreamKind::DataNode => {
            info!(base_url = %config.base_url, "Using data node source");
            let client = DataNodeClient::new(&config.base_url, config.request_timeout())?;
            Ok(Arc::new(client))
        }
        UpstreamKind::Fixture => {
            let path = config
                .fixture_path
                .as_ref()
                .ok_or_else(|| MarketDataError::Fixture("upstream.fixture_path is not set".to_string()))?;
            info!(path = %path.display(), "Using fixture source");
            Ok(Arc::new(FixtureSource::from_file(path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_fixture_kind_requires_path() {
        let config = UpstreamConfig {
            kind: UpstreamKind::Fixture,
            fixture_path: None,
            ..UpstreamConfig::default()
        };
        // `Arc<dyn MarketSource>` has no `Debug`; match on the error alone
        assert_matches!(create_source(&config).err(), Some(MarketDataError::Fixture(_)));
    }

    #[test]
    fn test_data_node_kind() {
        assert!(create_source(&UpstreamConfig::default()).is_ok());
    }
}

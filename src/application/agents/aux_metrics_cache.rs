//! Short-lived read-through cache for funding-rate/open-interest/netflow
//! readings (spec §4.D), grounded in the teacher's `SpreadCache`: an
//! `RwLock<HashMap>` keyed by symbol, consulted before `DataSyncAgent`
//! calls out to the `MarketDataSource` so these three values refresh at
//! most once per `ttl` window instead of on every cycle's fetch.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::domain::market::snapshot::OpenInterest;

#[derive(Debug, Clone, Copy)]
pub struct AuxMetrics {
    pub funding_rate: Option<f64>,
    pub open_interest: Option<OpenInterest>,
    pub institutional_netflow_1h: Option<f64>,
}

struct Entry {
    metrics: AuxMetrics,
    fetched_at: Instant,
}

pub struct AuxMetricsCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl AuxMetricsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// The cached reading for `symbol`, or `None` if there is no entry or
    /// it was fetched more than `ttl` ago.
    pub fn get(&self, symbol: &str) -> Option<AuxMetrics> {
        let guard = self.entries.read().expect("aux metrics cache lock poisoned");
        guard
            .get(symbol)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.metrics)
    }

    pub fn store(&self, symbol: &str, metrics: AuxMetrics) {
        let mut guard = self.entries.write().expect("aux metrics cache lock poisoned");
        guard.insert(
            symbol.to_string(),
            Entry {
                metrics,
                fetched_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AuxMetrics {
        AuxMetrics {
            funding_rate: Some(0.0001),
            open_interest: None,
            institutional_netflow_1h: Some(1.0),
        }
    }

    #[test]
    fn fresh_entry_is_returned() {
        let cache = AuxMetricsCache::new(Duration::from_secs(60));
        cache.store("BTCUSDT", sample());
        assert!(cache.get("BTCUSDT").is_some());
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = AuxMetricsCache::new(Duration::from_millis(1));
        cache.store("BTCUSDT", sample());
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("BTCUSDT").is_none());
    }

    #[test]
    fn missing_symbol_is_none() {
        let cache = AuxMetricsCache::new(Duration::from_secs(60));
        assert!(cache.get("ETHUSDT").is_none());
    }
}

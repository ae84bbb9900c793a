use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::errors::FetchError;
use crate::domain::market::series::MIN_SERIES_LEN;
use crate::domain::market::snapshot::OpenInterest;
use crate::domain::market::{MarketSnapshot, Timeframe, TimeframeView};
use crate::domain::ports::MarketDataSource;

use super::aux_metrics_cache::{AuxMetrics, AuxMetricsCache};
use super::indicator_processor::IndicatorProcessor;
use super::kline_validator::KlineValidator;

/// Concurrently fetches all timeframes plus auxiliary metrics, splits each
/// series into `stable_view`/`live_view`, and checks cross-timeframe
/// alignment (spec §4.D). This is the only place the pipeline touches I/O
/// before the decision stage.
pub struct DataSyncAgent {
    source: Arc<dyn MarketDataSource>,
    kline_limit: usize,
    aux_cache: AuxMetricsCache,
}

impl DataSyncAgent {
    pub fn new(source: Arc<dyn MarketDataSource>, aux_cache_ttl: Duration) -> Self {
        Self {
            source,
            kline_limit: MIN_SERIES_LEN + 1,
            aux_cache: AuxMetricsCache::new(aux_cache_ttl),
        }
    }

    pub async fn fetch(&self, symbol: &str) -> Result<MarketSnapshot, FetchError> {
        let aux_fetch = async {
            match self.aux_cache.get(symbol) {
                Some(cached) => cached,
                None => {
                    let (funding, oi, netflow) = tokio::join!(
                        self.source.get_funding_rate(symbol),
                        self.source.get_open_interest(symbol),
                        self.source.get_institutional_netflow(symbol, 60),
                    );
                    let metrics = AuxMetrics {
                        funding_rate: funding.ok(),
                        open_interest: oi.ok().map(|(current, value_24h_ago)| OpenInterest {
                            current,
                            value_24h_ago,
                        }),
                        institutional_netflow_1h: netflow.ok(),
                    };
                    self.aux_cache.store(symbol, metrics);
                    metrics
                }
            }
        };

        let (k5, k15, k1h, aux) = tokio::join!(
            self.source.get_klines(symbol, Timeframe::FiveMin, self.kline_limit),
            self.source.get_klines(symbol, Timeframe::FifteenMin, self.kline_limit),
            self.source.get_klines(symbol, Timeframe::OneHour, self.kline_limit),
            aux_fetch,
        );

        let mut views = BTreeMap::new();
        for (tf, raw) in [
            (Timeframe::FiveMin, k5),
            (Timeframe::FifteenMin, k15),
            (Timeframe::OneHour, k1h),
        ] {
            let raw = raw?;
            let cleaned = KlineValidator::clean(symbol, tf.as_str(), raw);
            if cleaned.len() < MIN_SERIES_LEN + 1 {
                return Err(FetchError::MissingSeries {
                    symbol: symbol.to_string(),
                    timeframe: tf.as_str().to_string(),
                    reason: format!("only {} usable candles after validation", cleaned.len()),
                });
            }

            let mut candles = cleaned;
            let live_candle = candles.pop().expect("len checked above");
            let stable_view =
                IndicatorProcessor::process(symbol, tf.as_str(), candles).map_err(|e| {
                    FetchError::MissingSeries {
                        symbol: symbol.to_string(),
                        timeframe: tf.as_str().to_string(),
                        reason: e.to_string(),
                    }
                })?;

            let period_start = stable_view
                .candles
                .last()
                .map(|c| c.close_time)
                .unwrap_or(live_candle.open_time);
            let expected_open = period_start;
            let live_view_stale = live_candle.open_time < expected_open - chrono::Duration::seconds(tf.to_seconds());
            if live_view_stale {
                warn!(symbol, tf = tf.as_str(), "live candle is stale");
            }

            views.insert(
                tf,
                TimeframeView {
                    stable_view,
                    live_view: live_candle,
                    live_view_stale,
                },
            );
        }

        let funding_rate = aux.funding_rate;
        let open_interest = aux.open_interest;
        let institutional_netflow_1h = aux.institutional_netflow_1h;

        let now = Utc::now();
        let alignment_ok = Self::check_alignment(&views, now);
        if !alignment_ok {
            warn!(symbol, "snapshot failed alignment check");
        }

        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            views,
            funding_rate,
            open_interest,
            institutional_netflow_1h,
            timestamp: now,
            alignment_ok,
            snapshot_id: Uuid::new_v4(),
        })
    }

    /// spec §4.D alignment rule: `T_s = stable_view[5m].close_time`;
    /// require `T_s ≥ now − 10min`, `stable_view[15m].close_time ≥ T_s − 15min`,
    /// `stable_view[1h].close_time ≥ T_s − 60min`.
    fn check_alignment(
        views: &BTreeMap<Timeframe, TimeframeView>,
        now: chrono::DateTime<Utc>,
    ) -> bool {
        let Some(t_s) = views
            .get(&Timeframe::FiveMin)
            .and_then(|v| v.stable_view.candles.last())
            .map(|c| c.close_time)
        else {
            return false;
        };
        if t_s < now - chrono::Duration::minutes(10) {
            return false;
        }
        let Some(t_15) = views
            .get(&Timeframe::FifteenMin)
            .and_then(|v| v.stable_view.candles.last())
            .map(|c| c.close_time)
        else {
            return false;
        };
        if t_15 < t_s - chrono::Duration::minutes(15) {
            return false;
        }
        let Some(t_1h) = views
            .get(&Timeframe::OneHour)
            .and_then(|v| v.stable_view.candles.last())
            .map(|c| c.close_time)
        else {
            return false;
        };
        if t_1h < t_s - chrono::Duration::minutes(60) {
            return false;
        }
        true
    }
}

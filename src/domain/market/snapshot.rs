use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::candle::Candle;
use super::series::IndicatorFrame;
use super::timeframe::Timeframe;

/// A single timeframe's contribution to a `MarketSnapshot`: everything
/// closed (`stable_view`) plus the one candle still forming (`live_view`)
/// at snapshot time (spec §3/§4.D's split rule).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeframeView {
    pub stable_view: IndicatorFrame,
    pub live_view: Candle,
    /// Set when `live_view` is stale (older than one period) rather than a
    /// genuinely in-progress candle — spec §4.D's split-rule warning.
    pub live_view_stale: bool,
}

/// Current + 24h-ago open interest reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OpenInterest {
    pub current: f64,
    pub value_24h_ago: f64,
}

/// The pipeline's atomic unit of state (spec §3): a point-in-time,
/// cross-timeframe, replay-safe frozen view. Immutable once built by
/// `DataSyncAgent` — every downstream component only reads from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub views: BTreeMap<Timeframe, TimeframeView>,
    pub funding_rate: Option<f64>,
    pub open_interest: Option<OpenInterest>,
    pub institutional_netflow_1h: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub alignment_ok: bool,
    pub snapshot_id: Uuid,
}

impl MarketSnapshot {
    pub fn view(&self, tf: Timeframe) -> Option<&TimeframeView> {
        self.views.get(&tf)
    }
}

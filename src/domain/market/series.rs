use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candle::Candle;

/// Minimum series length required for indicator stability (spec §3).
pub const MIN_SERIES_LEN: usize = 200;

/// Leading rows excluded from decisions while indicators stabilize (spec §3).
pub const WARMUP_ROWS: usize = 105;

/// One row of a fully-indicated series: the source candle plus every
/// indicator value computed up to and including it. `None` within the
/// warmup prefix, `Some` afterward — the Rust encoding of spec §3's
/// "NaN in the warmup prefix, non-NaN afterward" contract, chosen over a
/// bare `f64::NAN` so downstream code cannot accidentally consume a warmup
/// value without the compiler flagging the unwrap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct IndicatorRow {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub rsi_14: Option<f64>,
    pub atr_14: Option<f64>,
    pub bollinger_mid: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub obv: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub vwap: Option<f64>,
}

/// A validated candle series extended with per-row indicator values.
/// Produced only by `IndicatorProcessor::process` (application layer);
/// this type is a pure data holder with no computation of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndicatorFrame {
    pub candles: Vec<Candle>,
    pub rows: Vec<IndicatorRow>,
    /// Identifies the indicator-computation schema version. Bumped whenever
    /// the formula set changes, invalidating cached frames from older
    /// versions (spec §4.C).
    pub processor_version: u32,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Rows past the warmup prefix, paired with their source candle.
    pub fn stable_rows(&self) -> impl Iterator<Item = (&Candle, &IndicatorRow)> {
        self.candles
            .iter()
            .zip(self.rows.iter())
            .skip(WARMUP_ROWS)
    }

    pub fn last_row(&self) -> Option<(&Candle, &IndicatorRow)> {
        self.candles.last().zip(self.rows.last())
    }
}

/// Coarse RSI bucket used in `FeatureSnapshot`, independent of
/// `OscillatorSubAgent`'s own ±score thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RsiBucket {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiBucket {
    pub fn from_rsi(rsi: f64) -> Self {
        if rsi <= 30.0 {
            RsiBucket::Oversold
        } else if rsi >= 70.0 {
            RsiBucket::Overbought
        } else {
            RsiBucket::Neutral
        }
    }
}

/// One-row summary extracted from an `IndicatorFrame`'s last stable row,
/// consumed only by `PredictAgent` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSnapshot {
    pub as_of: DateTime<Utc>,
    /// Percentage price change over {1,3,5,10,20} prior candles, in that order.
    pub price_change_pct: [f64; 5],
    pub ema_cross_bullish: bool,
    pub ema_cross_bearish: bool,
    pub macd_cross_bullish: bool,
    pub macd_cross_bearish: bool,
    pub rsi_bucket: RsiBucket,
    pub atr_over_price: f64,
    pub volume_ratio_zscore: f64,
    pub distance_to_recent_high_pct: f64,
    pub distance_to_recent_low_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_bucket_boundaries() {
        assert_eq!(RsiBucket::from_rsi(29.0), RsiBucket::Oversold);
        assert_eq!(RsiBucket::from_rsi(30.0), RsiBucket::Oversold);
        assert_eq!(RsiBucket::from_rsi(50.0), RsiBucket::Neutral);
        assert_eq!(RsiBucket::from_rsi(70.0), RsiBucket::Overbought);
        assert_eq!(RsiBucket::from_rsi(71.0), RsiBucket::Overbought);
    }
}

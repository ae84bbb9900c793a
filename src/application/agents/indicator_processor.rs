use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::{Data, Distribution};
use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
    OnBalanceVolume, RelativeStrengthIndex, SimpleMovingAverage,
};
use ta::{DataItem, Next};

use crate::domain::errors::InsufficientData;
use crate::domain::market::series::{IndicatorFrame, IndicatorRow, MIN_SERIES_LEN, WARMUP_ROWS};
use crate::domain::market::Candle;

/// Current processor schema version, embedded in every persisted frame
/// (spec §4.C). Bump whenever the formula set below changes.
pub const PROCESSOR_VERSION: u32 = 1;

/// Computes the full indicator set over a raw candle series (spec §3/§4.C).
/// A pure function of its input; rejects series shorter than
/// [`MIN_SERIES_LEN`].
pub struct IndicatorProcessor;

impl IndicatorProcessor {
    pub fn process(symbol: &str, tf_label: &str, raw: Vec<Candle>) -> Result<IndicatorFrame, InsufficientData> {
        if raw.len() < MIN_SERIES_LEN {
            return Err(InsufficientData {
                symbol: symbol.to_string(),
                timeframe: tf_label.to_string(),
                have: raw.len(),
                need: MIN_SERIES_LEN,
            });
        }

        let mut sma_20 = SimpleMovingAverage::new(20).expect("period > 0");
        let mut sma_50 = SimpleMovingAverage::new(50).expect("period > 0");
        let mut ema_12 = ExponentialMovingAverage::new(12).expect("period > 0");
        let mut ema_26 = ExponentialMovingAverage::new(26).expect("period > 0");
        let mut macd = MovingAverageConvergenceDivergence::new(12, 26, 9).expect("valid periods");
        let mut rsi = RelativeStrengthIndex::new(14).expect("period > 0");
        let mut atr = AverageTrueRange::new(14).expect("period > 0");
        let mut bb = BollingerBands::new(20, 2.0).expect("valid params");
        let mut obv = OnBalanceVolume::new();

        let mut volumes: Vec<f64> = Vec::with_capacity(raw.len());
        let mut rows = Vec::with_capacity(raw.len());
        let mut cum_pv = 0.0_f64;
        let mut cum_vol = 0.0_f64;

        for (i, candle) in raw.iter().enumerate() {
            let open = candle.open.to_f64().unwrap_or(0.0);
            let high = candle.high.to_f64().unwrap_or(0.0);
            let low = candle.low.to_f64().unwrap_or(0.0);
            let close = candle.close.to_f64().unwrap_or(0.0);
            let volume = candle.volume.to_f64().unwrap_or(0.0);
            volumes.push(volume);

            let sma20_v = sma_20.next(close);
            let sma50_v = sma_50.next(close);
            let ema12_v = ema_12.next(close);
            let ema26_v = ema_26.next(close);
            let macd_out = macd.next(close);
            let rsi_v = rsi.next(close);
            let bb_out = bb.next(close);

            let item = DataItem::builder()
                .open(open)
                .high(high)
                .low(low)
                .close(close)
                .volume(volume)
                .build()
                .unwrap_or_else(|_| {
                    DataItem::builder()
                        .open(close)
                        .high(close)
                        .low(close)
                        .close(close)
                        .volume(volume.max(0.0))
                        .build()
                        .expect("degenerate item always valid")
                });
            let atr_v = atr.next(&item);
            let obv_v = obv.next(&item);

            let typical_price = (high + low + close) / 3.0;
            cum_pv += typical_price * volume;
            cum_vol += volume;
            let vwap_v = if cum_vol > 0.0 {
                cum_pv / cum_vol
            } else {
                close
            };

            let volume_ratio = if i >= 19 {
                let window = &volumes[i + 1 - 20..=i];
                let avg: f64 = window.iter().sum::<f64>() / window.len() as f64;
                if avg > 0.0 {
                    volume / avg
                } else {
                    1.0
                }
            } else {
                1.0
            };

            let warmup = i < WARMUP_ROWS;
            rows.push(IndicatorRow {
                sma_20: (!warmup).then_some(sma20_v),
                sma_50: (!warmup).then_some(sma50_v),
                ema_12: (!warmup).then_some(ema12_v),
                ema_26: (!warmup).then_some(ema26_v),
                macd: (!warmup).then_some(macd_out.macd),
                macd_signal: (!warmup).then_some(macd_out.signal),
                macd_histogram: (!warmup).then_some(macd_out.histogram),
                rsi_14: (!warmup).then_some(rsi_v),
                atr_14: (!warmup).then_some(atr_v),
                bollinger_mid: (!warmup).then_some(bb_out.average),
                bollinger_upper: (!warmup).then_some(bb_out.upper),
                bollinger_lower: (!warmup).then_some(bb_out.lower),
                obv: (!warmup).then_some(obv_v),
                volume_ratio: (!warmup).then_some(volume_ratio),
                vwap: (!warmup).then_some(vwap_v),
            });
        }

        Ok(IndicatorFrame {
            candles: raw,
            rows,
            processor_version: PROCESSOR_VERSION,
        })
    }
}

/// Z-score of the most recent volume ratio against the preceding window,
/// used by `FeatureSnapshot::volume_ratio_zscore` (spec §3).
pub fn volume_ratio_zscore(volume_ratios: &[f64]) -> f64 {
    if volume_ratios.len() < 2 {
        return 0.0;
    }
    let last = *volume_ratios.last().expect("len >= 2");
    let data = Data::new(volume_ratios.to_vec());
    let (Some(mean), Some(std_dev)) = (data.mean(), data.std_dev()) else {
        return 0.0;
    };
    if std_dev == 0.0 {
        0.0
    } else {
        (last - mean) / std_dev
    }
}

/// Extracts the one-row `FeatureSnapshot` the predictor consumes from the
/// last stable row of an `IndicatorFrame` (spec §3). Returns `None` if the
/// frame has no stable (post-warmup) rows yet.
pub fn build_feature_snapshot(frame: &IndicatorFrame) -> Option<crate::domain::market::series::FeatureSnapshot> {
    use crate::domain::market::series::{FeatureSnapshot, RsiBucket};

    let n = frame.candles.len();
    if n <= WARMUP_ROWS {
        return None;
    }
    let last = frame.rows.last()?;
    let last_close = frame.candles.last()?.close.to_f64().unwrap_or(0.0);

    let mut price_change_pct = [0.0; 5];
    for (idx, &lookback) in [1usize, 3, 5, 10, 20].iter().enumerate() {
        if n > lookback {
            let prior = frame.candles[n - 1 - lookback].close.to_f64().unwrap_or(0.0);
            price_change_pct[idx] = if prior != 0.0 {
                (last_close - prior) / prior * 100.0
            } else {
                0.0
            };
        }
    }

    let prev = frame.rows.get(n.saturating_sub(2));
    let ema_cross_bullish = matches!((prev, last.ema_12, last.ema_26), (Some(p), Some(e12), Some(e26))
        if matches!((p.ema_12, p.ema_26), (Some(pe12), Some(pe26)) if pe12 <= pe26 && e12 > e26));
    let ema_cross_bearish = matches!((prev, last.ema_12, last.ema_26), (Some(p), Some(e12), Some(e26))
        if matches!((p.ema_12, p.ema_26), (Some(pe12), Some(pe26)) if pe12 >= pe26 && e12 < e26));
    let macd_cross_bullish = matches!((prev, last.macd, last.macd_signal), (Some(p), Some(m), Some(s))
        if matches!((p.macd, p.macd_signal), (Some(pm), Some(ps)) if pm <= ps && m > s));
    let macd_cross_bearish = matches!((prev, last.macd, last.macd_signal), (Some(p), Some(m), Some(s))
        if matches!((p.macd, p.macd_signal), (Some(pm), Some(ps)) if pm >= ps && m < s));

    let rsi_bucket = last.rsi_14.map(RsiBucket::from_rsi).unwrap_or(RsiBucket::Neutral);
    let atr_over_price = match last.atr_14 {
        Some(atr) if last_close != 0.0 => atr / last_close,
        _ => 0.0,
    };

    let volume_ratios: Vec<f64> = frame.rows.iter().filter_map(|r| r.volume_ratio).collect();
    let volume_ratio_zscore = volume_ratio_zscore(&volume_ratios);

    let recent_window = &frame.candles[n.saturating_sub(20)..];
    let recent_high = recent_window
        .iter()
        .map(|c| c.high.to_f64().unwrap_or(0.0))
        .fold(f64::MIN, f64::max);
    let recent_low = recent_window
        .iter()
        .map(|c| c.low.to_f64().unwrap_or(0.0))
        .fold(f64::MAX, f64::min);
    let distance_to_recent_high_pct = if recent_high != 0.0 {
        (recent_high - last_close) / recent_high * 100.0
    } else {
        0.0
    };
    let distance_to_recent_low_pct = if recent_low != 0.0 {
        (last_close - recent_low) / recent_low * 100.0
    } else {
        0.0
    };

    Some(FeatureSnapshot {
        as_of: chrono::Utc::now(),
        price_change_pct,
        ema_cross_bullish,
        ema_cross_bearish,
        macd_cross_bullish,
        macd_cross_bearish,
        rsi_bucket,
        atr_over_price,
        volume_ratio_zscore,
        distance_to_recent_high_pct,
        distance_to_recent_low_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn synthetic_series(len: usize) -> Vec<Candle> {
        let t0 = Utc::now();
        (0..len)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.1).sin() * 5.0 + i as f64 * 0.01;
                let open_time = t0 + Duration::minutes(5 * i as i64);
                Candle {
                    open_time,
                    open: Decimal::try_from(close).unwrap(),
                    high: Decimal::try_from(close + 1.0).unwrap(),
                    low: Decimal::try_from(close - 1.0).unwrap(),
                    close: Decimal::try_from(close).unwrap(),
                    volume: dec!(1000),
                    close_time: open_time + Duration::minutes(5),
                }
            })
            .collect()
    }

    #[test]
    fn rejects_short_series() {
        let raw = synthetic_series(50);
        let err = IndicatorProcessor::process("BTCUSDT", "5m", raw).unwrap_err();
        assert_eq!(err.have, 50);
        assert_eq!(err.need, MIN_SERIES_LEN);
    }

    #[test]
    fn warmup_rows_are_none_afterward_some() {
        let raw = synthetic_series(250);
        let frame = IndicatorProcessor::process("BTCUSDT", "5m", raw).unwrap();
        assert_eq!(frame.len(), 250);
        for row in &frame.rows[..WARMUP_ROWS] {
            assert!(row.rsi_14.is_none());
        }
        for row in &frame.rows[WARMUP_ROWS..] {
            assert!(row.rsi_14.is_some());
        }
    }
}

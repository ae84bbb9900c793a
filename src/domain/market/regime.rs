use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use ta::indicators::ExponentialMovingAverage;
use ta::Next;

use super::candle::Candle;

/// Coarse market label gating `DecisionCoreAgent` (spec §4.J).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Trending,
    Choppy,
    Volatile,
    Unknown,
}

#[derive(Debug, Clone, Copy)]
pub struct RegimeThresholds {
    /// ADX(14) at or above this is "trending". Frozen at 25 per Open
    /// Question (b) — see DESIGN.md.
    pub adx_trending: f64,
    pub adx_choppy_ceiling: f64,
    pub choppy_ema_distance_pct: f64,
    pub volatile_atr_pct: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            adx_trending: 25.0,
            adx_choppy_ceiling: 20.0,
            choppy_ema_distance_pct: 0.3,
            volatile_atr_pct: 1.5,
        }
    }
}

/// Labels a symbol's 1h regime from raw 1h candles, computing ADX/EMA/ATR
/// itself rather than reusing `IndicatorFrame` — the teacher's
/// `MarketRegimeDetector` does the same, hand-rolling its inputs from a
/// candle slice rather than depending on the shared indicator pipeline.
pub struct RegimeDetector {
    thresholds: RegimeThresholds,
}

impl RegimeDetector {
    pub fn new(thresholds: RegimeThresholds) -> Self {
        Self { thresholds }
    }

    /// Labels the regime from the last `stable_view` candles of the 1h
    /// timeframe. Requires at least 51 candles (EMA(50) warmup); returns
    /// `Unknown` otherwise, matching the teacher's "too short ⇒ unknown"
    /// fallback.
    pub fn detect(&self, candles: &[Candle]) -> Regime {
        if candles.len() < 51 {
            return Regime::Unknown;
        }

        let closes: Vec<f64> = candles
            .iter()
            .map(|c| c.close.to_f64().unwrap_or(0.0))
            .collect();

        let ema_12 = ema_series(&closes, 12);
        let ema_26 = ema_series(&closes, 26);
        let ema_50 = ema_series(&closes, 50);
        let adx = wilder_adx(candles, 14);
        let atr = wilder_atr(candles, 14);

        let last_close = closes[closes.len() - 1];
        let last_ema20 = ema_series(&closes, 20)[closes.len() - 1];
        let last_atr_pct = if last_close != 0.0 {
            atr[atr.len() - 1] / last_close * 100.0
        } else {
            0.0
        };
        let last_adx = adx[adx.len() - 1];

        let monotonic_ordered = {
            let e12 = ema_12[ema_12.len() - 1];
            let e26 = ema_26[ema_26.len() - 1];
            let e50 = ema_50[ema_50.len() - 1];
            (e12 > e26 && e26 > e50) || (e12 < e26 && e26 < e50)
        };

        if last_adx >= self.thresholds.adx_trending && monotonic_ordered {
            Regime::Trending
        } else if last_adx < self.thresholds.adx_choppy_ceiling
            && last_close != 0.0
            && (last_close - last_ema20).abs() / last_close * 100.0
                < self.thresholds.choppy_ema_distance_pct
        {
            Regime::Choppy
        } else if last_atr_pct > self.thresholds.volatile_atr_pct {
            Regime::Volatile
        } else {
            Regime::Unknown
        }
    }
}

fn ema_series(closes: &[f64], period: usize) -> Vec<f64> {
    let mut ema = ExponentialMovingAverage::new(period).expect("period > 0");
    closes.iter().map(|&c| ema.next(c)).collect()
}

/// True range per Wilder, one value per candle (first value is just high-low).
fn true_range(candles: &[Candle]) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    for (i, c) in candles.iter().enumerate() {
        let high = c.high.to_f64().unwrap_or(0.0);
        let low = c.low.to_f64().unwrap_or(0.0);
        let tr = if i == 0 {
            high - low
        } else {
            let prev_close = candles[i - 1].close.to_f64().unwrap_or(0.0);
            (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs())
        };
        out.push(tr);
    }
    out
}

/// Wilder-smoothed ATR(period), one value per candle (seeded by a simple
/// average of the first `period` true ranges, then Wilder-smoothed).
fn wilder_atr(candles: &[Candle], period: usize) -> Vec<f64> {
    let tr = true_range(candles);
    wilder_smooth(&tr, period)
}

fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    if values.len() < period {
        return out;
    }
    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;
    for i in period..values.len() {
        out[i] = (out[i - 1] * (period as f64 - 1.0) + values[i]) / period as f64;
    }
    out
}

/// Hand-rolled Wilder ADX(period) — not provided by the `ta` crate.
/// Standard formula: +DM/-DM per bar, Wilder-smoothed, DX = 100·|+DI−−DI|/(+DI+−DI),
/// ADX = Wilder-smoothed DX.
fn wilder_adx(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up_move = candles[i].high.to_f64().unwrap_or(0.0) - candles[i - 1].high.to_f64().unwrap_or(0.0);
        let down_move = candles[i - 1].low.to_f64().unwrap_or(0.0) - candles[i].low.to_f64().unwrap_or(0.0);
        if up_move > down_move && up_move > 0.0 {
            plus_dm[i] = up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm[i] = down_move;
        }
    }
    let tr = true_range(candles);
    let smoothed_tr = wilder_smooth(&tr, period);
    let smoothed_plus_dm = wilder_smooth(&plus_dm, period);
    let smoothed_minus_dm = wilder_smooth(&minus_dm, period);

    let mut dx = vec![0.0; n];
    for i in 0..n {
        if smoothed_tr[i] == 0.0 {
            continue;
        }
        let plus_di = 100.0 * smoothed_plus_dm[i] / smoothed_tr[i];
        let minus_di = 100.0 * smoothed_minus_dm[i] / smoothed_tr[i];
        let sum = plus_di + minus_di;
        if sum > 0.0 {
            dx[i] = 100.0 * (plus_di - minus_di).abs() / sum;
        }
    }
    wilder_smooth(&dx, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let t0 = Utc::now();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let open_time = t0 + Duration::hours(i as i64);
                Candle {
                    open_time,
                    open: Decimal::try_from(c).unwrap(),
                    high: Decimal::try_from(c + 0.5).unwrap(),
                    low: Decimal::try_from(c - 0.5).unwrap(),
                    close: Decimal::try_from(c).unwrap(),
                    volume: Decimal::from(100),
                    close_time: open_time + Duration::hours(1),
                }
            })
            .collect()
    }

    #[test]
    fn too_short_series_is_unknown() {
        let candles = candles_from_closes(&[100.0; 10]);
        let detector = RegimeDetector::new(RegimeThresholds::default());
        assert_eq!(detector.detect(&candles), Regime::Unknown);
    }

    #[test]
    fn strong_uptrend_is_trending() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64 * 3.0).collect();
        let candles = candles_from_closes(&closes);
        let detector = RegimeDetector::new(RegimeThresholds::default());
        assert_eq!(detector.detect(&candles), Regime::Trending);
    }

    #[test]
    fn flat_series_is_choppy() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i % 2) as f64 * 0.01).collect();
        let candles = candles_from_closes(&closes);
        let detector = RegimeDetector::new(RegimeThresholds::default());
        assert_eq!(detector.detect(&candles), Regime::Choppy);
    }
}

use rust_decimal::Decimal;

use crate::domain::market::{Candle, TimeframeView};

/// Scores trend per timeframe (spec §4.E). Each timeframe is driven by the
/// one crossover/expansion/breakout rule the spec keys to it, plus a
/// uniform live-correction term — see DESIGN.md for why the three rules
/// aren't all applied to every timeframe.
pub struct TrendSubAgent;

impl TrendSubAgent {
    /// 1h: ±40 on an EMA(12)/EMA(26) crossover within the last 3 closed
    /// candles, signed by the crossover's direction.
    pub fn score_1h(view: &TimeframeView) -> f64 {
        clip(ema_cross_score(view) + live_correction(view))
    }

    /// 15m: ±30 when the MACD histogram is strictly expanding over the
    /// last 3 bars, signed by the histogram's sign.
    pub fn score_15m(view: &TimeframeView) -> f64 {
        clip(macd_expansion_score(view) + live_correction(view))
    }

    /// 5m: ±30 when the close breaks the prior 20-bar high/low.
    pub fn score_5m(view: &TimeframeView) -> f64 {
        clip(breakout_score(&view.stable_view.candles) + live_correction(view))
    }
}

fn clip(score: f64) -> f64 {
    score.clamp(-100.0, 100.0)
}

fn ema_cross_score(view: &TimeframeView) -> f64 {
    let diffs: Vec<f64> = view
        .stable_view
        .rows
        .iter()
        .rev()
        .take(4)
        .filter_map(|r| match (r.ema_12, r.ema_26) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        })
        .collect();
    if diffs.len() < 2 {
        return 0.0;
    }
    for w in diffs.windows(2) {
        let (newer, older) = (w[0], w[1]);
        let crossed = (older <= 0.0 && newer > 0.0) || (older >= 0.0 && newer < 0.0);
        if crossed && newer != 0.0 {
            return 40.0 * newer.signum();
        }
    }
    0.0
}

fn macd_expansion_score(view: &TimeframeView) -> f64 {
    let hist: Vec<f64> = view
        .stable_view
        .rows
        .iter()
        .rev()
        .take(3)
        .filter_map(|r| r.macd_histogram)
        .collect();
    if hist.len() < 3 {
        return 0.0;
    }
    // `hist` is newest-first; reverse to chronological order for the
    // "strictly expanding" check.
    let chrono: Vec<f64> = hist.into_iter().rev().collect();
    let mags: Vec<f64> = chrono.iter().map(|h| h.abs()).collect();
    let expanding = mags[0] < mags[1] && mags[1] < mags[2];
    if expanding && chrono[2] != 0.0 {
        30.0 * chrono[2].signum()
    } else {
        0.0
    }
}

fn breakout_score(candles: &[Candle]) -> f64 {
    if candles.len() < 21 {
        return 0.0;
    }
    let last_close = candles[candles.len() - 1].close;
    let window = &candles[candles.len() - 21..candles.len() - 1];
    let prior_high = window.iter().map(|c| c.high).fold(Decimal::MIN, Decimal::max);
    let prior_low = window.iter().map(|c| c.low).fold(Decimal::MAX, Decimal::min);
    if last_close > prior_high {
        30.0
    } else if last_close < prior_low {
        -30.0
    } else {
        0.0
    }
}

fn live_correction(view: &TimeframeView) -> f64 {
    let Some(stable_last) = view.stable_view.candles.last() else {
        return 0.0;
    };
    let live_close = view.live_view.close;
    if live_close > stable_last.close {
        20.0
    } else if live_close < stable_last.close {
        -20.0
    } else {
        0.0
    }
}

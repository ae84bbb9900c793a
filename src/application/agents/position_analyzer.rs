use rust_decimal::prelude::ToPrimitive;

use crate::domain::market::Candle;
use crate::domain::trading::PositionLocation;

pub const LOOKBACK_CANDLES: usize = 96;

/// Output of `PositionAnalyzer` (spec §4.K).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionAnalysis {
    pub pct: f64,
    pub location: PositionLocation,
    pub allow_long: bool,
    pub allow_short: bool,
}

pub struct PositionAnalyzer;

impl PositionAnalyzer {
    /// `pct = (close − min)/(max − min)·100` over the last
    /// [`LOOKBACK_CANDLES`] 1h candles.
    pub fn analyze(candles_1h: &[Candle]) -> PositionAnalysis {
        let window = &candles_1h[candles_1h.len().saturating_sub(LOOKBACK_CANDLES)..];
        let closes: Vec<f64> = window.iter().map(|c| c.close.to_f64().unwrap_or(0.0)).collect();
        let highs: Vec<f64> = window.iter().map(|c| c.high.to_f64().unwrap_or(0.0)).collect();
        let lows: Vec<f64> = window.iter().map(|c| c.low.to_f64().unwrap_or(0.0)).collect();

        let max = highs.iter().cloned().fold(f64::MIN, f64::max);
        let min = lows.iter().cloned().fold(f64::MAX, f64::min);
        let last_close = closes.last().copied().unwrap_or(0.0);

        let pct = if max > min {
            (last_close - min) / (max - min) * 100.0
        } else {
            50.0
        };

        let location = if pct < 30.0 {
            PositionLocation::Bottom
        } else if pct > 70.0 {
            PositionLocation::Top
        } else {
            PositionLocation::Middle
        };

        PositionAnalysis {
            pct,
            location,
            allow_long: pct < 70.0,
            allow_short: pct > 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn candle(close: f64) -> Candle {
        let t0 = Utc::now();
        Candle {
            open_time: t0,
            open: Decimal::try_from(close).unwrap(),
            high: Decimal::try_from(close + 1.0).unwrap(),
            low: Decimal::try_from(close - 1.0).unwrap(),
            close: Decimal::try_from(close).unwrap(),
            volume: dec!(10),
            close_time: t0 + Duration::hours(1),
        }
    }

    #[test]
    fn price_at_range_bottom_blocks_short() {
        let mut candles: Vec<Candle> = (0..96).map(|_| candle(100.0)).collect();
        candles[50] = candle(120.0);
        candles[95] = candle(100.0);
        let analysis = PositionAnalyzer::analyze(&candles);
        assert!(analysis.pct < 30.0);
        assert_eq!(analysis.location, PositionLocation::Bottom);
        assert!(analysis.allow_long);
        assert!(!analysis.allow_short);
    }

    #[test]
    fn flat_range_defaults_to_middle() {
        let candles: Vec<Candle> = (0..96).map(|_| candle(100.0)).collect();
        let analysis = PositionAnalyzer::analyze(&candles);
        assert_eq!(analysis.location, PositionLocation::Middle);
    }
}

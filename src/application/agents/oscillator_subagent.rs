use crate::domain::market::TimeframeView;

/// Scores mean-reversion pressure per timeframe from RSI(14) (spec §4.F).
/// The cross-timeframe 30/30/40 blend lives in
/// `QuantAnalysis::composite` (see DESIGN.md) since it is `QuantAnalystAgent`'s
/// combination step, not a per-timeframe score.
pub struct OscillatorSubAgent;

impl OscillatorSubAgent {
    /// `rsi ≥ 75 → −80`, `rsi ≤ 25 → +80`, between 70/30 → linear interpolation
    /// to ±40, else 0. Returns `None` if the last stable row has no RSI yet
    /// (still in warmup).
    pub fn score(view: &TimeframeView) -> Option<f64> {
        let rsi = view.stable_view.last_row()?.1.rsi_14?;
        Some(score_from_rsi(rsi))
    }
}

fn score_from_rsi(rsi: f64) -> f64 {
    if rsi >= 75.0 {
        -80.0
    } else if rsi <= 25.0 {
        80.0
    } else if rsi >= 70.0 {
        // linear between 70 (−40) and 75 (−80)
        let t = (rsi - 70.0) / 5.0;
        -40.0 - 40.0 * t
    } else if rsi <= 30.0 {
        // linear between 30 (+40) and 25 (+80)
        let t = (30.0 - rsi) / 5.0;
        40.0 + 40.0 * t
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_hit_caps() {
        assert_eq!(score_from_rsi(80.0), -80.0);
        assert_eq!(score_from_rsi(10.0), 80.0);
    }

    #[test]
    fn neutral_band_is_zero() {
        assert_eq!(score_from_rsi(50.0), 0.0);
    }

    #[test]
    fn linear_interpolation_matches_endpoints() {
        assert_eq!(score_from_rsi(70.0), -40.0);
        assert_eq!(score_from_rsi(75.0), -80.0);
        assert_eq!(score_from_rsi(30.0), 40.0);
        assert_eq!(score_from_rsi(25.0), 80.0);
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Composed output of `QuantAnalystAgent` (spec §3/§4.H): per-timeframe trend
/// and oscillator scores plus a single sentiment score, each in [-100,+100].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuantAnalysis {
    pub trend_5m: Option<f64>,
    pub trend_15m: Option<f64>,
    pub trend_1h: Option<f64>,
    pub oscillator_5m: Option<f64>,
    pub oscillator_15m: Option<f64>,
    pub oscillator_1h: Option<f64>,
    pub sentiment: Option<f64>,
    /// Human-readable rationale per sub-score, keyed by field name.
    pub rationale: BTreeMap<String, String>,
}

impl QuantAnalysis {
    /// `composite = 0.4·avg(trend) + 0.3·oscillator + 0.3·sentiment`
    /// (spec §3/§4.H). `trend` is a simple mean of the three timeframes;
    /// `oscillator` is `OscillatorSubAgent`'s own 30/30/40 (5m/15m/1h)
    /// weighted blend, renormalized over whichever timeframes are present.
    /// Missing timeframes are excluded rather than treated as 0, since
    /// §4.G's "missing → 0, not imputed" rule applies only to sentiment's
    /// own sub-terms.
    pub fn composite(&self) -> f64 {
        let trend_avg = avg(&[self.trend_5m, self.trend_15m, self.trend_1h]);
        let osc_weighted = weighted_oscillator(
            self.oscillator_5m,
            self.oscillator_15m,
            self.oscillator_1h,
        );
        let sentiment = self.sentiment.unwrap_or(0.0);
        0.4 * trend_avg + 0.3 * osc_weighted + 0.3 * sentiment
    }

    /// `> +30` buy, `< -30` sell, else neutral (spec §4.H).
    pub fn label(&self) -> &'static str {
        let c = self.composite();
        if c > 30.0 {
            "buy"
        } else if c < -30.0 {
            "sell"
        } else {
            "neutral"
        }
    }
}

fn avg(values: &[Option<f64>]) -> f64 {
    let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    if present.is_empty() {
        0.0
    } else {
        present.iter().sum::<f64>() / present.len() as f64
    }
}

/// `OscillatorSubAgent`'s 30/30/40 (5m/15m/1h) weighted combination (spec
/// §4.F), renormalized over present timeframes so a missing one doesn't
/// silently shrink the contribution.
fn weighted_oscillator(osc_5m: Option<f64>, osc_15m: Option<f64>, osc_1h: Option<f64>) -> f64 {
    let entries = [(osc_5m, 0.3), (osc_15m, 0.3), (osc_1h, 0.4)];
    let weight_sum: f64 = entries
        .iter()
        .filter_map(|(v, w)| v.map(|_| *w))
        .sum();
    if weight_sum == 0.0 {
        return 0.0;
    }
    entries
        .iter()
        .filter_map(|(v, w)| v.map(|value| value * w))
        .sum::<f64>()
        / weight_sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_weights_match_spec() {
        let qa = QuantAnalysis {
            trend_5m: Some(50.0),
            trend_15m: Some(50.0),
            trend_1h: Some(50.0),
            oscillator_5m: Some(0.0),
            oscillator_15m: Some(0.0),
            oscillator_1h: Some(0.0),
            sentiment: Some(0.0),
            rationale: BTreeMap::new(),
        };
        assert!((qa.composite() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn label_thresholds() {
        let mut qa = QuantAnalysis {
            trend_5m: Some(100.0),
            trend_15m: Some(100.0),
            trend_1h: Some(100.0),
            oscillator_5m: None,
            oscillator_15m: None,
            oscillator_1h: None,
            sentiment: Some(100.0),
            rationale: BTreeMap::new(),
        };
        assert_eq!(qa.label(), "buy");
        qa.trend_5m = Some(-100.0);
        qa.trend_15m = Some(-100.0);
        qa.trend_1h = Some(-100.0);
        qa.sentiment = Some(-100.0);
        assert_eq!(qa.label(), "sell");
    }
}

use std::sync::Arc;

use tracing::warn;

use crate::domain::market::FeatureSnapshot;
use crate::domain::ports::Predictor;
use crate::domain::signals::predict::PredictLabel;
use crate::domain::signals::{PredictResult, PredictSource};

/// Wraps the external `Predictor`, falling back to a rule score when it is
/// unavailable or errors (spec §4.I).
pub struct PredictAgent {
    predictor: Arc<dyn Predictor>,
}

impl PredictAgent {
    pub fn new(predictor: Arc<dyn Predictor>) -> Self {
        Self { predictor }
    }

    pub async fn predict(&self, features: &FeatureSnapshot, composite_quant_score: f64) -> PredictResult {
        match self.predictor.predict(features).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "predictor unavailable, falling back to rule score");
                rule_fallback(composite_quant_score)
            }
        }
    }
}

/// `p_up = sigmoid(0.02 · composite_quant_score)`, confidence capped at 50
/// (spec §4.I). `pub(crate)` so the orchestrator can reach it directly when
/// there is no stable `FeatureSnapshot` yet to hand the real predictor.
pub(crate) fn rule_fallback(composite_quant_score: f64) -> PredictResult {
    let p_up = sigmoid(0.02 * composite_quant_score);
    let label = if p_up > 0.55 {
        PredictLabel::Bullish
    } else if p_up < 0.45 {
        PredictLabel::Bearish
    } else {
        PredictLabel::Neutral
    };
    // Confidence scales with distance from 0.5, capped at the spec's 50.
    let confidence = ((p_up - 0.5).abs() * 200.0).min(50.0);
    PredictResult {
        p_up,
        label,
        confidence,
        source: PredictSource::RuleFallback,
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

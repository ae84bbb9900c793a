use std::collections::BTreeMap;

use crate::config::DecisionWeights;
use crate::domain::market::Regime;
use crate::domain::signals::vote::{Action, Alignment};
use crate::domain::signals::{PredictResult, QuantAnalysis, VoteResult};
use crate::domain::trading::PositionLocation;

use super::position_analyzer::PositionAnalysis;

/// The critic: weighted vote, multi-TF alignment, regime/position gates,
/// adversarial audit (spec §4.L).
pub struct DecisionCoreAgent;

impl DecisionCoreAgent {
    pub fn decide(
        qa: &QuantAnalysis,
        predict: &PredictResult,
        regime: Regime,
        position: &PositionAnalysis,
        netflow: Option<f64>,
        weights: &DecisionWeights,
    ) -> VoteResult {
        let (weighted_score, vote_details) = weighted_vote(qa, predict, weights);
        let alignment = classify_alignment(qa);
        let multi_period_aligned = alignment == Alignment::FullyAligned;

        let (mut action, confidence, mut reason) = map_action(weighted_score, alignment);

        if regime == Regime::Choppy && position.location == PositionLocation::Middle {
            action = Action::Hold;
            reason = "CHOPPY-MIDDLE".to_string();
        }
        if action == Action::Long && !position.allow_long {
            action = Action::Hold;
            reason = "position gate: long disallowed at current range location".to_string();
        }
        if action == Action::Short && !position.allow_short {
            action = Action::Hold;
            reason = "position gate: short disallowed at current range location".to_string();
        }

        let (action, confidence, reason) = apply_adversarial_audit(action, confidence, reason, netflow);

        VoteResult {
            action,
            confidence,
            weighted_score,
            vote_details,
            multi_period_aligned,
            alignment,
            regime,
            position: position.location,
            reason,
        }
    }
}

fn sign(x: Option<f64>) -> i8 {
    match x {
        Some(v) if v > 0.0 => 1,
        Some(v) if v < 0.0 => -1,
        _ => 0,
    }
}

fn classify_alignment(qa: &QuantAnalysis) -> Alignment {
    let s1h = sign(qa.trend_1h);
    let s15m = sign(qa.trend_15m);
    let s5m = sign(qa.trend_5m);
    if s1h == s15m && s15m == s5m && s1h != 0 {
        Alignment::FullyAligned
    } else if s1h == s15m && s1h != 0 {
        Alignment::PartiallyAligned
    } else {
        Alignment::Divergent
    }
}

/// `Σ wᵢ·sᵢ` over present signals, weights renormalized to sum to 1.0
/// deterministically (spec §4.L, invariant I3). `vote_details` records the
/// effective (renormalized) weight per component.
fn weighted_vote(
    qa: &QuantAnalysis,
    predict: &PredictResult,
    weights: &DecisionWeights,
) -> (f64, BTreeMap<String, f64>) {
    let components: [(&str, Option<f64>, f64); 8] = [
        ("trend_5m", qa.trend_5m, weights.trend_5m),
        ("trend_15m", qa.trend_15m, weights.trend_15m),
        ("trend_1h", qa.trend_1h, weights.trend_1h),
        ("osc_5m", qa.oscillator_5m, weights.osc_5m),
        ("osc_15m", qa.oscillator_15m, weights.osc_15m),
        ("osc_1h", qa.oscillator_1h, weights.osc_1h),
        ("prophet", Some(predict.vote_contribution()), weights.prophet),
        ("sentiment", qa.sentiment, weights.sentiment),
    ];

    let weight_sum: f64 = components
        .iter()
        .filter_map(|(_, v, w)| v.map(|_| *w))
        .sum();

    let mut vote_details = BTreeMap::new();
    if weight_sum <= 0.0 {
        return (0.0, vote_details);
    }

    let mut weighted_score = 0.0;
    for (name, v, w) in components {
        if let Some(score) = v {
            let effective_weight = w / weight_sum;
            vote_details.insert(name.to_string(), effective_weight);
            weighted_score += effective_weight * score;
        }
    }
    (weighted_score, vote_details)
}

/// Action-mapping table (spec §4.L).
fn map_action(weighted_score: f64, alignment: Alignment) -> (Action, f64, String) {
    if weighted_score > 50.0 && alignment == Alignment::FullyAligned {
        (Action::Long, 85.0, "fully aligned strong long".to_string())
    } else if weighted_score > 30.0 {
        (
            Action::Long,
            linear_confidence(weighted_score),
            "long".to_string(),
        )
    } else if weighted_score < -50.0 && alignment == Alignment::FullyAligned {
        (Action::Short, 85.0, "fully aligned strong short".to_string())
    } else if weighted_score < -30.0 {
        (
            Action::Short,
            linear_confidence(weighted_score.abs()),
            "short".to_string(),
        )
    } else {
        (Action::Hold, hold_confidence(weighted_score), "hold".to_string())
    }
}

/// Linear interpolation of confidence between 60 (at score 30) and 75 (at
/// score 50), clamped — spec §4.L's "60–75 (linear in score)".
fn linear_confidence(score_abs: f64) -> f64 {
    let clamped = score_abs.min(50.0);
    (60.0 + (clamped - 30.0) / 20.0 * 15.0).clamp(60.0, 75.0)
}

/// Unspecified by the table beyond `f(|score|)`; decreasing confidence as
/// the score approaches (without crossing) the ±30 action threshold — see
/// DESIGN.md.
fn hold_confidence(weighted_score: f64) -> f64 {
    (90.0 - (weighted_score.abs() / 30.0) * 60.0).clamp(20.0, 90.0)
}

/// Decays confidence against institutional netflow and downgrades to hold
/// below the 30 floor (spec §4.L's adversarial audit). Split out from
/// `decide` so the floor crossing is directly testable — under the table's
/// own 60–75 long/short confidence range, a 0.5 decay never actually drops
/// a *table-produced* confidence below 30, so the crossing can only be
/// pinned down by driving this function with an arbitrary confidence
/// directly (see `adversarial_decay_downgrades_to_hold_below_floor`).
fn apply_adversarial_audit(
    mut action: Action,
    mut confidence: f64,
    mut reason: String,
    netflow: Option<f64>,
) -> (Action, f64, String) {
    if action == Action::Long {
        if let Some(flow) = netflow {
            if flow < -1_000_000.0 {
                confidence *= 0.5;
                reason = format!("{reason}; technical long vs institutional outflow");
            }
        }
    } else if action == Action::Short {
        if let Some(flow) = netflow {
            if flow > 1_000_000.0 {
                confidence *= 0.5;
                reason = format!("{reason}; technical short vs institutional inflow");
            }
        }
    }
    if action != Action::Hold && confidence < 30.0 {
        action = Action::Hold;
        reason = format!("{reason}; downgraded to hold after adversarial decay");
    }
    (action, confidence, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::position_analyzer::PositionAnalysis;
    use crate::domain::signals::predict::PredictLabel;
    use crate::domain::signals::PredictSource;

    fn weights() -> DecisionWeights {
        DecisionWeights {
            trend_5m: 0.10,
            trend_15m: 0.15,
            trend_1h: 0.20,
            osc_5m: 0.05,
            osc_15m: 0.07,
            osc_1h: 0.08,
            prophet: 0.15,
            sentiment: 0.20,
        }
    }

    fn neutral_position() -> PositionAnalysis {
        PositionAnalysis {
            pct: 50.0,
            location: PositionLocation::Middle,
            allow_long: true,
            allow_short: true,
        }
    }

    #[test]
    fn strong_aligned_long_scenario() {
        let qa = QuantAnalysis {
            trend_5m: Some(25.0),
            trend_15m: Some(45.0),
            trend_1h: Some(60.0),
            oscillator_5m: Some(0.0),
            oscillator_15m: Some(0.0),
            oscillator_1h: Some(0.0),
            sentiment: Some(20.0),
            rationale: BTreeMap::new(),
        };
        let predict = PredictResult {
            p_up: 0.70,
            label: PredictLabel::Bullish,
            confidence: 80.0,
            source: PredictSource::Model,
        };
        let result = DecisionCoreAgent::decide(
            &qa,
            &predict,
            Regime::Trending,
            &neutral_position(),
            Some(5_000_000.0),
            &weights(),
        );
        assert_eq!(result.action, Action::Long);
        assert!(result.multi_period_aligned);
        assert!(result.confidence >= 60.0);
    }

    #[test]
    fn choppy_middle_forces_hold() {
        let qa = QuantAnalysis {
            trend_5m: Some(10.0),
            trend_15m: Some(10.0),
            trend_1h: Some(10.0),
            oscillator_5m: Some(0.0),
            oscillator_15m: Some(0.0),
            oscillator_1h: Some(0.0),
            sentiment: Some(5.0),
            rationale: BTreeMap::new(),
        };
        let predict = PredictResult {
            p_up: 0.58,
            label: PredictLabel::Neutral,
            confidence: 50.0,
            source: PredictSource::RuleFallback,
        };
        let position = PositionAnalysis {
            pct: 47.0,
            location: PositionLocation::Middle,
            allow_long: true,
            allow_short: true,
        };
        let result = DecisionCoreAgent::decide(
            &qa,
            &predict,
            Regime::Choppy,
            &position,
            None,
            &weights(),
        );
        assert_eq!(result.action, Action::Hold);
        assert!(result.reason.contains("CHOPPY"));
    }

    #[test]
    fn weight_renormalization_sums_to_one() {
        let qa = QuantAnalysis {
            trend_5m: Some(10.0),
            trend_15m: Some(10.0),
            trend_1h: Some(10.0),
            oscillator_5m: Some(0.0),
            oscillator_15m: Some(0.0),
            oscillator_1h: Some(0.0),
            sentiment: None,
            rationale: BTreeMap::new(),
        };
        let predict = PredictResult {
            p_up: 0.5,
            label: PredictLabel::Neutral,
            confidence: 50.0,
            source: PredictSource::RuleFallback,
        };
        let result = DecisionCoreAgent::decide(
            &qa,
            &predict,
            Regime::Unknown,
            &neutral_position(),
            None,
            &weights(),
        );
        let total_weight: f64 = result.vote_details.values().sum();
        assert!((total_weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn adversarial_decay_downgrades_to_hold_below_floor() {
        // spec §8 scenario 3's second branch: "if instead base confidence
        // was 55, decays to ~27 < 30 ⇒ downgraded to hold". The table in
        // §4.L never actually produces a base confidence below 60 for a
        // long/short action, so this drives the decay/downgrade step
        // directly with the confidence the scenario describes.
        let (action, confidence, reason) =
            apply_adversarial_audit(Action::Long, 55.0, "long".to_string(), Some(-5_000_000.0));
        assert_eq!(action, Action::Hold);
        assert!((confidence - 27.5).abs() < 1e-9);
        assert!(reason.contains("downgraded to hold"));
    }

    #[test]
    fn adversarial_decay_stays_long_above_floor() {
        let (action, confidence, _) =
            apply_adversarial_audit(Action::Long, 85.0, "long".to_string(), Some(-3_000_000.0));
        assert_eq!(action, Action::Long);
        assert!((confidence - 42.5).abs() < 1e-9);
    }
}

use std::collections::BTreeMap;

use crate::domain::market::{MarketSnapshot, Timeframe};
use crate::domain::signals::QuantAnalysis;

use super::oscillator_subagent::OscillatorSubAgent;
use super::sentiment_subagent::SentimentSubAgent;
use super::trend_subagent::TrendSubAgent;

/// Composes `TrendSubAgent`/`OscillatorSubAgent`/`SentimentSubAgent` into a
/// single `QuantAnalysis` (spec §4.H).
pub struct QuantAnalystAgent;

impl QuantAnalystAgent {
    pub fn analyze(snapshot: &MarketSnapshot) -> QuantAnalysis {
        let mut rationale = BTreeMap::new();

        let trend_5m = snapshot.view(Timeframe::FiveMin).map(TrendSubAgent::score_5m);
        let trend_15m = snapshot
            .view(Timeframe::FifteenMin)
            .map(TrendSubAgent::score_15m);
        let trend_1h = snapshot.view(Timeframe::OneHour).map(TrendSubAgent::score_1h);

        let oscillator_5m = snapshot
            .view(Timeframe::FiveMin)
            .and_then(OscillatorSubAgent::score);
        let oscillator_15m = snapshot
            .view(Timeframe::FifteenMin)
            .and_then(OscillatorSubAgent::score);
        let oscillator_1h = snapshot
            .view(Timeframe::OneHour)
            .and_then(OscillatorSubAgent::score);

        let price_direction = trend_1h.map(|t| t.signum()).unwrap_or(0.0);
        let all_aux_missing = snapshot.institutional_netflow_1h.is_none()
            && snapshot.funding_rate.is_none()
            && snapshot.open_interest.is_none();
        let sentiment = if all_aux_missing {
            None
        } else {
            Some(SentimentSubAgent::score(
                snapshot.institutional_netflow_1h,
                snapshot.funding_rate,
                snapshot.open_interest,
                price_direction,
            ))
        };

        if all_aux_missing {
            rationale.insert(
                "sentiment".to_string(),
                "funding rate, open interest, and netflow all unavailable".to_string(),
            );
        }
        if trend_5m.is_none() {
            rationale.insert("trend_5m".to_string(), "missing 5m view".to_string());
        }
        if oscillator_5m.is_none() {
            rationale.insert(
                "oscillator_5m".to_string(),
                "no stable RSI yet (warmup)".to_string(),
            );
        }

        QuantAnalysis {
            trend_5m,
            trend_15m,
            trend_1h,
            oscillator_5m,
            oscillator_15m,
            oscillator_1h,
            sentiment,
            rationale,
        }
    }
}

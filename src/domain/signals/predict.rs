use serde::{Deserialize, Serialize};

/// Where a `PredictResult` came from (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictSource {
    Model,
    RuleFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictLabel {
    Bullish,
    Bearish,
    Neutral,
}

/// Output of `PredictAgent` (spec §3/§4.I).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictResult {
    pub p_up: f64,
    pub label: PredictLabel,
    pub confidence: f64,
    pub source: PredictSource,
}

impl PredictResult {
    /// `prophet` contributes `(p_up − 0.5)·200` to the weighted vote (spec §4.L).
    pub fn vote_contribution(&self) -> f64 {
        (self.p_up - 0.5) * 200.0
    }
}

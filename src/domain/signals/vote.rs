use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::market::Regime;
use crate::domain::trading::PositionLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Long,
    Short,
    Hold,
}

/// Multi-timeframe trend-sign agreement (spec §4.L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    FullyAligned,
    PartiallyAligned,
    Divergent,
}

/// Output of `DecisionCoreAgent` (spec §3/§4.L).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteResult {
    pub action: Action,
    pub confidence: f64,
    pub weighted_score: f64,
    pub vote_details: BTreeMap<String, f64>,
    pub multi_period_aligned: bool,
    pub alignment: Alignment,
    pub regime: Regime,
    pub position: PositionLocation,
    pub reason: String,
}

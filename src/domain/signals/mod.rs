pub mod predict;
pub mod quant;
pub mod risk;
pub mod vote;

pub use predict::{PredictResult, PredictSource};
pub use quant::QuantAnalysis;
pub use risk::{RiskCheckResult, RiskLevel};
pub use vote::{Action, Alignment, VoteResult};

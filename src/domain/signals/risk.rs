use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    Warning,
    Danger,
    Fatal,
}

/// Output of `RiskAuditAgent` (spec §3/§4.M): the pipeline's final veto.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskCheckResult {
    pub passed: bool,
    pub risk_level: RiskLevel,
    pub blocked_reason: Option<String>,
    pub corrections: BTreeMap<String, Decimal>,
    pub warnings: Vec<String>,
}

impl RiskCheckResult {
    /// `level` distinguishes a malformed proposal (`Fatal`, e.g. an
    /// uncorrectable stop) from a proposal that is well-formed but sized
    /// out by a normal risk limit (`Danger`, e.g. margin or drawdown).
    pub fn blocked(level: RiskLevel, code: &str, reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            risk_level: level,
            blocked_reason: Some(format!("{code}: {}", reason.into())),
            corrections: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn passed() -> Self {
        Self {
            passed: true,
            risk_level: RiskLevel::Safe,
            blocked_reason: None,
            corrections: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }
}

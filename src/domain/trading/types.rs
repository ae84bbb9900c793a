use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Long,
    Short,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Long => write!(f, "LONG"),
            OrderSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Where price sits within the recent range (spec §4.K).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionLocation {
    Bottom,
    Middle,
    Top,
}

/// A proposed order after `DecisionCoreAgent`, before `RiskAuditAgent`
/// has a chance to veto or rewrite it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeProposal {
    pub symbol: String,
    pub side: OrderSide,
    pub entry: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub qty: Decimal,
    pub leverage: u32,
}

/// Read-only, per-cycle snapshot of the account's open position and balance,
/// consumed by `RiskAuditAgent` (spec §5's "read-only within a cycle" rule).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PositionState {
    pub balance: Decimal,
    pub open_qty: Decimal,
    pub drawdown_pct: Decimal,
    pub consecutive_losses: u32,
}

/// A closed trade's outcome, the sole input to `TradeOutcomeReconciler`
/// (spec §9's "single reconciler task with a well-defined update event
/// stream").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeOutcome {
    pub symbol: String,
    pub closed_at: DateTime<Utc>,
    pub realized_pnl: Decimal,
}

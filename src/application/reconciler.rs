use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use crate::domain::trading::TradeOutcome;

#[derive(Debug, Clone, Copy)]
struct SymbolState {
    equity_high_water_mark: Decimal,
    current_equity: Decimal,
    consecutive_losses: u32,
}

impl SymbolState {
    fn drawdown_pct(&self) -> Decimal {
        if self.equity_high_water_mark <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ((self.equity_high_water_mark - self.current_equity) / self.equity_high_water_mark)
            .max(Decimal::ZERO)
    }
}

/// Owns the drawdown high-water-mark and consecutive-loss counter that
/// spec §9 singles out as the original's global mutable state. Updated only
/// by [`record_outcome`](Self::record_outcome); `RiskAuditAgent` reads an
/// immutable [`PositionState`](crate::domain::trading::PositionState)
/// snapshot per cycle via [`snapshot`](Self::snapshot) — a one-directional
/// flow grounded in the teacher's `RiskStateManager`/`CircuitBreakerService`
/// split, replacing the cyclic Decision↔Risk coupling the spec calls out.
pub struct TradeOutcomeReconciler {
    state: RwLock<HashMap<String, SymbolState>>,
}

impl Default for TradeOutcomeReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl TradeOutcomeReconciler {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// The reconciler's sole write path — a trade-outcome event.
    pub fn record_outcome(&self, outcome: TradeOutcome, starting_equity: Decimal) {
        let mut guard = self.state.write().expect("reconciler lock poisoned");
        let entry = guard.entry(outcome.symbol.clone()).or_insert(SymbolState {
            equity_high_water_mark: starting_equity,
            current_equity: starting_equity,
            consecutive_losses: 0,
        });
        entry.current_equity += outcome.realized_pnl;
        entry.equity_high_water_mark = entry.equity_high_water_mark.max(entry.current_equity);
        if outcome.realized_pnl < Decimal::ZERO {
            entry.consecutive_losses += 1;
        } else {
            entry.consecutive_losses = 0;
        }
        info!(
            symbol = %outcome.symbol,
            pnl = %outcome.realized_pnl,
            consecutive_losses = entry.consecutive_losses,
            drawdown_pct = %entry.drawdown_pct(),
            "recorded trade outcome"
        );
    }

    /// An immutable snapshot for `RiskAuditAgent`'s drawdown/cooldown gates
    /// (spec §4.M checks 7 and 8). Symbols with no recorded history read as
    /// zero drawdown and zero consecutive losses.
    pub fn snapshot(&self, symbol: &str) -> (Decimal, u32) {
        let guard = self.state.read().expect("reconciler lock poisoned");
        match guard.get(symbol) {
            Some(s) => (s.drawdown_pct(), s.consecutive_losses),
            None => (dec!(0), 0),
        }
    }

    /// Current equity for `symbol`, or `starting_equity` if no outcomes
    /// have been recorded yet.
    pub fn equity(&self, symbol: &str, starting_equity: Decimal) -> Decimal {
        let guard = self.state.read().expect("reconciler lock poisoned");
        guard
            .get(symbol)
            .map(|s| s.current_equity)
            .unwrap_or(starting_equity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn consecutive_losses_reset_on_win() {
        let reconciler = TradeOutcomeReconciler::new();
        let loss = |pnl: Decimal| TradeOutcome {
            symbol: "BTCUSDT".to_string(),
            closed_at: Utc::now(),
            realized_pnl: pnl,
        };
        reconciler.record_outcome(loss(dec!(-10)), dec!(1000));
        reconciler.record_outcome(loss(dec!(-10)), dec!(1000));
        assert_eq!(reconciler.snapshot("BTCUSDT").1, 2);
        reconciler.record_outcome(loss(dec!(5)), dec!(1000));
        assert_eq!(reconciler.snapshot("BTCUSDT").1, 0);
    }

    #[test]
    fn drawdown_computed_from_high_water_mark() {
        let reconciler = TradeOutcomeReconciler::new();
        reconciler.record_outcome(
            TradeOutcome {
                symbol: "BTCUSDT".to_string(),
                closed_at: Utc::now(),
                realized_pnl: dec!(100),
            },
            dec!(1000),
        );
        reconciler.record_outcome(
            TradeOutcome {
                symbol: "BTCUSDT".to_string(),
                closed_at: Utc::now(),
                realized_pnl: dec!(-220),
            },
            dec!(1000),
        );
        let (drawdown, _) = reconciler.snapshot("BTCUSDT");
        assert!((drawdown - dec!(0.2)).abs() < dec!(0.0001));
    }
}

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::RiskThresholds;
use crate::domain::signals::{RiskCheckResult, RiskLevel};
use crate::domain::trading::{OrderSide, PositionState, TradeProposal};

/// The guardian: eight ordered, correctable checks, first failure wins
/// (spec §4.M). Pure and synchronous — RiskAudit errors are deterministic
/// given inputs and are never retried (spec §7).
pub struct RiskAuditAgent;

impl RiskAuditAgent {
    pub fn audit(
        proposal: &mut TradeProposal,
        position: &PositionState,
        thresholds: &RiskThresholds,
    ) -> RiskCheckResult {
        let mut warnings = Vec::new();

        // 1. Stop-loss direction (fatal, but correctable).
        let stop = match proposal.stop_loss {
            None => return RiskCheckResult::blocked(RiskLevel::Fatal, "FATAL_SL", "no stop loss provided"),
            Some(stop) => stop,
        };
        let wrong_sided = match proposal.side {
            OrderSide::Long => stop >= proposal.entry,
            OrderSide::Short => stop <= proposal.entry,
        };
        let mut corrections = std::collections::BTreeMap::new();
        let stop = if wrong_sided {
            let flipped = proposal.entry * dec!(2) - stop;
            let distance_pct = distance_pct(proposal.entry, flipped);
            let min = to_decimal(thresholds.sl_min_distance_pct);
            let max = to_decimal(thresholds.sl_max_distance_pct);
            if distance_pct < min || distance_pct > max || flipped <= Decimal::ZERO {
                return RiskCheckResult::blocked(
                    RiskLevel::Fatal,
                    "FATAL_SL",
                    "stop on wrong side of entry and not correctable",
                );
            }
            proposal.stop_loss = Some(flipped);
            corrections.insert("stop_loss".to_string(), flipped);
            flipped
        } else {
            stop
        };

        // 2. Stop-loss magnitude.
        let distance_pct = distance_pct(proposal.entry, stop);
        let min = to_decimal(thresholds.sl_min_distance_pct);
        let max = to_decimal(thresholds.sl_max_distance_pct);
        if distance_pct < min || distance_pct > max {
            let mut result = RiskCheckResult::blocked(
                RiskLevel::Danger,
                "SL_RANGE",
                format!("stop distance {distance_pct} outside [{min},{max}]"),
            );
            result.corrections = corrections;
            return result;
        }

        // 3. Leverage cap.
        if proposal.leverage > thresholds.max_leverage {
            let mut result = RiskCheckResult::blocked(
                RiskLevel::Danger,
                "LEVERAGE",
                format!("leverage {} exceeds max {}", proposal.leverage, thresholds.max_leverage),
            );
            result.corrections = corrections;
            return result;
        }

        // 4. Margin feasibility.
        let required_margin = proposal.qty * proposal.entry / Decimal::from(proposal.leverage);
        let margin_cap = position.balance * dec!(0.95);
        if required_margin > margin_cap {
            let mut result = RiskCheckResult::blocked(
                RiskLevel::Danger,
                "MARGIN",
                format!("required margin {required_margin} exceeds {margin_cap}"),
            );
            result.corrections = corrections;
            return result;
        }

        // 5. Position concentration.
        let notional = proposal.qty * proposal.entry;
        let position_cap = to_decimal(thresholds.max_position_pct) * position.balance;
        if notional > position_cap {
            let mut result = RiskCheckResult::blocked(
                RiskLevel::Danger,
                "POSITION_PCT",
                format!("notional {notional} exceeds {position_cap}"),
            );
            result.corrections = corrections;
            return result;
        }

        // 6. Risk exposure.
        let risk_amount = (proposal.entry - stop).abs() * proposal.qty;
        let risk_cap = to_decimal(thresholds.max_total_risk_pct) * position.balance;
        if risk_amount > risk_cap {
            let mut result = RiskCheckResult::blocked(
                RiskLevel::Danger,
                "RISK_EXPOSURE",
                format!("risk amount {risk_amount} exceeds {risk_cap}"),
            );
            result.corrections = corrections;
            return result;
        }

        // 7. Drawdown gate.
        if position.drawdown_pct >= to_decimal(thresholds.stop_trading_drawdown_pct) {
            let mut result = RiskCheckResult::blocked(
                RiskLevel::Danger,
                "DRAWDOWN",
                format!("drawdown {} at/above halt threshold", position.drawdown_pct),
            );
            result.corrections = corrections;
            return result;
        }

        // 8. Consecutive loss gate.
        if position.consecutive_losses >= thresholds.max_consecutive_losses {
            let mut result = RiskCheckResult::blocked(
                RiskLevel::Danger,
                "COOLDOWN",
                format!(
                    "{} consecutive losses at/above limit {}",
                    position.consecutive_losses, thresholds.max_consecutive_losses
                ),
            );
            result.corrections = corrections;
            return result;
        }

        if !corrections.is_empty() {
            warnings.push("stop loss was corrected to the opposite side of entry".to_string());
        }

        RiskCheckResult {
            passed: true,
            risk_level: if warnings.is_empty() {
                RiskLevel::Safe
            } else {
                RiskLevel::Warning
            },
            blocked_reason: None,
            corrections,
            warnings,
        }
    }
}

fn distance_pct(entry: Decimal, stop: Decimal) -> Decimal {
    if entry == Decimal::ZERO {
        return Decimal::MAX;
    }
    ((entry - stop) / entry).abs()
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> RiskThresholds {
        RiskThresholds {
            max_leverage: 10,
            max_position_pct: 0.30,
            max_total_risk_pct: 0.02,
            stop_trading_drawdown_pct: 0.10,
            max_consecutive_losses: 3,
            sl_min_distance_pct: 0.005,
            sl_max_distance_pct: 0.05,
        }
    }

    fn position(balance: Decimal) -> PositionState {
        PositionState {
            balance,
            open_qty: Decimal::ZERO,
            drawdown_pct: Decimal::ZERO,
            consecutive_losses: 0,
        }
    }

    #[test]
    fn wrong_sided_stop_is_flipped_symmetrically() {
        let mut proposal = TradeProposal {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Long,
            entry: dec!(100),
            stop_loss: Some(dec!(103)),
            take_profit: None,
            qty: dec!(1),
            leverage: 2,
        };
        let result = RiskAuditAgent::audit(&mut proposal, &position(dec!(100000)), &thresholds());
        assert!(result.passed);
        assert_eq!(proposal.stop_loss, Some(dec!(97)));
        assert_eq!(result.corrections.get("stop_loss"), Some(&dec!(97)));
    }

    #[test]
    fn margin_infeasible_blocks() {
        let mut proposal = TradeProposal {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Long,
            entry: dec!(100),
            stop_loss: Some(dec!(97)),
            take_profit: None,
            qty: dec!(20),
            leverage: 2,
        };
        let result = RiskAuditAgent::audit(&mut proposal, &position(dec!(1000)), &thresholds());
        assert!(!result.passed);
        assert!(result.blocked_reason.unwrap().starts_with("MARGIN"));
    }

    #[test]
    fn drawdown_halts_new_trades() {
        let mut proposal = TradeProposal {
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Long,
            entry: dec!(100),
            stop_loss: Some(dec!(97)),
            take_profit: None,
            qty: dec!(1),
            leverage: 2,
        };
        let mut pos = position(dec!(100000));
        pos.drawdown_pct = dec!(0.12);
        let result = RiskAuditAgent::audit(&mut proposal, &pos, &thresholds());
        assert!(!result.passed);
        assert!(result.blocked_reason.unwrap().starts_with("DRAWDOWN"));
    }
}

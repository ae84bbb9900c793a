//! Property tests for invariants I1-I6 (spec.md §8).

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_decision_engine::application::agents::indicator_processor::IndicatorProcessor;
use futures_decision_engine::application::agents::{DataSyncAgent, DecisionCoreAgent, RiskAuditAgent};
use futures_decision_engine::application::agents::position_analyzer::PositionAnalysis;
use futures_decision_engine::config::{DecisionWeights, RiskThresholds};
use futures_decision_engine::domain::market::series::WARMUP_ROWS;
use futures_decision_engine::domain::market::{Candle, Regime, Timeframe};
use futures_decision_engine::domain::signals::predict::{PredictLabel, PredictSource};
use futures_decision_engine::domain::signals::{PredictResult, QuantAnalysis};
use futures_decision_engine::domain::trading::{OrderSide, PositionLocation, PositionState, TradeProposal};
use futures_decision_engine::infrastructure::mock::MockMarketDataSource;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn sample_candles(n: usize) -> Vec<Candle> {
    let t0 = Utc::now() - Duration::minutes(5 * n as i64);
    (0..n)
        .map(|i| {
            let price = 100.0 + (i as f64 * 0.1).sin() * 5.0 + i as f64 * 0.01;
            let open_time = t0 + Duration::minutes(5 * i as i64);
            Candle {
                open_time,
                open: Decimal::try_from(price).unwrap(),
                high: Decimal::try_from(price + 0.5).unwrap(),
                low: Decimal::try_from(price - 0.5).unwrap(),
                close: Decimal::try_from(price + 0.05).unwrap(),
                volume: dec!(100),
                close_time: open_time + Duration::minutes(5),
            }
        })
        .collect()
}

/// (I1) A snapshot built from a freshly-generated (always-current) mock
/// series passes the cross-timeframe alignment check.
#[tokio::test]
async fn i1_fresh_snapshot_passes_alignment() {
    let source = Arc::new(MockMarketDataSource);
    let agent = DataSyncAgent::new(source, std::time::Duration::from_secs(60));
    let snapshot = agent.fetch("BTCUSDT").await.expect("mock source always has enough data");
    assert!(snapshot.alignment_ok);
    for tf in Timeframe::all() {
        assert!(snapshot.view(tf).is_some());
    }
}

/// (I2) No row within the warmup prefix carries a value; every row past it
/// does (for an indicator that is present once its own lookback is
/// satisfied).
#[test]
fn i2_warmup_rows_are_none_stable_rows_are_some() {
    let candles = sample_candles(220);
    let frame = IndicatorProcessor::process("BTCUSDT", "5m", candles).expect("series long enough");
    for row in frame.rows.iter().take(WARMUP_ROWS) {
        assert!(row.sma_20.is_none());
        assert!(row.rsi_14.is_none());
    }
    for row in frame.rows.iter().skip(WARMUP_ROWS) {
        assert!(row.sma_20.is_some());
        assert!(row.rsi_14.is_some());
    }
}

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

/// (I3) Weight renormalization always sums to 1.0, across several missing-
/// component combinations.
#[test]
fn i3_effective_weights_always_sum_to_one() {
    let combos: Vec<QuantAnalysis> = vec![
        QuantAnalysis {
            trend_5m: Some(1.0),
            trend_15m: Some(1.0),
            trend_1h: Some(1.0),
            oscillator_5m: Some(1.0),
            oscillator_15m: Some(1.0),
            oscillator_1h: Some(1.0),
            sentiment: Some(1.0),
            rationale: BTreeMap::new(),
        },
        QuantAnalysis {
            trend_5m: None,
            trend_15m: Some(1.0),
            trend_1h: Some(1.0),
            oscillator_5m: None,
            oscillator_15m: None,
            oscillator_1h: Some(1.0),
            sentiment: None,
            rationale: BTreeMap::new(),
        },
        QuantAnalysis {
            trend_5m: Some(1.0),
            trend_15m: None,
            trend_1h: None,
            oscillator_5m: None,
            oscillator_15m: None,
            oscillator_1h: None,
            sentiment: None,
            rationale: BTreeMap::new(),
        },
    ];
    let predict = PredictResult {
        p_up: 0.5,
        label: PredictLabel::Neutral,
        confidence: 50.0,
        source: PredictSource::RuleFallback,
    };
    for qa in combos {
        let result = DecisionCoreAgent::decide(
            &qa,
            &predict,
            Regime::Unknown,
            &neutral_position(),
            None,
            &weights(),
        );
        if result.vote_details.is_empty() {
            continue;
        }
        let total: f64 = result.vote_details.values().sum();
        assert!((total - 1.0).abs() < 1e-9, "weights did not renormalize: {total}");
    }
}

fn risk_thresholds() -> RiskThresholds {
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

/// (I4) A blocked audit never clears `passed`, which is the orchestrator's
/// sole gate before any `OrderSink` call.
#[test]
fn i4_blocked_audit_never_reports_passed() {
    let mut proposal = TradeProposal {
        symbol: "BTCUSDT".to_string(),
        side: OrderSide::Long,
        entry: dec!(100),
        stop_loss: Some(dec!(97)),
        take_profit: None,
        qty: dec!(1000),
        leverage: 2,
    };
    let position = PositionState {
        balance: dec!(1000),
        open_qty: Decimal::ZERO,
        drawdown_pct: Decimal::ZERO,
        consecutive_losses: 0,
    };
    let result = RiskAuditAgent::audit(&mut proposal, &position, &risk_thresholds());
    assert!(!result.passed);
    assert!(result.blocked_reason.is_some());
}

/// (I5) Every proposal a passing audit leaves behind has its stop on the
/// correct side of entry, across a spread of entry/stop/side combinations.
#[test]
fn i5_passing_audits_always_leave_a_correctly_sided_stop() {
    let position = PositionState {
        balance: dec!(1_000_000),
        open_qty: Decimal::ZERO,
        drawdown_pct: Decimal::ZERO,
        consecutive_losses: 0,
    };
    let cases = [
        (OrderSide::Long, dec!(100), dec!(98)),
        (OrderSide::Long, dec!(100), dec!(103)),
        (OrderSide::Short, dec!(100), dec!(102)),
        (OrderSide::Short, dec!(100), dec!(97)),
    ];
    for (side, entry, stop) in cases {
        let mut proposal = TradeProposal {
            symbol: "BTCUSDT".to_string(),
            side,
            entry,
            stop_loss: Some(stop),
            take_profit: None,
            qty: dec!(1),
            leverage: 2,
        };
        let result = RiskAuditAgent::audit(&mut proposal, &position, &risk_thresholds());
        if !result.passed {
            continue;
        }
        let final_stop = proposal.stop_loss.expect("passing audit always leaves a stop");
        match side {
            OrderSide::Long => assert!(final_stop < proposal.entry),
            OrderSide::Short => assert!(final_stop > proposal.entry),
        }
    }
}

/// (I6) `DecisionCoreAgent::decide` is a pure function of its inputs: the
/// same snapshot-derived values always produce the same `VoteResult`.
#[test]
fn i6_decide_is_deterministic() {
    let qa = QuantAnalysis {
        trend_5m: Some(25.0),
        trend_15m: Some(45.0),
        trend_1h: Some(60.0),
        oscillator_5m: Some(5.0),
        oscillator_15m: Some(-5.0),
        oscillator_1h: Some(10.0),
        sentiment: Some(20.0),
        rationale: BTreeMap::new(),
    };
    let predict = PredictResult {
        p_up: 0.7,
        label: PredictLabel::Bullish,
        confidence: 80.0,
        source: PredictSource::Model,
    };
    let a = DecisionCoreAgent::decide(&qa, &predict, Regime::Trending, &neutral_position(), Some(5e6), &weights());
    let b = DecisionCoreAgent::decide(&qa, &predict, Regime::Trending, &neutral_position(), Some(5e6), &weights());
    assert_eq!(a.action, b.action);
    assert_eq!(a.weighted_score, b.weighted_score);
    assert!((a.confidence - b.confidence).abs() < 1e-12);
    assert_eq!(a.vote_details, b.vote_details);
}

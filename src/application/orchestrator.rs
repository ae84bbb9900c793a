//! Cycle driver (spec §4.N): runs the full A→M pipeline once per symbol,
//! per cycle, symbols overlapping at I/O boundaries via cooperative
//! concurrency rather than running one symbol to completion before the
//! next starts (spec §5). Isolated at the symbol boundary — one symbol's
//! failure never aborts another's (spec §7's propagation policy), and the
//! orchestrator is the only component that talks to persistence and the
//! `OrderSink`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use futures_util::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::agents::{
    indicator_processor, DataSyncAgent, DecisionCoreAgent, PositionAnalyzer, PredictAgent,
    QuantAnalystAgent, RiskAuditAgent,
};
use crate::application::persistence::{self, ArtifactKind, SnapshotRepository};
use crate::application::reconciler::TradeOutcomeReconciler;
use crate::config::Config;
use crate::domain::errors::{AlignmentError, CycleError, ExecError};
use crate::domain::market::regime::{RegimeDetector, RegimeThresholds};
use crate::domain::market::{MarketSnapshot, Timeframe};
use crate::domain::ports::{MarketDataSource, OrderSink, Predictor};
use crate::domain::signals::{Action, VoteResult};
use crate::domain::trading::{OrderSide, PositionState, TradeOutcome, TradeProposal};

/// An order the orchestrator has dispatched and is still watching for its
/// stop-loss/take-profit trigger (spec §4.N).
#[derive(Debug, Clone)]
struct OpenPosition {
    order_id: String,
    side: OrderSide,
    entry: Decimal,
    qty: Decimal,
    stop_loss: Option<Decimal>,
    take_profit: Option<Decimal>,
}

/// Composes the agents and collaborators one `run_cycle` needs, wired once
/// at startup by `main.rs`.
pub struct Orchestrator {
    config: Config,
    data_sync: DataSyncAgent,
    predict_agent: PredictAgent,
    regime_detector: RegimeDetector,
    order_sink: Arc<dyn OrderSink>,
    repository: Arc<dyn SnapshotRepository>,
    reconciler: Arc<TradeOutcomeReconciler>,
    open_positions: RwLock<HashMap<String, OpenPosition>>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        market_data: Arc<dyn MarketDataSource>,
        predictor: Arc<dyn Predictor>,
        order_sink: Arc<dyn OrderSink>,
        repository: Arc<dyn SnapshotRepository>,
        reconciler: Arc<TradeOutcomeReconciler>,
    ) -> Self {
        let regime_detector = RegimeDetector::new(RegimeThresholds {
            adx_trending: config.regime.adx_trending,
            adx_choppy_ceiling: config.regime.adx_choppy_ceiling,
            choppy_ema_distance_pct: config.regime.choppy_ema_distance_pct,
            volatile_atr_pct: config.regime.volatile_atr_pct,
        });
        let aux_cache_ttl = config.aux_cache_ttl;
        Self {
            config,
            data_sync: DataSyncAgent::new(market_data, aux_cache_ttl),
            predict_agent: PredictAgent::new(predictor),
            regime_detector,
            order_sink,
            repository,
            reconciler,
            open_positions: RwLock::new(HashMap::new()),
        }
    }

    /// Runs one cycle across every configured symbol. Each symbol's
    /// fetch/predict/dispatch pipeline is its own future and all of them
    /// are driven concurrently, so one symbol's awaits overlap with
    /// another's instead of the whole cycle serializing symbol by symbol
    /// (spec §5's cooperative concurrency). A single symbol's error is
    /// logged and skipped; it never aborts the others' cycles.
    pub async fn run_cycle(&self) {
        let results = join_all(
            self.config
                .symbols
                .iter()
                .map(|symbol| self.run_symbol_cycle(symbol)),
        )
        .await;

        for (symbol, result) in self.config.symbols.iter().zip(results) {
            if let Err(e) = result {
                if e.degrades_to_hold() {
                    warn!(symbol = %symbol, error = %e, "cycle degraded to hold");
                } else {
                    error!(symbol = %symbol, error = %e, "cycle aborted for this symbol");
                }
            }
        }
    }

    async fn run_symbol_cycle(&self, symbol: &str) -> Result<(), CycleError> {
        let snapshot = self.data_sync.fetch(symbol).await.map_err(CycleError::Fetch)?;

        persistence::append(
            self.repository.as_ref(),
            ArtifactKind::RawKlines,
            symbol,
            snapshot.snapshot_id,
            &snapshot,
        )
        .await
        .unwrap_or_else(|e| error!(symbol, error = %e, "failed to persist raw snapshot"));

        if !snapshot.alignment_ok {
            return Err(CycleError::Alignment(AlignmentError {
                symbol: symbol.to_string(),
                reason: "cross-timeframe alignment check failed".to_string(),
            }));
        }

        self.watch_open_position(symbol, &snapshot).await?;

        let vote = self.decide(symbol, &snapshot).await?;

        persistence::append(
            self.repository.as_ref(),
            ArtifactKind::Decisions,
            symbol,
            snapshot.snapshot_id,
            &vote,
        )
        .await
        .unwrap_or_else(|e| error!(symbol, error = %e, "failed to persist decision"));

        if vote.action == Action::Hold {
            return Ok(());
        }

        self.act_on_vote(symbol, &snapshot, &vote).await
    }

    /// Latest 5m stable close, used both to size a new proposal and to
    /// check an open position's stop/take-profit.
    fn current_price(snapshot: &MarketSnapshot) -> Decimal {
        snapshot
            .view(Timeframe::FiveMin)
            .and_then(|v| v.stable_view.last_row())
            .map(|(c, _)| c.close)
            .unwrap_or(Decimal::ZERO)
    }

    /// Checks this symbol's open position (if any) against its stop-loss
    /// and take-profit before this cycle's decision runs; on trigger,
    /// closes it via the `OrderSink` and records the outcome with the
    /// `TradeOutcomeReconciler` (spec §4.N).
    async fn watch_open_position(&self, symbol: &str, snapshot: &MarketSnapshot) -> Result<(), CycleError> {
        let position = {
            let guard = self.open_positions.read().expect("open positions lock poisoned");
            guard.get(symbol).cloned()
        };
        let Some(position) = position else {
            return Ok(());
        };

        let price = Self::current_price(snapshot);
        if price <= Decimal::ZERO {
            return Ok(());
        }

        let stop_hit = position.stop_loss.is_some_and(|stop| match position.side {
            OrderSide::Long => price <= stop,
            OrderSide::Short => price >= stop,
        });
        let take_profit_hit = position.take_profit.is_some_and(|tp| match position.side {
            OrderSide::Long => price >= tp,
            OrderSide::Short => price <= tp,
        });
        if !stop_hit && !take_profit_hit {
            return Ok(());
        }

        self.order_sink
            .close_position(symbol, &position.order_id, position.qty)
            .await
            .map_err(CycleError::Exec)?;

        let realized_pnl = match position.side {
            OrderSide::Long => (price - position.entry) * position.qty,
            OrderSide::Short => (position.entry - price) * position.qty,
        };
        let outcome = TradeOutcome {
            symbol: symbol.to_string(),
            closed_at: Utc::now(),
            realized_pnl,
        };

        {
            let mut guard = self.open_positions.write().expect("open positions lock poisoned");
            guard.remove(symbol);
        }

        info!(
            symbol,
            trigger = if stop_hit { "stop_loss" } else { "take_profit" },
            pnl = %realized_pnl,
            "closed watched position"
        );

        persistence::append(
            self.repository.as_ref(),
            ArtifactKind::PositionClosures,
            symbol,
            snapshot.snapshot_id,
            &outcome,
        )
        .await
        .unwrap_or_else(|e| error!(symbol, error = %e, "failed to persist position closure"));

        self.reconciler.record_outcome(outcome, self.config.initial_balance);

        Ok(())
    }

    /// Runs quant analysis, regime/position classification, and the
    /// predictor, then fuses them into a `VoteResult` (spec §4.H–L).
    async fn decide(&self, symbol: &str, snapshot: &MarketSnapshot) -> Result<VoteResult, CycleError> {
        let qa = QuantAnalystAgent::analyze(snapshot);

        let hourly_candles = &snapshot
            .view(Timeframe::OneHour)
            .expect("alignment_ok guarantees every timeframe view is present")
            .stable_view
            .candles;
        let regime = self.regime_detector.detect(hourly_candles);
        let position = PositionAnalyzer::analyze(hourly_candles);

        let five_min_frame = &snapshot
            .view(Timeframe::FiveMin)
            .expect("alignment_ok guarantees every timeframe view is present")
            .stable_view;
        let features = indicator_processor::build_feature_snapshot(five_min_frame);

        let composite = qa.composite();
        let predict = match &features {
            Some(f) => self.predict_agent.predict(f, composite).await,
            None => {
                warn!(symbol, "no stable 5m feature row yet, using rule fallback");
                crate::application::agents::predict_agent::rule_fallback(composite)
            }
        };

        Ok(DecisionCoreAgent::decide(
            &qa,
            &predict,
            regime,
            &position,
            snapshot.institutional_netflow_1h,
            &self.config.weights,
        ))
    }

    /// Builds a `TradeProposal` from the vote, runs it through
    /// `RiskAuditAgent`, and dispatches on pass (spec §4.M–N).
    async fn act_on_vote(
        &self,
        symbol: &str,
        snapshot: &MarketSnapshot,
        vote: &VoteResult,
    ) -> Result<(), CycleError> {
        let entry = Self::current_price(snapshot);
        if entry <= Decimal::ZERO {
            return Ok(());
        }

        let side = match vote.action {
            Action::Long => OrderSide::Long,
            Action::Short => OrderSide::Short,
            Action::Hold => return Ok(()),
        };

        let balance = self
            .reconciler
            .equity(symbol, self.config.initial_balance);
        let (drawdown_pct, consecutive_losses) = self.reconciler.snapshot(symbol);
        let position_state = PositionState {
            balance,
            open_qty: Decimal::ZERO,
            drawdown_pct,
            consecutive_losses,
        };

        // Initial stop at 2% against the position; RiskAuditAgent corrects
        // or rejects it, never this orchestrator.
        let stop_distance = entry * dec!(0.02);
        let initial_stop = match side {
            OrderSide::Long => entry - stop_distance,
            OrderSide::Short => entry + stop_distance,
        };
        let leverage = self.config.risk.max_leverage.min(3);
        let notional_cap = dec!(0.1) * balance;
        let qty = if entry > Decimal::ZERO {
            (notional_cap / entry).max(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        let mut proposal = TradeProposal {
            symbol: symbol.to_string(),
            side,
            entry,
            stop_loss: Some(initial_stop),
            take_profit: None,
            qty,
            leverage,
        };

        let audit = RiskAuditAgent::audit(&mut proposal, &position_state, &self.config.risk);

        persistence::append(
            self.repository.as_ref(),
            ArtifactKind::RiskAudits,
            symbol,
            snapshot.snapshot_id,
            &audit,
        )
        .await
        .unwrap_or_else(|e| error!(symbol, error = %e, "failed to persist risk audit"));

        if !audit.passed {
            info!(
                symbol,
                reason = audit.blocked_reason.as_deref().unwrap_or("unknown"),
                "risk audit blocked proposal"
            );
            return Ok(());
        }

        self.dispatch(symbol, snapshot.snapshot_id, &proposal).await
    }

    async fn dispatch(
        &self,
        symbol: &str,
        snapshot_id: Uuid,
        proposal: &TradeProposal,
    ) -> Result<(), CycleError> {
        self.order_sink
            .set_leverage(symbol, proposal.leverage)
            .await
            .map_err(CycleError::Exec)?;

        let mut last_err = None;
        let mut order_id = None;
        for attempt in 1..=self.config.exec_max_retries {
            match self
                .order_sink
                .place_market(snapshot_id, symbol, proposal.side, proposal.qty)
                .await
            {
                Ok(id) => {
                    order_id = Some(id);
                    break;
                }
                Err(e) => {
                    warn!(symbol, attempt, error = %e, "order dispatch failed, retrying");
                    last_err = Some(e);
                }
            }
        }
        let order_id = match order_id {
            Some(id) => id,
            None => {
                return Err(CycleError::Exec(ExecError::DispatchFailed {
                    symbol: symbol.to_string(),
                    attempt: self.config.exec_max_retries,
                    max_attempts: self.config.exec_max_retries,
                    reason: last_err.map(|e| e.to_string()).unwrap_or_else(|| "unknown".to_string()),
                }));
            }
        };

        if let Some(stop) = proposal.stop_loss {
            if let Err(e) = self
                .order_sink
                .attach_stops(symbol, &order_id, stop, proposal.take_profit)
                .await
            {
                error!(
                    symbol,
                    order_id = %order_id,
                    error = %e,
                    "attach_stops failed after order placed; position state unknown"
                );
                return Err(CycleError::Exec(ExecError::StateUnknown {
                    symbol: symbol.to_string(),
                }));
            }
        }

        self.open_positions.write().expect("open positions lock poisoned").insert(
            symbol.to_string(),
            OpenPosition {
                order_id: order_id.clone(),
                side: proposal.side,
                entry: proposal.entry,
                qty: proposal.qty,
                stop_loss: proposal.stop_loss,
                take_profit: proposal.take_profit,
            },
        );

        let record = serde_json::json!({
            "order_id": order_id,
            "symbol": symbol,
            "side": proposal.side.to_string(),
            "qty": proposal.qty.to_f64(),
            "entry": proposal.entry.to_f64(),
            "stop_loss": proposal.stop_loss.and_then(|d| d.to_f64()),
            "leverage": proposal.leverage,
        });
        persistence::append(
            self.repository.as_ref(),
            ArtifactKind::ExecutionRecords,
            symbol,
            snapshot_id,
            &record,
        )
        .await
        .unwrap_or_else(|e| error!(symbol, error = %e, "failed to persist execution record"));

        info!(symbol, order_id = %order_id, "dispatched order");
        Ok(())
    }
}

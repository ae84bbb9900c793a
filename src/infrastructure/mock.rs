//! Test/demo collaborator implementations. The real exchange client,
//! trained model, and LLM advisor are external collaborators outside this
//! crate's scope (spec §1); these stand in for them in the `run` CLI
//! subcommand when no production adapter is wired in.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::errors::{ExecError, FetchError, PredictorError};
use crate::domain::market::{Candle, FeatureSnapshot, Timeframe};
use crate::domain::ports::{MarketDataSource, OrderSink, Predictor};
use crate::domain::signals::predict::PredictLabel;
use crate::domain::signals::{PredictResult, PredictSource};
use crate::domain::trading::OrderSide;

/// Generates a synthetic random-walk candle series per call. Good enough to
/// exercise the full pipeline without a real exchange connection.
pub struct MockMarketDataSource;

#[async_trait]
impl MarketDataSource for MockMarketDataSource {
    async fn get_klines(
        &self,
        _symbol: &str,
        tf: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, FetchError> {
        let mut rng = rand::rng();
        let mut price = 100.0_f64;
        let t0 = Utc::now() - Duration::seconds(tf.to_seconds() * limit as i64);
        let mut out = Vec::with_capacity(limit);
        for i in 0..limit {
            let drift: f64 = rng.random_range(-0.6..0.6);
            let open = price;
            price = (price + drift).max(1.0);
            let close = price;
            let high = open.max(close) + rng.random_range(0.0..0.3);
            let low = open.min(close) - rng.random_range(0.0..0.3);
            let volume = rng.random_range(50.0..500.0);
            let open_time = t0 + Duration::seconds(tf.to_seconds() * i as i64);
            out.push(Candle {
                open_time,
                open: Decimal::try_from(open).unwrap_or(Decimal::ONE_HUNDRED),
                high: Decimal::try_from(high).unwrap_or(Decimal::ONE_HUNDRED),
                low: Decimal::try_from(low).unwrap_or(Decimal::ONE),
                close: Decimal::try_from(close).unwrap_or(Decimal::ONE_HUNDRED),
                volume: Decimal::try_from(volume).unwrap_or(Decimal::ONE_HUNDRED),
                close_time: open_time + Duration::seconds(tf.to_seconds()),
            });
        }
        Ok(out)
    }

    async fn get_funding_rate(&self, _symbol: &str) -> Result<f64, FetchError> {
        Ok(rand::rng().random_range(-0.0005..0.0005))
    }

    async fn get_open_interest(&self, _symbol: &str) -> Result<(f64, f64), FetchError> {
        let base = rand::rng().random_range(1_000_000.0..10_000_000.0);
        Ok((base, base * rand::rng().random_range(0.9..1.1)))
    }

    async fn get_institutional_netflow(
        &self,
        _symbol: &str,
        _window_minutes: u32,
    ) -> Result<f64, FetchError> {
        Ok(rand::rng().random_range(-2_000_000.0..2_000_000.0))
    }
}

/// Records dispatched orders in memory; never talks to a real exchange.
#[derive(Default)]
pub struct MockOrderSink {
    dispatched: Mutex<Vec<(Uuid, String, OrderSide, Decimal)>>,
}

impl MockOrderSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched_count(&self) -> usize {
        self.dispatched.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl OrderSink for MockOrderSink {
    async fn set_leverage(&self, _symbol: &str, _leverage: u32) -> Result<(), ExecError> {
        Ok(())
    }

    async fn place_market(
        &self,
        snapshot_id: Uuid,
        symbol: &str,
        side: OrderSide,
        qty: Decimal,
    ) -> Result<String, ExecError> {
        let mut guard = self.dispatched.lock().expect("lock poisoned");
        if let Some(existing) = guard
            .iter()
            .find(|(id, s, _, _)| *id == snapshot_id && s == symbol)
        {
            return Ok(format!("{}-{}", existing.0, existing.1));
        }
        guard.push((snapshot_id, symbol.to_string(), side, qty));
        Ok(format!("{snapshot_id}-{symbol}"))
    }

    async fn attach_stops(
        &self,
        _symbol: &str,
        _order_id: &str,
        _stop: Decimal,
        _take_profit: Option<Decimal>,
    ) -> Result<(), ExecError> {
        Ok(())
    }

    async fn close_position(&self, symbol: &str, _order_id: &str, qty: Decimal) -> Result<(), ExecError> {
        self.dispatched
            .lock()
            .expect("lock poisoned")
            .retain(|(_, s, _, q)| !(s == symbol && *q == qty));
        Ok(())
    }
}

/// A deterministic stand-in for the external ML predictor. Never errors, so
/// `PredictAgent`'s rule-fallback path is exercised only via
/// [`AlwaysUnavailablePredictor`].
pub struct MockPredictor;

#[async_trait]
impl Predictor for MockPredictor {
    async fn predict(&self, features: &FeatureSnapshot) -> Result<PredictResult, PredictorError> {
        let p_up = (0.5 + features.price_change_pct[0] / 200.0).clamp(0.0, 1.0);
        let label = if p_up > 0.55 {
            PredictLabel::Bullish
        } else if p_up < 0.45 {
            PredictLabel::Bearish
        } else {
            PredictLabel::Neutral
        };
        Ok(PredictResult {
            p_up,
            label,
            confidence: 70.0,
            source: PredictSource::Model,
        })
    }
}

/// Always errors, forcing `PredictAgent` onto its rule-fallback path —
/// useful for exercising spec §7's degrade-to-rule-fallback behavior.
pub struct AlwaysUnavailablePredictor;

#[async_trait]
impl Predictor for AlwaysUnavailablePredictor {
    async fn predict(&self, _features: &FeatureSnapshot) -> Result<PredictResult, PredictorError> {
        Err(PredictorError::Unavailable("mock predictor disabled".to_string()))
    }
}

//! Ports the core consumes from external collaborators (spec §6). Concrete
//! adapters (a real exchange client, a trained model, an LLM) live outside
//! this crate's scope; `infrastructure::mock`/`infrastructure::replay`
//! provide the test/demo implementations used by the `run`/`backtest` CLI
//! subcommands.

use async_trait::async_trait;

use crate::domain::errors::{ExecError, FetchError, PredictorError};
use crate::domain::market::{Candle, Timeframe};
use crate::domain::signals::PredictResult;
use crate::domain::trading::OrderSide;

/// Abstract fetch of klines and auxiliary market metrics (spec §6).
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn get_klines(
        &self,
        symbol: &str,
        tf: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, FetchError>;

    async fn get_funding_rate(&self, symbol: &str) -> Result<f64, FetchError>;

    /// Returns `(current, value_24h_ago)`.
    async fn get_open_interest(&self, symbol: &str) -> Result<(f64, f64), FetchError>;

    async fn get_institutional_netflow(
        &self,
        symbol: &str,
        window_minutes: u32,
    ) -> Result<f64, FetchError>;
}

/// Order dispatch surface (spec §6). Implementations must be idempotent on
/// retry by `(snapshot_id, symbol)`.
#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), ExecError>;

    async fn place_market(
        &self,
        snapshot_id: uuid::Uuid,
        symbol: &str,
        side: OrderSide,
        qty: rust_decimal::Decimal,
    ) -> Result<String, ExecError>;

    async fn attach_stops(
        &self,
        symbol: &str,
        order_id: &str,
        stop: rust_decimal::Decimal,
        take_profit: Option<rust_decimal::Decimal>,
    ) -> Result<(), ExecError>;

    /// Closes `qty` of an open position at market, as a stop/take-profit
    /// trigger or a manual unwind (spec §4.N's position-watch step).
    async fn close_position(
        &self,
        symbol: &str,
        order_id: &str,
        qty: rust_decimal::Decimal,
    ) -> Result<(), ExecError>;
}

/// The external machine-learning predictor (spec §6). `PredictAgent` falls
/// back to a rule score when this errors or is unavailable.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(
        &self,
        features: &crate::domain::market::FeatureSnapshot,
    ) -> Result<PredictResult, PredictorError>;
}

//! Error taxonomy for the decision pipeline.
//!
//! Mirrors the severity/propagation rules of spec §7: fetch/alignment/data
//! errors degrade a single symbol's cycle to `hold`, predictor errors fall
//! back to the rule-based predictor, risk blocks are recorded but never
//! retried, and config errors are fatal at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing or invalid environment variable {name}: {reason}")]
    InvalidVar { name: String, reason: String },

    #[error("decision weights must sum to 1.0, got {sum}")]
    WeightsNotNormalized { sum: f64 },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("required series missing for {symbol}/{timeframe}: {reason}")]
    MissingSeries {
        symbol: String,
        timeframe: String,
        reason: String,
    },

    #[error("call to market data source timed out after {duration_ms}ms: {what}")]
    Timeout { duration_ms: u64, what: String },

    #[error("rate limited by exchange, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
}

#[derive(Debug, Error)]
#[error("snapshot for {symbol} failed alignment: {reason}")]
pub struct AlignmentError {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Error)]
#[error("insufficient data for {symbol}/{timeframe}: have {have}, need {need}")]
pub struct InsufficientData {
    pub symbol: String,
    pub timeframe: String,
    pub have: usize,
    pub need: usize,
}

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("predictor unavailable: {0}")]
    Unavailable(String),

    #[error("predictor returned an invalid result: {0}")]
    InvalidResult(String),
}

#[derive(Debug, Error)]
#[error("risk audit blocked the proposal for {symbol}: {reason}")]
pub struct RiskBlock {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("order dispatch failed for {symbol} (attempt {attempt}/{max_attempts}): {reason}")]
    DispatchFailed {
        symbol: String,
        attempt: u32,
        max_attempts: u32,
        reason: String,
    },

    #[error("position state for {symbol} is unknown after exhausting retries; blocked pending reconciliation")]
    StateUnknown { symbol: String },
}

/// Per-cycle, per-symbol error envelope. Never crosses symbol boundaries
/// (spec §7's "propagation policy").
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
    #[error(transparent)]
    InsufficientData(#[from] InsufficientData),
    #[error(transparent)]
    Predictor(#[from] PredictorError),
    #[error(transparent)]
    Risk(#[from] RiskBlock),
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl CycleError {
    /// Whether this error degrades the cycle to `hold` rather than aborting it.
    pub fn degrades_to_hold(&self) -> bool {
        matches!(
            self,
            CycleError::Fetch(_) | CycleError::Alignment(_) | CycleError::InsufficientData(_)
        )
    }
}

//! Replay infrastructure for the `backtest` CLI subcommand (spec §6): a
//! `MarketDataSource` backed by pre-recorded CSV candle series, and a stub
//! `OrderSink` that records fills without dispatching.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::errors::{ExecError, FetchError};
use crate::domain::market::{Candle, Timeframe};
use crate::domain::ports::{MarketDataSource, OrderSink};
use crate::domain::trading::OrderSide;

#[derive(Debug, Deserialize)]
struct CsvRow {
    open_time: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    close_time: DateTime<Utc>,
}

/// Loads one CSV file per `(symbol, timeframe)` and replays it verbatim —
/// no lookahead: callers only ever request a fixed `limit` from the front
/// of a replay cursor that advances per cycle (the pipeline's own
/// replayable-snapshot contract, spec §1(d)).
pub struct ReplayMarketDataSource {
    series: HashMap<(String, Timeframe), Vec<Candle>>,
    cursor: Mutex<HashMap<(String, Timeframe), usize>>,
}

impl ReplayMarketDataSource {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
            cursor: Mutex::new(HashMap::new()),
        }
    }

    /// Loads `path` (a CSV with `open_time,open,high,low,close,volume,close_time`
    /// headers) as the replay series for `(symbol, tf)`.
    pub fn load_csv(&mut self, symbol: &str, tf: Timeframe, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut candles = Vec::new();
        for result in reader.deserialize() {
            let row: CsvRow = result?;
            candles.push(Candle {
                open_time: row.open_time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
                close_time: row.close_time,
            });
        }
        self.series.insert((symbol.to_string(), tf), candles);
        Ok(())
    }
}

impl Default for ReplayMarketDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for ReplayMarketDataSource {
    async fn get_klines(
        &self,
        symbol: &str,
        tf: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, FetchError> {
        let key = (symbol.to_string(), tf);
        let series = self.series.get(&key).ok_or_else(|| FetchError::MissingSeries {
            symbol: symbol.to_string(),
            timeframe: tf.as_str().to_string(),
            reason: "no replay series loaded".to_string(),
        })?;

        let mut cursors = self.cursor.lock().expect("cursor lock poisoned");
        let position = cursors.entry(key.clone()).or_insert(limit.min(series.len()));
        if *position > series.len() {
            return Err(FetchError::MissingSeries {
                symbol: symbol.to_string(),
                timeframe: tf.as_str().to_string(),
                reason: "replay series exhausted".to_string(),
            });
        }
        let start = position.saturating_sub(limit);
        let window = series[start..*position].to_vec();
        *position = (*position + 1).min(series.len());
        Ok(window)
    }

    async fn get_funding_rate(&self, _symbol: &str) -> Result<f64, FetchError> {
        Ok(0.0)
    }

    async fn get_open_interest(&self, _symbol: &str) -> Result<(f64, f64), FetchError> {
        Ok((0.0, 0.0))
    }

    async fn get_institutional_netflow(
        &self,
        _symbol: &str,
        _window_minutes: u32,
    ) -> Result<f64, FetchError> {
        Ok(0.0)
    }
}

/// Records fills without ever dispatching — the `backtest` subcommand's
/// `OrderSink` (spec §6).
#[derive(Default)]
pub struct StubOrderSink {
    fills: Mutex<Vec<(Uuid, String, OrderSide, Decimal)>>,
}

impl StubOrderSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fills(&self) -> Vec<(Uuid, String, OrderSide, Decimal)> {
        self.fills.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl OrderSink for StubOrderSink {
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
        self.fills
            .lock()
            .expect("lock poisoned")
            .push((snapshot_id, symbol.to_string(), side, qty));
        Ok(format!("backtest-{snapshot_id}"))
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

    async fn close_position(&self, _symbol: &str, _order_id: &str, _qty: Decimal) -> Result<(), ExecError> {
        Ok(())
    }
}

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::errors::ConfigError;

fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>().map_err(|_| ConfigError::InvalidVar {
        name: name.to_string(),
        reason: format!("could not parse {raw:?}"),
    })
}

/// Decision weights for `DecisionCoreAgent` (spec §4.L). Must sum to 1.0.
#[derive(Debug, Clone, Copy)]
pub struct DecisionWeights {
    pub trend_5m: f64,
    pub trend_15m: f64,
    pub trend_1h: f64,
    pub osc_5m: f64,
    pub osc_15m: f64,
    pub osc_1h: f64,
    pub prophet: f64,
    pub sentiment: f64,
}

impl DecisionWeights {
    pub fn sum(&self) -> f64 {
        self.trend_5m
            + self.trend_15m
            + self.trend_1h
            + self.osc_5m
            + self.osc_15m
            + self.osc_1h
            + self.prophet
            + self.sentiment
    }
}

/// Risk thresholds for `RiskAuditAgent` (spec §4.M).
#[derive(Debug, Clone, Copy)]
pub struct RiskThresholds {
    pub max_leverage: u32,
    pub max_position_pct: f64,
    pub max_total_risk_pct: f64,
    pub stop_trading_drawdown_pct: f64,
    pub max_consecutive_losses: u32,
    pub sl_min_distance_pct: f64,
    pub sl_max_distance_pct: f64,
}

/// Per-call timeouts (spec §5).
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub klines: Duration,
    pub aux_metrics: Duration,
    pub predictor: Duration,
    pub llm: Duration,
    pub order_submit: Duration,
}

/// Regime thresholds, duplicated here (rather than imported from
/// `domain::market::regime`) only so they can be overridden from the
/// environment; `Config::regime_thresholds()` converts them.
#[derive(Debug, Clone, Copy)]
pub struct RegimeEnvThresholds {
    pub adx_trending: f64,
    pub adx_choppy_ceiling: f64,
    pub choppy_ema_distance_pct: f64,
    pub volatile_atr_pct: f64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub symbols: Vec<String>,
    pub weights: DecisionWeights,
    pub risk: RiskThresholds,
    pub timeouts: Timeouts,
    pub regime: RegimeEnvThresholds,
    pub llm_advisor_enabled: bool,
    pub persistence_dir: String,
    pub exec_max_retries: u32,
    /// Starting account balance used to seed the reconciler's equity curve.
    /// A real account-balance feed is an out-of-scope exchange-client
    /// concern (spec §1); this is the demo/backtest stand-in.
    pub initial_balance: rust_decimal::Decimal,
    /// How long `DataSyncAgent`'s `AuxMetricsCache` treats a funding/OI/
    /// netflow reading as fresh before refetching (spec §10.7's
    /// once-per-cycle cache).
    pub aux_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let symbols_str = env::var("SYMBOLS").unwrap_or_else(|_| "BTCUSDT".to_string());
        let symbols: Vec<String> = symbols_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(ConfigError::InvalidVar {
                name: "SYMBOLS".to_string(),
                reason: "must list at least one symbol".to_string(),
            });
        }

        let weights = DecisionWeights {
            trend_5m: parse_var("WEIGHT_TREND_5M", "0.10")?,
            trend_15m: parse_var("WEIGHT_TREND_15M", "0.15")?,
            trend_1h: parse_var("WEIGHT_TREND_1H", "0.20")?,
            osc_5m: parse_var("WEIGHT_OSC_5M", "0.05")?,
            osc_15m: parse_var("WEIGHT_OSC_15M", "0.07")?,
            osc_1h: parse_var("WEIGHT_OSC_1H", "0.08")?,
            prophet: parse_var("WEIGHT_PROPHET", "0.15")?,
            sentiment: parse_var("WEIGHT_SENTIMENT", "0.20")?,
        };
        let sum = weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightsNotNormalized { sum });
        }

        let risk = RiskThresholds {
            max_leverage: parse_var("MAX_LEVERAGE", "10")?,
            max_position_pct: parse_var("MAX_POSITION_PCT", "0.30")?,
            max_total_risk_pct: parse_var("MAX_TOTAL_RISK_PCT", "0.02")?,
            stop_trading_drawdown_pct: parse_var("STOP_TRADING_DRAWDOWN_PCT", "0.10")?,
            max_consecutive_losses: parse_var("MAX_CONSECUTIVE_LOSSES", "3")?,
            sl_min_distance_pct: parse_var("SL_MIN_DISTANCE_PCT", "0.005")?,
            sl_max_distance_pct: parse_var("SL_MAX_DISTANCE_PCT", "0.05")?,
        };

        let timeouts = Timeouts {
            klines: Duration::from_millis(parse_var("TIMEOUT_KLINES_MS", "5000")?),
            aux_metrics: Duration::from_millis(parse_var("TIMEOUT_AUX_METRICS_MS", "3000")?),
            predictor: Duration::from_millis(parse_var("TIMEOUT_PREDICTOR_MS", "2000")?),
            llm: Duration::from_millis(parse_var("TIMEOUT_LLM_MS", "6000")?),
            order_submit: Duration::from_millis(parse_var("TIMEOUT_ORDER_SUBMIT_MS", "5000")?),
        };

        let regime = RegimeEnvThresholds {
            adx_trending: parse_var("REGIME_ADX_TRENDING", "25.0")?,
            adx_choppy_ceiling: parse_var("REGIME_ADX_CHOPPY_CEILING", "20.0")?,
            choppy_ema_distance_pct: parse_var("REGIME_CHOPPY_EMA_DISTANCE_PCT", "0.3")?,
            volatile_atr_pct: parse_var("REGIME_VOLATILE_ATR_PCT", "1.5")?,
        };

        let llm_advisor_enabled: bool = parse_var("LLM_ADVISOR_ENABLED", "false")?;
        let persistence_dir = env::var("PERSISTENCE_DIR").unwrap_or_else(|_| "./data".to_string());
        let exec_max_retries = parse_var("EXEC_MAX_RETRIES", "3")?;
        let initial_balance = parse_var("INITIAL_BALANCE", "100000")?;
        let aux_cache_ttl = Duration::from_millis(parse_var("AUX_CACHE_TTL_MS", "60000")?);

        Ok(Self {
            symbols,
            weights,
            risk,
            timeouts,
            regime,
            llm_advisor_enabled,
            persistence_dir,
            exec_max_retries,
            initial_balance,
            aux_cache_ttl,
        })
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single timeframe-bucketed OHLCV record (spec §3's Candle/Kline).
///
/// Uses `Decimal` throughout, matching the teacher's `domain::trading::types::Candle` —
/// prices and volume never touch `f64` until they reach an indicator or score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CandleError {
    #[error("high/low bound violated: low={low} high={high} open={open} close={close}")]
    BoundViolation {
        low: Decimal,
        high: Decimal,
        open: Decimal,
        close: Decimal,
    },
    #[error("negative volume: {0}")]
    NegativeVolume(Decimal),
    #[error("close_time {close_time} is not after open_time {open_time}")]
    NonPositiveDuration {
        open_time: DateTime<Utc>,
        close_time: DateTime<Utc>,
    },
}

impl Candle {
    /// Validates the single-candle invariants from spec §3. Ordering invariants
    /// across a series (strictly increasing timestamps) are checked by the
    /// series/validator layer, not here, since a lone candle has no neighbor.
    pub fn validate(&self) -> Result<(), CandleError> {
        if self.low > self.open
            || self.low > self.close
            || self.open > self.high
            || self.close > self.high
        {
            return Err(CandleError::BoundViolation {
                low: self.low,
                high: self.high,
                open: self.open,
                close: self.close,
            });
        }
        if self.volume < Decimal::ZERO {
            return Err(CandleError::NegativeVolume(self.volume));
        }
        if self.close_time <= self.open_time {
            return Err(CandleError::NonPositiveDuration {
                open_time: self.open_time,
                close_time: self.close_time,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn candle(open: i64, high: i64, low: i64, close: i64) -> Candle {
        let t0 = DateTime::<Utc>::UNIX_EPOCH;
        Candle {
            open_time: t0,
            open: Decimal::from(open),
            high: Decimal::from(high),
            low: Decimal::from(low),
            close: Decimal::from(close),
            volume: dec!(10),
            close_time: t0 + Duration::minutes(5),
        }
    }

    #[test]
    fn valid_candle_passes() {
        assert!(candle(100, 110, 95, 105).validate().is_ok());
    }

    #[test]
    fn high_below_open_is_rejected() {
        assert!(matches!(
            candle(100, 99, 95, 98).validate(),
            Err(CandleError::BoundViolation { .. })
        ));
    }

    #[test]
    fn negative_volume_is_rejected() {
        let mut c = candle(100, 110, 95, 105);
        c.volume = dec!(-1);
        assert!(matches!(c.validate(), Err(CandleError::NegativeVolume(_))));
    }

    #[test]
    fn close_time_not_after_open_time_is_rejected() {
        let mut c = candle(100, 110, 95, 105);
        c.close_time = c.open_time;
        assert!(matches!(
            c.validate(),
            Err(CandleError::NonPositiveDuration { .. })
        ));
    }
}

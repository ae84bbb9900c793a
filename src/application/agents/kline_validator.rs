use tracing::warn;

use crate::domain::market::Candle;

/// Rejects malformed candles and enforces strictly increasing timestamps
/// within a series (spec §3/§4.B). A pure function: it never fetches, it
/// only filters what `MarketDataSource` already returned.
pub struct KlineValidator;

impl KlineValidator {
    pub fn clean(symbol: &str, tf_label: &str, raw: Vec<Candle>) -> Vec<Candle> {
        let mut out: Vec<Candle> = Vec::with_capacity(raw.len());
        for candle in raw {
            if let Err(e) = candle.validate() {
                warn!(symbol, tf = tf_label, error = %e, "dropping malformed candle");
                continue;
            }
            if let Some(prev) = out.last() {
                if candle.open_time <= prev.open_time {
                    warn!(
                        symbol,
                        tf = tf_label,
                        open_time = %candle.open_time,
                        prev_open_time = %prev.open_time,
                        "dropping out-of-order candle"
                    );
                    continue;
                }
            }
            out.push(candle);
        }
        out
    }
}

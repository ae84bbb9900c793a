use crate::domain::market::snapshot::OpenInterest;

/// Scores funding/OI/netflow (spec §4.G). Each sub-term is independent;
/// a missing input contributes 0 rather than being imputed.
pub struct SentimentSubAgent;

impl SentimentSubAgent {
    /// `price_direction` is the sign of the 1h timeframe's recent price
    /// change, used only to test the OI term's "directionally aligned with
    /// price" clause.
    pub fn score(
        netflow: Option<f64>,
        funding_rate: Option<f64>,
        open_interest: Option<OpenInterest>,
        price_direction: f64,
    ) -> f64 {
        let mut score = 0.0;

        if let Some(flow) = netflow {
            if flow > 0.0 {
                score += 30.0;
            } else if flow < 0.0 {
                score -= 30.0;
            }
        }

        if let Some(rate) = funding_rate {
            if rate > 0.0003 {
                score -= 30.0;
            } else if rate < -0.0003 {
                score += 30.0;
            }
        }

        if let Some(oi) = open_interest {
            if oi.value_24h_ago != 0.0 {
                let pct_change = (oi.current - oi.value_24h_ago) / oi.value_24h_ago * 100.0;
                if pct_change.abs() > 10.0 && pct_change.signum() == price_direction.signum() {
                    score += 10.0 * price_direction.signum();
                }
            }
        }

        score.clamp(-100.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_inputs_contribute_zero() {
        assert_eq!(SentimentSubAgent::score(None, None, None, 1.0), 0.0);
    }

    #[test]
    fn positive_netflow_is_bullish() {
        assert_eq!(SentimentSubAgent::score(Some(1.0), None, None, 1.0), 30.0);
    }

    #[test]
    fn crowded_long_funding_is_bearish() {
        assert_eq!(SentimentSubAgent::score(None, Some(0.0005), None, 1.0), -30.0);
    }

    #[test]
    fn oi_aligned_with_price_adds_bonus() {
        let oi = OpenInterest {
            current: 120.0,
            value_24h_ago: 100.0,
        };
        assert_eq!(SentimentSubAgent::score(None, None, Some(oi), 1.0), 10.0);
        assert_eq!(SentimentSubAgent::score(None, None, Some(oi), -1.0), 0.0);
    }
}

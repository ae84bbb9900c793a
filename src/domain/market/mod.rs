pub mod candle;
pub mod regime;
pub mod series;
pub mod snapshot;
pub mod timeframe;

pub use candle::Candle;
pub use regime::{Regime, RegimeDetector};
pub use series::{FeatureSnapshot, IndicatorFrame, IndicatorRow, RsiBucket};
pub use snapshot::{MarketSnapshot, TimeframeView};
pub use timeframe::Timeframe;

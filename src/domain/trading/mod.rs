pub mod types;

pub use types::{
    OrderSide, PositionLocation, PositionState, TradeOutcome, TradeProposal,
};

//! Autonomous crypto-futures decision pipeline: fetches multi-timeframe
//! market data, computes technical indicators and composite signals, fuses
//! them into a trade vote, and runs every proposal through an ordered risk
//! audit before dispatch (see `SPEC_FULL.md`).

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

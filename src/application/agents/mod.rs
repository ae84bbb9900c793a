pub mod aux_metrics_cache;
pub mod data_sync_agent;
pub mod decision_core_agent;
pub mod indicator_processor;
pub mod kline_validator;
pub mod oscillator_subagent;
pub mod position_analyzer;
pub mod predict_agent;
pub mod quant_analyst_agent;
pub mod risk_audit_agent;
pub mod sentiment_subagent;
pub mod trend_subagent;

pub use data_sync_agent::DataSyncAgent;
pub use decision_core_agent::DecisionCoreAgent;
pub use indicator_processor::IndicatorProcessor;
pub use kline_validator::KlineValidator;
pub use oscillator_subagent::OscillatorSubAgent;
pub use position_analyzer::PositionAnalyzer;
pub use predict_agent::PredictAgent;
pub use quant_analyst_agent::QuantAnalystAgent;
pub use risk_audit_agent::RiskAuditAgent;
pub use sentiment_subagent::SentimentSubAgent;
pub use trend_subagent::TrendSubAgent;

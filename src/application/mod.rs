pub mod agents;
pub mod orchestrator;
pub mod persistence;
pub mod reconciler;

pub use orchestrator::Orchestrator;
pub use reconciler::TradeOutcomeReconciler;

//! Business logic services module.

pub mod binder;
pub mod gateway;
pub mod history;
pub mod orchestrator;

pub use binder::{AlloyContractBinder, ContractBinder};
pub use gateway::WalletGateway;
pub use history::format_history;
pub use orchestrator::LedgerOrchestrator;

//! Ledger ATM Client Library
//!
//! Connects a wallet to a single on-chain ledger ("ATM") contract and drives its
//! balance-mutating calls while keeping a local view of balance and history.
//!
//! # Components
//!
//! - **WalletGateway**: detects the wallet provider and enumerates accounts
//! - **ContractBinder**: binds the ledger contract to the active account's signer
//! - **LedgerOrchestrator**: connection state machine and the only path to the contract
//! - **format_history**: turns raw contract history into display records
//! - **LedgerAtmServer**: MCP tool surface over the orchestrator
//!
//! # Example
//!
//! ```rust,ignore
//! use alloy::primitives::U256;
//! use ledger_atm_mcp::{Config, LedgerOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let orchestrator = LedgerOrchestrator::from_config(&config)?;
//!     orchestrator.initialize().await;
//!     orchestrator.connect().await?;
//!     let outcome = orchestrator.deposit(U256::from(1)).await?;
//!     println!("balance after deposit: {:?}", outcome.balance);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ethereum;
pub mod mcp;
pub mod services;
pub mod types;

pub use config::Config;
pub use error::{AppError, Result};
pub use ethereum::constants::*;
pub use mcp::LedgerAtmServer;
pub use services::{LedgerOrchestrator, WalletGateway};

//! MCP server module.
//!
//! Contains the MCP server implementation with tool handlers.

pub mod server;

pub use server::LedgerAtmServer;
pub use server::{AmountInput, HistoryView, StatusView};

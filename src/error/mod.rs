//! Error types and handling module.
//!
//! Wallet, binding and ledger-call failures, and their mapping onto MCP errors.

use rmcp::ErrorData as McpError;
use thiserror::Error;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No wallet provider is available.
    #[error("No wallet provider detected; install or configure a wallet to continue")]
    WalletAbsent,

    /// The user declined the account authorization request.
    #[error("Wallet authorization rejected by user")]
    UserRejected,

    /// A signer-bound contract handle could not be produced.
    #[error("Contract binding failed: {0}")]
    BindingFailed(String),

    /// A contract read or write failed, including confirmation failures.
    #[error("Contract call failed: {0}")]
    CallFailed(String),

    /// Operation requires a connected account and bound contract.
    #[error("Cannot {operation}: no account connected")]
    NotConnected { operation: &'static str },

    /// Amounts passed to mutating calls must be positive.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Another mutating operation has not finished yet.
    #[error("Another ledger operation is already in progress")]
    OperationInProgress,

    /// Transport errors.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Wallet-related errors.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Numeric overflow during conversion.
    #[error("Numeric overflow: {0}")]
    NumericOverflow(String),
}

impl From<alloy::transports::TransportError> for AppError {
    fn from(err: alloy::transports::TransportError) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl From<alloy::contract::Error> for AppError {
    fn from(err: alloy::contract::Error) -> Self {
        AppError::CallFailed(err.to_string())
    }
}

impl From<alloy::providers::PendingTransactionError> for AppError {
    fn from(err: alloy::providers::PendingTransactionError) -> Self {
        AppError::CallFailed(format!("confirmation failed: {err}"))
    }
}

impl From<alloy::signers::local::LocalSignerError> for AppError {
    fn from(err: alloy::signers::local::LocalSignerError) -> Self {
        AppError::Wallet(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::InvalidAmount(_)
            | AppError::Parse(_)
            | AppError::NumericOverflow(_) => McpError::invalid_params(err.to_string(), None),
            AppError::Config(_)
            | AppError::WalletAbsent
            | AppError::UserRejected
            | AppError::NotConnected { .. }
            | AppError::OperationInProgress => McpError::invalid_request(err.to_string(), None),
            _ => McpError::internal_error(err.to_string(), None),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

//! Ethereum network constants.
//!
//! Contains the default ledger deployment and wallet provider codes.

use alloy::primitives::{address, Address};

// ============================================================================
// Ledger Deployment
// ============================================================================

/// First contract deployed by the default Hardhat account on a fresh local node.
pub const DEFAULT_LEDGER_ADDRESS: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

// ============================================================================
// Wallet Provider (EIP-1193) Error Codes
// ============================================================================

/// The user rejected the request.
pub const USER_REJECTED_REQUEST_CODE: i64 = 4001;
